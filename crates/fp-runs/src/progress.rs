//! Batch progress events.

/// Emitted once per finished scenario, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub scenario: String,
    pub ok: bool,
}

impl BatchProgress {
    pub fn fraction_complete(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Progress callback shared by batch workers.
pub type ProgressFn<'a> = &'a (dyn Fn(BatchProgress) + Sync);

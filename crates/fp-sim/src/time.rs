//! Time grid and operating phases.

use fp_core::{ConfigError, ConfigResult, Tolerances, grid_index_floor, nearly_equal};
use serde::{Deserialize, Serialize};

/// Upper bound on `(end - start) / dt` for a valid horizon.
pub const MAX_STEPS: usize = 10_000_000;

/// Horizon `[start, end]` sampled every `dt`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeParams {
    pub start: f64,
    pub end: f64,
    pub dt: f64,
}

impl Default for TimeParams {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
            dt: 1.0,
        }
    }
}

impl TimeParams {
    pub fn new(start: f64, end: f64, dt: f64) -> Self {
        Self { start, end, dt }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let bad = |what: &str| {
            Err(ConfigError::InvalidTimeRange {
                what: what.to_string(),
            })
        };
        if !self.start.is_finite() || !self.end.is_finite() {
            return bad("start and end must be finite");
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return bad("dt must be positive and finite");
        }
        if self.end < self.start {
            return bad("end must not precede start");
        }
        if (self.end - self.start) / self.dt >= MAX_STEPS as f64 {
            return Err(ConfigError::InvalidTimeRange {
                what: format!(
                    "[{}, {}] at dt {} exceeds {MAX_STEPS} steps",
                    self.start, self.end, self.dt
                ),
            });
        }
        Ok(())
    }

    /// Number of grid points in the horizon, both ends included.
    ///
    /// An `end` that falls between grid points is rounded down. Saturates
    /// for horizons that [`validate`](Self::validate) would reject.
    pub fn steps(&self) -> usize {
        grid_index_floor(self.end, self.start, self.dt, Tolerances::default())
            .map_or(0, |n| n.saturating_add(1))
    }

    pub fn time_at(&self, index: usize) -> f64 {
        self.start + index as f64 * self.dt
    }

    /// Grid index at or below `time`, if `time` lies in the horizon.
    pub fn index_floor(&self, time: f64) -> Option<usize> {
        grid_index_floor(time, self.start, self.dt, Tolerances::default())
            .filter(|&i| i < self.steps())
    }

    /// Grid index of `time` when it sits on the grid within tolerance.
    pub fn index_of(&self, time: f64, tol: Tolerances) -> Option<usize> {
        let index = grid_index_floor(time, self.start, self.dt, tol)?;
        (index < self.steps() && nearly_equal(self.time_at(index), time, tol)).then_some(index)
    }
}

/// Named operating interval used to weight fault opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub start: f64,
    pub end: f64,
}

impl Phase {
    pub fn new(name: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.start + self.end)
    }
}

/// Index of the phase containing `time`.
///
/// Phases are half-open `[start, end)` except the last one listed, which
/// also owns its end point.
pub fn phase_of(phases: &[Phase], time: f64) -> Option<usize> {
    phases
        .iter()
        .position(|p| p.start <= time && time < p.end)
        .or_else(|| {
            let last = phases.len().checked_sub(1)?;
            (phases[last].start <= time && time == phases[last].end).then_some(last)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump_phases() -> Vec<Phase> {
        vec![
            Phase::new("start", 0.0, 5.0),
            Phase::new("on", 5.0, 50.0),
            Phase::new("end", 50.0, 55.0),
        ]
    }

    #[test]
    fn steps_include_both_ends() {
        let t = TimeParams::new(0.0, 55.0, 1.0);
        assert_eq!(t.steps(), 56);
        assert_eq!(t.time_at(55), 55.0);
        assert_eq!(TimeParams::new(0.0, 1.0, 0.1).steps(), 11);
        assert_eq!(TimeParams::new(0.0, 2.5, 1.0).steps(), 3);
        assert_eq!(TimeParams::new(3.0, 3.0, 1.0).steps(), 1);
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!(TimeParams::new(0.0, 10.0, 0.0).validate().is_err());
        assert!(TimeParams::new(5.0, 1.0, 1.0).validate().is_err());
        assert!(TimeParams::new(0.0, f64::NAN, 1.0).validate().is_err());
        assert!(TimeParams::new(0.0, 10.0, 0.5).validate().is_ok());
    }

    #[test]
    fn huge_horizons_are_capped() {
        let t = TimeParams::new(0.0, 1e30, 1.0);
        assert!(matches!(
            t.validate(),
            Err(ConfigError::InvalidTimeRange { what }) if what.contains("steps")
        ));
        assert_eq!(t.steps(), usize::MAX);

        let widest = TimeParams::new(0.0, (MAX_STEPS - 2) as f64, 1.0);
        assert!(widest.validate().is_ok());
        assert_eq!(widest.steps(), MAX_STEPS - 1);
        assert!(TimeParams::new(0.0, MAX_STEPS as f64, 1.0).validate().is_err());
        assert!(TimeParams::new(0.0, 1.0, 1e-9).validate().is_err());
    }

    #[test]
    fn grid_lookup() {
        let t = TimeParams::new(0.0, 55.0, 1.0);
        let tol = Tolerances::default();
        assert_eq!(t.index_of(27.0, tol), Some(27));
        assert_eq!(t.index_of(27.5, tol), None);
        assert_eq!(t.index_of(56.0, tol), None);
        assert_eq!(t.index_floor(27.5), Some(27));
        assert_eq!(t.index_floor(-1.0), None);
    }

    #[test]
    fn phase_lookup() {
        let phases = pump_phases();
        assert_eq!(phase_of(&phases, 0.0), Some(0));
        assert_eq!(phase_of(&phases, 5.0), Some(1));
        assert_eq!(phase_of(&phases, 49.0), Some(1));
        assert_eq!(phase_of(&phases, 55.0), Some(2));
        assert_eq!(phase_of(&phases, 56.0), None);
        assert_eq!(phases[1].center(), 27.5);
    }
}

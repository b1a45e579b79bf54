//! Flow state records.

use std::collections::BTreeMap;

use fp_core::{Tolerances, nearly_equal};
use serde::{Deserialize, Serialize};

/// Field values of one flow at the current instant.
///
/// The field set is fixed when the flow is created; `set` refuses fields
/// that were not declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowState {
    fields: BTreeMap<String, f64>,
}

impl FlowState {
    pub fn new<K: Into<String>>(fields: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Overwrite an existing field. Returns `false` if the field is unknown.
    pub fn set(&mut self, field: &str, value: f64) -> bool {
        match self.fields.get_mut(field) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }

    /// True when every field matches `other` within tolerance.
    pub fn settled(&self, other: &FlowState, tol: Tolerances) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|((ka, a), (kb, b))| ka == kb && nearly_equal(*a, *b, tol))
    }

    /// Largest absolute field difference against `other`.
    pub fn max_change(&self, other: &FlowState) -> f64 {
        self.fields
            .iter()
            .filter_map(|(k, a)| other.fields.get(k).map(|b| (a - b).abs()))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> FlowState {
        FlowState::new([("rate", 1.0), ("effort", 1.0), ("area", 1.0), ("level", 1.0)])
    }

    #[test]
    fn set_rejects_unknown_field() {
        let mut w = water();
        assert!(w.set("rate", 2.0));
        assert!(!w.set("pressure", 2.0));
        assert_eq!(w.get("rate"), Some(2.0));
        assert_eq!(w.get("pressure"), None);
    }

    #[test]
    fn settled_and_max_change() {
        let a = water();
        let mut b = water();
        assert!(a.settled(&b, Tolerances::default()));

        b.set("level", 1.5);
        assert!(!a.settled(&b, Tolerances::default()));
        assert_eq!(a.max_change(&b), 0.5);
    }
}

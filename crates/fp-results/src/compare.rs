//! Nominal vs. faulty history comparison.

use std::collections::BTreeSet;

use fp_core::{Tolerances, nearly_equal};
use serde::{Deserialize, Serialize};

use crate::types::{History, Snapshot};

/// End-state degradation of a faulty run relative to nominal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    /// Blocks with at least one active fault at the end.
    pub faulty_blocks: BTreeSet<String>,
    /// Flows whose final values differ from nominal.
    pub degraded_flows: BTreeSet<String>,
}

impl Degradation {
    pub fn is_nominal(&self) -> bool {
        self.faulty_blocks.is_empty() && self.degraded_flows.is_empty()
    }
}

/// Compare the final snapshots of two runs.
pub fn degradation(nominal: &History, faulty: &History, tol: Tolerances) -> Degradation {
    let (Some(nom), Some(fau)) = (nominal.last(), faulty.last()) else {
        return Degradation::default();
    };

    let faulty_blocks = fau
        .blocks
        .iter()
        .filter(|(_, rec)| !rec.faults.is_empty())
        .map(|(name, _)| name.clone())
        .collect();

    let degraded_flows = fau
        .flows
        .iter()
        .filter(|(name, fields)| match nom.flows.get(*name) {
            Some(nominal_fields) => fields.iter().any(|(field, v)| {
                nominal_fields
                    .get(field)
                    .is_none_or(|n| !nearly_equal(*n, *v, tol))
            }),
            None => true,
        })
        .map(|(name, _)| name.clone())
        .collect();

    Degradation {
        faulty_blocks,
        degraded_flows,
    }
}

fn snapshots_match(a: &Snapshot, b: &Snapshot, tol: Tolerances) -> bool {
    let flows_match = a.flows.len() == b.flows.len()
        && a.flows.iter().all(|(name, fields)| {
            b.flows.get(name).is_some_and(|other| {
                fields.len() == other.len()
                    && fields.iter().all(|(field, v)| {
                        other.get(field).is_some_and(|o| nearly_equal(*v, *o, tol))
                    })
            })
        });

    let blocks_match = a.blocks.len() == b.blocks.len()
        && a.blocks.iter().all(|(name, rec)| {
            b.blocks.get(name).is_some_and(|other| {
                rec.faults == other.faults
                    && rec.state.len() == other.state.len()
                    && rec.state.iter().all(|(key, v)| {
                        other.state.get(key).is_some_and(|o| nearly_equal(*v, *o, tol))
                    })
            })
        });

    let density_match = match (a.density, b.density) {
        (Some(x), Some(y)) => nearly_equal(x, y, tol),
        (None, None) => true,
        _ => false,
    };

    a.index == b.index
        && nearly_equal(a.time, b.time, tol)
        && flows_match
        && blocks_match
        && density_match
}

/// Snapshot-by-snapshot equality within tolerance, ignoring scenario labels
/// and warnings.
pub fn approx_eq(a: &History, b: &History, tol: Tolerances) -> bool {
    a.snapshots.len() == b.snapshots.len()
        && a
            .snapshots
            .iter()
            .zip(&b.snapshots)
            .all(|(x, y)| snapshots_match(x, y, tol))
}

/// Index of the first snapshot where two runs differ.
pub fn first_divergence(a: &History, b: &History, tol: Tolerances) -> Option<usize> {
    let common = a.snapshots.len().min(b.snapshots.len());
    (0..common)
        .find(|&i| !snapshots_match(&a.snapshots[i], &b.snapshots[i], tol))
        .or_else(|| (a.snapshots.len() != b.snapshots.len()).then_some(common))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockRecord;
    use std::collections::BTreeMap;

    fn hist(rates: &[f64], fault_from: Option<usize>) -> History {
        let mut h = History::new("s", 0);
        for (i, &rate) in rates.iter().enumerate() {
            let faults = match fault_from {
                Some(k) if i >= k => BTreeSet::from(["block".to_string()]),
                _ => BTreeSet::new(),
            };
            h.snapshots.push(Snapshot {
                index: i,
                time: i as f64,
                flows: BTreeMap::from([(
                    "wat_2".to_string(),
                    BTreeMap::from([("rate".to_string(), rate)]),
                )]),
                blocks: BTreeMap::from([(
                    "export_water".to_string(),
                    BlockRecord {
                        state: BTreeMap::new(),
                        faults,
                    },
                )]),
                density: None,
            });
        }
        h
    }

    #[test]
    fn degradation_reports_end_state() {
        let nominal = hist(&[1.0, 1.0, 1.0], None);
        let faulty = hist(&[1.0, 0.1, 0.1], Some(1));
        let d = degradation(&nominal, &faulty, Tolerances::default());
        assert!(d.faulty_blocks.contains("export_water"));
        assert!(d.degraded_flows.contains("wat_2"));
        assert!(degradation(&nominal, &nominal, Tolerances::default()).is_nominal());
    }

    #[test]
    fn approx_eq_and_divergence() {
        let a = hist(&[1.0, 1.0, 1.0], None);
        let b = hist(&[1.0, 1.0 + 1e-12, 1.0], None);
        let c = hist(&[1.0, 1.0, 0.5], None);
        let tol = Tolerances::default();
        assert!(approx_eq(&a, &b, tol));
        assert!(!approx_eq(&a, &c, tol));
        assert_eq!(first_divergence(&a, &c, tol), Some(2));
        assert_eq!(first_divergence(&a, &b, tol), None);
        assert_eq!(first_divergence(&a, &hist(&[1.0], None), tol), Some(1));
    }
}

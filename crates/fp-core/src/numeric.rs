/// Absolute/relative tolerance pair used for "did this value change" checks.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-9,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: f64, b: f64, tol: Tolerances) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// Snap `value` down onto the grid `origin + k*step`, returning `k`.
///
/// Values within `tol` of the next grid point snap up to it, so that
/// `0.1 + 0.2` lands on index 3 of a `0.1` grid rather than index 2.
pub fn grid_index_floor(value: f64, origin: f64, step: f64, tol: Tolerances) -> Option<usize> {
    if !(step > 0.0) || !value.is_finite() || value < origin {
        return None;
    }
    let raw = (value - origin) / step;
    let up = raw.ceil();
    if nearly_equal(raw, up, tol) {
        return Some(up as usize);
    }
    Some(raw.floor() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn nearly_equal_handles_infinities() {
        let tol = Tolerances::default();
        assert!(nearly_equal(f64::INFINITY, f64::INFINITY, tol));
        assert!(!nearly_equal(f64::INFINITY, 1.0, tol));
    }

    #[test]
    fn grid_index_snaps_to_step() {
        let tol = Tolerances::default();
        assert_eq!(grid_index_floor(0.0, 0.0, 1.0, tol), Some(0));
        assert_eq!(grid_index_floor(27.0, 0.0, 1.0, tol), Some(27));
        assert_eq!(grid_index_floor(27.5, 0.0, 1.0, tol), Some(27));
        assert_eq!(grid_index_floor(0.1 + 0.2, 0.0, 0.1, tol), Some(3));
        assert_eq!(grid_index_floor(-1.0, 0.0, 1.0, tol), None);
        assert_eq!(grid_index_floor(1.0, 0.0, 0.0, tol), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn nearly_equal_is_symmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let tol = Tolerances::default();
            prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }

        #[test]
        fn grid_index_never_overshoots(k in 0usize..10_000, frac in 0.0f64..0.99) {
            let tol = Tolerances::default();
            let value = (k as f64 + frac) * 0.5;
            let idx = grid_index_floor(value, 0.0, 0.5, tol).unwrap();
            prop_assert!(idx == k || idx == k + 1);
            prop_assert!(idx as f64 * 0.5 <= value + 0.5 * 1e-6);
        }
    }
}

//! Epsilon-aware float comparisons and the sentinel values shared by
//! every solver component. All capacity and cost arithmetic in this
//! crate is `f64` and must go through these helpers with the run's
//! configured epsilon; direct `==`/`<` on flow quantities is a bug.

/// Identifier of a node in the network. Virtual nodes (super-sources,
/// super-sinks injected by callers) use negative ids.
pub type NodeID = i64;

/// Default tolerance for flow and cost comparisons.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Parent-map entry of a search root. Note that `-1` is reserved and
/// rejected as a declared node id during validation.
pub const PARENT_SENTINEL: NodeID = -1;

/// Distance value of an unreached node in dense level arrays.
pub const UNREACHABLE: usize = usize::MAX;

/// Virtual nodes participate in flow but are excluded from statistics.
#[inline]
pub fn is_virtual(node: NodeID) -> bool {
    node < 0
}

#[inline]
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

#[inline]
pub fn approx_lt(a: f64, b: f64, eps: f64) -> bool {
    a < b - eps
}

#[inline]
pub fn approx_zero(x: f64, eps: f64) -> bool {
    x.abs() < eps
}

/// Strictly positive beyond the tolerance. Residual capacities at or
/// below epsilon are treated as exhausted by every traversal.
#[inline]
pub fn approx_positive(x: f64, eps: f64) -> bool {
    x > eps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_at_the_tolerance_boundary() {
        let eps = DEFAULT_EPSILON;
        let test_cases = [
            ((1.0, 1.0 + eps / 2.0), true),
            ((1.0, 1.0 + eps * 2.0), false),
            ((0.0, 0.0), true),
            ((-1.0, -1.0 - eps / 3.0), true),
        ];
        test_cases.into_iter().for_each(|((a, b), expected)| {
            assert_eq!(approx_eq(a, b, eps), expected);
        });
    }

    #[test]
    fn less_than_requires_a_full_epsilon_of_separation() {
        let eps = 1e-6;
        assert!(approx_lt(1.0, 2.0, eps));
        assert!(!approx_lt(1.0, 1.0 + eps / 2.0, eps));
        assert!(!approx_lt(2.0, 1.0, eps));
    }

    #[test]
    fn zero_and_positive() {
        let eps = DEFAULT_EPSILON;
        assert!(approx_zero(eps / 2.0, eps));
        assert!(approx_zero(-eps / 2.0, eps));
        assert!(!approx_zero(eps * 2.0, eps));
        assert!(approx_positive(1e-3, eps));
        assert!(!approx_positive(eps / 2.0, eps));
        assert!(!approx_positive(-1.0, eps));
    }

    #[test]
    fn virtual_node_predicate() {
        assert!(is_virtual(-2));
        assert!(is_virtual(PARENT_SENTINEL));
        assert!(!is_virtual(0));
        assert!(!is_virtual(42));
    }
}

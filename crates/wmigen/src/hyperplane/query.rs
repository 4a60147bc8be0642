//! Linear query `Σ_{j∈S} w_j·x_j <= 1` over a random variable subset `S`.

use nalgebra::DVector;
use rand::seq::index;
use rand::Rng;

use crate::error::GenError;
use crate::formula::{Formula, Term};

/// A hyperplane query restricted to `selected` (ascending, non-empty).
#[derive(Clone, Debug, PartialEq)]
pub struct HyperplaneQuery {
    pub coeffs: DVector<f64>,
    pub selected: Vec<usize>,
    pub formula: Formula,
}

/// `floor(hardness·n)`, clamped to `n`. Zero means "pick one variable".
#[inline]
pub fn selection_size(hardness: f64, n: usize) -> usize {
    ((hardness * n as f64).floor().max(0.0) as usize).min(n)
}

/// Build the query formula from coefficients `w` over `variables`.
///
/// Draws `floor(hardness·n)` distinct indices without replacement, or a single
/// uniform index when that count is zero.
pub fn build_query<R: Rng + ?Sized>(
    w: DVector<f64>,
    variables: &[String],
    hardness: f64,
    rng: &mut R,
) -> Result<HyperplaneQuery, GenError> {
    let n = variables.len();
    if w.len() != n {
        return Err(GenError::invalid(
            "variables",
            format!("{} coefficients for {n} variables", w.len()),
        ));
    }
    if n == 0 {
        return Err(GenError::invalid("variables", "need at least one variable"));
    }
    let k = selection_size(hardness, n);
    let mut selected = if k == 0 {
        vec![rng.gen_range(0..n)]
    } else {
        index::sample(rng, n, k).into_vec()
    };
    selected.sort_unstable();
    let formula = Formula::Le(
        Term::weighted_sum(selected.iter().map(|&j| (w[j], variables[j].as_str()))),
        Term::Const(1.0),
    );
    Ok(HyperplaneQuery {
        coeffs: w,
        selected,
        formula,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn vars(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("x{i}")).collect()
    }

    /// `Σ_{j∈S} w_j·x_j <= 1` at `x`; `None` on a length mismatch.
    fn holds_at(q: &HyperplaneQuery, x: &[f64]) -> Option<bool> {
        if x.len() != q.coeffs.len() {
            return None;
        }
        let lhs: f64 = q.selected.iter().map(|&j| q.coeffs[j] * x[j]).sum();
        Some(lhs <= 1.0)
    }

    #[test]
    fn selection_sizes() {
        assert_eq!(selection_size(0.0, 5), 0);
        assert_eq!(selection_size(0.5, 2), 1);
        assert_eq!(selection_size(0.5, 5), 2);
        assert_eq!(selection_size(1.0, 5), 5);
        assert_eq!(selection_size(0.19, 5), 0);
    }

    #[test]
    fn zero_hardness_selects_one() {
        let mut rng = StdRng::seed_from_u64(5);
        let w = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let q = build_query(w, &vars(3), 0.0, &mut rng).unwrap();
        assert_eq!(q.selected.len(), 1);
    }

    #[test]
    fn full_hardness_selects_all_in_order() {
        let mut rng = StdRng::seed_from_u64(5);
        let w = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let q = build_query(w, &vars(3), 1.0, &mut rng).unwrap();
        assert_eq!(q.selected, vec![0, 1, 2]);
        assert_eq!(holds_at(&q, &[0.1, 0.1, 0.1]), Some(true));
        assert_eq!(holds_at(&q, &[1.0, 1.0, 1.0]), Some(false));
        assert_eq!(holds_at(&q, &[0.1, 0.1]), None);
        match &q.formula {
            Formula::Le(Term::Plus(terms), Term::Const(one)) => {
                assert_eq!(terms.len(), 3);
                assert_eq!(*one, 1.0);
            }
            other => panic!("unexpected formula {other:?}"),
        }
    }

    #[test]
    fn length_mismatch_is_config_error() {
        let mut rng = StdRng::seed_from_u64(5);
        let w = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            build_query(w, &vars(3), 0.5, &mut rng),
            Err(GenError::InvalidConfig { param: "variables", .. })
        ));
    }
}

//! Variable domains and axis-aligned bounding boxes.

use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::formula::{Formula, Term};

/// Axis-aligned box `Π [lower_i, upper_i]`.
///
/// Invariants: non-empty, finite bounds, `lower <= upper` per dimension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    bounds: Vec<(f64, f64)>,
}

impl BoundingBox {
    pub fn new(bounds: Vec<(f64, f64)>) -> Result<Self, GenError> {
        if bounds.is_empty() {
            return Err(GenError::invalid("bbox", "need at least one dimension"));
        }
        for (i, &(lo, hi)) in bounds.iter().enumerate() {
            if !(lo.is_finite() && hi.is_finite()) {
                return Err(GenError::invalid(
                    "bbox",
                    format!("bounds of dimension {i} must be finite"),
                ));
            }
            if lo > hi {
                return Err(GenError::invalid(
                    "bbox",
                    format!("dimension {i} has lower {lo} > upper {hi}"),
                ));
            }
        }
        Ok(Self { bounds })
    }

    /// `[lo, hi]^dim`.
    pub fn cube(dim: usize, lo: f64, hi: f64) -> Result<Self, GenError> {
        Self::new(vec![(lo, hi); dim])
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    #[inline]
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dim()
            && self
                .bounds
                .iter()
                .zip(x)
                .all(|(&(lo, hi), &v)| lo <= v && v <= hi)
    }
}

/// A real variable with its value range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealVar {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

/// Boolean and real variables of a density, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub bool_vars: Vec<String>,
    pub real_vars: Vec<RealVar>,
}

impl Domain {
    pub fn new(bool_vars: Vec<String>, real_vars: Vec<RealVar>) -> Self {
        Self {
            bool_vars,
            real_vars,
        }
    }

    /// Real variables named `prefix0..prefix{n-1}` over the given box.
    pub fn from_box(prefix: &str, bbox: &BoundingBox) -> Self {
        let real_vars = bbox
            .bounds()
            .iter()
            .enumerate()
            .map(|(i, &(lower, upper))| RealVar {
                name: format!("{prefix}{i}"),
                lower,
                upper,
            })
            .collect();
        Self::new(Vec::new(), real_vars)
    }

    pub fn real_symbols(&self) -> Vec<String> {
        self.real_vars.iter().map(|v| v.name.clone()).collect()
    }

    pub fn bounding_box(&self) -> Result<BoundingBox, GenError> {
        BoundingBox::new(self.real_vars.iter().map(|v| (v.lower, v.upper)).collect())
    }

    /// `∧_i (lower_i <= x_i ∧ x_i <= upper_i)`.
    pub fn bounds_formula(&self) -> Formula {
        Formula::and_all(self.real_vars.iter().flat_map(|v| {
            [
                Formula::Le(Term::Const(v.lower), Term::var(&v.name)),
                Formula::Le(Term::var(&v.name), Term::Const(v.upper)),
            ]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_validation() {
        assert!(BoundingBox::new(vec![]).is_err());
        assert!(BoundingBox::new(vec![(1.0, 0.0)]).is_err());
        assert!(BoundingBox::new(vec![(f64::NEG_INFINITY, 0.0)]).is_err());
        let b = BoundingBox::new(vec![(0.0, 0.0), (-1.0, 2.0)]).unwrap();
        assert_eq!(b.dim(), 2);
        assert!(b.contains(&[0.0, 1.5]));
        assert!(!b.contains(&[0.1, 1.5]));
    }

    #[test]
    fn domain_from_box_and_bounds_formula() {
        let b = BoundingBox::cube(2, -1.0, 1.0).unwrap();
        let d = Domain::from_box("x", &b);
        assert_eq!(d.real_symbols(), vec!["x0".to_string(), "x1".to_string()]);
        assert_eq!(d.bounding_box().unwrap(), b);
        match d.bounds_formula() {
            Formula::And(parts) => assert_eq!(parts.len(), 4),
            other => panic!("expected conjunction, got {other:?}"),
        }
    }
}

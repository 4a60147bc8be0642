//! Density estimation trees fitted elsewhere, read from JSON.
//!
//! ```json
//! {"bounds": [[-3.0, 3.0], [-2.5, 2.0]],
//!  "tree": {"type": "split", "var": 0, "threshold": 0.1,
//!           "left": {"type": "leaf", "density": 0.05},
//!           "right": {"type": "leaf", "density": 0.02}}}
//! ```
//!
//! Samples with `x_var <= threshold` go left.

use serde::{Deserialize, Serialize};

use crate::domain::{BoundingBox, Domain};
use crate::error::GenError;
use crate::formula::{Formula, Term};
use crate::relu::input_var;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DetNode {
    Split {
        var: usize,
        threshold: f64,
        left: Box<DetNode>,
        right: Box<DetNode>,
    },
    Leaf {
        density: f64,
    },
}

impl DetNode {
    pub fn leaves(&self) -> usize {
        match self {
            DetNode::Split { left, right, .. } => left.leaves() + right.leaves(),
            DetNode::Leaf { .. } => 1,
        }
    }

    fn check(&self, dim: usize) -> Result<(), GenError> {
        match self {
            DetNode::Split {
                var,
                threshold,
                left,
                right,
            } => {
                if *var >= dim {
                    return Err(GenError::invalid(
                        "tree",
                        format!("split on x_{var} in a {dim}-dimensional tree"),
                    ));
                }
                if !threshold.is_finite() {
                    return Err(GenError::invalid("tree", "non-finite split threshold"));
                }
                left.check(dim)?;
                right.check(dim)
            }
            DetNode::Leaf { density } => {
                if !(density.is_finite() && *density >= 0.0) {
                    return Err(GenError::invalid(
                        "tree",
                        format!("leaf density {density} must be finite and >= 0"),
                    ));
                }
                Ok(())
            }
        }
    }

    fn encode(&self) -> Term {
        match self {
            DetNode::Split {
                var,
                threshold,
                left,
                right,
            } => Term::ite(
                Formula::Le(Term::var(input_var(*var)), Term::Const(*threshold)),
                left.encode(),
                right.encode(),
            ),
            DetNode::Leaf { density } => Term::Const(*density),
        }
    }

    /// Leaf density for `x`; `None` if a split reads past the end of `x`.
    fn eval(&self, x: &[f64]) -> Option<f64> {
        match self {
            DetNode::Split {
                var,
                threshold,
                left,
                right,
            } => {
                if *x.get(*var)? <= *threshold {
                    left.eval(x)
                } else {
                    right.eval(x)
                }
            }
            DetNode::Leaf { density } => Some(*density),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Det {
    pub bounds: Vec<(f64, f64)>,
    pub tree: DetNode,
}

impl Det {
    pub fn validate(&self) -> Result<BoundingBox, GenError> {
        let bbox = BoundingBox::new(self.bounds.clone())?;
        self.tree.check(bbox.dim())?;
        Ok(bbox)
    }

    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// Real variables `x_0..` over the tree bounds.
    pub fn domain(&self) -> Result<Domain, GenError> {
        Ok(Domain::from_box("x_", &self.validate()?))
    }

    pub fn support(&self) -> Result<Formula, GenError> {
        Ok(self.domain()?.bounds_formula())
    }

    /// Piecewise-constant weight as nested `ite` terms.
    pub fn weight(&self) -> Result<Term, GenError> {
        self.validate()?;
        Ok(self.tree.encode())
    }

    /// Density at `x`; zero outside the bounds.
    pub fn density_at(&self, x: &[f64]) -> Result<f64, GenError> {
        let bbox = self.validate()?;
        if x.len() != bbox.dim() {
            return Err(GenError::invalid(
                "x",
                format!("{} coordinates for a {}-dimensional tree", x.len(), bbox.dim()),
            ));
        }
        let inside = self
            .bounds
            .iter()
            .zip(x)
            .all(|(&(lo, hi), &v)| lo <= v && v <= hi);
        if !inside {
            return Ok(0.0);
        }
        self.tree
            .eval(x)
            .ok_or_else(|| GenError::invalid("tree", "split variable out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::term_to_smtlib;

    const JSON: &str = r#"{"bounds": [[-1.0, 1.0], [0.0, 2.0]],
        "tree": {"type": "split", "var": 1, "threshold": 0.5,
                 "left": {"type": "leaf", "density": 0.3},
                 "right": {"type": "split", "var": 0, "threshold": 0.0,
                           "left": {"type": "leaf", "density": 0.2},
                           "right": {"type": "leaf", "density": 0.1}}}}"#;

    #[test]
    fn encodes_splits_as_ite() {
        let det: Det = serde_json::from_str(JSON).unwrap();
        assert_eq!(det.tree.leaves(), 3);
        let w = det.weight().unwrap();
        assert_eq!(
            term_to_smtlib(&w),
            "(ite (<= x_1 0.5) 0.3 (ite (<= x_0 0.0) 0.2 0.1))"
        );
        let d = det.domain().unwrap();
        assert_eq!(d.real_symbols(), vec!["x_0", "x_1"]);
        assert_eq!(det.density_at(&[0.5, 1.0]).unwrap(), 0.1);
        assert_eq!(det.density_at(&[-0.5, 1.0]).unwrap(), 0.2);
        assert_eq!(det.density_at(&[0.0, 0.25]).unwrap(), 0.3);
        assert_eq!(det.density_at(&[0.0, 3.0]).unwrap(), 0.0);
    }

    #[test]
    fn density_at_rejects_trees_and_points_of_the_wrong_dimension() {
        let det: Det = serde_json::from_str(
            r#"{"bounds": [[0.0, 1.0]],
                "tree": {"type": "split", "var": 3, "threshold": 0.5,
                         "left": {"type": "leaf", "density": 1.0},
                         "right": {"type": "leaf", "density": 1.0}}}"#,
        )
        .unwrap();
        assert!(matches!(
            det.density_at(&[0.5]),
            Err(GenError::InvalidConfig { param: "tree", .. })
        ));

        let det: Det = serde_json::from_str(JSON).unwrap();
        assert!(matches!(
            det.density_at(&[0.5]),
            Err(GenError::InvalidConfig { param: "x", .. })
        ));
    }

    #[test]
    fn rejects_bad_trees() {
        let mut det: Det = serde_json::from_str(JSON).unwrap();
        det.tree = DetNode::Split {
            var: 2,
            threshold: 0.0,
            left: Box::new(DetNode::Leaf { density: 0.1 }),
            right: Box::new(DetNode::Leaf { density: 0.1 }),
        };
        assert!(matches!(det.weight(), Err(GenError::InvalidConfig { param: "tree", .. })));
        det.tree = DetNode::Leaf { density: -1.0 };
        assert!(det.validate().is_err());
        det.tree = DetNode::Leaf { density: 1.0 };
        det.bounds = vec![(1.0, 0.0)];
        assert!(matches!(det.validate(), Err(GenError::InvalidConfig { param: "bbox", .. })));
    }
}

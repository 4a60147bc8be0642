//! Mixed sum-product networks (structure only) and their weight encoding.
//!
//! Structures are learned elsewhere and exchanged as tagged JSON:
//!
//! ```json
//! {"type": "sum", "weights": [0.3, 0.7], "children": [ ... ]}
//! {"type": "product", "children": [ ... ]}
//! {"type": "leaf", "scope": [2], "densities": [0.1, 0.4], "breaks": [0.0, 1.0, 2.0]}
//! ```
//!
//! `encode_weight` is a post-order descent: sums become weighted `Plus`,
//! products `Times`, leaves an `ite` over the leaf's feature.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::features::{Feature, FeatureKind};
use crate::formula::{Formula, Term};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpnNode {
    Sum {
        weights: Vec<f64>,
        children: Vec<SpnNode>,
    },
    Product {
        children: Vec<SpnNode>,
    },
    Leaf {
        scope: Vec<usize>,
        densities: Vec<f64>,
        /// Histogram bin edges; empty for Boolean leaves.
        #[serde(default)]
        breaks: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpnError {
    SumArity { weights: usize, children: usize },
    EmptyChildren,
    LeafScope { scope: Vec<usize> },
    UnknownFeature { index: usize, features: usize },
    BoolLeafArity { densities: usize },
    HistogramArity { breaks: usize, densities: usize },
}

impl fmt::Display for SpnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SumArity { weights, children } => {
                write!(f, "sum node has {weights} weights for {children} children")
            }
            Self::EmptyChildren => write!(f, "inner node without children"),
            Self::LeafScope { scope } => write!(f, "leaf scope {scope:?} is not a single feature"),
            Self::UnknownFeature { index, features } => {
                write!(f, "leaf refers to feature {index} but only {features} exist")
            }
            Self::BoolLeafArity { densities } => {
                write!(f, "Boolean leaf needs 2 densities, got {densities}")
            }
            Self::HistogramArity { breaks, densities } => write!(
                f,
                "histogram leaf needs densities+1 breaks, got {breaks} breaks for {densities} densities"
            ),
        }
    }
}

impl std::error::Error for SpnError {}

impl SpnNode {
    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            SpnNode::Sum { children, .. } | SpnNode::Product { children } => {
                1 + children.iter().map(SpnNode::size).sum::<usize>()
            }
            SpnNode::Leaf { .. } => 1,
        }
    }
}

/// Weight function of the network over `features` (indexed by leaf scope).
pub fn encode_weight(node: &SpnNode, features: &[Feature]) -> Result<Term, SpnError> {
    match node {
        SpnNode::Sum { weights, children } => {
            if children.is_empty() {
                return Err(SpnError::EmptyChildren);
            }
            if weights.len() != children.len() {
                return Err(SpnError::SumArity {
                    weights: weights.len(),
                    children: children.len(),
                });
            }
            let terms = weights
                .iter()
                .zip(children)
                .map(|(w, c)| Ok(Term::scaled(*w, encode_weight(c, features)?)))
                .collect::<Result<Vec<_>, SpnError>>()?;
            Ok(Term::Plus(terms))
        }
        SpnNode::Product { children } => {
            if children.is_empty() {
                return Err(SpnError::EmptyChildren);
            }
            let terms = children
                .iter()
                .map(|c| encode_weight(c, features))
                .collect::<Result<Vec<_>, SpnError>>()?;
            Ok(Term::Times(terms))
        }
        SpnNode::Leaf {
            scope,
            densities,
            breaks,
        } => {
            let [index] = scope.as_slice() else {
                return Err(SpnError::LeafScope {
                    scope: scope.clone(),
                });
            };
            let feature = features.get(*index).ok_or(SpnError::UnknownFeature {
                index: *index,
                features: features.len(),
            })?;
            match feature.kind {
                FeatureKind::Bool => bool_leaf(&feature.name, densities),
                FeatureKind::Real => histogram_leaf(&feature.name, densities, breaks),
            }
        }
    }
}

fn bool_leaf(name: &str, densities: &[f64]) -> Result<Term, SpnError> {
    let [d0, d1] = densities else {
        return Err(SpnError::BoolLeafArity {
            densities: densities.len(),
        });
    };
    Ok(Term::ite(
        Formula::bool_var(name),
        Term::Const(*d1),
        Term::Const(*d0),
    ))
}

/// Nested ite over half-open bins `[b_i, b_{i+1})`; the first bin's else
/// branch carries the leftover mass `1 - Σ d`.
fn histogram_leaf(name: &str, densities: &[f64], breaks: &[f64]) -> Result<Term, SpnError> {
    if densities.is_empty() || breaks.len() != densities.len() + 1 {
        return Err(SpnError::HistogramArity {
            breaks: breaks.len(),
            densities: densities.len(),
        });
    }
    let bin = |i: usize| {
        Formula::And(vec![
            Formula::Le(Term::Const(breaks[i]), Term::var(name)),
            Formula::Lt(Term::var(name), Term::Const(breaks[i + 1])),
        ])
    };
    let rest = 1.0 - densities.iter().sum::<f64>();
    let mut ite = Term::ite(bin(0), Term::Const(densities[0]), Term::Const(rest));
    for (i, d) in densities.iter().enumerate().skip(1) {
        ite = Term::ite(bin(i), Term::Const(*d), ite);
    }
    Ok(ite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::term_to_smtlib;

    fn feats() -> Vec<Feature> {
        vec![
            Feature {
                name: "a".into(),
                kind: FeatureKind::Bool,
                values: vec!["n".into(), "y".into()],
            },
            Feature {
                name: "x".into(),
                kind: FeatureKind::Real,
                values: vec![],
            },
        ]
    }

    #[test]
    fn parses_tagged_json() {
        let json = r#"{"type":"sum","weights":[0.4,0.6],"children":[
            {"type":"product","children":[
                {"type":"leaf","scope":[0],"densities":[0.2,0.8]},
                {"type":"leaf","scope":[1],"densities":[0.5,0.25],"breaks":[0.0,1.0,2.0]}]},
            {"type":"leaf","scope":[1],"densities":[1.0],"breaks":[0.0,1.0]}]}"#;
        let spn: SpnNode = serde_json::from_str(json).unwrap();
        assert_eq!(spn.size(), 5);
        let w = encode_weight(&spn, &feats()).unwrap();
        let s = term_to_smtlib(&w);
        assert!(s.starts_with("(+ (* 0.4 (* (ite a 0.8 0.2) (ite (and (<= 1.0 x) (< x 2.0)) 0.25"));
        assert!(s.contains("(ite (and (<= 0.0 x) (< x 1.0)) 0.5 0.25)"));
    }

    #[test]
    fn malformed_nodes_are_rejected() {
        let f = feats();
        let bad_sum = SpnNode::Sum {
            weights: vec![1.0],
            children: vec![],
        };
        assert_eq!(encode_weight(&bad_sum, &f), Err(SpnError::EmptyChildren));
        let bad_scope = SpnNode::Leaf {
            scope: vec![0, 1],
            densities: vec![0.5, 0.5],
            breaks: vec![],
        };
        assert!(matches!(encode_weight(&bad_scope, &f), Err(SpnError::LeafScope { .. })));
        let unknown = SpnNode::Leaf {
            scope: vec![7],
            densities: vec![0.5, 0.5],
            breaks: vec![],
        };
        assert!(matches!(encode_weight(&unknown, &f), Err(SpnError::UnknownFeature { index: 7, .. })));
        let hist = SpnNode::Leaf {
            scope: vec![1],
            densities: vec![0.5, 0.5],
            breaks: vec![0.0, 1.0],
        };
        assert!(matches!(encode_weight(&hist, &f), Err(SpnError::HistogramArity { .. })));
    }
}

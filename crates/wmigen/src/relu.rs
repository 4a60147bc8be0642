//! Fully connected ReLU networks and their LRA encoding.
//!
//! Weights come from an external trainer as JSON:
//! `{"layers": [{"weights": [[..], ..], "bias": [..]}, ..]}` where
//! `weights[k][j]` maps input `j` to unit `k`. Every layer but the last is
//! followed by a ReLU.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::formula::{Formula, Term};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl DenseLayer {
    pub fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    pub fn outputs(&self) -> usize {
        self.weights.len()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReluNet {
    pub layers: Vec<DenseLayer>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    NoLayers,
    Shape { layer: usize, reason: String },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLayers => write!(f, "network has no layers"),
            Self::Shape { layer, reason } => write!(f, "layer {layer}: {reason}"),
        }
    }
}

impl std::error::Error for EncodeError {}

pub fn input_var(i: usize) -> String {
    format!("x_{i}")
}

pub fn output_var(j: usize) -> String {
    format!("y_{j}")
}

pub fn hidden_var(layer: usize, unit: usize) -> String {
    format!("h_{layer}_{unit}")
}

impl ReluNet {
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.layers.is_empty() {
            return Err(EncodeError::NoLayers);
        }
        let mut width = None;
        for (l, layer) in self.layers.iter().enumerate() {
            let shape = |reason: String| EncodeError::Shape { layer: l, reason };
            if layer.outputs() == 0 || layer.inputs() == 0 {
                return Err(shape("empty weight matrix".into()));
            }
            if layer.weights.iter().any(|row| row.len() != layer.inputs()) {
                return Err(shape("ragged weight matrix".into()));
            }
            if layer.bias.len() != layer.outputs() {
                return Err(shape(format!(
                    "{} biases for {} units",
                    layer.bias.len(),
                    layer.outputs()
                )));
            }
            if let Some(w) = width {
                if w != layer.inputs() {
                    return Err(shape(format!(
                        "expects {} inputs, previous layer has {w} units",
                        layer.inputs()
                    )));
                }
            }
            width = Some(layer.outputs());
        }
        Ok(())
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::inputs)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::outputs)
    }

    pub fn input_vars(&self) -> Vec<String> {
        (0..self.input_dim()).map(input_var).collect()
    }

    pub fn output_vars(&self) -> Vec<String> {
        (0..self.output_dim()).map(output_var).collect()
    }

    /// Forward pass with ReLU cut at `threshold`.
    pub fn forward(&self, x: &[f64], threshold: f64) -> Result<Vec<f64>, EncodeError> {
        self.validate()?;
        if x.len() != self.input_dim() {
            return Err(EncodeError::Shape {
                layer: 0,
                reason: format!("input has {} entries, expected {}", x.len(), self.input_dim()),
            });
        }
        let last = self.layers.len() - 1;
        let mut act = x.to_vec();
        for (l, layer) in self.layers.iter().enumerate() {
            act = layer
                .weights
                .iter()
                .zip(&layer.bias)
                .map(|(row, b)| {
                    let z = row.iter().zip(&act).map(|(w, a)| w * a).sum::<f64>() + b;
                    if l < last && z <= threshold {
                        0.0
                    } else {
                        z
                    }
                })
                .collect();
        }
        Ok(act)
    }

    /// Conjunction relating `x_*` to `y_*` through the hidden units.
    ///
    /// Hidden unit: `(z > t ∧ h = z) ∨ (z <= t ∧ h = 0)`; output: `y = z`.
    pub fn to_formula(&self, threshold: f64) -> Result<Formula, EncodeError> {
        self.validate()?;
        let last = self.layers.len() - 1;
        let mut prev = self.input_vars();
        let mut parts = Vec::new();
        for (l, layer) in self.layers.iter().enumerate() {
            let names: Vec<String> = if l == last {
                (0..layer.outputs()).map(output_var).collect()
            } else {
                (0..layer.outputs()).map(|k| hidden_var(l, k)).collect()
            };
            for ((row, b), name) in layer.weights.iter().zip(&layer.bias).zip(&names) {
                let mut terms: Vec<Term> = row
                    .iter()
                    .zip(&prev)
                    .map(|(w, v)| Term::scaled(*w, Term::var(v)))
                    .collect();
                terms.push(Term::Const(*b));
                let z = Term::Plus(terms);
                let unit = Term::var(name);
                if l == last {
                    parts.push(Formula::eq(unit, z));
                } else {
                    let t = Term::Const(threshold);
                    parts.push(Formula::Or(vec![
                        Formula::And(vec![Formula::Lt(t.clone(), z.clone()), Formula::eq(unit.clone(), z.clone())]),
                        Formula::And(vec![Formula::Le(z, t), Formula::eq(unit, Term::Const(0.0))]),
                    ]));
                }
            }
            prev = names;
        }
        Ok(Formula::And(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Z3Oracle;

    fn net() -> ReluNet {
        serde_json::from_str(
            r#"{"layers":[
                {"weights":[[1.0,-1.0],[0.5,2.0]],"bias":[0.0,-1.0]},
                {"weights":[[1.0,-2.0]],"bias":[0.25]}]}"#,
        )
        .unwrap()
    }

    fn pin(var: &str, lo: f64, hi: f64) -> Formula {
        Formula::And(vec![
            Formula::Le(Term::Const(lo), Term::var(var)),
            Formula::Le(Term::var(var), Term::Const(hi)),
        ])
    }

    #[test]
    fn forward_matches_hand_computation() {
        // h0 = relu(0.5 - (-0.5)) = 1, h1 = relu(0.25 - 1 - 1) = 0
        let y = net().forward(&[0.5, -0.5], 0.0).unwrap();
        assert_eq!(y, vec![1.25]);
    }

    #[test]
    fn formula_agrees_with_forward_pass() {
        let n = net();
        let f = n.to_formula(0.0).unwrap();
        let vars = f.free_vars();
        assert!(vars.contains_key("x_0") && vars.contains_key("h_0_1") && vars.contains_key("y_0"));
        let oracle = Z3Oracle::default();
        for x in [[0.5, -0.5], [-1.0, 0.25], [0.9, 0.9]] {
            let y = n.forward(&x, 0.0).unwrap()[0];
            let near = Formula::And(vec![
                f.clone(),
                pin("x_0", x[0], x[0]),
                pin("x_1", x[1], x[1]),
                pin("y_0", y - 1e-6, y + 1e-6),
            ]);
            assert!(oracle.check(&near).unwrap());
            let far = Formula::And(vec![
                f.clone(),
                pin("x_0", x[0], x[0]),
                pin("x_1", x[1], x[1]),
                pin("y_0", y + 0.5, y + 1.0),
            ]);
            assert!(!oracle.check(&far).unwrap());
        }
    }

    #[test]
    fn shape_errors() {
        assert_eq!(ReluNet { layers: vec![] }.validate(), Err(EncodeError::NoLayers));
        let mut bad = net();
        bad.layers[1].weights = vec![vec![1.0, 2.0, 3.0]];
        assert!(matches!(bad.to_formula(0.0), Err(EncodeError::Shape { layer: 1, .. })));
        let mut bias = net();
        bias.layers[0].bias.pop();
        assert!(matches!(bias.validate(), Err(EncodeError::Shape { layer: 0, .. })));
    }
}

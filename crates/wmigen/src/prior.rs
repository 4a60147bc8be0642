//! Diagonal Gaussian-mixture prior over the network inputs.

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{Distribution, Normal, WeightedIndex};
use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::hyperplane::uniform;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianMixture {
    pub weights: Vec<f64>,
    pub means: Vec<Vec<f64>>,
    pub stds: Vec<Vec<f64>>,
}

impl GaussianMixture {
    /// Random mixture with `ncl` components in `dim` dimensions.
    ///
    /// Draw order: component weights, then all means (`U(-1,1)`), then all
    /// standard deviations (`U(0,1)`).
    pub fn random<R: Rng + ?Sized>(ncl: usize, dim: usize, rng: &mut R) -> Result<Self, GenError> {
        if ncl == 0 {
            return Err(GenError::invalid("ncl", "need at least one component"));
        }
        if dim == 0 {
            return Err(GenError::invalid("xdim", "must be >= 1"));
        }
        let raw: Vec<f64> = (0..ncl).map(|_| rng.gen::<f64>()).collect();
        let total: f64 = raw.iter().sum();
        let weights = raw.iter().map(|w| w / total).collect();
        let means = (0..ncl)
            .map(|_| (0..dim).map(|_| uniform(rng, -1.0, 1.0)).collect())
            .collect();
        let stds = (0..ncl)
            .map(|_| (0..dim).map(|_| uniform(rng, 0.0, 1.0)).collect())
            .collect();
        let gm = Self {
            weights,
            means,
            stds,
        };
        gm.validate()?;
        Ok(gm)
    }

    pub fn components(&self) -> usize {
        self.weights.len()
    }

    pub fn dim(&self) -> usize {
        self.means.first().map_or(0, Vec::len)
    }

    pub fn validate(&self) -> Result<(), GenError> {
        let k = self.weights.len();
        if k == 0 {
            return Err(GenError::invalid("weights", "empty mixture"));
        }
        if self.means.len() != k || self.stds.len() != k {
            return Err(GenError::invalid(
                "means",
                format!(
                    "{k} weights, {} means, {} stds",
                    self.means.len(),
                    self.stds.len()
                ),
            ));
        }
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0)
            || self.weights.iter().sum::<f64>() <= 0.0
        {
            return Err(GenError::invalid(
                "weights",
                "must be finite, non-negative and not all zero",
            ));
        }
        let dim = self.dim();
        if dim == 0 {
            return Err(GenError::invalid("means", "zero-dimensional component"));
        }
        for (m, s) in self.means.iter().zip(&self.stds) {
            if m.len() != dim || s.len() != dim {
                return Err(GenError::invalid("means", "components differ in dimension"));
            }
            if m.iter().any(|v| !v.is_finite()) {
                return Err(GenError::invalid("means", "must be finite"));
            }
            if s.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(GenError::invalid("stds", "must be finite and >= 0"));
            }
        }
        Ok(())
    }

    /// `n x dim` sample matrix, one row per point.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<DMatrix<f64>, GenError> {
        self.validate()?;
        let picker = WeightedIndex::new(&self.weights)
            .map_err(|e| GenError::invalid("weights", e.to_string()))?;
        let normals = self
            .means
            .iter()
            .zip(&self.stds)
            .map(|(m, s)| {
                m.iter()
                    .zip(s)
                    .map(|(mu, sd)| Normal::new(*mu, *sd))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GenError::invalid("stds", e.to_string()))?;
        let dim = self.dim();
        let mut out = DMatrix::zeros(n, dim);
        for row in 0..n {
            let comp = &normals[picker.sample(rng)];
            for (col, dist) in comp.iter().enumerate() {
                out[(row, col)] = dist.sample(rng);
            }
        }
        Ok(out)
    }
}

//! Probabilistic verification benchmarks for ReLU networks.
//!
//! Ground truth: `nhyper` random hyperplanes over `[-1,1]^xdim`, each carrying
//! a `xdim x ydim` factor matrix. A point's label is `x · C` where `C` is the
//! element-wise product of the factors of every hyperplane with `w·x <= 1`.
//! The network (trained elsewhere on [`Dataset`]s sampled here) is checked
//! against that function region by region.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::density::Density;
use crate::det::Det;
use crate::domain::BoundingBox;
use crate::error::GenError;
use crate::formula::{Formula, Term};
use crate::hyperplane::{sample_hyperplane, SamplerCfg};
use crate::prior::GaussianMixture;
use crate::relu::{input_var, output_var, EncodeError, ReluNet};

/// Resamples allowed per hyperplane when the point system is singular.
const MAX_DEGENERATE_RETRIES: usize = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifyParams {
    pub xdim: usize,
    pub ydim: usize,
    /// Mixture components of the input prior.
    pub ncl: usize,
    pub nhyper: usize,
    /// Output tolerance of the queries.
    pub epsilon: f64,
    /// ReLU activation threshold.
    pub threshold: f64,
    pub seed: u64,
    pub nn_train: usize,
    pub nn_test: usize,
    pub det_train: usize,
    pub det_valid: usize,
}

impl Default for VerifyParams {
    fn default() -> Self {
        Self {
            xdim: 3,
            ydim: 1,
            ncl: 3,
            nhyper: 2,
            epsilon: 1e-2,
            threshold: 0.0,
            seed: 666,
            nn_train: 10_000,
            nn_test: 1_000,
            det_train: 1_000,
            det_valid: 100,
        }
    }
}

impl VerifyParams {
    pub fn validate(&self) -> Result<(), GenError> {
        if self.xdim == 0 {
            return Err(GenError::invalid("xdim", "must be >= 1"));
        }
        if self.ydim == 0 {
            return Err(GenError::invalid("ydim", "must be >= 1"));
        }
        if self.ncl == 0 {
            return Err(GenError::invalid("ncl", "must be >= 1"));
        }
        // One query per output and truth assignment.
        if self.nhyper > 20 {
            return Err(GenError::invalid("nhyper", "at most 20 hyperplanes"));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(GenError::invalid("epsilon", "must be finite and >= 0"));
        }
        if !self.threshold.is_finite() {
            return Err(GenError::invalid("threshold", "must be finite"));
        }
        Ok(())
    }

    /// `pfv-<xdim>-<ydim>-<ncl>-<nhyper>`
    pub fn folder_name(&self) -> String {
        format!("pfv-{}-{}-{}-{}", self.xdim, self.ydim, self.ncl, self.nhyper)
    }
}

#[derive(Debug)]
pub enum VerifyError {
    Gen(GenError),
    Encode(EncodeError),
    Mismatch { reason: String },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gen(e) => write!(f, "{e}"),
            Self::Encode(e) => write!(f, "network encoding: {e}"),
            Self::Mismatch { reason } => write!(f, "dimension mismatch: {reason}"),
        }
    }
}

impl std::error::Error for VerifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gen(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Mismatch { .. } => None,
        }
    }
}

impl From<GenError> for VerifyError {
    fn from(e: GenError) -> Self {
        Self::Gen(e)
    }
}

impl From<EncodeError> for VerifyError {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeightedHalfspace {
    pub w: DVector<f64>,
    pub factors: DMatrix<f64>,
}

impl WeightedHalfspace {
    #[inline]
    pub fn contains(&self, x: &DVector<f64>) -> bool {
        self.w.dot(x) <= 1.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroundTruth {
    pub xdim: usize,
    pub ydim: usize,
    pub halfspaces: Vec<WeightedHalfspace>,
}

impl GroundTruth {
    /// Per hyperplane: base point, orientation, then factors (row-major).
    pub fn generate<R: Rng + ?Sized>(
        xdim: usize,
        ydim: usize,
        nhyper: usize,
        rng: &mut R,
    ) -> Result<Self, GenError> {
        let bbox = BoundingBox::cube(xdim, -1.0, 1.0)?;
        let mut halfspaces = Vec::with_capacity(nhyper);
        for _ in 0..nhyper {
            let mut tries = 0;
            let sample = loop {
                match sample_hyperplane(&bbox, SamplerCfg::default(), rng) {
                    Ok(s) => break s,
                    Err(GenError::DegenerateSample { .. }) if tries < MAX_DEGENERATE_RETRIES => {
                        tries += 1;
                    }
                    Err(e) => return Err(e),
                }
            };
            let factors =
                DMatrix::from_row_iterator(xdim, ydim, (0..xdim * ydim).map(|_| rng.gen::<f64>()));
            halfspaces.push(WeightedHalfspace {
                w: sample.w,
                factors,
            });
        }
        Ok(Self {
            xdim,
            ydim,
            halfspaces,
        })
    }

    /// Combined factor matrix for the region of `x`.
    pub fn combination(&self, x: &DVector<f64>) -> DMatrix<f64> {
        self.halfspaces
            .iter()
            .filter(|h| h.contains(x))
            .fold(DMatrix::from_element(self.xdim, self.ydim, 1.0), |c, h| {
                c.component_mul(&h.factors)
            })
    }

    /// `x · C(x)` as a `ydim` vector.
    pub fn label(&self, x: &DVector<f64>) -> DVector<f64> {
        self.combination(x).tr_mul(x)
    }

    pub fn label_rows(&self, xs: &DMatrix<f64>) -> DMatrix<f64> {
        let mut ys = DMatrix::zeros(xs.nrows(), self.ydim);
        for (r, row) in xs.row_iter().enumerate() {
            let y = self.label(&row.transpose());
            ys.row_mut(r).copy_from(&y.transpose());
        }
        ys
    }

    /// One query per truth assignment and output.
    ///
    /// Assignments are enumerated all-true first, the last hyperplane
    /// toggling fastest. Each query conjoins the region conditions with
    /// `y_i - eps <= C_mu[:,i]·x <= y_i + eps`.
    pub fn queries(&self, epsilon: f64) -> Vec<Formula> {
        let n = self.halfspaces.len();
        let xs: Vec<String> = (0..self.xdim).map(input_var).collect();
        let dot = |coeffs: Vec<f64>| Term::weighted_sum(coeffs.into_iter().zip(xs.iter().map(String::as_str)));
        let mut out = Vec::with_capacity((1usize << n) * self.ydim);
        for code in 0..(1usize << n) {
            let mut conds = Vec::with_capacity(n);
            let mut comb = DMatrix::from_element(self.xdim, self.ydim, 1.0);
            for (k, h) in self.halfspaces.iter().enumerate() {
                let inside = (code >> (n - 1 - k)) & 1 == 0;
                let cond = Formula::Le(dot(h.w.iter().copied().collect()), Term::Const(1.0));
                if inside {
                    comb.component_mul_assign(&h.factors);
                    conds.push(cond);
                } else {
                    conds.push(Formula::not(cond));
                }
            }
            for i in 0..self.ydim {
                let wc = dot(comb.column(i).iter().copied().collect());
                let y = Term::var(output_var(i));
                let mut parts = conds.clone();
                parts.push(Formula::Le(
                    Term::minus(y.clone(), Term::Const(epsilon)),
                    wc.clone(),
                ));
                parts.push(Formula::Le(wc, Term::Plus(vec![y, Term::Const(epsilon)])));
                out.push(Formula::And(parts));
            }
        }
        out
    }
}

/// Inputs and labels, one row per point.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub x: DMatrix<f64>,
    pub y: DMatrix<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }
}

/// `first + second` labelled points from one RNG seeded with `seed`.
pub fn sample_split(
    prior: &GaussianMixture,
    truth: &GroundTruth,
    first: usize,
    second: usize,
    seed: u64,
) -> Result<(Dataset, Dataset), GenError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let xs = prior.sample(first + second, &mut rng)?;
    if xs.ncols() != truth.xdim {
        return Err(GenError::invalid(
            "prior",
            format!("{}-dimensional prior for {} inputs", xs.ncols(), truth.xdim),
        ));
    }
    let ys = truth.label_rows(&xs);
    let split = |start: usize, len: usize| Dataset {
        x: xs.rows(start, len).into_owned(),
        y: ys.rows(start, len).into_owned(),
    };
    Ok((split(0, first), split(first, second)))
}

/// Prior and ground truth drawn from one RNG seeded with `params.seed`.
pub fn setup(params: &VerifyParams) -> Result<(GaussianMixture, GroundTruth), GenError> {
    params.validate()?;
    let mut rng = StdRng::seed_from_u64(params.seed);
    let prior = GaussianMixture::random(params.ncl, params.xdim, &mut rng)?;
    let truth = GroundTruth::generate(params.xdim, params.ydim, params.nhyper, &mut rng)?;
    Ok((prior, truth))
}

/// Network training data (`seed`) and tree fitting data (`seed + 1`).
pub struct Datasets {
    pub nn_train: Dataset,
    pub nn_test: Dataset,
    pub det_train: Dataset,
    pub det_valid: Dataset,
}

pub fn datasets(
    params: &VerifyParams,
    prior: &GaussianMixture,
    truth: &GroundTruth,
) -> Result<Datasets, GenError> {
    let (nn_train, nn_test) = sample_split(prior, truth, params.nn_train, params.nn_test, params.seed)?;
    let (det_train, det_valid) = sample_split(
        prior,
        truth,
        params.det_train,
        params.det_valid,
        params.seed.wrapping_add(1),
    )?;
    Ok(Datasets {
        nn_train,
        nn_test,
        det_train,
        det_valid,
    })
}

/// Support `relu ∧ det bounds`, weight from the tree, queries from `truth`.
pub fn build_density(
    net: &ReluNet,
    det: &Det,
    truth: &GroundTruth,
    params: &VerifyParams,
) -> Result<Density, VerifyError> {
    params.validate()?;
    if net.input_dim() != truth.xdim || det.dim() != truth.xdim {
        return Err(VerifyError::Mismatch {
            reason: format!(
                "network has {} inputs, tree {} dimensions, ground truth {}",
                net.input_dim(),
                det.dim(),
                truth.xdim
            ),
        });
    }
    if net.output_dim() != truth.ydim {
        return Err(VerifyError::Mismatch {
            reason: format!(
                "network has {} outputs, ground truth {}",
                net.output_dim(),
                truth.ydim
            ),
        });
    }
    let relu = net.to_formula(params.threshold)?;
    let domain = det.domain()?;
    let support = Formula::and_all([relu, det.support()?]);
    let weight = det.weight()?;
    let queries = truth.queries(params.epsilon);
    tracing::info!(
        queries = queries.len(),
        leaves = det.tree.leaves(),
        "verification density assembled"
    );
    Ok(Density::new(domain, support, weight, queries))
}

/// Agreement of the trained network and the fitted tree with labelled points.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelFit {
    pub points: usize,
    /// Fraction of points whose outputs are all within `epsilon` of the label.
    pub within_epsilon: f64,
    /// Largest absolute output error over all points and outputs.
    pub max_abs_error: f64,
    /// Mean tree density over the points.
    pub mean_density: f64,
}

/// Runs the network and the tree on every row of `data`.
pub fn model_fit(
    net: &ReluNet,
    det: &Det,
    data: &Dataset,
    params: &VerifyParams,
) -> Result<ModelFit, VerifyError> {
    if data.x.ncols() != net.input_dim() || data.y.ncols() != net.output_dim() {
        return Err(VerifyError::Mismatch {
            reason: format!(
                "network is {}->{}, data is {}->{}",
                net.input_dim(),
                net.output_dim(),
                data.x.ncols(),
                data.y.ncols()
            ),
        });
    }
    let mut within = 0usize;
    let mut max_abs_error = 0.0f64;
    let mut density = 0.0;
    for (x, y) in data.x.row_iter().zip(data.y.row_iter()) {
        let x: Vec<f64> = x.iter().copied().collect();
        let out = net.forward(&x, params.threshold)?;
        let err = out
            .iter()
            .zip(y.iter())
            .map(|(o, t)| (o - t).abs())
            .fold(0.0, f64::max);
        if err <= params.epsilon {
            within += 1;
        }
        max_abs_error = max_abs_error.max(err);
        density += det.density_at(&x)?;
    }
    let n = data.len();
    let mean = |total: f64| if n == 0 { 0.0 } else { total / n as f64 };
    let fit = ModelFit {
        points: n,
        within_epsilon: mean(within as f64),
        max_abs_error,
        mean_density: mean(density),
    };
    tracing::info!(
        points = fit.points,
        within_epsilon = fit.within_epsilon,
        max_abs_error = fit.max_abs_error,
        mean_density = fit.mean_density,
        "model fit on held-out points"
    );
    Ok(fit)
}

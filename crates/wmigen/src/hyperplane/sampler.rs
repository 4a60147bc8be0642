//! Random hyperplane `w·x = 1` through `n` points built around a random base point.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::BoundingBox;
use crate::error::GenError;

/// Numeric tolerances for the hyperplane solve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplerCfg {
    /// Minimum ratio `min|U_ii| / max|U_ii|` of the LU factor before the point
    /// system counts as singular.
    pub eps_det: f64,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self { eps_det: 1e-12 }
    }
}

/// Coefficients of `w·x = 1` plus the base point it was built from.
#[derive(Clone, Debug, PartialEq)]
pub struct HyperplaneSample {
    pub w: DVector<f64>,
    pub base_point: DVector<f64>,
}

/// Uniform draw in `[lo, hi]`; safe for `lo == hi`.
#[inline]
pub(crate) fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * rng.gen::<f64>()
}

/// Sample one hyperplane over `bbox`.
///
/// Draw order: `n` coordinates of the base point `p`, then the `(n-1)×n`
/// orientation matrix `O` row-major. Both are drawn before the solve, so a
/// degenerate sample consumes the same draws as an accepted one.
///
/// Rows of the point matrix are `p` and `p ⊙ O[r]`; `w` solves `Points·w = 1`
/// by dense LU without regularization.
pub fn sample_hyperplane<R: Rng + ?Sized>(
    bbox: &BoundingBox,
    cfg: SamplerCfg,
    rng: &mut R,
) -> Result<HyperplaneSample, GenError> {
    let n = bbox.dim();
    let p = DVector::from_iterator(
        n,
        bbox.bounds().iter().map(|&(lo, hi)| uniform(rng, lo, hi)),
    );
    let o: Vec<f64> = (0..(n - 1) * n).map(|_| rng.gen::<f64>()).collect();
    let points = DMatrix::from_fn(n, n, |r, c| {
        if r == 0 {
            p[c]
        } else {
            p[c] * o[(r - 1) * n + c]
        }
    });
    let w = solve_unit_rhs(points, cfg)?;
    Ok(HyperplaneSample { w, base_point: p })
}

/// Solve `m·w = 1` or report the system as degenerate.
pub(crate) fn solve_unit_rhs(m: DMatrix<f64>, cfg: SamplerCfg) -> Result<DVector<f64>, GenError> {
    let n = m.nrows();
    let lu = m.lu();
    let diag = lu.u().diagonal();
    let max = diag.amax();
    let min = diag.amin();
    if !(max.is_finite() && max > 0.0) || min / max < cfg.eps_det {
        return Err(GenError::degenerate(format!(
            "point matrix is singular (|U_ii| in [{min:e}, {max:e}])"
        )));
    }
    let w = lu
        .solve(&DVector::from_element(n, 1.0))
        .ok_or_else(|| GenError::degenerate("LU solve failed"))?;
    if !w.iter().all(|v| v.is_finite()) {
        return Err(GenError::degenerate("non-finite hyperplane coefficients"));
    }
    Ok(w)
}

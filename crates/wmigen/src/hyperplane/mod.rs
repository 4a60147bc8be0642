//! Random feasible-hyperplane queries.
//!
//! Purpose
//! - Sample hyperplanes `w·x = 1` inside a bounding box, restrict them to a
//!   random variable subset, and keep those that intersect the support.
//!
//! Reproducibility
//! - One injected `Rng` is consumed in a fixed order per attempt (base point,
//!   orientation matrix, subset), including attempts that get rejected.
//!   Same seed, same inputs, same `QuerySet`.
//!
//! Degenerate point systems never produce NaN coefficients: they surface as
//! `GenError::DegenerateSample` and are retried or returned per
//! `DegeneratePolicy`.

mod accept;
mod query;
mod sampler;

pub use accept::{
    generate_queries, AttemptStats, DegeneratePolicy, QueryGenerator, QueryParams, QuerySet, Step,
};
pub use query::{build_query, selection_size, HyperplaneQuery};
pub use sampler::{sample_hyperplane, HyperplaneSample, SamplerCfg};
pub(crate) use sampler::uniform;

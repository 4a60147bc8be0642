//! Curated internal API for the CLI and benches (UNSTABLE).
//!
//! Breaking changes are allowed; callers import from here rather than from
//! individual modules so moves inside the crate stay local.

// Formulas and artifacts
pub use crate::density::Density;
pub use crate::domain::{BoundingBox, Domain, RealVar};
pub use crate::formula::{formula_to_smtlib, script, term_to_smtlib, Formula, Sort, Term};
// Query generation
pub use crate::hyperplane::{
    build_query, generate_queries, sample_hyperplane, selection_size, AttemptStats,
    DegeneratePolicy, HyperplaneQuery, HyperplaneSample, QueryGenerator, QueryParams, QuerySet,
    SamplerCfg,
};
// Oracles
pub use crate::oracle::{SatOracle, SmtProcessOracle, Z3Cfg, Z3Oracle};
// MSPN pipeline
pub use crate::features::{parse_features, Feature, FeatureError, FeatureKind};
pub use crate::mspn::{build_benchmark, feature_domain, MspnBenchmark, MspnError, MspnParams, Suite};
pub use crate::spn::{encode_weight, SpnError, SpnNode};
// Verification pipeline
pub use crate::det::{Det, DetNode};
pub use crate::prior::GaussianMixture;
pub use crate::relu::{DenseLayer, EncodeError, ReluNet};
pub use crate::verification::{
    build_density, datasets, model_fit, sample_split, setup, Dataset, Datasets, GroundTruth,
    ModelFit, VerifyError, VerifyParams, WeightedHalfspace,
};
// Errors
pub use crate::error::{GenError, OracleError};

//! MSPN benchmarks: learned mixed SPNs turned into densities with random
//! hyperplane queries.
//!
//! Per experiment the inputs are a feature list, the real-feature ranges seen
//! in the training data and a learned structure. Output folder and file names
//! encode every parameter so reruns skip finished experiments.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::density::Density;
use crate::domain::{Domain, RealVar};
use crate::error::GenError;
use crate::features::{Feature, FeatureKind};
use crate::formula::real_literal;
use crate::hyperplane::{generate_queries, AttemptStats, QueryParams};
use crate::oracle::SatOracle;
use crate::spn::{encode_weight, SpnError, SpnNode};

/// Experiment suites, each sorted by increasing feature count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    Small,
    Big,
}

impl Suite {
    pub const ALL: [Suite; 2] = [Suite::Small, Suite::Big];

    pub fn name(self) -> &'static str {
        match self {
            Suite::Small => "small",
            Suite::Big => "big",
        }
    }

    pub fn experiments(self) -> &'static [&'static str] {
        match self {
            Suite::Small => &[
                "balance-scale",
                "iris",
                "cars",
                "diabetes",
                "breast-cancer",
                "glass2",
                "glass",
                "breast",
                "solar",
                "cleve",
                "hepatitis",
            ],
            Suite::Big => &[
                "heart",
                "australian",
                "crx",
                "german",
                "german-org",
                "auto",
                "anneal-U",
            ],
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Suite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(Suite::Small),
            "big" => Ok(Suite::Big),
            other => Err(format!("unknown suite `{other}` (expected small or big)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MspnParams {
    /// Structure-learning slice size; part of the artifact names.
    pub min_inst_slices: usize,
    pub seed: u64,
    pub query: QueryParams,
}

impl MspnParams {
    pub fn validate(&self) -> Result<(), GenError> {
        if self.min_inst_slices == 0 {
            return Err(GenError::invalid("min_inst_slices", "must be >= 1"));
        }
        self.query.validate()
    }

    /// `<suite>-mspns-<mis>-<nq>-<h>-<seed>`
    pub fn folder_name(&self, suite: Suite) -> String {
        format!(
            "{}-mspns-{}-{}-{}-{}",
            suite,
            self.min_inst_slices,
            self.query.nqueries,
            real_literal(self.query.hardness),
            self.seed
        )
    }

    /// `<exp>-<mis>.json`
    pub fn file_name(&self, experiment: &str) -> String {
        format!("{experiment}-{}.json", self.min_inst_slices)
    }

    /// `<exp>-<mis>.spn.json`
    pub fn structure_file_name(&self, experiment: &str) -> String {
        format!("{experiment}-{}.spn.json", self.min_inst_slices)
    }
}

#[derive(Debug)]
pub enum MspnError {
    Spn(SpnError),
    Gen(GenError),
    MissingRange { feature: String },
}

impl fmt::Display for MspnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spn(e) => write!(f, "invalid structure: {e}"),
            Self::Gen(e) => write!(f, "{e}"),
            Self::MissingRange { feature } => {
                write!(f, "no value range for real feature `{feature}`")
            }
        }
    }
}

impl std::error::Error for MspnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spn(e) => Some(e),
            Self::Gen(e) => Some(e),
            Self::MissingRange { .. } => None,
        }
    }
}

impl From<SpnError> for MspnError {
    fn from(e: SpnError) -> Self {
        Self::Spn(e)
    }
}

impl From<GenError> for MspnError {
    fn from(e: GenError) -> Self {
        Self::Gen(e)
    }
}

/// Boolean features become Boolean variables; real ones get `ranges[name]`.
pub fn feature_domain(
    features: &[Feature],
    ranges: &BTreeMap<String, (f64, f64)>,
) -> Result<Domain, MspnError> {
    let mut bools = Vec::new();
    let mut reals = Vec::new();
    for f in features {
        match f.kind {
            FeatureKind::Bool => bools.push(f.name.clone()),
            FeatureKind::Real => {
                let &(lower, upper) = ranges.get(&f.name).ok_or_else(|| MspnError::MissingRange {
                    feature: f.name.clone(),
                })?;
                reals.push(RealVar {
                    name: f.name.clone(),
                    lower,
                    upper,
                });
            }
        }
    }
    Ok(Domain::new(bools, reals))
}

/// One experiment's density plus the acceptance-loop counters.
pub struct MspnBenchmark {
    pub density: Density,
    pub stats: AttemptStats,
}

/// Encode `spn`, bound the real features and draw queries from a fresh RNG
/// seeded with `params.seed`.
pub fn build_benchmark<O: SatOracle + ?Sized>(
    features: &[Feature],
    ranges: &BTreeMap<String, (f64, f64)>,
    spn: &SpnNode,
    params: &MspnParams,
    oracle: &mut O,
) -> Result<MspnBenchmark, MspnError> {
    params.validate()?;
    let domain = feature_domain(features, ranges)?;
    let support = domain.bounds_formula();
    let weight = encode_weight(spn, features)?;
    let bbox = domain.bounding_box()?;
    let names = domain.real_symbols();
    let mut rng = StdRng::seed_from_u64(params.seed);
    let set = generate_queries(&bbox, &names, &support, params.query.clone(), oracle, &mut rng)?;
    tracing::info!(
        nodes = spn.size(),
        attempts = set.stats.attempts,
        unsat = set.stats.unsat,
        "mspn benchmark built"
    );
    let queries = set.formulas();
    Ok(MspnBenchmark {
        density: Density::new(domain, support, weight, queries),
        stats: set.stats,
    })
}

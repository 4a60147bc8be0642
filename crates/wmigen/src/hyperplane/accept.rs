//! Rejection loop: sample, check `support ∧ query`, keep satisfiable queries.
//!
//! States per attempt: sampling → checking → accepted | rejected. The loop ends
//! when `nqueries` queries are accepted or the attempt budget runs out.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::query::{build_query, HyperplaneQuery};
use super::sampler::{sample_hyperplane, SamplerCfg};
use crate::domain::BoundingBox;
use crate::error::GenError;
use crate::formula::Formula;
use crate::oracle::SatOracle;

/// What to do when the point system of an attempt is singular.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Count the attempt and resample.
    #[default]
    Retry,
    /// Return `GenError::DegenerateSample`.
    Abort,
}

/// Parameters of one query-generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Number of queries to accept.
    pub nqueries: usize,
    /// Fraction of variables per query, in `[0, 1]`.
    pub hardness: f64,
    /// Attempt budget; `None` loops until enough queries are accepted.
    pub max_attempts: Option<u64>,
    #[serde(default)]
    pub on_degenerate: DegeneratePolicy,
    #[serde(default)]
    pub sampler: SamplerCfg,
}

impl QueryParams {
    pub const DEFAULT_MAX_ATTEMPTS: u64 = 100_000;

    pub fn new(nqueries: usize, hardness: f64) -> Self {
        Self {
            nqueries,
            hardness,
            max_attempts: Some(Self::DEFAULT_MAX_ATTEMPTS),
            on_degenerate: DegeneratePolicy::Retry,
            sampler: SamplerCfg::default(),
        }
    }

    pub fn validate(&self) -> Result<(), GenError> {
        if self.nqueries == 0 {
            return Err(GenError::invalid("nqueries", "must be a positive integer"));
        }
        if !(self.hardness.is_finite() && (0.0..=1.0).contains(&self.hardness)) {
            return Err(GenError::invalid(
                "hardness",
                format!("must lie in [0, 1], got {}", self.hardness),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(GenError::invalid("max_attempts", "must be > 0 when set"));
        }
        if !(self.sampler.eps_det.is_finite() && self.sampler.eps_det >= 0.0) {
            return Err(GenError::invalid("eps_det", "must be finite and >= 0"));
        }
        Ok(())
    }
}

/// Attempt counters of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptStats {
    pub attempts: u64,
    pub unsat: u64,
    pub degenerate: u64,
}

/// Accepted queries in acceptance order.
#[derive(Clone, Debug)]
pub struct QuerySet {
    pub queries: Vec<HyperplaneQuery>,
    pub stats: AttemptStats,
}

impl QuerySet {
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn formulas(&self) -> Vec<Formula> {
        self.queries.iter().map(|q| q.formula.clone()).collect()
    }
}

/// Outcome of a single attempt.
#[derive(Clone, Debug)]
pub enum Step {
    Accepted(HyperplaneQuery),
    Unsat,
    Degenerate,
}

/// Query generator bound to one bounding box, variable list and support.
pub struct QueryGenerator<'a> {
    bbox: &'a BoundingBox,
    variables: &'a [String],
    support: &'a Formula,
    params: QueryParams,
    stats: AttemptStats,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(
        bbox: &'a BoundingBox,
        variables: &'a [String],
        support: &'a Formula,
        params: QueryParams,
    ) -> Result<Self, GenError> {
        params.validate()?;
        if variables.len() != bbox.dim() {
            return Err(GenError::invalid(
                "variables",
                format!("{} variables for a {}-dimensional box", variables.len(), bbox.dim()),
            ));
        }
        Ok(Self {
            bbox,
            variables,
            support,
            params,
            stats: AttemptStats::default(),
        })
    }

    pub fn stats(&self) -> AttemptStats {
        self.stats
    }

    /// One attempt. Draw order: base point, orientation, subset.
    pub fn step<O, R>(&mut self, oracle: &mut O, rng: &mut R) -> Result<Step, GenError>
    where
        O: SatOracle + ?Sized,
        R: Rng + ?Sized,
    {
        self.stats.attempts += 1;
        let sample = match sample_hyperplane(self.bbox, self.params.sampler, rng) {
            Ok(s) => s,
            Err(GenError::DegenerateSample { reason }) => {
                self.stats.degenerate += 1;
                return match self.params.on_degenerate {
                    DegeneratePolicy::Retry => {
                        tracing::debug!(attempt = self.stats.attempts, %reason, "degenerate sample");
                        Ok(Step::Degenerate)
                    }
                    DegeneratePolicy::Abort => Err(GenError::DegenerateSample { reason }),
                };
            }
            Err(err) => return Err(err),
        };
        let query = build_query(sample.w, self.variables, self.params.hardness, rng)?;
        if oracle.is_satisfiable(self.support, &query.formula)? {
            Ok(Step::Accepted(query))
        } else {
            self.stats.unsat += 1;
            Ok(Step::Unsat)
        }
    }

    /// Run until `nqueries` are accepted or `max_attempts` is spent.
    pub fn run<O, R>(mut self, oracle: &mut O, rng: &mut R) -> Result<QuerySet, GenError>
    where
        O: SatOracle + ?Sized,
        R: Rng + ?Sized,
    {
        let target = self.params.nqueries;
        let mut queries = Vec::with_capacity(target);
        while queries.len() < target {
            if let Some(limit) = self.params.max_attempts {
                if self.stats.attempts >= limit {
                    return Err(GenError::AcceptanceExhausted {
                        attempts: self.stats.attempts,
                        accepted: queries.len(),
                        target,
                    });
                }
            }
            match self.step(oracle, rng)? {
                Step::Accepted(q) => {
                    tracing::debug!(
                        accepted = queries.len() + 1,
                        target,
                        attempt = self.stats.attempts,
                        vars = q.selected.len(),
                        "query accepted"
                    );
                    queries.push(q);
                }
                Step::Unsat => {
                    tracing::info!("UNSAT {}/{}", queries.len() + 1, target);
                }
                Step::Degenerate => {}
            }
        }
        Ok(QuerySet {
            queries,
            stats: self.stats,
        })
    }
}

/// Convenience wrapper around `QueryGenerator::new(..).run(..)`.
pub fn generate_queries<O, R>(
    bbox: &BoundingBox,
    variables: &[String],
    support: &Formula,
    params: QueryParams,
    oracle: &mut O,
    rng: &mut R,
) -> Result<QuerySet, GenError>
where
    O: SatOracle + ?Sized,
    R: Rng + ?Sized,
{
    QueryGenerator::new(bbox, variables, support, params)?.run(oracle, rng)
}

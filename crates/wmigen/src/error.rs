//! Error types for query generation and the satisfiability oracles.

use std::fmt;

/// Failure of a satisfiability oracle. Never retried by the generator.
#[derive(Debug)]
pub enum OracleError {
    /// Input the oracle cannot express (e.g. non-finite constants).
    Unsupported { reason: String },
    /// The solver gave up within its time budget.
    Timeout,
    /// The solver answered neither sat nor unsat.
    Unknown { reason: String },
    /// The solver reported an error, could not be started or died.
    Solver { reason: String },
}

impl OracleError {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown(reason: impl Into<String>) -> Self {
        Self::Unknown {
            reason: reason.into(),
        }
    }

    pub(crate) fn solver(reason: impl Into<String>) -> Self {
        Self::Solver {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { reason } => write!(f, "unsupported by oracle: {reason}"),
            Self::Timeout => write!(f, "oracle timed out"),
            Self::Unknown { reason } => write!(f, "oracle returned unknown: {reason}"),
            Self::Solver { reason } => write!(f, "solver failure: {reason}"),
        }
    }
}

impl std::error::Error for OracleError {}

/// Error type shared by the hyperplane sampler and the acceptance loop.
#[derive(Debug)]
pub enum GenError {
    InvalidConfig {
        param: &'static str,
        reason: String,
    },
    DegenerateSample {
        reason: String,
    },
    Oracle(OracleError),
    AcceptanceExhausted {
        attempts: u64,
        accepted: usize,
        target: usize,
    },
}

impl GenError {
    pub(crate) fn invalid(param: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            param,
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateSample {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { param, reason } => {
                write!(f, "invalid configuration `{param}`: {reason}")
            }
            Self::DegenerateSample { reason } => write!(f, "degenerate sample: {reason}"),
            Self::Oracle(err) => write!(f, "{err}"),
            Self::AcceptanceExhausted {
                attempts,
                accepted,
                target,
            } => write!(
                f,
                "no acceptable query after {attempts} attempts ({accepted}/{target} accepted)"
            ),
        }
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Oracle(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OracleError> for GenError {
    fn from(err: OracleError) -> Self {
        Self::Oracle(err)
    }
}

//! Benchmark generation for weighted model integration.
//!
//! Core: random hyperplane queries `Σ w_i x_i <= 1` over a random variable
//! subset, kept only when they intersect the support (`hyperplane`). Around
//! it sit the pieces that turn external models into density artifacts:
//! learned MSPNs (`mspn`) and ReLU-network verification problems
//! (`verification`).
//!
//! API Policy
//! - The crate backs the `wmigen` CLI. There is no stable public API; prefer
//!   the `api` re-exports in callers.

pub mod api;
pub mod density;
pub mod det;
pub mod domain;
pub mod error;
pub mod features;
pub mod formula;
pub mod hyperplane;
pub mod mspn;
pub mod oracle;
pub mod prior;
pub mod relu;
pub mod spn;
pub mod verification;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{GenError, OracleError};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::domain::{BoundingBox, Domain};
    pub use crate::error::{GenError, OracleError};
    pub use crate::formula::{Formula, Term};
    pub use crate::hyperplane::{generate_queries, QueryParams, QuerySet};
    pub use crate::oracle::{SatOracle, SmtProcessOracle, Z3Oracle};
}

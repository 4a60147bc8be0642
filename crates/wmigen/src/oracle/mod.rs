//! Satisfiability oracles for `support ∧ query`.
//!
//! - `Z3Oracle`: z3 linked in through the `z3` crate (default).
//! - `SmtProcessOracle`: an external z3 binary spoken to over SMT-LIB via `rsmt2`.
//!
//! The generator only ever asks one question, so the seam is a one-method trait.

mod embedded;
mod process;

pub use embedded::{Z3Cfg, Z3Oracle};
pub use process::SmtProcessOracle;

use crate::error::OracleError;
use crate::formula::Formula;

/// Decides whether `support ∧ query` has a model.
pub trait SatOracle {
    fn is_satisfiable(&mut self, support: &Formula, query: &Formula) -> Result<bool, OracleError>;
}

impl<O: SatOracle + ?Sized> SatOracle for Box<O> {
    fn is_satisfiable(&mut self, support: &Formula, query: &Formula) -> Result<bool, OracleError> {
        (**self).is_satisfiable(support, query)
    }
}

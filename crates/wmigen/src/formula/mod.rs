//! Symbolic formulas over Boolean and real variables.
//!
//! Purpose
//! - Typed AST for the support constraints, weight functions and queries that
//!   end up in density artifacts.
//! - SMT-LIB rendering for density artifacts and the external solver process.
//!
//! Conventions
//! - Atoms are `Le`/`Lt` only; `>=`/`>` are written with swapped sides and
//!   equality is `Formula::eq` (two `Le`s).
//! - Weight functions are `Term`s; `Ite` conditions are `Formula`s.

mod smtlib;
mod types;

pub use smtlib::{check_symbol, formula_to_smtlib, real_literal, script, symbol, term_to_smtlib};
pub use types::{term_vars, Formula, Sort, Term};

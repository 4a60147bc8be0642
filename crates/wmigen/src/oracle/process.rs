//! External SMT solver process driven through `rsmt2`.
//!
//! One solver process is kept alive across calls. Each check runs inside a
//! `push`/`pop` scope so declarations do not leak between queries. Any error
//! drops the process; the next call spawns a fresh one.

use std::time::Duration;

use rsmt2::{SmtConf, Solver};

use super::SatOracle;
use crate::error::OracleError;
use crate::formula::{formula_to_smtlib, symbol, Formula, Sort};

pub struct SmtProcessOracle {
    /// Path or name of the z3 binary.
    pub program: String,
    pub timeout: Option<Duration>,
    /// Number of solver checks issued.
    pub calls: u64,
    solver: Option<Solver<()>>,
}

impl std::fmt::Debug for SmtProcessOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtProcessOracle")
            .field("program", &self.program)
            .field("timeout", &self.timeout)
            .field("calls", &self.calls)
            .field("running", &self.solver.is_some())
            .finish()
    }
}

fn solver_err(err: rsmt2::errors::Error) -> OracleError {
    OracleError::solver(err.to_string())
}

impl SmtProcessOracle {
    pub fn z3(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
            calls: 0,
            solver: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.solver.is_some()
    }

    fn spawn(&self) -> Result<Solver<()>, OracleError> {
        let conf = SmtConf::z3(self.program.clone());
        let mut solver = Solver::new(conf, ()).map_err(solver_err)?;
        if let Some(t) = self.timeout {
            solver
                .set_option(":timeout", t.as_millis().max(1))
                .map_err(solver_err)?;
        }
        tracing::debug!(program = %self.program, "solver started");
        Ok(solver)
    }

    /// Satisfiability of the conjunction of `formulas`.
    pub fn check_all(&mut self, formulas: &[&Formula]) -> Result<bool, OracleError> {
        let mut solver = match self.solver.take() {
            Some(s) => s,
            None => self.spawn()?,
        };
        let answer = Self::run(&mut solver, formulas);
        match &answer {
            Ok(_) => self.solver = Some(solver),
            Err(err) => {
                tracing::debug!(program = %self.program, %err, "dropping solver");
                let _ = solver.kill();
            }
        }
        match answer? {
            Some(sat) => Ok(sat),
            None if self.timeout.is_some() => Err(OracleError::Timeout),
            None => Err(OracleError::unknown("solver returned unknown")),
        }
    }

    fn run(solver: &mut Solver<()>, formulas: &[&Formula]) -> Result<Option<bool>, OracleError> {
        let mut vars = std::collections::BTreeMap::new();
        for f in formulas {
            f.collect_vars(&mut vars);
        }
        solver.push(1).map_err(solver_err)?;
        for (name, sort) in &vars {
            let sort = match sort {
                Sort::Bool => "Bool",
                Sort::Real => "Real",
            };
            solver
                .declare_const(symbol(name).as_str(), sort)
                .map_err(solver_err)?;
        }
        for f in formulas {
            solver
                .assert(formula_to_smtlib(f).as_str())
                .map_err(solver_err)?;
        }
        let answer = solver.check_sat_or_unk().map_err(solver_err)?;
        solver.pop(1).map_err(solver_err)?;
        tracing::debug!(?answer, "solver answered");
        Ok(answer)
    }
}

impl SatOracle for SmtProcessOracle {
    fn is_satisfiable(&mut self, support: &Formula, query: &Formula) -> Result<bool, OracleError> {
        self.calls += 1;
        self.check_all(&[support, query])
    }
}

//! In-process z3 through the `z3` crate.
//!
//! `Term`s become `z3::ast::Real`, `Formula`s become `z3::ast::Bool`. Constants
//! are passed as exact rationals built from their decimal expansion, so the
//! solver sees the same numbers as the SMT-LIB artifacts.

use std::time::Duration;

use z3::ast::{Bool, Real};
use z3::{Config, Context, Params, SatResult, Solver};

use super::SatOracle;
use crate::error::OracleError;
use crate::formula::{Formula, Term};

#[derive(Clone, Copy, Debug, Default)]
pub struct Z3Cfg {
    /// Per-check timeout; `None` lets z3 run to completion.
    pub timeout: Option<Duration>,
}

/// One z3 context reused across calls; each call gets a fresh `Solver`.
pub struct Z3Oracle {
    pub cfg: Z3Cfg,
    /// Number of oracle calls served.
    pub calls: u64,
    ctx: Context,
}

impl Default for Z3Oracle {
    fn default() -> Self {
        Self::new(Z3Cfg::default())
    }
}

impl std::fmt::Debug for Z3Oracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Z3Oracle")
            .field("cfg", &self.cfg)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

impl Z3Oracle {
    pub fn new(cfg: Z3Cfg) -> Self {
        Self {
            cfg,
            calls: 0,
            ctx: Context::new(&Config::new()),
        }
    }

    /// Satisfiability of the conjunction of `formulas`.
    pub fn check_all(&self, formulas: &[&Formula]) -> Result<bool, OracleError> {
        let solver = Solver::new(&self.ctx);
        if let Some(t) = self.cfg.timeout {
            let mut params = Params::new(&self.ctx);
            params.set_u32("timeout", u32::try_from(t.as_millis()).unwrap_or(u32::MAX).max(1));
            solver.set_params(&params);
        }
        for f in formulas {
            solver.assert(&formula(&self.ctx, f)?);
        }
        let answer = solver.check();
        tracing::trace!(?answer, "z3 answered");
        match answer {
            SatResult::Sat => Ok(true),
            SatResult::Unsat => Ok(false),
            SatResult::Unknown => {
                let reason = solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "no reason given".to_string());
                if reason.contains("timeout") || reason.contains("canceled") {
                    Err(OracleError::Timeout)
                } else {
                    Err(OracleError::unknown(reason))
                }
            }
        }
    }

    pub fn check(&self, formula: &Formula) -> Result<bool, OracleError> {
        self.check_all(&[formula])
    }
}

impl SatOracle for Z3Oracle {
    fn is_satisfiable(&mut self, support: &Formula, query: &Formula) -> Result<bool, OracleError> {
        self.calls += 1;
        self.check_all(&[support, query])
    }
}

/// Exact rational for a finite `f64`: the decimal digits over a power of ten.
fn constant<'ctx>(ctx: &'ctx Context, k: f64) -> Result<Real<'ctx>, OracleError> {
    if !k.is_finite() {
        return Err(OracleError::unsupported(format!("non-finite constant {k}")));
    }
    // f64 Display never switches to scientific notation.
    let digits = format!("{}", k.abs());
    let (int, frac) = digits.split_once('.').unwrap_or((digits.as_str(), ""));
    let num = format!("{int}{frac}");
    let num = match num.trim_start_matches('0') {
        "" => "0",
        n => n,
    };
    let den = format!("1{}", "0".repeat(frac.len()));
    let r = Real::from_real_str(ctx, num, &den)
        .ok_or_else(|| OracleError::unsupported(format!("constant {k} has no rational form")))?;
    Ok(if k.is_sign_negative() && k != 0.0 {
        r.unary_minus()
    } else {
        r
    })
}

fn term<'ctx>(ctx: &'ctx Context, t: &Term) -> Result<Real<'ctx>, OracleError> {
    Ok(match t {
        Term::Const(k) => constant(ctx, *k)?,
        Term::Var(v) => Real::new_const(ctx, v.as_str()),
        Term::Plus(ts) if ts.is_empty() => Real::from_real(ctx, 0, 1),
        Term::Times(ts) if ts.is_empty() => Real::from_real(ctx, 1, 1),
        Term::Plus(ts) => {
            let args = ts.iter().map(|t| term(ctx, t)).collect::<Result<Vec<_>, _>>()?;
            Real::add(ctx, &args.iter().collect::<Vec<_>>())
        }
        Term::Times(ts) => {
            let args = ts.iter().map(|t| term(ctx, t)).collect::<Result<Vec<_>, _>>()?;
            Real::mul(ctx, &args.iter().collect::<Vec<_>>())
        }
        Term::Minus(a, b) => Real::sub(ctx, &[&term(ctx, a)?, &term(ctx, b)?]),
        Term::Ite(c, a, b) => formula(ctx, c)?.ite(&term(ctx, a)?, &term(ctx, b)?),
    })
}

fn formula<'ctx>(ctx: &'ctx Context, f: &Formula) -> Result<Bool<'ctx>, OracleError> {
    Ok(match f {
        Formula::True => Bool::from_bool(ctx, true),
        Formula::False => Bool::from_bool(ctx, false),
        Formula::BoolVar(v) => Bool::new_const(ctx, v.as_str()),
        Formula::Not(g) => formula(ctx, g)?.not(),
        Formula::And(fs) => {
            let args = fs.iter().map(|g| formula(ctx, g)).collect::<Result<Vec<_>, _>>()?;
            Bool::and(ctx, &args.iter().collect::<Vec<_>>())
        }
        Formula::Or(fs) => {
            let args = fs.iter().map(|g| formula(ctx, g)).collect::<Result<Vec<_>, _>>()?;
            Bool::or(ctx, &args.iter().collect::<Vec<_>>())
        }
        Formula::Le(a, b) => term(ctx, a)?.le(&term(ctx, b)?),
        Formula::Lt(a, b) => term(ctx, a)?.lt(&term(ctx, b)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le(a: Term, b: Term) -> Formula {
        Formula::Le(a, b)
    }
    fn x(i: usize) -> Term {
        Term::var(format!("x{i}"))
    }
    fn c(k: f64) -> Term {
        Term::Const(k)
    }

    fn unit_box(n: usize) -> Formula {
        Formula::and_all((0..n).flat_map(|i| [le(c(0.0), x(i)), le(x(i), c(1.0))]))
    }

    #[test]
    fn query_through_box_is_sat() {
        let o = Z3Oracle::default();
        let q = le(Term::weighted_sum([(4.0, "x0"), (4.0, "x1")]), c(1.0));
        assert!(o.check_all(&[&unit_box(2), &q]).unwrap());
    }

    #[test]
    fn query_missing_box_is_unsat() {
        let o = Z3Oracle::default();
        // -x0 <= -3 means x0 >= 3, outside [0,1].
        let q = le(Term::weighted_sum([(-1.0, "x0")]), c(-3.0));
        assert!(!o.check_all(&[&unit_box(2), &q]).unwrap());
    }

    #[test]
    fn strict_atoms_and_negation() {
        let o = Z3Oracle::default();
        let f = Formula::And(vec![
            Formula::Lt(x(0), c(0.0)),
            Formula::not(Formula::Lt(x(0), c(0.0))),
        ]);
        assert!(!o.check(&f).unwrap());
        // x > 0 and x <= 1e-12 is sat over the reals
        let g = Formula::And(vec![Formula::Lt(c(0.0), x(0)), le(x(0), c(1e-12))]);
        assert!(o.check(&g).unwrap());
    }

    #[test]
    fn disjunction_and_bools() {
        let o = Z3Oracle::default();
        let f = Formula::And(vec![
            Formula::Or(vec![
                Formula::And(vec![Formula::bool_var("b"), le(c(5.0), x(0))]),
                Formula::And(vec![Formula::not(Formula::bool_var("b")), le(x(0), c(-5.0))]),
            ]),
            Formula::bool_var("b"),
            le(x(0), c(1.0)),
        ]);
        // b forces x0 >= 5, contradicting x0 <= 1.
        assert!(!o.check(&f).unwrap());
        let g = Formula::And(vec![
            Formula::Or(vec![le(c(5.0), x(0)), le(x(0), c(-5.0))]),
            le(x(0), c(1.0)),
        ]);
        assert!(o.check(&g).unwrap());
    }

    #[test]
    fn ite_terms_are_translated() {
        let o = Z3Oracle::default();
        // relu: y = ite(x > 0, x, 0), with y <= -1 -> unsat
        let relu = Term::ite(Formula::Lt(c(0.0), x(0)), x(0), c(0.0));
        let f = Formula::And(vec![Formula::eq(Term::var("y"), relu.clone()), le(Term::var("y"), c(-1.0))]);
        assert!(!o.check(&f).unwrap());
        let g = Formula::And(vec![Formula::eq(Term::var("y"), relu), le(c(2.0), Term::var("y"))]);
        assert!(o.check(&g).unwrap());
    }

    #[test]
    fn constants_are_exact() {
        let o = Z3Oracle::default();
        // 0.1 + 0.2 != 0.3 in binary, and the solver must see the binary values.
        let sum = Term::Plus(vec![c(0.1), c(0.2)]);
        assert!(!o.check(&Formula::eq(sum.clone(), c(0.3))).unwrap());
        assert!(o.check(&Formula::eq(sum, c(0.1 + 0.2))).unwrap());
        assert!(o.check(&Formula::eq(Term::Minus(Box::new(c(0.0)), Box::new(c(2.5))), c(-2.5))).unwrap());
        assert!(o.check(&Formula::Lt(c(-1e-10), c(0.0))).unwrap());
    }

    #[test]
    fn non_finite_constants_are_unsupported() {
        let o = Z3Oracle::default();
        let f = le(x(0), c(f64::NAN));
        assert!(matches!(o.check(&f), Err(OracleError::Unsupported { .. })));
    }

    #[test]
    fn calls_are_counted() {
        let mut o = Z3Oracle::new(Z3Cfg {
            timeout: Some(Duration::from_secs(5)),
        });
        assert!(o.is_satisfiable(&unit_box(1), &le(x(0), c(0.5))).unwrap());
        assert!(!o.is_satisfiable(&unit_box(1), &le(x(0), c(-0.5))).unwrap());
        assert_eq!(o.calls, 2);
    }
}

//! Term and formula trees for quantifier-free linear real arithmetic.
//!
//! - `Term`: real-valued expressions (constants, variables, sums, products, ite).
//! - `Formula`: Boolean structure over `Le`/`Lt` atoms and Boolean variables.
//!
//! Constructors are plain enum variants; the helpers below only save boxing noise.

use std::collections::BTreeMap;

/// Sort of a free variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sort {
    Bool,
    Real,
}

/// Real-valued term.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Const(f64),
    Var(String),
    Plus(Vec<Term>),
    Times(Vec<Term>),
    Minus(Box<Term>, Box<Term>),
    Ite(Box<Formula>, Box<Term>, Box<Term>),
}

/// Quantifier-free formula.
#[derive(Clone, Debug, PartialEq)]
pub enum Formula {
    True,
    False,
    BoolVar(String),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    /// `lhs <= rhs`
    Le(Term, Term),
    /// `lhs < rhs`
    Lt(Term, Term),
}

impl Term {
    #[inline]
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    #[inline]
    pub fn minus(a: Term, b: Term) -> Self {
        Term::Minus(Box::new(a), Box::new(b))
    }

    #[inline]
    pub fn ite(cond: Formula, then: Term, other: Term) -> Self {
        Term::Ite(Box::new(cond), Box::new(then), Box::new(other))
    }

    /// `c * x`
    #[inline]
    pub fn scaled(c: f64, x: Term) -> Self {
        Term::Times(vec![Term::Const(c), x])
    }

    /// `sum_j coeffs[j] * vars[j]` in the given order.
    pub fn weighted_sum<'a>(terms: impl IntoIterator<Item = (f64, &'a str)>) -> Self {
        Term::Plus(
            terms
                .into_iter()
                .map(|(c, v)| Term::scaled(c, Term::var(v)))
                .collect(),
        )
    }

    pub(crate) fn collect_vars(&self, out: &mut BTreeMap<String, Sort>) {
        match self {
            Term::Const(_) => {}
            Term::Var(v) => {
                out.entry(v.clone()).or_insert(Sort::Real);
            }
            Term::Plus(ts) | Term::Times(ts) => ts.iter().for_each(|t| t.collect_vars(out)),
            Term::Minus(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Term::Ite(c, a, b) => {
                c.collect_vars(out);
                a.collect_vars(out);
                b.collect_vars(out);
            }
        }
    }
}

impl Formula {
    #[inline]
    pub fn bool_var(name: impl Into<String>) -> Self {
        Formula::BoolVar(name.into())
    }

    #[inline]
    pub fn not(f: Formula) -> Self {
        Formula::Not(Box::new(f))
    }

    /// `a = b` as the conjunction of both non-strict inequalities.
    pub fn eq(a: Term, b: Term) -> Self {
        Formula::And(vec![Formula::Le(a.clone(), b.clone()), Formula::Le(b, a)])
    }

    /// Conjunction, flattening nested `And`s and dropping `True`.
    pub fn and_all(parts: impl IntoIterator<Item = Formula>) -> Self {
        let mut out = Vec::new();
        for p in parts {
            match p {
                Formula::True => {}
                Formula::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Formula::True,
            1 => out.pop().unwrap_or(Formula::True),
            _ => Formula::And(out),
        }
    }

    /// Free variables with their sorts, sorted by name.
    pub fn free_vars(&self) -> BTreeMap<String, Sort> {
        let mut out = BTreeMap::new();
        self.collect_vars(&mut out);
        out
    }

    pub(crate) fn collect_vars(&self, out: &mut BTreeMap<String, Sort>) {
        match self {
            Formula::True | Formula::False => {}
            Formula::BoolVar(v) => {
                out.insert(v.clone(), Sort::Bool);
            }
            Formula::Not(f) => f.collect_vars(out),
            Formula::And(fs) | Formula::Or(fs) => fs.iter().for_each(|f| f.collect_vars(out)),
            Formula::Le(a, b) | Formula::Lt(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
        }
    }
}

/// Free variables of a term with their sorts.
pub fn term_vars(t: &Term) -> BTreeMap<String, Sort> {
    let mut out = BTreeMap::new();
    t.collect_vars(&mut out);
    out
}

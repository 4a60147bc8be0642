//! SMT-LIB v2 rendering (QF_LRA).

use std::fmt::Write as _;

use super::types::{Formula, Sort, Term};

/// Exact decimal literal: no exponent, at least one fractional digit.
pub fn real_literal(x: f64) -> String {
    // f64 Display never switches to scientific notation.
    let mut s = format!("{}", x.abs());
    if !s.contains('.') {
        s.push_str(".0");
    }
    if x.is_sign_negative() && x != 0.0 {
        format!("(- {s})")
    } else {
        s
    }
}

/// Reserved words and theory symbols that must not appear as bare variables.
const RESERVED: &[&str] = &[
    "!", "_", "as", "let", "exists", "forall", "match", "par", "BINARY", "DECIMAL",
    "HEXADECIMAL", "NUMERAL", "STRING", "true", "false", "not", "and", "or", "xor", "=>",
    "=", "distinct", "ite", "+", "-", "*", "/", "<", "<=", ">", ">=", "div", "mod", "abs",
    "to_real", "to_int", "is_int",
];

/// Names that fit inside `|..|`: no `|` and no `\`.
pub fn check_symbol(name: &str) -> Result<(), String> {
    match name.chars().find(|c| matches!(c, '|' | '\\')) {
        Some(c) => Err(format!("`{name}` contains `{c}`, which SMT-LIB symbols cannot hold")),
        None => Ok(()),
    }
}

/// Symbols outside the simple-symbol alphabet, and reserved words, are quoted
/// with `|..|`. Names failing [`check_symbol`] are printed as is and will not
/// parse; they are never rewritten into another name.
pub fn symbol(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c))
        && !RESERVED.contains(&name);
    if simple {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

fn nary(out: &mut String, op: &str, args: &[String]) {
    if args.len() == 1 {
        out.push_str(&args[0]);
        return;
    }
    let _ = write!(out, "({op}");
    for a in args {
        out.push(' ');
        out.push_str(a);
    }
    out.push(')');
}

pub fn term_to_smtlib(t: &Term) -> String {
    let mut out = String::new();
    match t {
        Term::Const(k) => out.push_str(&real_literal(*k)),
        Term::Var(v) => out.push_str(&symbol(v)),
        Term::Plus(ts) if ts.is_empty() => out.push_str("0.0"),
        Term::Times(ts) if ts.is_empty() => out.push_str("1.0"),
        Term::Plus(ts) => nary(&mut out, "+", &ts.iter().map(term_to_smtlib).collect::<Vec<_>>()),
        Term::Times(ts) => nary(&mut out, "*", &ts.iter().map(term_to_smtlib).collect::<Vec<_>>()),
        Term::Minus(a, b) => {
            let _ = write!(out, "(- {} {})", term_to_smtlib(a), term_to_smtlib(b));
        }
        Term::Ite(c, a, b) => {
            let _ = write!(
                out,
                "(ite {} {} {})",
                formula_to_smtlib(c),
                term_to_smtlib(a),
                term_to_smtlib(b)
            );
        }
    }
    out
}

pub fn formula_to_smtlib(f: &Formula) -> String {
    let mut out = String::new();
    match f {
        Formula::True => out.push_str("true"),
        Formula::False => out.push_str("false"),
        Formula::BoolVar(v) => out.push_str(&symbol(v)),
        Formula::Not(g) => {
            let _ = write!(out, "(not {})", formula_to_smtlib(g));
        }
        Formula::And(fs) if fs.is_empty() => out.push_str("true"),
        Formula::Or(fs) if fs.is_empty() => out.push_str("false"),
        Formula::And(fs) => nary(&mut out, "and", &fs.iter().map(formula_to_smtlib).collect::<Vec<_>>()),
        Formula::Or(fs) => nary(&mut out, "or", &fs.iter().map(formula_to_smtlib).collect::<Vec<_>>()),
        Formula::Le(a, b) => {
            let _ = write!(out, "(<= {} {})", term_to_smtlib(a), term_to_smtlib(b));
        }
        Formula::Lt(a, b) => {
            let _ = write!(out, "(< {} {})", term_to_smtlib(a), term_to_smtlib(b));
        }
    }
    out
}

/// Full script asserting every formula in `asserts`, ending in `(check-sat)`.
pub fn script(asserts: &[&Formula]) -> String {
    let mut vars = std::collections::BTreeMap::new();
    for f in asserts {
        f.collect_vars(&mut vars);
    }
    let mut out = String::from("(set-logic QF_LRA)\n");
    for (name, sort) in &vars {
        let sort = match sort {
            Sort::Bool => "Bool",
            Sort::Real => "Real",
        };
        let _ = writeln!(out, "(declare-fun {} () {sort})", symbol(name));
    }
    for f in asserts {
        let _ = writeln!(out, "(assert {})", formula_to_smtlib(f));
    }
    out.push_str("(check-sat)\n(exit)\n");
    out
}

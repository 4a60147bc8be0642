//! Benchmark artifact: domain, support, weight and queries.
//!
//! Serialized as JSON with every formula rendered to SMT-LIB:
//!
//! ```json
//! {"domain": {"variables": ["a", "x"],
//!             "var_types": {"a": "bool", "x": "real"},
//!             "var_domains": {"x": [0.0, 1.0]}},
//!  "support": "(and ...)", "weight": "(+ ...)", "queries": ["(<= ...)"]}
//! ```

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::domain::Domain;
use crate::formula::{formula_to_smtlib, term_to_smtlib, Formula, Term};

#[derive(Clone, Debug, PartialEq)]
pub struct Density {
    pub domain: Domain,
    pub support: Formula,
    pub weight: Term,
    pub queries: Vec<Formula>,
}

impl Density {
    pub fn new(domain: Domain, support: Formula, weight: Term, queries: Vec<Formula>) -> Self {
        Self {
            domain,
            support,
            weight,
            queries,
        }
    }

    pub fn to_json_value(&self) -> Value {
        let mut variables = Vec::new();
        let mut types = Map::new();
        let mut domains = Map::new();
        for b in &self.domain.bool_vars {
            variables.push(Value::from(b.as_str()));
            types.insert(b.clone(), json!("bool"));
        }
        for r in &self.domain.real_vars {
            variables.push(Value::from(r.name.as_str()));
            types.insert(r.name.clone(), json!("real"));
            domains.insert(r.name.clone(), json!([r.lower, r.upper]));
        }
        json!({
            "domain": {
                "variables": variables,
                "var_types": types,
                "var_domains": domains,
            },
            "support": formula_to_smtlib(&self.support),
            "weight": term_to_smtlib(&self.weight),
            "queries": self.queries.iter().map(formula_to_smtlib).collect::<Vec<_>>(),
        })
    }

    /// Write pretty JSON to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, &self.to_json_value())?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RealVar;

    fn sample() -> Density {
        let domain = Domain::new(
            vec!["a".into()],
            vec![RealVar {
                name: "x".into(),
                lower: 0.0,
                upper: 2.0,
            }],
        );
        let support = domain.bounds_formula();
        let weight = Term::ite(Formula::bool_var("a"), Term::Const(0.25), Term::var("x"));
        let q = Formula::Le(Term::var("x"), Term::Const(1.0));
        Density::new(domain, support, weight, vec![q])
    }

    #[test]
    fn json_layout() {
        let v = sample().to_json_value();
        assert_eq!(v["domain"]["variables"], json!(["a", "x"]));
        assert_eq!(v["domain"]["var_types"]["a"], "bool");
        assert_eq!(v["domain"]["var_domains"]["x"], json!([0.0, 2.0]));
        assert_eq!(v["support"], "(and (<= 0.0 x) (<= x 2.0))");
        assert_eq!(v["weight"], "(ite a 0.25 x)");
        assert_eq!(v["queries"], json!(["(<= x 1.0)"]));
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite").join("iris-200.json");
        sample().write_to(&path).unwrap();
        let back: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, sample().to_json_value());
    }
}

//! Feature declarations in C4.5 `.names` style.
//!
//! ```text
//! | comment
//! age: continuous.
//! smoker: no, yes.
//! ```
//!
//! `continuous` declares a real feature, exactly two values a Boolean one.
//! Lines without `:` (such as the class line) are skipped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::formula::check_symbol;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Real,
    Bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub kind: FeatureKind,
    /// Declared values for Boolean features (`false`, `true` order).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureError {
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for FeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "features line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for FeatureError {}

pub fn parse_features(text: &str) -> Result<Vec<Feature>, FeatureError> {
    let mut out: Vec<Feature> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('|') {
            continue;
        }
        let Some((name, decl)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let decl = decl.trim().trim_end_matches('.').trim();
        let err = |reason: String| FeatureError {
            line: line_no,
            reason,
        };
        if name.is_empty() {
            return Err(err("empty feature name".into()));
        }
        check_symbol(name).map_err(err)?;
        if out.iter().any(|f| f.name == name) {
            return Err(err(format!("duplicate feature `{name}`")));
        }
        let feature = if decl.eq_ignore_ascii_case("continuous") {
            Feature {
                name: name.to_string(),
                kind: FeatureKind::Real,
                values: Vec::new(),
            }
        } else {
            let values: Vec<String> = decl
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            if values.len() != 2 {
                return Err(err(format!(
                    "feature `{name}` has {} values; only continuous and binary features are supported",
                    values.len()
                )));
            }
            Feature {
                name: name.to_string(),
                kind: FeatureKind::Bool,
                values,
            }
        };
        out.push(feature);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_real_and_bool() {
        let text = "good, bad.\n| comment\n\nage: continuous.\nsmoker: no, yes.\n";
        let feats = parse_features(text).unwrap();
        assert_eq!(feats.len(), 2);
        assert_eq!(feats[0].kind, FeatureKind::Real);
        assert_eq!(feats[1].kind, FeatureKind::Bool);
        assert_eq!(feats[1].values, vec!["no", "yes"]);
    }

    #[test]
    fn rejects_wide_categoricals_and_duplicates() {
        let err = parse_features("color: r, g, b.\n").unwrap_err();
        assert_eq!(err.line, 1);
        let err = parse_features("a: continuous.\na: continuous.\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn rejects_names_that_cannot_be_quoted() {
        let err = parse_features("a|b: continuous.\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.reason.contains('|'));
        let feats = parse_features("not: continuous.\n").unwrap();
        assert_eq!(feats[0].name, "not");
    }
}

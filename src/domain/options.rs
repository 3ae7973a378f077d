//! Option resolution
//!
//! Options are applied in layers, lowest precedence first:
//! 1. defaults reported by the provider for each resolved package
//! 2. manifest `options` entries (then any command-line entries), in order
//!
//! Within a layer the last assignment to a `(package, key)` pair wins.
//! An entry naming a package that is not in the resolved graph is an error,
//! never silently dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use super::error::ResolveError;
use super::manifest::OptionEntry;
use super::resolve::ResolvedGraph;

/// A normalized option value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

impl OptionValue {
    /// Normalizes a raw value: `"True"`/`"FALSE"` become booleans and
    /// integers become text. Anything else, including text with control
    /// characters such as newlines, is rejected.
    pub fn normalize(
        package: &str,
        key: &str,
        raw: &serde_json::Value,
    ) -> Result<Self, ResolveError> {
        use serde_json::Value;

        let invalid = |found: &str| ResolveError::InvalidOptionValue {
            package: package.to_string(),
            key: key.to_string(),
            found: found.to_string(),
        };

        match raw {
            Value::Bool(b) => Ok(OptionValue::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(OptionValue::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(OptionValue::Bool(false)),
            Value::String(s) if s.chars().any(char::is_control) => {
                Err(invalid("text containing control characters"))
            }
            Value::String(s) => Ok(OptionValue::Text(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(OptionValue::Text(n.to_string())),
            Value::Number(n) => Err(invalid(&format!("the number {}", n))),
            Value::Null => Err(invalid("null")),
            Value::Array(_) => Err(invalid("a list")),
            Value::Object(_) => Err(invalid("a table")),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Text(_) => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => f.write_str("True"),
            OptionValue::Bool(false) => f.write_str("False"),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

/// Applies provider defaults and then declared entries to the resolved nodes
pub fn apply_options(graph: &mut ResolvedGraph, entries: &[OptionEntry]) -> Result<(), ResolveError> {
    let names: Vec<String> = graph.order().to_vec();

    for name in &names {
        let defaults = graph.defaults(name).cloned().unwrap_or_default();
        let mut values = Vec::with_capacity(defaults.len());
        for (key, raw) in &defaults {
            values.push((key.clone(), OptionValue::normalize(name, key, raw)?));
        }

        if let Some(node) = graph.get_mut(name) {
            node.options.extend(values);
        }
    }

    for entry in entries {
        if !graph.contains(&entry.package) {
            return Err(ResolveError::DanglingOption {
                package: entry.package.clone(),
                key: entry.key.clone(),
            });
        }

        let value = OptionValue::normalize(&entry.package, &entry.key, &entry.value)?;

        let undeclared = graph
            .defaults(&entry.package)
            .is_some_and(|defaults| !defaults.is_empty() && !defaults.contains_key(&entry.key));
        if undeclared {
            warn!(
                package = %entry.package,
                key = %entry.key,
                "option is not among the options the provider declares for this package"
            );
        }

        if let Some(node) = graph.get_mut(&entry.package) {
            debug!(package = %entry.package, key = %entry.key, value = %value, "option set");
            node.options.insert(entry.key.clone(), value);
        }
    }

    Ok(())
}

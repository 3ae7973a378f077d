//! Platform context: build settings and conditional predicates
//!
//! A manifest declares the axes it is built against. Each axis is bound to a
//! single value before resolution, and conditional requirements are gated by
//! predicates over those values, e.g. `os == Windows && arch != x86`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::ResolveError;

/// One of the four build axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingAxis {
    Os,
    Compiler,
    BuildType,
    Arch,
}

impl SettingAxis {
    pub const ALL: [SettingAxis; 4] = [
        SettingAxis::Os,
        SettingAxis::Compiler,
        SettingAxis::BuildType,
        SettingAxis::Arch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingAxis::Os => "os",
            SettingAxis::Compiler => "compiler",
            SettingAxis::BuildType => "build_type",
            SettingAxis::Arch => "arch",
        }
    }
}

impl fmt::Display for SettingAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingAxis {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "os" => Ok(SettingAxis::Os),
            "compiler" => Ok(SettingAxis::Compiler),
            "build_type" => Ok(SettingAxis::BuildType),
            "arch" => Ok(SettingAxis::Arch),
            other => Err(ResolveError::UnknownSettingAxis(other.to_string())),
        }
    }
}

/// Values bound to the build axes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<SettingAxis, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an axis, replacing any earlier value
    pub fn bind(&mut self, axis: SettingAxis, value: impl Into<String>) {
        self.values.insert(axis, value.into());
    }

    /// Binds an axis given by name
    pub fn bind_named(&mut self, axis: &str, value: impl Into<String>) -> Result<(), ResolveError> {
        let axis: SettingAxis = axis.parse()?;
        self.bind(axis, value);
        Ok(())
    }

    /// Parses and binds an `axis=value` assignment
    pub fn bind_assignment(&mut self, assignment: &str) -> Result<(), ResolveError> {
        let (axis, value) = assignment.split_once('=').ok_or_else(|| {
            ResolveError::malformed(format!(
                "setting '{}' must have the form axis=value",
                assignment
            ))
        })?;

        let value = value.trim();
        if value.is_empty() {
            return Err(ResolveError::malformed(format!(
                "setting '{}' has an empty value",
                axis.trim()
            )));
        }

        self.bind_named(axis, value)
    }

    /// Returns the value bound to an axis
    pub fn get(&self, axis: SettingAxis) -> Option<&str> {
        self.values.get(&axis).map(String::as_str)
    }

    /// Fails unless every listed axis has a value
    pub fn ensure_bound(&self, axes: &[SettingAxis]) -> Result<(), ResolveError> {
        match axes.iter().find(|axis| !self.values.contains_key(axis)) {
            Some(axis) => Err(ResolveError::UnboundSetting(axis.to_string())),
            None => Ok(()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SettingAxis, &str)> {
        self.values.iter().map(|(axis, value)| (*axis, value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Comparison used by a predicate clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    NotEquals,
}

/// A single axis test, e.g. `os == Windows`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub axis: SettingAxis,
    pub comparison: Comparison,
    pub value: String,
}

impl Clause {
    pub fn equals(axis: SettingAxis, value: impl Into<String>) -> Self {
        Self {
            axis,
            comparison: Comparison::Equals,
            value: value.into(),
        }
    }

    pub fn not_equals(axis: SettingAxis, value: impl Into<String>) -> Self {
        Self {
            axis,
            comparison: Comparison::NotEquals,
            value: value.into(),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.comparison {
            Comparison::Equals => "==",
            Comparison::NotEquals => "!=",
        };
        write!(f, "{} {} {}", self.axis, op, self.value)
    }
}

/// A conjunction of axis tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.clauses.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(" && "))
    }
}

impl FromStr for Predicate {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut clauses = Vec::new();

        for term in s.split("&&") {
            let term = term.trim();
            let (axis, comparison, value) = if let Some((axis, value)) = term.split_once("!=") {
                (axis, Comparison::NotEquals, value)
            } else if let Some((axis, value)) = term.split_once("==") {
                (axis, Comparison::Equals, value)
            } else {
                return Err(ResolveError::malformed(format!(
                    "condition '{}' must compare an axis with == or !=",
                    term
                )));
            };

            let value = value.trim().trim_matches('"');
            if value.is_empty() {
                return Err(ResolveError::malformed(format!(
                    "condition '{}' has no value to compare against",
                    term
                )));
            }

            clauses.push(Clause {
                axis: axis.parse()?,
                comparison,
                value: value.to_string(),
            });
        }

        Ok(Self { clauses })
    }
}

/// Evaluates a predicate against bound settings
pub fn evaluate(predicate: &Predicate, settings: &Settings) -> Result<bool, ResolveError> {
    for clause in predicate.clauses() {
        let bound = settings
            .get(clause.axis)
            .ok_or_else(|| ResolveError::UnboundSetting(clause.axis.to_string()))?;

        let holds = match clause.comparison {
            Comparison::Equals => bound == clause.value,
            Comparison::NotEquals => bound != clause.value,
        };

        if !holds {
            return Ok(false);
        }
    }

    Ok(true)
}

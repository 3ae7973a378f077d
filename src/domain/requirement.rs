//! Package references and requirement specs
//!
//! Reference format: `{name}/{version}[@{channel}]`
//! - `qt/6.0.2`
//! - `libhunspell/1.7.0@owl/stable`
//!
//! The channel is a provenance tag used for provider lookups only; it never
//! takes part in version comparison.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ResolveError;
use super::settings::Predicate;

/// Identifies one concrete package for provider lookups
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageRef {
    pub name: String,
    pub version: String,
    pub channel: Option<String>,
}

impl PackageRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'))
}

fn valid_token(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(char::is_whitespace)
}

impl FromStr for PackageRef {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || {
            ResolveError::malformed(format!(
                "requirement '{}' must have the form name/version[@channel]",
                s
            ))
        };

        let (coordinates, channel) = match s.split_once('@') {
            Some((coordinates, channel)) => {
                if !valid_token(channel) {
                    return Err(invalid());
                }
                (coordinates, Some(channel.to_string()))
            }
            None => (s, None),
        };

        let (name, version) = coordinates.split_once('/').ok_or_else(invalid)?;
        if !valid_name(name) || !valid_token(version) || version.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            channel,
        })
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let Some(channel) = &self.channel {
            write!(f, "@{}", channel)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for PackageRef {
    type Error = ResolveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackageRef> for String {
    fn from(reference: PackageRef) -> Self {
        reference.to_string()
    }
}

/// How a requirement competes with other requests for the same package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    #[default]
    Normal,
    /// Pins this version across the whole graph
    Override,
}

impl FromStr for Modifier {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "override" => Ok(Modifier::Override),
            "normal" => Ok(Modifier::Normal),
            other => Err(ResolveError::malformed(format!(
                "unknown requirement modifier '{}' (expected 'override')",
                other
            ))),
        }
    }
}

/// A request for a package at a version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementSpec {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub modifier: Modifier,
}

impl RequirementSpec {
    pub fn new(reference: PackageRef, modifier: Modifier) -> Self {
        Self {
            name: reference.name,
            version: reference.version,
            channel: reference.channel,
            modifier,
        }
    }

    /// Parses a plain (non-override) requirement
    pub fn parse(reference: &str) -> Result<Self, ResolveError> {
        Ok(Self::new(reference.parse()?, Modifier::Normal))
    }

    /// Parses an override requirement
    pub fn parse_override(reference: &str) -> Result<Self, ResolveError> {
        Ok(Self::new(reference.parse()?, Modifier::Override))
    }

    pub fn reference(&self) -> PackageRef {
        PackageRef {
            name: self.name.clone(),
            version: self.version.clone(),
            channel: self.channel.clone(),
        }
    }

    pub fn is_override(&self) -> bool {
        self.modifier == Modifier::Override
    }
}

impl fmt::Display for RequirementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference())?;
        if self.is_override() {
            f.write_str(" (override)")?;
        }
        Ok(())
    }
}

/// A requirement that only applies when its predicate holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalRequirement {
    pub spec: RequirementSpec,
    pub predicate: Predicate,
}

/// A requirement as declared in a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestRequirement {
    Always(RequirementSpec),
    When(ConditionalRequirement),
}

impl ManifestRequirement {
    pub fn spec(&self) -> &RequirementSpec {
        match self {
            ManifestRequirement::Always(spec) => spec,
            ManifestRequirement::When(conditional) => &conditional.spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_reference() {
        let reference: PackageRef = "qt/6.0.2".parse().unwrap();
        assert_eq!(reference.name, "qt");
        assert_eq!(reference.version, "6.0.2");
        assert_eq!(reference.channel, None);
        assert_eq!(reference.to_string(), "qt/6.0.2");
    }

    #[test]
    fn parse_reference_with_channel() {
        let reference: PackageRef = "tidy-html5/5.7.28@owl/stable".parse().unwrap();
        assert_eq!(reference.name, "tidy-html5");
        assert_eq!(reference.version, "5.7.28");
        assert_eq!(reference.channel.as_deref(), Some("owl/stable"));
        assert_eq!(reference.to_string(), "tidy-html5/5.7.28@owl/stable");
    }

    #[test]
    fn reject_malformed_references() {
        for input in ["qt", "qt/", "/6.0.2", "qt/6.0.2@", "qt/6 0", "q t/1.0", "qt/1/2"] {
            let result = input.parse::<PackageRef>();
            assert!(
                matches!(result, Err(ResolveError::MalformedManifest(_))),
                "expected '{}' to be rejected",
                input
            );
        }
    }

    #[test]
    fn parse_modifier() {
        assert_eq!("override".parse::<Modifier>().unwrap(), Modifier::Override);
        assert!("pin".parse::<Modifier>().is_err());
    }

    #[test]
    fn spec_display_marks_override() {
        let spec = RequirementSpec::parse_override("openssl/1.1.1i").unwrap();
        assert!(spec.is_override());
        assert_eq!(spec.to_string(), "openssl/1.1.1i (override)");
    }

    #[test]
    fn reference_serializes_as_string() {
        let reference = PackageRef::new("rang", "3.1").with_channel("owl/stable");
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, "\"rang/3.1@owl/stable\"");

        let parsed: PackageRef = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, reference);
    }
}

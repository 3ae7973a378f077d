//! Resolution error taxonomy
//!
//! Every stage of the pipeline returns one of these. None of them is retried:
//! each reflects a defect in the manifest or its environment.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("Unknown setting axis '{0}' (expected one of: os, compiler, build_type, arch)")]
    UnknownSettingAxis(String),

    #[error("Setting '{0}' has no value; bind it with --setting {0}=<value> or a config profile")]
    UnboundSetting(String),

    #[error("Cyclic requirement: {}", .cycle.join(" -> "))]
    CyclicRequirement { cycle: Vec<String> },

    #[error("Version conflict for '{name}': requested {}", .requested_versions.join(", "))]
    VersionConflict {
        name: String,
        requested_versions: Vec<String>,
    },

    #[error("Option '{package}:{key}' refers to package '{package}', which is not in the resolved graph")]
    DanglingOption { package: String, key: String },

    #[error("Invalid value for option '{package}:{key}': {found} is not a boolean or string")]
    InvalidOptionValue {
        package: String,
        key: String,
        found: String,
    },

    #[error("Cannot resolve package '{reference}': {reason}")]
    UnresolvablePackage { reference: String, reason: String },

    #[error("Unknown generator '{0}'")]
    UnknownGenerator(String),

    #[error("Generator '{generator}' failed: {reason}")]
    GeneratorFailed { generator: String, reason: String },
}

impl ResolveError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::MalformedManifest(_) => "malformed_manifest",
            ResolveError::UnknownSettingAxis(_) => "unknown_setting_axis",
            ResolveError::UnboundSetting(_) => "unbound_setting",
            ResolveError::CyclicRequirement { .. } => "cyclic_requirement",
            ResolveError::VersionConflict { .. } => "version_conflict",
            ResolveError::DanglingOption { .. } => "dangling_option",
            ResolveError::InvalidOptionValue { .. } => "invalid_option_value",
            ResolveError::UnresolvablePackage { .. } => "unresolvable_package",
            ResolveError::UnknownGenerator(_) => "unknown_generator",
            ResolveError::GeneratorFailed { .. } => "generator_failed",
        }
    }

    /// Process exit code reported by the CLI for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            ResolveError::MalformedManifest(_) => 2,
            ResolveError::UnknownSettingAxis(_) => 3,
            ResolveError::UnboundSetting(_) => 3,
            ResolveError::CyclicRequirement { .. } => 4,
            ResolveError::VersionConflict { .. } => 5,
            ResolveError::DanglingOption { .. } => 6,
            ResolveError::InvalidOptionValue { .. } => 7,
            ResolveError::UnresolvablePackage { .. } => 8,
            ResolveError::UnknownGenerator(_) => 9,
            ResolveError::GeneratorFailed { .. } => 10,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        ResolveError::MalformedManifest(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_lists_versions() {
        let err = ResolveError::VersionConflict {
            name: "boost".to_string(),
            requested_versions: vec!["1.68.0".to_string(), "1.74.0".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "Version conflict for 'boost': requested 1.68.0, 1.74.0"
        );
        assert_eq!(err.kind(), "version_conflict");
    }

    #[test]
    fn cycle_message_joins_path() {
        let err = ResolveError::CyclicRequirement {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic requirement: a -> b -> a");
    }

    #[test]
    fn exit_codes_are_non_zero() {
        let errors = [
            ResolveError::malformed("x"),
            ResolveError::UnknownGenerator("x".into()),
            ResolveError::DanglingOption {
                package: "pq".into(),
                key: "shared".into(),
            },
        ];
        assert!(errors.iter().all(|e| e.exit_code() != 0));
    }
}

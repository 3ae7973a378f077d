//! File-backed package index
//!
//! A local stand-in for a remote package provider. Each entry names one
//! concrete package and lists what it requires and which options it accepts:
//!
//! ```toml
//! [[package]]
//! ref = "libcurl/7.66.0"
//! requires = ["openssl/1.0.2", "zlib/1.2.11"]
//!
//! [package.options]
//! shared = false
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::{
    ManifestFormat, MemoryProvider, Modifier, PackageMetadata, PackageProvider, PackageRef,
    ProviderError, RequirementSpec,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IndexDocument {
    #[serde(default, rename = "package")]
    packages: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IndexEntry {
    #[serde(rename = "ref")]
    reference: String,

    #[serde(default)]
    requires: Vec<RequirementForm>,

    #[serde(default)]
    options: BTreeMap<String, serde_json::Value>,
}

/// `"zlib/1.2.11"` or `["zlib/1.2.11", "override"]`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RequirementForm {
    Plain(String),
    Tagged(String, String),
}

impl RequirementForm {
    pub(crate) fn into_spec(self) -> Result<RequirementSpec> {
        let (reference, modifier) = match self {
            RequirementForm::Plain(reference) => (reference, Modifier::Normal),
            RequirementForm::Tagged(reference, modifier) => (reference, modifier.parse()?),
        };
        Ok(RequirementSpec::new(reference.parse()?, modifier))
    }
}

/// Package metadata loaded from an index file
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    packages: MemoryProvider,
}

impl PackageIndex {
    /// Loads an index file, choosing TOML or YAML by extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read package index: {}", path.display()))?;

        Self::parse(&content, ManifestFormat::from_path(path))
            .with_context(|| format!("Failed to parse package index: {}", path.display()))
    }

    /// Parses index text
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self> {
        let document: IndexDocument = match format {
            ManifestFormat::Toml => toml::from_str(content)?,
            ManifestFormat::Yaml => serde_yaml::from_str(content)?,
        };

        let mut index = Self::default();
        let mut seen = std::collections::HashSet::new();

        for entry in document.packages {
            let reference: PackageRef = entry.reference.parse()?;
            if !seen.insert(reference.clone()) {
                anyhow::bail!("package '{}' is listed more than once", reference);
            }

            let requires = entry
                .requires
                .into_iter()
                .map(RequirementForm::into_spec)
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Invalid requirement in '{}'", reference))?;

            index.packages.insert(
                reference,
                PackageMetadata {
                    requires,
                    options: entry.options,
                },
            );
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageProvider for PackageIndex {
    fn lookup(&self, reference: &PackageRef) -> Result<PackageMetadata, ProviderError> {
        self.packages.lookup(reference)
    }
}

//! Package provider seam
//!
//! The resolver never fetches anything itself. It asks a [`PackageProvider`]
//! for the transitive requirements and default options of each concrete
//! package, one synchronous lookup per reference.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::requirement::{PackageRef, RequirementSpec};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("package not found")]
    NotFound,

    #[error("{0}")]
    Failed(String),
}

/// What a provider knows about one package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Requirements the package itself declares
    #[serde(default)]
    pub requires: Vec<RequirementSpec>,

    /// Options the package accepts, with their default values
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl PackageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requires(mut self, spec: RequirementSpec) -> Self {
        self.requires.push(spec);
        self
    }

    pub fn option(mut self, key: impl Into<String>, default: serde_json::Value) -> Self {
        self.options.insert(key.into(), default);
        self
    }
}

/// Source of package metadata
pub trait PackageProvider {
    /// Looks up the metadata for a concrete package reference
    fn lookup(&self, reference: &PackageRef) -> Result<PackageMetadata, ProviderError>;
}

impl<P: PackageProvider + ?Sized> PackageProvider for &P {
    fn lookup(&self, reference: &PackageRef) -> Result<PackageMetadata, ProviderError> {
        (**self).lookup(reference)
    }
}

impl<P: PackageProvider + ?Sized> PackageProvider for Box<P> {
    fn lookup(&self, reference: &PackageRef) -> Result<PackageMetadata, ProviderError> {
        (**self).lookup(reference)
    }
}

/// Treats every package as a leaf with no requirements and no declared options
#[derive(Debug, Clone, Copy, Default)]
pub struct LeafProvider;

impl PackageProvider for LeafProvider {
    fn lookup(&self, _reference: &PackageRef) -> Result<PackageMetadata, ProviderError> {
        Ok(PackageMetadata::default())
    }
}

/// In-memory provider keyed by exact reference
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    packages: HashMap<PackageRef, PackageMetadata>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a package, replacing any earlier entry for the same reference
    pub fn insert(&mut self, reference: PackageRef, metadata: PackageMetadata) {
        self.packages.insert(reference, metadata);
    }

    /// Builder-style registration
    pub fn with(mut self, reference: PackageRef, metadata: PackageMetadata) -> Self {
        self.insert(reference, metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageProvider for MemoryProvider {
    fn lookup(&self, reference: &PackageRef) -> Result<PackageMetadata, ProviderError> {
        self.packages
            .get(reference)
            .cloned()
            .ok_or(ProviderError::NotFound)
    }
}

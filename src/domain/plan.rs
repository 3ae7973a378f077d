//! Build plan and plan emission
//!
//! The plan is the terminal artifact of a resolution: settings, the resolved
//! nodes with dependencies before dependents, and one directive per declared
//! generator. Generators are the single hand-off to outside serializers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::error::ResolveError;
use super::options::OptionValue;
use super::resolve::ResolvedGraph;
use super::settings::Settings;

/// A resolved package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,

    /// Direct dependencies of this package
    #[serde(default)]
    pub requires: BTreeSet<String>,

    /// Packages requiring this one (diagnostics only)
    #[serde(default)]
    pub dependents: BTreeSet<String>,

    /// Requested by the manifest itself rather than only transitively
    #[serde(default)]
    pub direct: bool,
}

impl PackageNode {
    /// `name/version[@channel]`
    pub fn reference(&self) -> String {
        match &self.channel {
            Some(channel) => format!("{}/{}@{}", self.name, self.version, channel),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

/// Output of one generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorDirective {
    pub generator: String,
    pub file_name: String,
    pub content: String,
}

/// A fully resolved, validated plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub settings: Settings,
    pub nodes: Vec<PackageNode>,
    #[serde(default)]
    pub generator_directives: Vec<GeneratorDirective>,
}

impl BuildPlan {
    pub fn node(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Stable hash over settings and nodes
    pub fn fingerprint(&self) -> String {
        #[derive(Serialize)]
        struct Canonical<'a> {
            settings: &'a Settings,
            nodes: &'a [PackageNode],
        }

        let canonical = Canonical {
            settings: &self.settings,
            nodes: &self.nodes,
        };
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

/// Artifact produced by a generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub file_name: String,
    pub content: String,
}

/// Serializes a plan for a downstream build system
pub trait Generator {
    /// Name used in the manifest's `generators` section
    fn name(&self) -> &str;

    /// Produces the artifact for a plan (directives are not yet filled in)
    fn emit(&self, plan: &BuildPlan) -> anyhow::Result<Artifact>;
}

/// Looks generators up by name
pub trait GeneratorCatalog {
    fn generator(&self, name: &str) -> Option<&dyn Generator>;
}

/// Builds the plan and runs every requested generator
///
/// Nothing is returned unless every generator succeeds.
pub fn emit(
    settings: &Settings,
    graph: ResolvedGraph,
    generators: &BTreeSet<String>,
    catalog: &dyn GeneratorCatalog,
) -> Result<BuildPlan, ResolveError> {
    let mut plan = BuildPlan {
        settings: settings.clone(),
        nodes: graph.into_nodes(),
        generator_directives: Vec::new(),
    };

    let mut directives = Vec::with_capacity(generators.len());
    for name in generators {
        let generator = catalog
            .generator(name)
            .ok_or_else(|| ResolveError::UnknownGenerator(name.clone()))?;

        debug!(generator = %name, "emitting");
        let artifact = generator
            .emit(&plan)
            .map_err(|e| ResolveError::GeneratorFailed {
                generator: name.clone(),
                reason: format!("{:#}", e),
            })?;

        directives.push(GeneratorDirective {
            generator: name.clone(),
            file_name: artifact.file_name,
            content: artifact.content,
        });
    }

    plan.generator_directives = directives;
    Ok(plan)
}

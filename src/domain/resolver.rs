//! Resolution pipeline
//!
//! Parser output → platform filter → graph build → override resolution →
//! options → plan. Each call takes a fresh manifest and returns a fresh plan;
//! nothing is cached between calls.

use tracing::{debug, info};

use super::error::ResolveError;
use super::graph::RequirementGraph;
use super::manifest::{OptionEntry, RawManifest};
use super::options::apply_options;
use super::plan::{emit, BuildPlan, GeneratorCatalog};
use super::provider::PackageProvider;
use super::requirement::{ManifestRequirement, RequirementSpec};
use super::resolve::resolve;
use super::settings::{evaluate, Settings};

/// Keeps unconditional requirements and the conditionals whose predicate holds
pub fn select_requirements(
    requirements: &[ManifestRequirement],
    settings: &Settings,
) -> Result<Vec<RequirementSpec>, ResolveError> {
    let mut selected = Vec::with_capacity(requirements.len());

    for requirement in requirements {
        match requirement {
            ManifestRequirement::Always(spec) => selected.push(spec.clone()),
            ManifestRequirement::When(conditional) => {
                if evaluate(&conditional.predicate, settings)? {
                    debug!(requirement = %conditional.spec, when = %conditional.predicate, "condition holds");
                    selected.push(conditional.spec.clone());
                } else {
                    debug!(requirement = %conditional.spec, when = %conditional.predicate, "condition skipped");
                }
            }
        }
    }

    Ok(selected)
}

/// Resolves manifests against a provider and a set of generators
pub struct Resolver<'a> {
    provider: &'a dyn PackageProvider,
    generators: &'a dyn GeneratorCatalog,
}

impl<'a> Resolver<'a> {
    pub fn new(provider: &'a dyn PackageProvider, generators: &'a dyn GeneratorCatalog) -> Self {
        Self {
            provider,
            generators,
        }
    }

    /// Resolves a manifest into a build plan
    pub fn resolve(&self, manifest: &RawManifest, settings: &Settings) -> Result<BuildPlan, ResolveError> {
        self.resolve_with(manifest, settings, &[])
    }

    /// Resolves with extra option entries applied after the manifest's own
    pub fn resolve_with(
        &self,
        manifest: &RawManifest,
        settings: &Settings,
        extra_options: &[OptionEntry],
    ) -> Result<BuildPlan, ResolveError> {
        settings.ensure_bound(&manifest.settings_axes)?;

        let roots = select_requirements(&manifest.requirements, settings)?;
        debug!(roots = roots.len(), "requirements selected");

        let graph = RequirementGraph::build(&roots, self.provider)?;
        let mut resolved = resolve(&graph)?;

        let entries: Vec<OptionEntry> = manifest
            .options
            .iter()
            .chain(extra_options)
            .cloned()
            .collect();
        apply_options(&mut resolved, &entries)?;

        let plan = emit(settings, resolved, &manifest.generators, self.generators)?;
        info!(
            packages = plan.nodes.len(),
            generators = plan.generator_directives.len(),
            "plan emitted"
        );

        Ok(plan)
    }
}

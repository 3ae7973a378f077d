//! Domain models for depplan
//!
//! The resolver core: manifest parsing, platform settings, the requirement
//! graph, override resolution, options and plan emission. No I/O lives here;
//! packages and generators are reached through the [`PackageProvider`] and
//! [`GeneratorCatalog`] seams.

mod error;
mod settings;
mod requirement;
mod manifest;
mod provider;
mod graph;
mod resolve;
mod options;
mod plan;
mod resolver;

pub use error::ResolveError;
pub use settings::{evaluate, Clause, Comparison, Predicate, SettingAxis, Settings};
pub use requirement::{ConditionalRequirement, ManifestRequirement, Modifier, PackageRef, RequirementSpec};
pub use manifest::{ManifestFormat, OptionEntry, RawManifest};
pub use provider::{LeafProvider, MemoryProvider, PackageMetadata, PackageProvider, ProviderError};
pub use graph::{Request, RequirementGraph};
pub use resolve::{resolve, ResolvedGraph};
pub use options::{apply_options, OptionValue};
pub use plan::{emit, Artifact, BuildPlan, Generator, GeneratorCatalog, GeneratorDirective, PackageNode};
pub use resolver::{select_requirements, Resolver};

//! # Generators
//!
//! Serializers that turn a [`BuildPlan`] into a file for a downstream build
//! system. A manifest names the generators it wants; each one produces a
//! single artifact.
//!
//! | Name | File | Contents |
//! |------|------|----------|
//! | `json` | `depplan.lock.json` | Lock file with the plan fingerprint |
//! | `make` | `depplan.mk` | Make variables |
//! | `env` | `depplan.env` | Shell `export` lines |
//! | `cmake` | `depplan.cmake` | CMake `set()` calls |
//!
//! Plugins named `depplan-gen-{name}` extend the set. Built-ins take
//! precedence over a plugin with the same name.

mod cmake;
mod env;
mod json;
mod make;

use std::collections::HashSet;

use anyhow::{bail, Result};
use tracing::debug;

use crate::domain::{BuildPlan, Generator, GeneratorCatalog, PackageNode};
use crate::plugin::{PluginGenerator, PluginLoader};

pub use cmake::CMakeGenerator;
pub use env::EnvGenerator;
pub use json::JsonLockGenerator;
pub use make::MakeGenerator;

/// Generators available to a resolution
pub struct GeneratorRegistry {
    generators: Vec<Box<dyn Generator>>,
}

impl GeneratorRegistry {
    /// The built-in generators
    pub fn builtin() -> Self {
        Self {
            generators: vec![
                Box::new(CMakeGenerator),
                Box::new(EnvGenerator),
                Box::new(JsonLockGenerator),
                Box::new(MakeGenerator),
            ],
        }
    }

    /// Built-ins plus every discovered `depplan-gen-*` plugin
    pub fn with_plugins(loader: &PluginLoader) -> Self {
        let mut registry = Self::builtin();
        for info in loader.list() {
            if let Some(generator) = PluginGenerator::from_info(info) {
                registry.register(Box::new(generator));
            }
        }
        registry
    }

    /// Adds a generator unless one with the same name exists
    pub fn register(&mut self, generator: Box<dyn Generator>) -> bool {
        if self.generator(generator.name()).is_some() {
            debug!(generator = generator.name(), "generator already registered, skipping");
            return false;
        }
        self.generators.push(generator);
        true
    }

    /// Sorted generator names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.generators.iter().map(|g| g.name()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GeneratorCatalog for GeneratorRegistry {
    fn generator(&self, name: &str) -> Option<&dyn Generator> {
        self.generators
            .iter()
            .find(|g| g.name() == name)
            .map(|g| g.as_ref())
    }
}

/// `DEPPLAN_` + upper-cased parts, anything outside `[A-Z0-9]` becoming `_`
pub(crate) fn variable_name(parts: &[&str]) -> String {
    let mut name = String::from("DEPPLAN");
    for part in parts {
        name.push('_');
        name.extend(part.chars().map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        }));
    }
    name
}

/// Variable assignments shared by the text generators, in plan order
///
/// Fails when two packages or options sanitize to the same variable name, or
/// when a value holds a control character the target syntax cannot carry.
pub(crate) fn variables(plan: &BuildPlan) -> Result<Vec<(String, String)>> {
    let mut vars = Vec::new();

    for (axis, value) in plan.settings.iter() {
        vars.push((variable_name(&["SETTING", axis.as_str()]), value.to_string()));
    }

    let names: Vec<&str> = plan.nodes.iter().map(|n| n.name.as_str()).collect();
    vars.push((variable_name(&["PACKAGES"]), names.join(" ")));

    for node in &plan.nodes {
        vars.extend(node_variables(node));
    }

    let mut seen = HashSet::with_capacity(vars.len());
    for (name, value) in &vars {
        if !seen.insert(name.as_str()) {
            bail!(
                "variable {} is produced more than once; package or option names collide after sanitizing",
                name
            );
        }
        if value.chars().any(char::is_control) {
            bail!("value of {} contains a control character", name);
        }
    }

    Ok(vars)
}

fn node_variables(node: &PackageNode) -> Vec<(String, String)> {
    let mut vars = vec![
        (variable_name(&[node.name.as_str(), "REFERENCE"]), node.reference()),
        (variable_name(&[node.name.as_str(), "VERSION"]), node.version.clone()),
    ];
    if let Some(channel) = &node.channel {
        vars.push((variable_name(&[node.name.as_str(), "CHANNEL"]), channel.clone()));
    }

    let requires: Vec<&str> = node.requires.iter().map(String::as_str).collect();
    vars.push((variable_name(&[node.name.as_str(), "REQUIRES"]), requires.join(" ")));

    for (key, value) in &node.options {
        vars.push((variable_name(&[node.name.as_str(), "OPTION", key.as_str()]), value.to_string()));
    }
    vars
}

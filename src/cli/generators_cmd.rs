//! `depplan generators`: list generator names usable in a manifest

use anyhow::Result;

use super::output::Output;
use crate::generators::GeneratorRegistry;
use crate::plugin::{PluginLoader, PluginType};
use crate::storage::Config;

pub fn run(output: &Output) -> Result<()> {
    let config = Config::load_from(&std::env::current_dir()?)?;

    let mut loader = PluginLoader::new();
    for dir in config.plugin_dirs() {
        loader.add_plugin_dir(dir);
    }
    loader.discover()?;

    let registry = GeneratorRegistry::with_plugins(&loader);
    let builtin = GeneratorRegistry::builtin();
    let plugins = loader.names(PluginType::Generator);

    let entries: Vec<(&str, &str)> = registry
        .names()
        .into_iter()
        .map(|name| {
            let source = if builtin.names().contains(&name) {
                "builtin"
            } else if plugins.iter().any(|plugin| plugin == name) {
                "plugin"
            } else {
                "unknown"
            };
            (name, source)
        })
        .collect();

    if output.is_json() {
        let items: Vec<_> = entries
            .iter()
            .map(|(name, source)| serde_json::json!({ "name": name, "source": source }))
            .collect();
        output.data(&items);
    } else {
        println!("{:<16} SOURCE", "NAME");
        for (name, source) in &entries {
            println!("{:<16} {}", name, source);
        }
    }

    Ok(())
}

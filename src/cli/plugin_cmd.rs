//! Plugin management commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::plugin::PluginLoader;
use crate::storage::Config;

#[derive(Subcommand)]
pub enum PluginCommands {
    /// List available plugins
    List,

    /// Show a plugin's manifest
    Info {
        /// Plugin binary name (e.g. depplan-gen-bazel)
        name: String,
    },
}

pub fn run(cmd: PluginCommands, output: &Output) -> Result<()> {
    let mut loader = discover()?;

    match cmd {
        PluginCommands::List => list_plugins(output, &loader),
        PluginCommands::Info { name } => plugin_info(output, &mut loader, &name),
    }
}

fn discover() -> Result<PluginLoader> {
    let config = Config::load_from(&std::env::current_dir()?)?;

    let mut loader = PluginLoader::new();
    for dir in config.plugin_dirs() {
        loader.add_plugin_dir(dir);
    }
    loader.discover()?;
    Ok(loader)
}

fn list_plugins(output: &Output, loader: &PluginLoader) -> Result<()> {
    let plugins = loader.list();

    if output.is_json() {
        let items: Vec<_> = plugins
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "path": p.path.display().to_string(),
                })
            })
            .collect();
        output.data(&items);
    } else if plugins.is_empty() {
        println!("No plugins found.");
        println!();
        println!("Plugins are discovered from:");
        println!("  - .depplan/plugins/ and configured plugin_dirs");
        println!("  - PATH (executables starting with 'depplan-provider-' or 'depplan-gen-')");
    } else {
        println!("Available plugins:");
        println!("{:<30} PATH", "NAME");
        println!("{}", "-".repeat(70));
        for plugin in plugins {
            println!("{:<30} {}", plugin.name, plugin.path.display());
        }
    }

    Ok(())
}

fn plugin_info(output: &Output, loader: &mut PluginLoader, name: &str) -> Result<()> {
    let manifest = loader
        .get_manifest(name)?
        .ok_or_else(|| anyhow::anyhow!("Plugin not found: {}", name))?;

    if output.is_json() {
        output.data(&manifest);
    } else {
        println!("Plugin: {}", manifest.name);
        println!("Version: {}", manifest.version);
        println!("Description: {}", manifest.description);
        println!("Type: {:?}", manifest.plugin_type);
        println!("Operations: {}", manifest.operations.join(", "));
    }

    Ok(())
}

//! `depplan resolve`: manifest in, build plan out

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{debug, info};

use super::output::Output;
use crate::domain::{
    BuildPlan, LeafProvider, OptionEntry, PackageProvider, ResolveError, Resolver, Settings,
};
use crate::generators::GeneratorRegistry;
use crate::plugin::{PluginLoader, PluginProvider};
use crate::storage::{load_manifest, Config, PackageIndex};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Manifest file (TOML, or YAML by .yaml/.yml extension)
    pub manifest: PathBuf,

    /// Bind a setting, e.g. --setting os=Linux (repeatable)
    #[arg(long = "setting", short = 's', value_name = "AXIS=VALUE")]
    pub settings: Vec<String>,

    /// Set an option after the manifest's own, e.g. --option boost:shared=True
    #[arg(long = "option", short = 'o', value_name = "PKG:KEY=VALUE")]
    pub options: Vec<String>,

    /// Package index file
    #[arg(long, env = "DEPPLAN_INDEX")]
    pub index: Option<PathBuf>,

    /// Provider plugin name (runs depplan-provider-NAME)
    #[arg(long)]
    pub provider: Option<String>,

    /// Write generator artifacts into this directory
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

/// JSON shape of a resolved plan
#[derive(Serialize)]
struct PlanReport<'a> {
    fingerprint: String,
    #[serde(flatten)]
    plan: &'a BuildPlan,
}

pub fn run(args: ResolveArgs, output: &Output) -> Result<()> {
    let manifest_dir = match args.manifest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let config = Config::load_from(&manifest_dir)?;
    debug!(project_root = ?config.project_root, "configuration loaded");

    let manifest = load_manifest(&args.manifest)?;
    let settings = settings(&config, &args.settings)?;
    let extra_options = args
        .options
        .iter()
        .map(|assignment| OptionEntry::parse_assignment(assignment))
        .collect::<Result<Vec<_>, ResolveError>>()?;

    let mut loader = PluginLoader::new();
    for dir in config.plugin_dirs() {
        loader.add_plugin_dir(dir);
    }
    loader.discover()?;

    let provider = select_provider(&args, &config, &loader)?;
    let generators = GeneratorRegistry::with_plugins(&loader);

    let plan = Resolver::new(provider.as_ref(), &generators).resolve_with(
        &manifest,
        &settings,
        &extra_options,
    )?;

    if let Some(out_dir) = &args.out_dir {
        write_artifacts(out_dir, &plan)?;
    }

    if output.is_json() {
        output.data(&PlanReport {
            fingerprint: plan.fingerprint(),
            plan: &plan,
        });
    } else {
        print_plan(&plan, args.out_dir.as_deref(), output.is_verbose());
    }

    Ok(())
}

/// Config profile first, then `--setting` flags in order
fn settings(config: &Config, assignments: &[String]) -> Result<Settings, ResolveError> {
    let mut settings = config.settings()?;
    for assignment in assignments {
        settings.bind_assignment(assignment)?;
    }
    Ok(settings)
}

/// `--provider`, then `--index`/`DEPPLAN_INDEX`, then config, then leaf packages
fn select_provider(
    args: &ResolveArgs,
    config: &Config,
    loader: &PluginLoader,
) -> Result<Box<dyn PackageProvider>> {
    if let Some(name) = &args.provider {
        info!(provider = %name, "using provider plugin");
        return Ok(Box::new(PluginProvider::from_loader(loader, name)?));
    }

    if let Some(path) = &args.index {
        info!(index = %path.display(), "using package index");
        return Ok(Box::new(PackageIndex::load(path)?));
    }

    if let Some(name) = &config.project.provider.plugin {
        info!(provider = %name, "using provider plugin from config");
        return Ok(Box::new(PluginProvider::from_loader(loader, name)?));
    }

    if let Some(path) = config.index_path() {
        info!(index = %path.display(), "using package index from config");
        return Ok(Box::new(PackageIndex::load(&path)?));
    }

    debug!("no provider configured, treating packages as leaves");
    Ok(Box::new(LeafProvider))
}

/// Writes each directive's content under `dir`
///
/// Every file name is checked before anything is written, so a bad directive
/// leaves the output directory untouched.
fn write_artifacts(dir: &Path, plan: &BuildPlan) -> Result<()> {
    let mut names = HashSet::with_capacity(plan.generator_directives.len());
    for directive in &plan.generator_directives {
        // Plain file names only; plugins must not escape the output directory
        let plain = Path::new(&directive.file_name)
            .file_name()
            .is_some_and(|name| name == directive.file_name.as_str());
        if !plain {
            anyhow::bail!(
                "Generator '{}' returned an invalid file name: {}",
                directive.generator,
                directive.file_name
            );
        }
        if !names.insert(directive.file_name.as_str()) {
            anyhow::bail!(
                "Generator '{}' returned a file name already used by another generator: {}",
                directive.generator,
                directive.file_name
            );
        }
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    for directive in &plan.generator_directives {
        let path = dir.join(&directive.file_name);
        fs::write(&path, &directive.content)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
        debug!(generator = %directive.generator, path = %path.display(), "artifact written");
    }

    Ok(())
}

fn print_plan(plan: &BuildPlan, out_dir: Option<&Path>, verbose: bool) {
    println!("Settings:");
    for (axis, value) in plan.settings.iter() {
        println!("  {:<12} {}", axis.as_str(), value);
    }

    println!();
    println!("Packages ({}, dependencies first):", plan.nodes.len());
    for node in &plan.nodes {
        let marker = if node.direct { "" } else { "  (transitive)" };
        println!("  {}{}", node.reference(), marker);

        if !node.requires.is_empty() {
            let requires: Vec<&str> = node.requires.iter().map(String::as_str).collect();
            println!("    requires: {}", requires.join(", "));
        }
        if verbose && !node.dependents.is_empty() {
            let dependents: Vec<&str> = node.dependents.iter().map(String::as_str).collect();
            println!("    required by: {}", dependents.join(", "));
        }
        for (key, value) in &node.options {
            println!("    {}:{} = {}", node.name, key, value);
        }
    }

    if !plan.generator_directives.is_empty() {
        println!();
        println!("Generators:");
        for directive in &plan.generator_directives {
            match out_dir {
                Some(dir) => println!(
                    "  {:<8} {}",
                    directive.generator,
                    dir.join(&directive.file_name).display()
                ),
                None => println!("  {:<8} {}", directive.generator, directive.file_name),
            }
        }
    }

    println!();
    println!("Fingerprint: {}", plan.fingerprint());
}

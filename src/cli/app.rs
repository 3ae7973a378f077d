//! Main CLI application structure

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::resolve::{self, ResolveArgs};
use super::{generators_cmd, plugin_cmd};
use crate::domain::ResolveError;
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "depplan")]
#[command(author, version, about = "Resolve dependency manifests into build plans")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config's default_format, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a .depplan project directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Resolve a manifest into a build plan
    Resolve(ResolveArgs),

    /// List available generators
    Generators,

    /// Manage plugins
    #[command(subcommand)]
    Plugin(plugin_cmd::PluginCommands),
}

/// Main entry point for the CLI
///
/// Resolution failures are reported here with their kind and mapped to their
/// exit code; any other error is returned to the caller.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()
            .map(|global| global.default_format)
            .unwrap_or_default(),
    };
    let output = Output::new(format, cli.verbose);

    match execute(cli.command, &output) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.chain().find_map(|cause| cause.downcast_ref::<ResolveError>()) {
            Some(resolve_error) => {
                output.resolve_error(resolve_error);
                Ok(ExitCode::from(resolve_error.exit_code()))
            }
            None => Err(err),
        },
    }
}

fn execute(command: Commands, output: &Output) -> Result<()> {
    match command {
        Commands::Init { path } => {
            let project_dir = Config::init_project(&path)?;
            tracing::debug!(path = %project_dir.display(), "project directory created");
            output.success(&format!("Initialized depplan project at {}", project_dir.display()));
        }

        Commands::Resolve(args) => resolve::run(args, output)?,
        Commands::Generators => generators_cmd::run(output)?,
        Commands::Plugin(cmd) => plugin_cmd::run(cmd, output)?,
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

//! Configuration handling for depplan
//!
//! Configuration is stored in `.depplan/config.toml` (project, found by
//! walking up from the manifest's directory) and
//! `~/.config/depplan/config.toml` (global). `DEPPLAN_CONFIG_DIR` replaces
//! the global directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::OutputFormat;
use crate::domain::{ResolveError, Settings};

/// Directory that marks a project root
pub const PROJECT_DIR: &str = ".depplan";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Where package metadata comes from
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Package index file (TOML or YAML)
    pub index: Option<PathBuf>,

    /// Provider plugin name (`depplan-provider-{name}`)
    pub plugin: Option<String>,
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Setting values, e.g. `os = "Linux"`
    pub profile: BTreeMap<String, String>,

    /// Package provider selection
    pub provider: ProviderConfig,

    /// Extra directories searched for plugins
    pub plugin_dirs: Vec<PathBuf>,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Setting values applied before the project profile
    pub profile: BTreeMap<String, String>,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads global configuration and the project configuration above `start`
    pub fn load_from(start: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = Self::find_project_root(start);

        let project = match &project_root {
            Some(root) => Self::load_project_config(root)?,
            None => ProjectConfig::default(),
        };

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os("DEPPLAN_CONFIG_DIR") {
            return Some(PathBuf::from(dir));
        }
        ProjectDirs::from("dev", "depplan", "depplan").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")
    }

    /// Finds the project root by looking for `.depplan/` at or above `start`
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut current = if start.is_absolute() {
            start.to_path_buf()
        } else {
            std::env::current_dir().ok()?.join(start)
        };

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Settings from the global profile, then the project profile
    pub fn settings(&self) -> Result<Settings, ResolveError> {
        let mut settings = Settings::new();
        for (axis, value) in self.global.profile.iter().chain(&self.project.profile) {
            settings.bind_named(axis, value.clone())?;
        }
        Ok(settings)
    }

    /// Package index path, relative paths resolved against the project root
    pub fn index_path(&self) -> Option<PathBuf> {
        self.project
            .provider
            .index
            .as_deref()
            .map(|path| self.project_path(path))
    }

    /// Plugin directories: `.depplan/plugins` plus any configured ones
    pub fn plugin_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(root) = &self.project_root {
            dirs.push(root.join(PROJECT_DIR).join("plugins"));
        }
        dirs.extend(self.project.plugin_dirs.iter().map(|dir| self.project_path(dir)));
        dirs
    }

    fn project_path(&self, path: &Path) -> PathBuf {
        match &self.project_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Creates `.depplan/` with a starter config at `root`
    pub fn init_project(root: &Path) -> Result<PathBuf> {
        let project_dir = root.join(PROJECT_DIR);
        let plugins_dir = project_dir.join("plugins");

        fs::create_dir_all(&plugins_dir).with_context(|| {
            format!("Failed to create plugins directory: {}", plugins_dir.display())
        })?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# depplan project configuration

# Setting values used when resolving manifests in this project.
# Command-line --setting flags take precedence.
[profile]
# os = "Linux"
# compiler = "gcc"
# build_type = "Release"
# arch = "x86_64"

[provider]
# index = "packages.toml"
# plugin = "artifactory"
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        Ok(project_dir)
    }
}

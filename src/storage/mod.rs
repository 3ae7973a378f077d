//! # Storage Layer
//!
//! Everything depplan reads from disk: manifests, package indexes and
//! configuration. The domain layer never touches the filesystem; this module
//! turns files into domain values.
//!
//! ## File Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Manifest | TOML or YAML (by extension) | anywhere, passed on the command line |
//! | Package index | TOML or YAML `[[package]]` entries | `--index`, `DEPPLAN_INDEX` or `[provider] index` |
//! | Config | TOML | `.depplan/config.toml`, `~/.config/depplan/config.toml` |
//!
//! ## Project Structure
//!
//! ```text
//! .depplan/
//! ├── config.toml           # Project configuration (profile, provider)
//! └── plugins/              # Local provider and generator plugins
//! ```
//!
//! ## Key Types
//!
//! - [`Config`] - Project and global configuration
//! - [`PackageIndex`] - File-backed [`crate::domain::PackageProvider`]
//! - [`load_manifest`] - Reads a manifest file

mod config;
mod index;
mod manifest;

pub use config::{Config, ConfigError, GlobalConfig, ProjectConfig, ProviderConfig, PROJECT_DIR};
pub use index::PackageIndex;
pub(crate) use index::RequirementForm;
pub use manifest::load_manifest;

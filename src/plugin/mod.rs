//! # Plugin System
//!
//! Extensibility layer for package providers and build generators.
//!
//! ## Overview
//!
//! Plugins are separate binaries that communicate with depplan via JSON over
//! stdin/stdout, so any language can implement one.
//!
//! ## Plugin Types
//!
//! | Type | Binary Pattern | Purpose |
//! |------|----------------|---------|
//! | Provider | `depplan-provider-{name}` | Package metadata (`lookup`) |
//! | Generator | `depplan-gen-{name}` | Serialize a plan for a build system (`emit`) |
//!
//! ## Plugin Discovery
//!
//! Plugins are discovered in two locations:
//! 1. `.depplan/plugins/` and configured `plugin_dirs` - Project-local plugins
//! 2. `$PATH` - System-wide plugins
//!
//! ## Protocol
//!
//! ```text
//! CLI                          Plugin Binary
//!  │                               │
//!  ├── Spawn: depplan-gen-bazel    │
//!  │                               │
//!  ├── Stdin: {"operation": "emit", "params": {...}}
//!  │                               │
//!  └── Stdout: {"success": true, "data": {...}}
//! ```
//!
//! Every plugin must support `--manifest` to declare its capabilities.
//!
//! ## Key Types
//!
//! - [`PluginLoader`] - Discovers and executes plugins
//! - [`PluginManifest`] - Declares plugin capabilities
//! - [`PluginProvider`] - [`crate::domain::PackageProvider`] over a plugin
//! - [`PluginGenerator`] - [`crate::domain::Generator`] over a plugin

mod generator;
mod loader;
mod protocol;
mod provider;

pub use generator::PluginGenerator;
pub use loader::{PluginInfo, PluginLoader};
pub use protocol::{PluginManifest, PluginRequest, PluginResponse, PluginType};
pub use provider::PluginProvider;

//! Plugin discovery and execution
//!
//! Plugins are discovered from:
//! 1. Plugin directories (`.depplan/plugins/` and any configured ones)
//! 2. PATH (executables starting with "depplan-")

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use anyhow::{Context, Result};
use tracing::debug;

use super::protocol::{PluginManifest, PluginRequest, PluginResponse, PluginType};

const PLUGIN_PREFIX: &str = "depplan-";

/// Information about a discovered plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Binary name without extension (e.g. "depplan-gen-bazel")
    pub name: String,

    /// Path to the plugin executable
    pub path: PathBuf,

    /// Plugin manifest (loaded on demand)
    pub manifest: Option<PluginManifest>,
}

/// Plugin loader and executor
#[derive(Debug, Default)]
pub struct PluginLoader {
    /// Discovered plugins
    plugins: BTreeMap<String, PluginInfo>,

    /// Additional plugin directories, searched before PATH
    plugin_dirs: Vec<PathBuf>,
}

impl PluginLoader {
    /// Creates a new plugin loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin directory to search
    pub fn add_plugin_dir(&mut self, dir: impl Into<PathBuf>) {
        self.plugin_dirs.push(dir.into());
    }

    /// Discovers all available plugins
    pub fn discover(&mut self) -> Result<()> {
        self.plugins.clear();

        for dir in self.plugin_dirs.clone() {
            self.scan_directory(&dir);
        }

        if let Some(path_var) = std::env::var_os("PATH") {
            for dir in std::env::split_paths(&path_var) {
                self.scan_directory(&dir);
            }
        }

        debug!(plugins = self.plugins.len(), "plugin discovery finished");
        Ok(())
    }

    /// Scans a directory for plugins; unreadable directories are skipped
    fn scan_directory(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();

            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(file_name) => file_name.strip_suffix(".exe").unwrap_or(file_name).to_string(),
                None => continue,
            };

            if name.starts_with(PLUGIN_PREFIX) && is_executable(&path) {
                // First found wins
                self.plugins.entry(name.clone()).or_insert_with(|| PluginInfo {
                    name,
                    path,
                    manifest: None,
                });
            }
        }
    }

    /// Lists all discovered plugins
    pub fn list(&self) -> Vec<&PluginInfo> {
        self.plugins.values().collect()
    }

    /// Gets a plugin by binary name
    pub fn get(&self, name: &str) -> Option<&PluginInfo> {
        self.plugins.get(name)
    }

    /// Gets a plugin by type and short name
    pub fn find(&self, plugin_type: PluginType, name: &str) -> Option<&PluginInfo> {
        self.get(&plugin_type.binary_name(name))
    }

    /// Short names of discovered plugins of one type, judged by binary prefix
    pub fn names(&self, plugin_type: PluginType) -> Vec<String> {
        self.plugins
            .keys()
            .filter_map(|name| name.strip_prefix(plugin_type.prefix()))
            .map(str::to_string)
            .collect()
    }

    /// Gets the manifest for a plugin (loads if needed)
    pub fn get_manifest(&mut self, name: &str) -> Result<Option<PluginManifest>> {
        if let Some(info) = self.plugins.get_mut(name) {
            if info.manifest.is_none() {
                info.manifest = Some(load_manifest(&info.path)?);
            }
            Ok(info.manifest.clone())
        } else {
            Ok(None)
        }
    }

    /// Executes a plugin request
    pub fn execute(&self, name: &str, request: &PluginRequest) -> Result<PluginResponse> {
        let info = self
            .plugins
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Plugin not found: {}", name))?;

        execute_at(&info.path, request)
    }
}

/// Runs one request against the plugin executable at `path`
///
/// The child is always waited on. Its stderr is drained on a separate thread
/// and attached to the error when no usable response arrives.
pub fn execute_at(path: &Path, request: &PluginRequest) -> Result<PluginResponse> {
    debug!(plugin = %path.display(), operation = %request.operation, "executing plugin");

    let mut child = Command::new(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn plugin: {}", path.display()))?;

    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = String::new();
            let _ = pipe.read_to_string(&mut buffer);
            buffer
        })
    });

    let result = exchange(&mut child, request);
    let status = child.wait();
    let diagnostics = stderr
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    match result {
        Ok(response) => {
            status.with_context(|| format!("Failed to wait for plugin: {}", path.display()))?;
            Ok(response)
        }
        Err(e) if diagnostics.trim().is_empty() => Err(e),
        Err(e) => Err(e.context(format!("Plugin stderr: {}", diagnostics.trim()))),
    }
}

/// Writes the request line, closes stdin and reads one response line
fn exchange(child: &mut Child, request: &PluginRequest) -> Result<PluginResponse> {
    // Dropping stdin at the end of this block sends EOF
    {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to open plugin stdin"))?;
        let request_json = serde_json::to_string(request).context("Failed to serialize request")?;
        writeln!(stdin, "{}", request_json).context("Failed to write to plugin")?;
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("Failed to open plugin stdout"))?;

    let response_line = BufReader::new(stdout)
        .lines()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No response from plugin"))?
        .context("Failed to read plugin response")?;

    serde_json::from_str(&response_line).context("Failed to parse plugin response")
}

/// Loads the manifest from a plugin
fn load_manifest(path: &Path) -> Result<PluginManifest> {
    let output = Command::new(path)
        .arg("--manifest")
        .output()
        .with_context(|| format!("Failed to execute plugin: {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Plugin returned error: {}", stderr);
    }

    serde_json::from_slice(&output.stdout).context("Failed to parse plugin manifest")
}

/// Checks if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = path.metadata() {
            return meta.is_file() && meta.permissions().mode() & 0o111 != 0;
        }
    }

    #[cfg(windows)]
    {
        if let Some(ext) = path.extension() {
            return ext == "exe" || ext == "bat" || ext == "cmd";
        }
    }

    false
}

//! Generator plugins
//!
//! A `depplan-gen-{name}` executable receives the whole plan and returns one
//! artifact:
//!
//! ```text
//! → {"operation":"emit","params":{"generator":"bazel","plan":{...}}}
//! ← {"success":true,"data":{"file_name":"deps.bzl","content":"..."}}
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use super::loader::{execute_at, PluginInfo};
use super::protocol::{PluginRequest, PluginType};
use crate::domain::{Artifact, BuildPlan, Generator};

/// Generator backed by an external plugin
#[derive(Debug, Clone)]
pub struct PluginGenerator {
    name: String,
    path: PathBuf,
}

impl PluginGenerator {
    /// Wraps a discovered `depplan-gen-*` plugin
    pub fn from_info(info: &PluginInfo) -> Option<Self> {
        let name = info.name.strip_prefix(PluginType::Generator.prefix())?;
        Some(Self {
            name: name.to_string(),
            path: info.path.clone(),
        })
    }
}

impl Generator for PluginGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn emit(&self, plan: &BuildPlan) -> Result<Artifact> {
        let request = PluginRequest::new(
            "emit",
            json!({
                "generator": self.name,
                "plan": plan,
            }),
        );

        let response = execute_at(&self.path, &request)?;
        let data = response.into_data().map_err(anyhow::Error::msg)?;

        serde_json::from_value(data).context("Plugin returned an invalid artifact")
    }
}

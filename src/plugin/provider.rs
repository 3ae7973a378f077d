//! Provider plugins
//!
//! A `depplan-provider-{name}` executable answers `lookup` requests:
//!
//! ```text
//! → {"operation":"lookup","params":{"name":"zlib","version":"1.2.11","channel":null}}
//! ← {"success":true,"data":{"requires":["..."],"options":{"shared":false}}}
//! ```
//!
//! `data` of `null` or `{"found": false}` means the package does not exist.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;

use super::loader::{execute_at, PluginLoader};
use super::protocol::{PluginRequest, PluginType};
use crate::domain::{PackageMetadata, PackageProvider, PackageRef, ProviderError};
use crate::storage::RequirementForm;

#[derive(Debug, Deserialize)]
struct LookupData {
    #[serde(default = "found_by_default")]
    found: bool,

    #[serde(default)]
    requires: Vec<RequirementForm>,

    #[serde(default)]
    options: BTreeMap<String, serde_json::Value>,
}

fn found_by_default() -> bool {
    true
}

/// Package provider backed by an external plugin
#[derive(Debug, Clone)]
pub struct PluginProvider {
    name: String,
    path: PathBuf,
}

impl PluginProvider {
    /// Finds `depplan-provider-{name}` among the discovered plugins
    pub fn from_loader(loader: &PluginLoader, name: &str) -> Result<Self> {
        let info = loader.find(PluginType::Provider, name).ok_or_else(|| {
            anyhow::anyhow!(
                "Provider plugin not found: {}",
                PluginType::Provider.binary_name(name)
            )
        })?;

        Ok(Self {
            name: name.to_string(),
            path: info.path.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn decode(data: serde_json::Value) -> Result<PackageMetadata, ProviderError> {
        if data.is_null() {
            return Err(ProviderError::NotFound);
        }

        let data: LookupData = serde_json::from_value(data)
            .map_err(|e| ProviderError::Failed(format!("invalid lookup response: {}", e)))?;
        if !data.found {
            return Err(ProviderError::NotFound);
        }

        let requires = data
            .requires
            .into_iter()
            .map(RequirementForm::into_spec)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| ProviderError::Failed(format!("invalid requirement: {:#}", e)))?;

        Ok(PackageMetadata {
            requires,
            options: data.options,
        })
    }
}

impl PackageProvider for PluginProvider {
    fn lookup(&self, reference: &PackageRef) -> Result<PackageMetadata, ProviderError> {
        let request = PluginRequest::new(
            "lookup",
            json!({
                "name": reference.name,
                "version": reference.version,
                "channel": reference.channel,
            }),
        );

        let response = execute_at(&self.path, &request)
            .map_err(|e| ProviderError::Failed(format!("{:#}", e)))?;
        let data = response.into_data().map_err(ProviderError::Failed)?;

        Self::decode(data)
    }
}

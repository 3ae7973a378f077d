//! Plugin protocol types
//!
//! Plugins communicate via JSON messages over stdin/stdout.
//! Each plugin must support the `--manifest` flag to declare capabilities.

use serde::{Deserialize, Serialize};

/// Plugin manifest declaring capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name (e.g., "depplan-provider-artifactory")
    pub name: String,

    /// Plugin version
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Plugin type
    #[serde(rename = "type")]
    pub plugin_type: PluginType,

    /// Supported operations
    #[serde(default)]
    pub operations: Vec<String>,
}

/// Type of plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
    /// Package metadata source (`lookup`)
    Provider,

    /// Plan serializer (`emit`)
    Generator,
}

impl PluginType {
    /// Binary name prefix for this plugin type
    pub fn prefix(self) -> &'static str {
        match self {
            PluginType::Provider => "depplan-provider-",
            PluginType::Generator => "depplan-gen-",
        }
    }

    /// Executable name for a plugin of this type
    pub fn binary_name(self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }
}

/// A message sent to a plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRequest {
    /// The operation to perform
    pub operation: String,

    /// Operation-specific parameters
    pub params: serde_json::Value,
}

impl PluginRequest {
    pub fn new(operation: impl Into<String>, params: impl Into<serde_json::Value>) -> Self {
        Self {
            operation: operation.into(),
            params: params.into(),
        }
    }
}

/// A response from a plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginResponse {
    /// Whether the operation succeeded
    pub success: bool,

    /// Result data (if success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message (if failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginResponse {
    pub fn success(data: impl Into<serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// The payload of a successful response, or the plugin's error
    pub fn into_data(self) -> Result<serde_json::Value, String> {
        if self.success {
            Ok(self.data.unwrap_or(serde_json::Value::Null))
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "plugin reported failure without a message".to_string()))
        }
    }
}

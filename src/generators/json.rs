//! `json` generator: a lock file pinning the resolved graph

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{Artifact, BuildPlan, Generator, PackageNode, Settings};

pub const LOCK_FILE: &str = "depplan.lock.json";

#[derive(Serialize)]
struct LockFile<'a> {
    fingerprint: String,
    settings: &'a Settings,
    packages: &'a [PackageNode],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLockGenerator;

impl Generator for JsonLockGenerator {
    fn name(&self) -> &str {
        "json"
    }

    fn emit(&self, plan: &BuildPlan) -> Result<Artifact> {
        let lock = LockFile {
            fingerprint: plan.fingerprint(),
            settings: &plan.settings,
            packages: &plan.nodes,
        };

        let mut content = serde_json::to_string_pretty(&lock).context("Failed to serialize lock file")?;
        content.push('\n');

        Ok(Artifact {
            file_name: LOCK_FILE.to_string(),
            content,
        })
    }
}

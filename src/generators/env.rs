//! `env` generator: POSIX shell exports, meant to be sourced

use std::fmt::Write;

use anyhow::Result;

use super::variables;
use crate::domain::{Artifact, BuildPlan, Generator};

#[derive(Debug, Clone, Copy, Default)]
pub struct EnvGenerator;

/// Single-quotes a value for sh
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

impl Generator for EnvGenerator {
    fn name(&self) -> &str {
        "env"
    }

    fn emit(&self, plan: &BuildPlan) -> Result<Artifact> {
        let mut content = String::from("# Generated by depplan. Source with: . ./depplan.env\n");
        for (name, value) in variables(plan)? {
            writeln!(content, "export {}={}", name, quote(&value))?;
        }

        Ok(Artifact {
            file_name: "depplan.env".to_string(),
            content,
        })
    }
}

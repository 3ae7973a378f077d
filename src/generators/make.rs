//! `make` generator: variables for inclusion from a Makefile

use std::fmt::Write;

use anyhow::Result;

use super::variables;
use crate::domain::{Artifact, BuildPlan, Generator};

#[derive(Debug, Clone, Copy, Default)]
pub struct MakeGenerator;

impl Generator for MakeGenerator {
    fn name(&self) -> &str {
        "make"
    }

    fn emit(&self, plan: &BuildPlan) -> Result<Artifact> {
        let mut content = String::from("# Generated by depplan. Do not edit.\n");
        for (name, value) in variables(plan)? {
            // `$` would start a make expansion
            writeln!(content, "{} := {}", name, value.replace('$', "$$"))?;
        }

        Ok(Artifact {
            file_name: "depplan.mk".to_string(),
            content,
        })
    }
}

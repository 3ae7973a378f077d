//! `cmake` generator: `set()` calls for `include(depplan.cmake)`
//!
//! Space-separated lists from the shared variable set become CMake lists.

use std::fmt::Write;

use anyhow::Result;

use super::variables;
use crate::domain::{Artifact, BuildPlan, Generator};

#[derive(Debug, Clone, Copy, Default)]
pub struct CMakeGenerator;

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
}

impl Generator for CMakeGenerator {
    fn name(&self) -> &str {
        "cmake"
    }

    fn emit(&self, plan: &BuildPlan) -> Result<Artifact> {
        let mut content = String::from("# Generated by depplan. Do not edit.\n");
        for (name, value) in variables(plan)? {
            let value = if name == "DEPPLAN_PACKAGES" || name.ends_with("_REQUIRES") {
                value.split_whitespace().collect::<Vec<_>>().join(";")
            } else {
                value
            };
            writeln!(content, "set({} \"{}\")", name, escape(&value))?;
        }

        Ok(Artifact {
            file_name: "depplan.cmake".to_string(),
            content,
        })
    }
}

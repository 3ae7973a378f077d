//! depplan - resolve dependency manifests into build plans
//!
//! A manifest declares build settings, package requirements (some gated on
//! the target platform), per-package options and the generators to run.
//! depplan expands the requirements through a package provider, applies
//! override precedence, validates options and emits an ordered plan.

pub mod domain;
pub mod storage;
pub mod plugin;
pub mod generators;
pub mod cli;

pub use domain::{BuildPlan, PackageNode, ResolveError, Resolver, Settings};

//! Override & conflict resolution
//!
//! Collapses the competing requests for each package name into one
//! [`PackageNode`]:
//! 1. an `override` request wins and pins every other request to its version;
//! 2. otherwise requests that agree on the version collapse;
//! 3. otherwise the name is a [`ResolveError::VersionConflict`]. There is no
//!    "highest version wins" fallback.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

use super::error::ResolveError;
use super::graph::{Request, RequirementGraph};
use super::plan::PackageNode;

/// One node per package name, versions fixed
#[derive(Debug, Clone, Default)]
pub struct ResolvedGraph {
    nodes: HashMap<String, PackageNode>,

    /// Dependencies before dependents
    order: Vec<String>,

    /// Default option values reported by the provider for each node
    defaults: HashMap<String, BTreeMap<String, serde_json::Value>>,
}

impl ResolvedGraph {
    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PackageNode> {
        self.nodes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Package names with dependencies before dependents
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Default options the provider declared for a package
    pub fn defaults(&self, name: &str) -> Option<&BTreeMap<String, serde_json::Value>> {
        self.defaults.get(name)
    }

    /// Nodes in dependency order
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.order.iter().filter_map(|name| self.nodes.get(name))
    }

    /// Consumes the graph, yielding nodes in dependency order
    pub fn into_nodes(mut self) -> Vec<PackageNode> {
        self.order
            .iter()
            .filter_map(|name| self.nodes.remove(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Picks the surviving request for one package name
fn select<'a>(name: &str, requests: &'a [Request]) -> Result<&'a Request, ResolveError> {
    let overrides: Vec<&Request> = requests.iter().filter(|r| r.spec.is_override()).collect();

    let candidates: Vec<&Request> = if overrides.is_empty() {
        requests.iter().collect()
    } else {
        overrides
    };

    let versions: BTreeSet<&str> = candidates.iter().map(|r| r.spec.version.as_str()).collect();
    if versions.len() > 1 {
        return Err(ResolveError::VersionConflict {
            name: name.to_string(),
            requested_versions: versions.into_iter().map(str::to_string).collect(),
        });
    }

    candidates.first().copied().ok_or_else(|| ResolveError::UnresolvablePackage {
        reference: name.to_string(),
        reason: "no request recorded for package".to_string(),
    })
}

/// Resolves every package in the graph to a single version
pub fn resolve(graph: &RequirementGraph) -> Result<ResolvedGraph, ResolveError> {
    let mut resolved = ResolvedGraph::default();

    for name in graph.package_names() {
        let requests = graph.requests(name);
        let winner = select(name, requests)?;

        for request in requests {
            if request.spec.version != winner.spec.version {
                debug!(
                    package = name,
                    requested = %request.spec.version,
                    pinned = %winner.spec.version,
                    requester = request.requester.as_deref().unwrap_or("manifest"),
                    "request rewritten by override"
                );
            }
        }

        let reference = winner.spec.reference();
        let defaults = graph
            .metadata(&reference)
            .map(|metadata| metadata.options.clone())
            .unwrap_or_default();

        let node = PackageNode {
            name: name.to_string(),
            version: winner.spec.version.clone(),
            channel: winner.spec.channel.clone(),
            options: BTreeMap::new(),
            requires: graph.dependencies(name).into_iter().collect(),
            dependents: graph.dependents(name).into_iter().collect(),
            direct: requests.iter().any(Request::is_root),
        };

        resolved.defaults.insert(name.to_string(), defaults);
        resolved.nodes.insert(name.to_string(), node);
    }

    resolved.order = graph.topological_order()?;
    info!(packages = resolved.len(), "requirements resolved");

    Ok(resolved)
}

//! Requirement graph
//!
//! Expands the manifest's root requirements through the package provider into
//! a directed graph keyed by package name. Edges point from the dependent to
//! its dependency. Every request for a name is kept, at whatever version and
//! from whichever requester, so the resolver can see the competition. Only
//! one reference per name is ever looked up.
//! Uses petgraph for cycle detection and ordering.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

use super::error::ResolveError;
use super::provider::{PackageMetadata, PackageProvider};
use super::requirement::{PackageRef, RequirementSpec};

/// One request for a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub spec: RequirementSpec,

    /// Package that asked for it; `None` for manifest requirements
    pub requester: Option<String>,
}

impl Request {
    pub fn is_root(&self) -> bool {
        self.requester.is_none()
    }
}

/// Multimap of package name to requests, plus the name-level requirement edges
#[derive(Debug, Default)]
pub struct RequirementGraph {
    /// The underlying directed graph
    graph: DiGraph<String, ()>,

    /// Map from package name to node index
    node_map: HashMap<String, NodeIndex>,

    /// Every request per package name, in discovery order
    requests: HashMap<String, Vec<Request>>,

    /// Provider answers, one per looked-up reference
    metadata: HashMap<PackageRef, PackageMetadata>,
}

impl RequirementGraph {
    /// Creates an empty requirement graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands root requirements breadth-first through the provider
    ///
    /// Each package name is looked up once, at its pinned reference: the
    /// first `override` request for the name anywhere in the graph, or else
    /// the first request for it. Only the pinned package's requirements become
    /// edges. Overrides can surface deep in the graph, so expansion repeats
    /// until the set of overrides stops changing.
    pub fn build(
        roots: &[RequirementSpec],
        provider: &dyn PackageProvider,
    ) -> Result<Self, ResolveError> {
        let mut overrides = HashMap::new();
        let mut tried: Vec<HashMap<String, PackageRef>> = Vec::new();

        loop {
            let (graph, failure) = Self::expand(roots, provider, &overrides);
            let discovered = graph.overrides();

            if discovered == overrides {
                if let Some(error) = failure {
                    return Err(error);
                }
                graph.check_acyclic()?;
                return Ok(graph);
            }

            if tried.contains(&discovered) {
                return Err(unstable_overrides(&overrides, &discovered));
            }

            debug!(overrides = discovered.len(), "overrides changed, expanding again");
            tried.push(std::mem::replace(&mut overrides, discovered));
        }
    }

    /// One breadth-first pass with the given override pins
    ///
    /// A failed lookup is held back rather than returned: a later pass may
    /// pin that name elsewhere.
    fn expand(
        roots: &[RequirementSpec],
        provider: &dyn PackageProvider,
        overrides: &HashMap<String, PackageRef>,
    ) -> (Self, Option<ResolveError>) {
        let mut graph = Self::new();
        let mut pins = overrides.clone();
        let mut queue = VecDeque::new();

        for spec in roots {
            graph.request(
                Request {
                    spec: spec.clone(),
                    requester: None,
                },
                &mut pins,
                &mut queue,
            );
        }

        let mut expanded = HashSet::new();
        let mut failure = None;

        while let Some(name) = queue.pop_front() {
            if !expanded.insert(name.clone()) {
                continue;
            }
            let Some(reference) = pins.get(&name).cloned() else {
                continue;
            };

            debug!(package = %reference, "looking up package");
            let metadata = match provider.lookup(&reference) {
                Ok(metadata) => metadata,
                Err(e) => {
                    failure.get_or_insert(ResolveError::UnresolvablePackage {
                        reference: reference.to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for spec in &metadata.requires {
                graph.add_requirement(&name, &spec.name);
                graph.request(
                    Request {
                        spec: spec.clone(),
                        requester: Some(name.clone()),
                    },
                    &mut pins,
                    &mut queue,
                );
            }

            graph.metadata.insert(reference, metadata);
        }

        (graph, failure)
    }

    /// Records a request, pins its name on first sight and queues it
    fn request(
        &mut self,
        request: Request,
        pins: &mut HashMap<String, PackageRef>,
        queue: &mut VecDeque<String>,
    ) {
        let name = request.spec.name.clone();
        pins.entry(name.clone())
            .or_insert_with(|| request.spec.reference());
        self.record(request);
        queue.push_back(name);
    }

    /// First override request per package name
    fn overrides(&self) -> HashMap<String, PackageRef> {
        self.requests
            .iter()
            .filter_map(|(name, requests)| {
                requests
                    .iter()
                    .find(|r| r.spec.is_override())
                    .map(|r| (name.clone(), r.spec.reference()))
            })
            .collect()
    }

    /// Records a request, adding the package node on first sight
    pub fn record(&mut self, request: Request) {
        self.add_package(&request.spec.name);
        self.requests
            .entry(request.spec.name.clone())
            .or_default()
            .push(request);
    }

    /// Adds a package to the graph
    pub fn add_package(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.node_map.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_map.insert(name.to_string(), idx);
        idx
    }

    /// Adds a requirement edge: `dependent` requires `dependency`
    pub fn add_requirement(&mut self, dependent: &str, dependency: &str) {
        let from = self.add_package(dependent);
        let to = self.add_package(dependency);
        self.graph.update_edge(from, to, ());
    }

    /// Fails with the first requirement cycle found, if any
    pub fn check_acyclic(&self) -> Result<(), ResolveError> {
        for component in tarjan_scc(&self.graph) {
            let cyclic = component.len() > 1
                || self.graph.find_edge(component[0], component[0]).is_some();
            if cyclic {
                return Err(ResolveError::CyclicRequirement {
                    cycle: self.cycle_path(&component),
                });
            }
        }
        Ok(())
    }

    /// Walks a strongly connected component until a node repeats
    fn cycle_path(&self, component: &[NodeIndex]) -> Vec<String> {
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let Some(mut current) = component.iter().copied().min_by(|a, b| self.graph[*a].cmp(&self.graph[*b])) else {
            return Vec::new();
        };

        let mut path: Vec<NodeIndex> = Vec::new();
        loop {
            if let Some(start) = path.iter().position(|idx| *idx == current) {
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|idx| self.graph[*idx].clone()).collect();
                cycle.push(self.graph[current].clone());
                return cycle;
            }
            path.push(current);

            let next = self
                .graph
                .neighbors_directed(current, Direction::Outgoing)
                .filter(|idx| members.contains(idx))
                .min_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));

            match next {
                Some(idx) => current = idx,
                None => return path.iter().map(|idx| self.graph[*idx].clone()).collect(),
            }
        }
    }

    /// Returns every request for a package
    pub fn requests(&self, name: &str) -> &[Request] {
        self.requests.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the provider answer for a looked-up reference
    pub fn metadata(&self, reference: &PackageRef) -> Option<&PackageMetadata> {
        self.metadata.get(reference)
    }

    /// Returns the direct dependencies of a package, sorted by name
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Returns the packages that require this one, sorted by name
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<String> {
        let idx = match self.node_map.get(name) {
            Some(idx) => *idx,
            None => return vec![],
        };

        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect();
        names.sort();
        names
    }

    /// Returns all packages with dependencies before dependents
    pub fn topological_order(&self) -> Result<Vec<String>, ResolveError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .rev()
                .filter_map(|idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => {
                let name = self.graph[cycle.node_id()].clone();
                Err(ResolveError::CyclicRequirement {
                    cycle: vec![name.clone(), name],
                })
            }
        }
    }

    /// Package names in discovery order
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    /// Returns true if the graph contains the package
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Returns the number of packages in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }
}

/// Overrides that keep replacing each other between passes
fn unstable_overrides(
    previous: &HashMap<String, PackageRef>,
    current: &HashMap<String, PackageRef>,
) -> ResolveError {
    let mut names: Vec<&String> = previous.keys().chain(current.keys()).collect();
    names.sort();

    let name = names
        .into_iter()
        .find(|name| previous.get(*name) != current.get(*name))
        .cloned()
        .unwrap_or_default();

    let versions: BTreeSet<String> = [previous.get(&name), current.get(&name)]
        .into_iter()
        .flatten()
        .map(|reference| reference.version.clone())
        .collect();

    ResolveError::VersionConflict {
        name,
        requested_versions: versions.into_iter().collect(),
    }
}

//! Dependency graph validation.
//!
//! Walks the declared dependency keys of every binding without running a
//! single factory and reports:
//! - dependencies that are not registered
//! - dependencies the sync path cannot reach (async bindings, `:*`, `:#`)
//! - circular dependencies, group queries expanding to all their members
//!
//! Problems are collected in the order they are encountered rather than
//! stopping at the first one.

use std::collections::HashSet;

use indexmap::IndexMap;
use lambda_ioc_support::rendering::{render_chain, suggest_similar};
use tracing::{debug, instrument, warn};

use crate::binding::{Binding, Producer};
use crate::error::{CircularDependencyError, IocError, NotFoundError, ValidationError};
use crate::key::{KeyQuery, group_label};
use crate::lifetime::Cardinality;

/// Information about a registered binding needed for validation.
#[derive(Debug, Clone)]
pub(crate) struct DependencyInfo {
    /// What this binding produces
    pub key: String,
    /// What its factory needs, in order
    pub dependencies: Vec<String>,
    /// Which resolution path runs it
    pub cardinality: Cardinality,
}

impl DependencyInfo {
    pub fn of<P: Producer>(binding: &Binding<P>) -> Self {
        Self {
            key: binding.key.clone(),
            dependencies: binding.dependencies.clone(),
            cardinality: P::CARDINALITY,
        }
    }
}

/// Validates the dependency graph of a container.
///
/// # Algorithm
/// Depth-first search over declared dependencies, keeping the current
/// path to detect and report cycles.
pub(crate) struct GraphValidator {
    /// All registered bindings, in registration order
    dependencies: IndexMap<String, DependencyInfo>,
    /// Currently being visited (for cycle detection)
    visiting: HashSet<String>,
    /// Already validated
    validated: HashSet<String>,
    /// Current DFS path (for error reporting)
    path: Vec<String>,
    errors: Vec<IocError>,
    suggestion_limit: usize,
}

impl GraphValidator {
    pub fn new(dependencies: IndexMap<String, DependencyInfo>, suggestion_limit: usize) -> Self {
        Self {
            dependencies,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
            errors: Vec::new(),
            suggestion_limit,
        }
    }

    /// Validates every binding.
    ///
    /// # Errors
    /// [`IocError::Validation`] carrying every problem found, in order.
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(mut self) -> Result<(), IocError> {
        let keys: Vec<String> = self.dependencies.keys().cloned().collect();

        debug!(binding_count = keys.len(), "Starting dependency graph validation");

        for key in keys {
            self.validate_key(&key);
        }

        if self.errors.is_empty() {
            debug!("Dependency graph validation passed");
            Ok(())
        } else {
            warn!(errors = self.errors.len(), "Dependency graph validation failed");
            Err(IocError::Validation(ValidationError {
                errors: self.errors,
            }))
        }
    }

    fn validate_key(&mut self, key: &str) {
        if self.validated.contains(key) {
            return;
        }

        if self.visiting.contains(key) {
            let cycle_start = self.path.iter().position(|k| k == key).unwrap_or(0);
            let mut chain = self.path[cycle_start..].to_vec();
            chain.push(key.to_string());

            warn!(cycle = %render_chain(&chain), "Circular dependency detected");
            self.errors
                .push(IocError::CircularDependency(CircularDependencyError { chain }));
            return;
        }

        let Some(info) = self.dependencies.get(key).cloned() else {
            return;
        };

        self.visiting.insert(key.to_string());
        self.path.push(key.to_string());

        for dep in &info.dependencies {
            for target in self.edges(&info, dep) {
                self.validate_key(&target);
            }
        }

        self.path.pop();
        self.visiting.remove(key);
        self.validated.insert(key.to_string());
    }

    /// Bindings reached through `dep`; records an error if there are none
    /// reachable and there should be.
    fn edges(&mut self, consumer: &DependencyInfo, dep: &str) -> Vec<String> {
        match edge(&self.dependencies, consumer, dep) {
            Edge::Targets(targets) => targets,
            Edge::Missing { async_only } => {
                self.missing(consumer, dep, async_only);
                Vec::new()
            }
        }
    }

    fn missing(&mut self, consumer: &DependencyInfo, dep: &str, async_only: bool) {
        let suggestions = if async_only {
            Vec::new()
        } else {
            let available: Vec<&str> = self.dependencies.keys().map(String::as_str).collect();
            suggest_similar(dep, &available, self.suggestion_limit)
        };

        self.errors.push(IocError::NotFound(NotFoundError {
            requested: dep.to_string(),
            required_by: Some(consumer.key.clone()),
            async_only,
            suggestions,
        }));
    }
}

/// Where a declared dependency leads.
enum Edge {
    Targets(Vec<String>),
    /// Unregistered, or not reachable from the consumer's resolution path.
    Missing { async_only: bool },
}

fn edge(
    dependencies: &IndexMap<String, DependencyInfo>,
    consumer: &DependencyInfo,
    dep: &str,
) -> Edge {
    let sync_consumer = consumer.cardinality == Cardinality::Sync;

    match KeyQuery::parse(dep) {
        KeyQuery::GroupLabels(_) => Edge::Targets(Vec::new()),
        KeyQuery::GroupAll(_) | KeyQuery::GroupLabelled(_) if sync_consumer => {
            Edge::Missing { async_only: true }
        }
        KeyQuery::GroupAll(prefix) | KeyQuery::GroupLabelled(prefix) => Edge::Targets(
            dependencies
                .keys()
                .filter(|member| group_label(member, prefix).is_some())
                .cloned()
                .collect(),
        ),
        KeyQuery::Plain(name) => match dependencies.get(name).map(|t| t.cardinality) {
            Some(Cardinality::Async) if sync_consumer => Edge::Missing { async_only: true },
            Some(_) => Edge::Targets(vec![name.to_string()]),
            None => Edge::Missing { async_only: false },
        },
    }
}

/// Finds a dependency path leading from `start` back to itself.
///
/// Returns the cycle as `[start, .., start]`.
pub(crate) fn cycle_through(
    dependencies: &IndexMap<String, DependencyInfo>,
    start: &str,
) -> Option<Vec<String>> {
    let mut path = vec![start.to_string()];
    let mut visited = HashSet::new();
    reaches(dependencies, start, start, &mut path, &mut visited).then_some(path)
}

fn reaches(
    dependencies: &IndexMap<String, DependencyInfo>,
    from: &str,
    target: &str,
    path: &mut Vec<String>,
    visited: &mut HashSet<String>,
) -> bool {
    let Some(info) = dependencies.get(from) else {
        return false;
    };

    for dep in &info.dependencies {
        let Edge::Targets(targets) = edge(dependencies, info, dep) else {
            continue;
        };
        for next in targets {
            if next == target {
                path.push(next);
                return true;
            }
            if !visited.insert(next.clone()) {
                continue;
            }
            path.push(next.clone());
            if reaches(dependencies, &next, target, path, visited) {
                return true;
            }
            path.pop();
        }
    }
    false
}

//! Binding store and resolution engine.
//!
//! The registry keeps two insertion-ordered key spaces, one for sync
//! bindings and one for async bindings, sharing a single set of unique
//! keys. Resolution is stateless: every call carries the chain of keys it
//! is currently producing, which is how cycles are caught.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use lambda_ioc_support::rendering::{render_chain, suggest_similar};
use tracing::{debug, trace, warn};

use crate::binding::{AsyncProducer, Binding, BindingInfo, BoxFuture, Producer, SyncProducer};
use crate::deps::{Deps, Group, LabelledGroup, Labels, Value};
use crate::error::{
    AlreadyRegisteredError, CircularDependencyError, IocError, NotFoundError, Result,
};
use crate::graph::{DependencyInfo, cycle_through};
use crate::key::{KeyQuery, group_label, validate_key};

/// Default number of "did you mean" suggestions attached to errors.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 3;

/// Stores all bindings of one container.
pub(crate) struct Registry {
    sync_bindings: IndexMap<String, Binding<SyncProducer>>,
    async_bindings: IndexMap<String, Binding<AsyncProducer>>,
    suggestion_limit: usize,
    /// Singletons lying on a dependency cycle, with that cycle. Reset on
    /// every insert.
    singleton_cycles: OnceCell<HashMap<String, Vec<String>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sync_bindings: IndexMap::new(),
            async_bindings: IndexMap::new(),
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            singleton_cycles: OnceCell::new(),
        }
    }

    pub fn set_suggestion_limit(&mut self, limit: usize) {
        self.suggestion_limit = limit;
    }

    pub fn suggestion_limit(&self) -> usize {
        self.suggestion_limit
    }

    /// Adds a sync binding.
    ///
    /// # Errors
    /// [`IocError::InvalidKey`] or [`IocError::AlreadyRegistered`]; the
    /// registry is left untouched.
    pub fn insert_sync(&mut self, binding: Binding<SyncProducer>) -> Result<()> {
        self.check_available(&binding.key)?;
        debug!(
            key = %binding.key,
            kind = %binding.producer.kind(),
            lifetime = %binding.producer.lifetime(),
            "Registered sync binding"
        );
        self.sync_bindings.insert(binding.key.clone(), binding);
        self.singleton_cycles.take();
        Ok(())
    }

    /// Adds an async binding. Same rules as [`Registry::insert_sync`].
    pub fn insert_async(&mut self, binding: Binding<AsyncProducer>) -> Result<()> {
        self.check_available(&binding.key)?;
        debug!(
            key = %binding.key,
            lifetime = %binding.producer.lifetime(),
            "Registered async binding"
        );
        self.async_bindings.insert(binding.key.clone(), binding);
        self.singleton_cycles.take();
        Ok(())
    }

    fn check_available(&self, key: &str) -> Result<()> {
        validate_key(key).map_err(IocError::InvalidKey)?;
        if self.contains(key) {
            return Err(IocError::AlreadyRegistered(AlreadyRegisteredError {
                key: key.to_string(),
            }));
        }
        Ok(())
    }

    /// Returns true if `key` is bound in either key space.
    pub fn contains(&self, key: &str) -> bool {
        self.sync_bindings.contains_key(key) || self.async_bindings.contains_key(key)
    }

    /// Returns the number of registered bindings.
    pub fn len(&self) -> usize {
        self.sync_bindings.len() + self.async_bindings.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sync keys, then async keys, each in registration order.
    pub fn keys(&self) -> Vec<&str> {
        self.sync_bindings
            .keys()
            .chain(self.async_bindings.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn sync_len(&self) -> usize {
        self.sync_bindings.len()
    }

    pub fn async_len(&self) -> usize {
        self.async_bindings.len()
    }

    pub fn binding_info(&self, key: &str) -> Option<BindingInfo> {
        self.sync_bindings
            .get(key)
            .map(Binding::info)
            .or_else(|| self.async_bindings.get(key).map(Binding::info))
    }

    /// Dependency edges of every binding, sync first (for validation).
    pub fn dependency_infos(&self) -> IndexMap<String, DependencyInfo> {
        let sync = self.sync_bindings.values().map(DependencyInfo::of);
        let async_ = self.async_bindings.values().map(DependencyInfo::of);
        sync.chain(async_).map(|info| (info.key.clone(), info)).collect()
    }

    // ── Sync resolution ──

    /// Resolves `key` through the synchronous path.
    pub fn resolve(&self, key: &str) -> Result<Value> {
        self.resolve_in(key, &[])
    }

    fn resolve_in(&self, key: &str, chain: &[String]) -> Result<Value> {
        match KeyQuery::parse(key) {
            KeyQuery::GroupLabels(prefix) => Ok(Arc::new(self.group_labels(prefix)) as Value),
            KeyQuery::GroupAll(_) | KeyQuery::GroupLabelled(_) => {
                Err(self.not_found(key, chain.last(), true))
            }
            KeyQuery::Plain(name) => match self.sync_bindings.get(name) {
                Some(binding) => {
                    trace!(key = name, depth = chain.len(), "Resolving");
                    self.produce_sync(binding, chain)
                }
                None => {
                    let async_only = self.async_bindings.contains_key(name);
                    Err(self.not_found(name, chain.last(), async_only))
                }
            },
        }
    }

    fn produce_sync(&self, binding: &Binding<SyncProducer>, chain: &[String]) -> Result<Value> {
        match &binding.producer {
            SyncProducer::Value(value) => Ok(value.clone()),
            SyncProducer::Transient(factory) => {
                let chain = enter(chain, &binding.key)?;
                factory(self.resolve_deps(binding, &chain)?)
            }
            SyncProducer::Singleton { factory, cell } => {
                if let Some(value) = cell.get() {
                    return Ok(value.clone());
                }
                // both must run before the cell is entered: waiting on a cell
                // initialized further down the same cycle never returns
                self.reject_cyclic_singleton(&binding.key)?;
                let chain = enter(chain, &binding.key)?;
                cell.get_or_try_init(|| {
                    let deps = self.resolve_deps(binding, &chain)?;
                    debug!(key = %binding.key, "Computing singleton");
                    factory(deps)
                })
                .cloned()
            }
        }
    }

    fn resolve_deps(&self, binding: &Binding<SyncProducer>, chain: &[String]) -> Result<Deps> {
        let entries = binding
            .dependencies
            .iter()
            .map(|dep| Ok((dep.clone(), self.resolve_in(dep, chain)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Deps::new(&binding.key, entries))
    }

    // ── Async resolution ──

    /// Resolves `key` through the asynchronous path.
    pub fn resolve_async<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Value>> {
        self.resolve_async_in(key, Vec::new())
    }

    fn resolve_async_in<'a>(
        &'a self,
        key: &'a str,
        chain: Vec<String>,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            match KeyQuery::parse(key) {
                KeyQuery::GroupAll(prefix) => {
                    let values: Group = self
                        .group_entries(prefix, &chain)
                        .await?
                        .into_iter()
                        .map(|(_, value)| value)
                        .collect();
                    Ok(Arc::new(values) as Value)
                }
                KeyQuery::GroupLabelled(prefix) => {
                    Ok(Arc::new(self.group_entries(prefix, &chain).await?) as Value)
                }
                KeyQuery::GroupLabels(prefix) => Ok(Arc::new(self.group_labels(prefix)) as Value),
                KeyQuery::Plain(name) => {
                    if let Some(binding) = self.sync_bindings.get(name) {
                        trace!(key = name, depth = chain.len(), "Resolving");
                        return self.produce_sync(binding, &chain);
                    }
                    match self.async_bindings.get(name) {
                        Some(binding) => {
                            trace!(key = name, depth = chain.len(), "Resolving async");
                            self.produce_async(binding, &chain).await
                        }
                        None => Err(self.not_found(name, chain.last(), false)),
                    }
                }
            }
        })
    }

    async fn produce_async(
        &self,
        binding: &Binding<AsyncProducer>,
        chain: &[String],
    ) -> Result<Value> {
        match &binding.producer {
            AsyncProducer::Transient(factory) => {
                let chain = enter(chain, &binding.key)?;
                let deps = self.resolve_deps_async(binding, &chain).await?;
                factory(deps).await
            }
            AsyncProducer::Singleton { factory, cell } => {
                if let Some(value) = cell.get() {
                    return Ok(value.clone());
                }
                self.reject_cyclic_singleton(&binding.key)?;
                let chain = enter(chain, &binding.key)?;
                cell.get_or_try_init(|| async {
                    let deps = self.resolve_deps_async(binding, &chain).await?;
                    debug!(key = %binding.key, "Computing async singleton");
                    factory(deps).await
                })
                .await
                .cloned()
            }
        }
    }

    /// Resolves declared dependencies one after another, in order.
    async fn resolve_deps_async(
        &self,
        binding: &Binding<AsyncProducer>,
        chain: &[String],
    ) -> Result<Deps> {
        let mut entries = Vec::with_capacity(binding.dependencies.len());
        for dep in &binding.dependencies {
            let value = self.resolve_async_in(dep, chain.to_vec()).await?;
            entries.push((dep.clone(), value));
        }
        Ok(Deps::new(&binding.key, entries))
    }

    // ── Groups ──

    /// Resolves every member of `prefix`: sync members first, then async
    /// members, each in registration order.
    pub async fn group_values(&self, prefix: &str) -> Result<Group> {
        let entries = self.group_entries(prefix, &[]).await?;
        Ok(entries.into_iter().map(|(_, value)| value).collect())
    }

    /// Like [`Registry::group_values`], keeping each member's label.
    pub async fn labelled_group_values(&self, prefix: &str) -> Result<LabelledGroup> {
        self.group_entries(prefix, &[]).await
    }

    async fn group_entries(&self, prefix: &str, chain: &[String]) -> Result<LabelledGroup> {
        let mut entries = Vec::new();
        for binding in self.sync_bindings.values() {
            if let Some(label) = group_label(&binding.key, prefix) {
                entries.push((label.to_string(), self.produce_sync(binding, chain)?));
            }
        }
        for binding in self.async_bindings.values() {
            if let Some(label) = group_label(&binding.key, prefix) {
                let value = self.produce_async(binding, chain).await?;
                entries.push((label.to_string(), value));
            }
        }
        trace!(group = prefix, members = entries.len(), "Resolved group");
        Ok(entries)
    }

    /// Labels of `prefix`, sync members first. Never fails.
    pub fn group_labels(&self, prefix: &str) -> Labels {
        self.sync_bindings
            .keys()
            .chain(self.async_bindings.keys())
            .filter_map(|key| group_label(key, prefix))
            .map(str::to_string)
            .collect()
    }

    /// Fails if resolving singleton `key` would lead back to it.
    ///
    /// The resolution chain only sees the current call stack; two callers
    /// initializing two singletons of one cycle would each hold a cell the
    /// other waits on.
    fn reject_cyclic_singleton(&self, key: &str) -> Result<()> {
        let cycles = self.singleton_cycles.get_or_init(|| {
            let graph = self.dependency_infos();
            let sync = self
                .sync_bindings
                .values()
                .filter(|b| matches!(b.producer, SyncProducer::Singleton { .. }))
                .map(|b| b.key.as_str());
            let async_ = self
                .async_bindings
                .values()
                .filter(|b| matches!(b.producer, AsyncProducer::Singleton { .. }))
                .map(|b| b.key.as_str());
            sync.chain(async_)
                .filter_map(|key| Some((key.to_string(), cycle_through(&graph, key)?)))
                .collect()
        });

        match cycles.get(key) {
            Some(cycle) => {
                warn!(cycle = %render_chain(cycle), "Circular dependency detected");
                Err(IocError::CircularDependency(CircularDependencyError {
                    chain: cycle.clone(),
                }))
            }
            None => Ok(()),
        }
    }

    fn not_found(&self, key: &str, required_by: Option<&String>, async_only: bool) -> IocError {
        let suggestions = if async_only {
            Vec::new()
        } else {
            suggest_similar(key, &self.keys(), self.suggestion_limit)
        };

        IocError::NotFound(NotFoundError {
            requested: key.to_string(),
            required_by: required_by.cloned(),
            async_only,
            suggestions,
        })
    }
}

/// Pushes `key` onto the resolution chain, failing if it is already there.
fn enter(chain: &[String], key: &str) -> Result<Vec<String>> {
    if let Some(start) = chain.iter().position(|k| k == key) {
        let mut cycle = chain[start..].to_vec();
        cycle.push(key.to_string());

        warn!(cycle = %render_chain(&cycle), "Circular dependency detected");
        return Err(IocError::CircularDependency(CircularDependencyError {
            chain: cycle,
        }));
    }

    let mut next = Vec::with_capacity(chain.len() + 1);
    next.extend_from_slice(chain);
    next.push(key.to_string());
    Ok(next)
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sync", &self.sync_bindings.values().collect::<Vec<_>>())
            .field("async", &self.async_bindings.values().collect::<Vec<_>>())
            .finish()
    }
}

//! # The Container
//!
//! Registration happens on a [`ContainerBuilder`]; [`close()`] turns it into
//! a read-only [`Container`] sharing the same bindings and memo cells.
//! Both resolve keys lazily, on demand.
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──register_*()──> ContainerBuilder
//!        │                                 │
//!   resolve*()                          close()
//!                                          │
//!                                          ▼
//!                                      Container ──resolve*()
//! ```
//!
//! # Examples
//! ```rust
//! use lambda_ioc_container::prelude::*;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: std::sync::Arc<Database>,
//! }
//!
//! let mut builder = Container::builder();
//! builder
//!     .register_value("db_url", String::from("postgres://localhost"))?
//!     .register_singleton("db", |deps| {
//!         let url = deps.get::<String>(0)?;
//!         Ok(Database { url: url.to_string() })
//!     }, &["db_url"])?
//!     .register_factory("users", |deps| {
//!         Ok(UserService { db: deps.get(0)? })
//!     }, &["db"])?;
//!
//! let container = builder.close();
//! let service = container.resolve::<UserService>("users")?;
//! assert_eq!(service.db.url, "postgres://localhost");
//! # Ok::<(), IocError>(())
//! ```
//!
//! [`close()`]: ContainerBuilder::close

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::binding::{
    AsyncFactoryFn, AsyncProducer, Binding, BindingInfo, SyncFactoryFn, SyncProducer,
};
use crate::deps::{Deps, Group, LabelledGroup, Labels, Value};
use crate::error::Result;
use crate::graph::GraphValidator;
use crate::registry::Registry;
use crate::resolver::{AsyncResolver, Resolver};

// ============================================================
// ContainerBuilder
// ============================================================

/// Registers bindings and resolves them.
///
/// Every `register_*` method validates the key first: on error nothing is
/// registered and the builder stays as it was.
///
/// # Examples
/// ```rust
/// use lambda_ioc_container::prelude::*;
///
/// let mut builder = Container::builder();
/// builder
///     .register_value("a", 2i32)?
///     .register_value("b", 3i32)?
///     .register_factory(
///         "sum",
///         |d| Ok(*d.get::<i32>(0)? + *d.get::<i32>(1)?),
///         &["a", "b"],
///     )?;
/// let container = builder.close();
/// assert_eq!(*container.resolve::<i32>("sum")?, 5);
/// # Ok::<(), IocError>(())
/// ```
pub struct ContainerBuilder {
    registry: Registry,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Maximum number of "did you mean" suggestions attached to
    /// [`NotFound`](crate::IocError::NotFound) errors.
    pub fn suggestion_limit(&mut self, limit: usize) -> &mut Self {
        self.registry.set_suggestion_limit(limit);
        self
    }

    // ── Values ──

    /// Registers a fixed value.
    ///
    /// Every resolution returns the same `Arc`.
    pub fn register_value<V: Any + Send + Sync>(
        &mut self,
        key: &str,
        value: V,
    ) -> Result<&mut Self> {
        self.register_shared(key, Arc::new(value))
    }

    /// Registers an already shared value; resolutions hand out clones of
    /// this very `Arc`.
    pub fn register_shared<V: Any + Send + Sync>(
        &mut self,
        key: &str,
        value: Arc<V>,
    ) -> Result<&mut Self> {
        let binding = Binding::new(key, SyncProducer::Value(value), &[]);
        self.registry.insert_sync(binding)?;
        Ok(self)
    }

    // ── Sync factories ──

    /// Registers a factory invoked on every resolution.
    ///
    /// `dependencies` are resolved in order and handed to the factory as
    /// [`Deps`]. Their count is not checked against what the factory reads.
    pub fn register_factory<T, F>(
        &mut self,
        key: &str,
        factory: F,
        dependencies: &[&str],
    ) -> Result<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(Deps) -> Result<T> + Send + Sync + 'static,
    {
        let producer = SyncProducer::Transient(erase_sync(factory));
        self.registry.insert_sync(Binding::new(key, producer, dependencies))?;
        Ok(self)
    }

    /// Registers a factory invoked at most once; its result is memoized.
    pub fn register_singleton<T, F>(
        &mut self,
        key: &str,
        factory: F,
        dependencies: &[&str],
    ) -> Result<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(Deps) -> Result<T> + Send + Sync + 'static,
    {
        let producer = SyncProducer::singleton(erase_sync(factory));
        self.registry.insert_sync(Binding::new(key, producer, dependencies))?;
        Ok(self)
    }

    // ── Async factories ──

    /// Registers an async factory invoked on every resolution.
    ///
    /// Its dependencies go through the async path, so they may be sync
    /// bindings, async bindings or group queries.
    pub fn register_async_factory<T, F, Fut>(
        &mut self,
        key: &str,
        factory: F,
        dependencies: &[&str],
    ) -> Result<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(Deps) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let producer = AsyncProducer::Transient(erase_async(factory));
        self.registry.insert_async(Binding::new(key, producer, dependencies))?;
        Ok(self)
    }

    /// Registers an async factory invoked at most once; the awaited result
    /// is memoized.
    pub fn register_async_singleton<T, F, Fut>(
        &mut self,
        key: &str,
        factory: F,
        dependencies: &[&str],
    ) -> Result<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(Deps) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let producer = AsyncProducer::singleton(erase_async(factory));
        self.registry.insert_async(Binding::new(key, producer, dependencies))?;
        Ok(self)
    }

    // ── Introspection ──

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.registry.contains(key)
    }

    /// Registered keys: sync bindings first, each kind in registration order.
    pub fn keys(&self) -> Vec<String> {
        self.registry.keys().into_iter().map(str::to_string).collect()
    }

    pub fn binding_info(&self, key: &str) -> Option<BindingInfo> {
        self.registry.binding_info(key)
    }

    /// Checks every declared dependency without running any factory.
    ///
    /// # Errors
    /// [`IocError::Validation`](crate::IocError::Validation) listing missing
    /// keys, keys unreachable from the sync path and cycles, in the order
    /// they were found.
    pub fn validate(&self) -> Result<()> {
        validate(&self.registry)
    }

    // ── Close ──

    /// Makes the container read-only.
    ///
    /// Bindings and memoized singletons carry over unchanged.
    pub fn close(self) -> Container {
        debug!(
            sync = self.registry.sync_len(),
            r#async = self.registry.async_len(),
            "Container closed"
        );
        Container {
            registry: Arc::new(self.registry),
        }
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("sync", &self.registry.sync_len())
            .field("async", &self.registry.async_len())
            .finish()
    }
}

fn erase_sync<T, F>(factory: F) -> SyncFactoryFn
where
    T: Any + Send + Sync,
    F: Fn(Deps) -> Result<T> + Send + Sync + 'static,
{
    Arc::new(move |deps: Deps| Ok(Arc::new(factory(deps)?) as Value))
}

fn erase_async<T, F, Fut>(factory: F) -> AsyncFactoryFn
where
    T: Any + Send + Sync,
    F: Fn(Deps) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move |deps: Deps| {
        let pending = factory(deps);
        Box::pin(async move { pending.await.map(|value| Arc::new(value) as Value) })
    })
}

fn validate(registry: &Registry) -> Result<()> {
    GraphValidator::new(registry.dependency_infos(), registry.suggestion_limit()).validate()
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Read-only, thread-safe container.
///
/// Created by [`ContainerBuilder::close()`]. Cloning is cheap and clones
/// share bindings and memoized singletons.
#[derive(Clone)]
pub struct Container {
    registry: Arc<Registry>,
}

impl Container {
    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.registry.contains(key)
    }

    /// Registered keys: sync bindings first, each kind in registration order.
    pub fn keys(&self) -> Vec<String> {
        self.registry.keys().into_iter().map(str::to_string).collect()
    }

    pub fn binding_info(&self, key: &str) -> Option<BindingInfo> {
        self.registry.binding_info(key)
    }

    /// See [`ContainerBuilder::validate`].
    pub fn validate(&self) -> Result<()> {
        validate(&self.registry)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.registry.len())
            .field("sync", &self.registry.sync_len())
            .field("async", &self.registry.async_len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Resolver impls
// ═══════════════════════════════════════════

impl Resolver for ContainerBuilder {
    fn resolve_value(&self, key: &str) -> Result<Value> {
        self.registry.resolve(key)
    }

    fn group_labels(&self, prefix: &str) -> Labels {
        self.registry.group_labels(prefix)
    }
}

#[async_trait]
impl AsyncResolver for ContainerBuilder {
    async fn resolve_value_async(&self, key: &str) -> Result<Value> {
        self.registry.resolve_async(key).await
    }

    async fn group_values(&self, prefix: &str) -> Result<Group> {
        self.registry.group_values(prefix).await
    }

    async fn labelled_group_values(&self, prefix: &str) -> Result<LabelledGroup> {
        self.registry.labelled_group_values(prefix).await
    }
}

impl Resolver for Container {
    fn resolve_value(&self, key: &str) -> Result<Value> {
        self.registry.resolve(key)
    }

    fn group_labels(&self, prefix: &str) -> Labels {
        self.registry.group_labels(prefix)
    }
}

#[async_trait]
impl AsyncResolver for Container {
    async fn resolve_value_async(&self, key: &str) -> Result<Value> {
        self.registry.resolve_async(key).await
    }

    async fn group_values(&self, prefix: &str) -> Result<Group> {
        self.registry.group_values(prefix).await
    }

    async fn labelled_group_values(&self, prefix: &str) -> Result<LabelledGroup> {
        self.registry.labelled_group_values(prefix).await
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder};
    pub use crate::binding::BindingInfo;
    pub use crate::deps::{Deps, Group, LabelledGroup, Labels, Value};
    pub use crate::error::{IocError, Result};
    pub use crate::lifetime::{BindingKind, Cardinality, Lifetime};
    pub use crate::resolver::{AsyncResolver, Resolver, ResolverApi};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    struct Counter {
        n: u32,
    }

    fn counting_factory(
        counter: &Arc<AtomicU32>,
    ) -> impl Fn(Deps) -> Result<Counter> + Send + Sync + 'static {
        let counter = counter.clone();
        move |_| {
            Ok(Counter {
                n: counter.fetch_add(1, Ordering::SeqCst),
            })
        }
    }

    fn sum_of(deps: &Deps) -> Result<i64> {
        let mut total = 0;
        for i in 0..deps.len() {
            total += *deps.get::<i64>(i)?;
        }
        Ok(total)
    }

    fn expect_not_found(err: IocError) -> crate::error::NotFoundError {
        match err {
            IocError::NotFound(e) => e,
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    // ── values ──

    #[test]
    fn resolve_registered_values() {
        let mut builder = Container::builder();
        builder.register_value("a", 1i32).unwrap().register_value("b", 2i32).unwrap();
        let container = builder.close();

        assert_eq!(*container.resolve::<i32>("a").unwrap(), 1);
        assert_eq!(*container.resolve::<i32>("b").unwrap(), 2);
    }

    #[test]
    fn values_keep_identity() {
        let shared = Arc::new(String::from("v"));
        let mut builder = Container::builder();
        builder
            .register_value("a", vec![42])
            .unwrap()
            .register_shared("s", shared.clone())
            .unwrap();

        let first = builder.resolve::<Vec<i32>>("a").unwrap();
        let second = builder.resolve::<Vec<i32>>("a").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&builder.resolve::<String>("s").unwrap(), &shared));
    }

    // ── factories & singletons ──

    #[test]
    fn resolve_from_factories() {
        struct First {
            a: i64,
        }
        struct Second {
            first: Arc<First>,
        }

        let mut builder = Container::builder();
        builder
            .register_value("a", 1i64)
            .unwrap()
            .register_value("b", 2i64)
            .unwrap()
            .register_factory("sum", |deps| sum_of(&deps), &["a", "b"])
            .unwrap()
            .register_factory("first", |deps| Ok(First { a: *deps.get::<i64>(0)? }), &["a"])
            .unwrap()
            .register_factory("second", |deps| Ok(Second { first: deps.get(0)? }), &["first"])
            .unwrap();
        let container = builder.close();

        assert_eq!(*container.resolve::<i64>("sum").unwrap(), 3);
        assert_eq!(container.resolve::<First>("first").unwrap().a, 1);
        assert_eq!(container.resolve::<Second>("second").unwrap().first.a, 1);
    }

    #[test]
    fn transient_creates_new_each_time() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut builder = Container::builder();
        builder.register_factory("c", counting_factory(&counter), &[]).unwrap();
        let container = builder.close();

        let a = container.resolve::<Counter>("c").unwrap();
        let b = container.resolve::<Counter>("c").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!((a.n, b.n), (0, 1));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn singleton_factory_called_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut builder = Container::builder();
        builder.register_singleton("c", counting_factory(&counter), &[]).unwrap();
        let container = builder.close();

        let a = container.resolve::<Counter>("c").unwrap();
        let b = container.resolve::<Counter>("c").unwrap();
        let c = container.resolve::<Counter>("c").unwrap();
        assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn singleton_does_not_re_resolve_dependencies() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut builder = Container::builder();
        builder
            .register_factory("dep", counting_factory(&counter), &[])
            .unwrap()
            .register_singleton("s", |deps| Ok(deps.get::<Counter>(0)?.n), &["dep"])
            .unwrap();

        builder.resolve::<u32>("s").unwrap();
        builder.resolve::<u32>("s").unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn async_singleton_does_not_re_resolve_dependencies() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut builder = Container::builder();
        builder
            .register_factory("dep", counting_factory(&counter), &[])
            .unwrap()
            .register_async_factory("async_dep", |_| async { Ok(0u32) }, &[])
            .unwrap()
            .register_async_singleton(
                "s",
                |deps| async move { Ok::<_, IocError>(deps.get::<Counter>(0)?.n) },
                &["dep", "async_dep"],
            )
            .unwrap();
        let container = builder.close();

        let first = container.resolve_async::<u32>("s").await.unwrap();
        let second = container.resolve_async::<u32>("s").await.unwrap();
        let third = container.resolve_async::<u32>("s").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second) && Arc::ptr_eq(&second, &third));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(container.binding_info("s").unwrap().resolved);
    }

    #[test]
    fn singleton_memo_survives_close() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut builder = Container::builder();
        builder.register_singleton("s", counting_factory(&counter), &[]).unwrap();

        let before = builder.resolve::<Counter>("s").unwrap();
        builder.register_value("later", 1u8).unwrap();
        let container = builder.close();
        let after = container.resolve::<Counter>("s").unwrap();

        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn singleton_survives_threads() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut builder = Container::builder();
        builder
            .register_singleton(
                "slow",
                {
                    let counter = counter.clone();
                    move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        Ok(Counter { n: 7 })
                    }
                },
                &[],
            )
            .unwrap();
        let container = builder.close();

        let resolved: Vec<Arc<Counter>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| container.resolve::<Counter>("slow").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(resolved.iter().all(|c| Arc::ptr_eq(c, &resolved[0])));
    }

    #[test]
    fn failed_singleton_is_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut builder = Container::builder();
        builder
            .register_singleton(
                "flaky",
                {
                    let attempts = attempts.clone();
                    move |_| match attempts.fetch_add(1, Ordering::SeqCst) {
                        0 => Err(IocError::factory("not yet")),
                        n => Ok(n),
                    }
                },
                &[],
            )
            .unwrap();

        let err = builder.resolve::<u32>("flaky").unwrap_err();
        assert_eq!(err.to_string(), "not yet");
        assert_eq!(*builder.resolve::<u32>("flaky").unwrap(), 1);
        assert_eq!(*builder.resolve::<u32>("flaky").unwrap(), 1);
    }

    // ── async ──

    #[tokio::test]
    async fn resolve_from_async_factories() {
        let mut builder = Container::builder();
        builder
            .register_value("a", 1i64)
            .unwrap()
            .register_value("b", 2i64)
            .unwrap()
            .register_async_factory("sum", |deps| async move { sum_of(&deps) }, &["a", "b"])
            .unwrap();
        let container = builder.close();

        assert_eq!(*container.resolve_async::<i64>("sum").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn async_transient_and_singleton_identity() {
        let mut builder = Container::builder();
        builder
            .register_async_factory("t", |_| async { Ok(Counter { n: 0 }) }, &[])
            .unwrap()
            .register_async_singleton("s", |_| async { Ok(Counter { n: 0 }) }, &[])
            .unwrap();
        let container = builder.close();

        let t1 = container.resolve_async::<Counter>("t").await.unwrap();
        let t2 = container.resolve_async::<Counter>("t").await.unwrap();
        assert!(!Arc::ptr_eq(&t1, &t2));

        let s1 = container.resolve_async::<Counter>("s").await.unwrap();
        let s2 = container.resolve_async::<Counter>("s").await.unwrap();
        assert!(Arc::ptr_eq(&s1, &s2));
    }

    #[tokio::test]
    async fn sync_bindings_resolve_from_async_path() {
        let mut builder = Container::builder();
        builder.register_value("a", 5u8).unwrap();
        assert_eq!(*builder.resolve_async::<u8>("a").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn resolve_with_sync_and_async_dependencies() {
        let mut builder = Container::builder();
        builder
            .register_value("a", 1i64)
            .unwrap()
            .register_value("b", 2i64)
            .unwrap()
            .register_factory("sum", |deps| sum_of(&deps), &["a", "b"])
            .unwrap()
            .register_async_factory(
                "mul",
                |deps| async move {
                    Ok::<_, IocError>(*deps.get::<i64>(0)? * *deps.get::<i64>(1)?)
                },
                &["b", "sum"],
            )
            .unwrap()
            .register_async_factory(
                "combine1",
                |deps| async move {
                    Ok::<_, IocError>(*deps.get::<i64>(0)? / *deps.get::<i64>(1)?)
                },
                &["mul", "a"],
            )
            .unwrap()
            .register_async_factory(
                "combine2",
                |deps| async move {
                    let exp = u32::try_from(*deps.get::<i64>(1)?).map_err(IocError::factory)?;
                    Ok::<_, IocError>(deps.get::<i64>(0)?.pow(exp))
                },
                &["mul", "b"],
            )
            .unwrap();
        let container = builder.close();

        assert_eq!(*container.resolve_async::<i64>("mul").await.unwrap(), 6);
        assert_eq!(*container.resolve_async::<i64>("combine1").await.unwrap(), 6);
        assert_eq!(*container.resolve_async::<i64>("combine2").await.unwrap(), 36);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn async_singleton_computed_once_under_concurrency() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut builder = Container::builder();
        builder
            .register_async_singleton(
                "slow",
                {
                    let counter = counter.clone();
                    move |_| {
                        let n = counter.fetch_add(1, Ordering::SeqCst);
                        async move {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(Counter { n })
                        }
                    }
                },
                &[],
            )
            .unwrap();
        let container = builder.close();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let container = container.clone();
                tokio::spawn(async move { container.resolve_async::<Counter>("slow").await })
            })
            .collect();

        let mut resolved = Vec::new();
        for task in tasks {
            resolved.push(task.await.unwrap().unwrap());
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(resolved[0].n, 0);
        assert!(resolved.iter().all(|c| Arc::ptr_eq(c, &resolved[0])));
    }

    #[tokio::test]
    async fn async_dependencies_resolve_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = Container::builder();
        for key in ["x", "y", "z"] {
            let log = log.clone();
            builder
                .register_async_factory(
                    key,
                    move |deps| {
                        let log = log.clone();
                        async move {
                            log.lock().push(deps.owner().to_string());
                            Ok(())
                        }
                    },
                    &[],
                )
                .unwrap();
        }
        builder
            .register_async_factory(
                "all",
                |deps| async move { Ok::<_, IocError>(deps.len()) },
                &["z", "x", "y"],
            )
            .unwrap();

        assert_eq!(*builder.resolve_async::<usize>("all").await.unwrap(), 3);
        assert_eq!(*log.lock(), vec!["z", "x", "y"]);
    }

    #[tokio::test]
    async fn first_declared_failure_is_reported() {
        let mut builder = Container::builder();
        builder
            .register_async_factory("all", |_| async { Ok(()) }, &["missing_1", "missing_2"])
            .unwrap();

        let err = expect_not_found(builder.resolve_async::<()>("all").await.unwrap_err());
        assert_eq!(err.requested, "missing_1");
        assert_eq!(err.required_by.as_deref(), Some("all"));
    }

    #[tokio::test]
    async fn sync_app_graph_over_async_dependencies() {
        #[derive(Debug)]
        struct DbClient {
            user: String,
        }
        struct WebhookClient {
            url: String,
        }
        struct App1 {
            db: Arc<DbClient>,
            webhook: Arc<WebhookClient>,
        }
        struct App2 {
            app1: Arc<App1>,
        }

        let mut builder = Container::builder();
        builder
            .register_value("db_user", String::from("root"))
            .unwrap()
            .register_value("db_password", String::from("password"))
            .unwrap()
            .register_value("webhook_url", String::from("https://example.com/webhook"))
            .unwrap()
            .register_factory(
                "db_client",
                |deps| Ok(DbClient { user: deps.get::<String>(0)?.to_string() }),
                &["db_user", "db_password"],
            )
            .unwrap()
            .register_singleton(
                "webhook_client",
                |deps| Ok(WebhookClient { url: deps.get::<String>(0)?.to_string() }),
                &["webhook_url"],
            )
            .unwrap()
            .register_async_factory(
                "app1",
                |deps| async move {
                    Ok::<_, IocError>(App1 {
                        db: deps.get(0)?,
                        webhook: deps.get(1)?,
                    })
                },
                &["db_client", "webhook_client"],
            )
            .unwrap()
            .register_async_singleton(
                "app2",
                |deps| async move {
                    Ok::<_, IocError>(App1 {
                        db: deps.get(0)?,
                        webhook: deps.get(1)?,
                    })
                },
                &["db_client", "webhook_client"],
            )
            .unwrap()
            .register_async_factory(
                "app3",
                |deps| async move { Ok::<_, IocError>(App2 { app1: deps.get(0)? }) },
                &["app2"],
            )
            .unwrap()
            .register_async_singleton(
                "app4",
                |deps| async move {
                    Ok::<_, IocError>((deps.get::<App1>(0)?, deps.get::<WebhookClient>(1)?))
                },
                &["app2", "webhook_client"],
            )
            .unwrap();
        let container = builder.close();

        let app1 = container.resolve_async::<App1>("app1").await.unwrap();
        let app2 = container.resolve_async::<App1>("app2").await.unwrap();
        let app3 = container.resolve_async::<App2>("app3").await.unwrap();
        let app4 = container
            .resolve_async::<(Arc<App1>, Arc<WebhookClient>)>("app4")
            .await
            .unwrap();

        assert_eq!(app1.db.user, "root");
        assert_eq!(app2.webhook.url, "https://example.com/webhook");
        assert!(Arc::ptr_eq(&app3.app1, &app2));
        assert!(Arc::ptr_eq(&app4.0, &app2));
        assert!(Arc::ptr_eq(&app4.1, &app1.webhook));
    }

    // ── groups ──

    fn grouped() -> ContainerBuilder {
        let mut builder = Container::builder();
        builder
            .register_value("g1:a", 1i64)
            .unwrap()
            .register_value("g1:b", 2i64)
            .unwrap()
            .register_factory("g1:sum", |deps| sum_of(&deps), &["g1:a", "g1:b"])
            .unwrap()
            .register_value("g2:a", 3i64)
            .unwrap()
            .register_value("g2:b", 4i64)
            .unwrap()
            .register_factory("g2:sum", |deps| sum_of(&deps), &["g2:a", "g2:b"])
            .unwrap();
        builder
    }

    #[tokio::test]
    async fn resolve_groups() {
        let container = grouped().close();

        let g1: Vec<i64> = container
            .resolve_group::<i64>("g1")
            .await
            .unwrap()
            .iter()
            .map(|v| **v)
            .collect();
        assert_eq!(g1, vec![1, 2, 3]);

        let g2: Vec<i64> = container
            .resolve_group::<i64>("g2")
            .await
            .unwrap()
            .iter()
            .map(|v| **v)
            .collect();
        assert_eq!(g2, vec![3, 4, 7]);

        assert!(container.resolve_group::<i64>("g3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_labelled_groups() {
        let container = grouped().close();

        let labelled: Vec<(String, i64)> = container
            .resolve_labelled_group::<i64>("g1")
            .await
            .unwrap()
            .into_iter()
            .map(|(label, v)| (label, *v))
            .collect();
        assert_eq!(
            labelled,
            vec![("a".into(), 1), ("b".into(), 2), ("sum".into(), 3)]
        );
    }

    #[tokio::test]
    async fn group_suffix_queries() {
        let builder = grouped();

        let all = builder.resolve_async::<Group>("g1:*").await.unwrap();
        assert_eq!(all.len(), 3);

        let labelled = builder.resolve_async::<LabelledGroup>("g1:#").await.unwrap();
        assert_eq!(labelled[2].0, "sum");

        let labels = builder.resolve_async::<Labels>("g1:@").await.unwrap();
        assert_eq!(*labels, vec!["a", "b", "sum"]);

        let labels = builder.resolve::<Labels>("g2:@").unwrap();
        assert_eq!(*labels, vec!["a", "b", "sum"]);
        assert_eq!(builder.resolve_group_labels("g2"), vec!["a", "b", "sum"]);
        assert!(builder.resolve_group_labels("nope").is_empty());
    }

    #[test]
    fn group_values_need_the_async_path() {
        let builder = grouped();
        let err = expect_not_found(builder.resolve::<Group>("g1:*").unwrap_err());
        assert!(err.async_only);
    }

    #[tokio::test]
    async fn sync_members_come_before_async_members() {
        let mut builder = Container::builder();
        builder
            .register_async_factory("g:x", |_| async { Ok(1i64) }, &[])
            .unwrap()
            .register_value("g:y", 2i64)
            .unwrap();

        let values: Vec<i64> = builder
            .resolve_group::<i64>("g")
            .await
            .unwrap()
            .iter()
            .map(|v| **v)
            .collect();
        assert_eq!(values, vec![2, 1]);
        assert_eq!(builder.resolve_group_labels("g"), vec!["y", "x"]);
    }

    #[tokio::test]
    async fn shared_prefix_is_not_a_group_member() {
        let mut builder = Container::builder();
        builder
            .register_value("group:a", 1i64)
            .unwrap()
            .register_value("group:b", 2i64)
            .unwrap()
            .register_value("groupedStuff", vec![4, 5, 6])
            .unwrap()
            .register_value("group", 0i64)
            .unwrap();

        assert_eq!(builder.resolve_async::<Group>("group:*").await.unwrap().len(), 2);
        assert_eq!(builder.resolve_labelled_group::<i64>("group").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn groups_as_factory_dependencies() {
        let mut builder = Container::builder();
        builder
            .register_value("g:a", 2i64)
            .unwrap()
            .register_value("g:b", 3i64)
            .unwrap()
            .register_async_factory(
                "sum",
                |deps| async move {
                    let pair = deps.group::<i64>(0)?;
                    Ok::<_, IocError>(*pair[0] + *pair[1])
                },
                &["g:*"],
            )
            .unwrap()
            .register_async_singleton(
                "another_sum",
                |deps| async move {
                    let group = deps.labelled_group::<i64>(0)?;
                    Ok::<_, IocError>(group.iter().map(|(_, v)| **v).sum::<i64>())
                },
                &["g:#"],
            )
            .unwrap();

        assert_eq!(*builder.resolve_async::<i64>("sum").await.unwrap(), 5);
        assert_eq!(*builder.resolve_async::<i64>("another_sum").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn registered_collections_as_dependencies() {
        let mut builder = Container::builder();
        builder
            .register_value("l_1", vec![2i64, 3])
            .unwrap()
            .register_factory(
                "sum",
                |deps| Ok(deps.get::<Vec<i64>>(0)?.iter().sum::<i64>()),
                &["l_1"],
            )
            .unwrap()
            .register_async_factory(
                "a_sum",
                |deps| async move {
                    Ok::<_, IocError>(deps.get::<Vec<i64>>(0)?.iter().sum::<i64>())
                },
                &["l_1"],
            )
            .unwrap();

        assert_eq!(*builder.resolve::<i64>("sum").unwrap(), 5);
        assert_eq!(*builder.resolve_async::<i64>("a_sum").await.unwrap(), 5);
    }

    // ── errors ──

    #[test]
    fn duplicate_registration_fails_across_kinds() {
        let mut builder = Container::builder();
        builder.register_value("a", 1i32).unwrap().register_value("b", 2i32).unwrap();

        assert!(matches!(builder.register_value("a", 1i32), Err(IocError::AlreadyRegistered(_))));
        assert!(matches!(
            builder.register_factory("a", |_| Ok(1i32), &[]),
            Err(IocError::AlreadyRegistered(_))
        ));
        assert!(matches!(
            builder.register_async_factory("a", |_| async { Ok(1i32) }, &[]),
            Err(IocError::AlreadyRegistered(_))
        ));
        assert!(matches!(
            builder.register_singleton("b", |_| Ok(1i32), &[]),
            Err(IocError::AlreadyRegistered(_))
        ));
        assert!(matches!(
            builder.register_async_singleton("b", |_| async { Ok(1i32) }, &[]),
            Err(IocError::AlreadyRegistered(_))
        ));

        assert_eq!(builder.len(), 2);
        assert_eq!(*builder.resolve::<i32>("a").unwrap(), 1);
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let mut builder = Container::builder();
        for key in ["", ":x", ":", "g:", "g:*", "g:#", "g:@"] {
            assert!(
                matches!(builder.register_value(key, 1), Err(IocError::InvalidKey(_))),
                "{key:?}"
            );
            assert!(matches!(
                builder.register_factory(key, |_| Ok(1), &[]),
                Err(IocError::InvalidKey(_))
            ));
            assert!(matches!(
                builder.register_async_factory(key, |_| async { Ok(1) }, &[]),
                Err(IocError::InvalidKey(_))
            ));
            assert!(matches!(
                builder.register_singleton(key, |_| Ok(1), &[]),
                Err(IocError::InvalidKey(_))
            ));
            assert!(matches!(
                builder.register_async_singleton(key, |_| async { Ok(1) }, &[]),
                Err(IocError::InvalidKey(_))
            ));
        }
        assert!(builder.is_empty());
    }

    #[tokio::test]
    async fn resolving_unknown_keys_fails() {
        let mut builder = Container::builder();
        builder.register_value("a", 1i32).unwrap().register_value("b", 2i32).unwrap();
        let container = builder.close();

        expect_not_found(container.resolve::<i32>("c").unwrap_err());
        expect_not_found(container.resolve_async::<i32>("c").await.unwrap_err());
    }

    #[tokio::test]
    async fn sync_path_cannot_reach_async_bindings() {
        let mut builder = Container::builder();
        builder
            .register_async_factory("client", |_| async { Ok(1u8) }, &[])
            .unwrap()
            .register_factory("service", |deps| Ok(*deps.get::<u8>(0)?), &["client"])
            .unwrap();

        assert!(expect_not_found(builder.resolve::<u8>("client").unwrap_err()).async_only);

        let err = expect_not_found(builder.resolve_async::<u8>("service").await.unwrap_err());
        assert_eq!(err.requested, "client");
        assert_eq!(err.required_by.as_deref(), Some("service"));
        assert!(err.async_only);
    }

    #[test]
    fn factory_errors_propagate_unchanged() {
        #[derive(Debug, thiserror::Error)]
        #[error("backend offline")]
        struct Offline;

        let mut builder = Container::builder();
        builder
            .register_factory("backend", |_| -> Result<u8> { Err(IocError::factory(Offline)) }, &[])
            .unwrap()
            .register_factory("frontend", |deps| Ok(*deps.get::<u8>(0)?), &["backend"])
            .unwrap();

        match builder.resolve::<u8>("frontend").unwrap_err() {
            IocError::Factory(source) => assert!(source.downcast_ref::<Offline>().is_some()),
            other => panic!("Expected Factory, got: {other:?}"),
        }
    }

    #[test]
    fn argument_count_is_checked_when_read() {
        let mut builder = Container::builder();
        builder
            .register_value("a", 2i64)
            .unwrap()
            .register_value("b", 3i64)
            .unwrap()
            .register_factory(
                "too_many",
                |deps| Ok(*deps.get::<i64>(0)? + *deps.get::<i64>(1)?),
                &["a", "b", "a"],
            )
            .unwrap()
            .register_factory(
                "too_few",
                |deps| Ok(*deps.get::<i64>(0)? + *deps.get::<i64>(1)?),
                &["a"],
            )
            .unwrap();

        assert_eq!(*builder.resolve::<i64>("too_many").unwrap(), 5);
        assert!(matches!(
            builder.resolve::<i64>("too_few"),
            Err(IocError::MissingArgument { index: 1, available: 1, .. })
        ));
    }

    #[test]
    fn type_mismatch_names_the_key() {
        let mut builder = Container::builder();
        builder.register_value("a", 1i32).unwrap();

        match builder.resolve::<String>("a").unwrap_err() {
            IocError::TypeMismatch { key, expected } => {
                assert_eq!(key, "a");
                assert_eq!(expected, "String");
            }
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
    }

    // ── cycles ──

    #[test]
    fn sync_cycle_is_detected() {
        let mut builder = Container::builder();
        builder
            .register_factory("a", |deps| Ok(*deps.get::<u8>(0)?), &["b"])
            .unwrap()
            .register_factory("b", |deps| Ok(*deps.get::<u8>(0)?), &["a"])
            .unwrap();

        match builder.resolve::<u8>("a").unwrap_err() {
            IocError::CircularDependency(err) => assert_eq!(err.chain, vec!["a", "b", "a"]),
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    fn slow_cycle() -> ContainerBuilder {
        let mut builder = Container::builder();
        builder
            .register_factory(
                "slow",
                |_| {
                    std::thread::sleep(Duration::from_millis(100));
                    Ok(0u8)
                },
                &[],
            )
            .unwrap()
            .register_singleton("a", |deps| Ok(*deps.get::<u8>(1)?), &["slow", "b"])
            .unwrap()
            .register_singleton("b", |deps| Ok(*deps.get::<u8>(1)?), &["slow", "a"])
            .unwrap();
        builder
    }

    #[test]
    fn singleton_cycle_fails_across_threads() {
        let container = slow_cycle().close();

        let (a, b) = std::thread::scope(|s| {
            let a = s.spawn(|| container.resolve::<u8>("a"));
            let b = s.spawn(|| container.resolve::<u8>("b"));
            (a.join().unwrap(), b.join().unwrap())
        });

        match (a.unwrap_err(), b.unwrap_err()) {
            (IocError::CircularDependency(a), IocError::CircularDependency(b)) => {
                assert_eq!(a.chain, vec!["a", "b", "a"]);
                assert_eq!(b.chain, vec!["b", "a", "b"]);
            }
            other => panic!("Expected two CircularDependency errors, got: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_singleton_cycle_fails_across_tasks() {
        let mut builder = Container::builder();
        builder
            .register_async_factory(
                "slow",
                |_| async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(0u8)
                },
                &[],
            )
            .unwrap()
            .register_async_singleton(
                "a",
                |deps| async move { Ok::<_, IocError>(*deps.get::<u8>(1)?) },
                &["slow", "b"],
            )
            .unwrap()
            .register_async_singleton(
                "b",
                |deps| async move { Ok::<_, IocError>(*deps.get::<u8>(1)?) },
                &["slow", "a"],
            )
            .unwrap();
        let container = builder.close();

        let tasks: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|key| {
                let container = container.clone();
                tokio::spawn(async move { container.resolve_async::<u8>(key).await })
            })
            .collect();

        for task in tasks {
            let resolved = tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("resolution stalled")
                .unwrap();
            assert!(matches!(resolved, Err(IocError::CircularDependency(_))));
        }
    }

    #[tokio::test]
    async fn async_singleton_cycle_is_detected() {
        let mut builder = Container::builder();
        builder
            .register_async_singleton(
                "a",
                |deps| async move { Ok::<_, IocError>(*deps.get::<u8>(0)?) },
                &["b"],
            )
            .unwrap()
            .register_async_factory(
                "b",
                |deps| async move { Ok::<_, IocError>(*deps.get::<u8>(0)?) },
                &["a"],
            )
            .unwrap();

        match builder.resolve_async::<u8>("a").await.unwrap_err() {
            IocError::CircularDependency(err) => assert_eq!(err.chain, vec!["a", "b", "a"]),
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn group_member_depending_on_its_group_is_a_cycle() {
        let mut builder = Container::builder();
        builder
            .register_value("g:a", 1i64)
            .unwrap()
            .register_async_factory(
                "g:total",
                |deps| async move { Ok::<_, IocError>(deps.group::<i64>(0)?.len()) },
                &["g:*"],
            )
            .unwrap();

        assert!(matches!(
            builder.resolve_async::<usize>("g:total").await,
            Err(IocError::CircularDependency(_))
        ));
    }

    // ── validation & introspection ──

    #[test]
    fn validate_collects_problems_in_order() {
        let mut builder = Container::builder();
        builder
            .register_value("db", 1u8)
            .unwrap()
            .register_factory("repo", |_| Ok(()), &["dbb"])
            .unwrap()
            .register_factory("loop", |_| Ok(()), &["loop"])
            .unwrap()
            .register_async_factory("svc", |_| async { Ok(()) }, &["repo", "cache"])
            .unwrap();

        match builder.validate().unwrap_err() {
            IocError::Validation(err) => {
                assert_eq!(err.errors.len(), 3);
                let first = expect_not_found(err.errors.into_iter().next().unwrap());
                assert_eq!(first.requested, "dbb");
                assert_eq!(first.suggestions, vec!["db"]);
            }
            other => panic!("Expected Validation, got: {other:?}"),
        }
    }

    #[test]
    fn validate_passes_on_sound_graph() {
        let container = grouped().close();
        assert!(container.validate().is_ok());
    }

    #[test]
    fn introspection() {
        let mut builder = Container::builder();
        builder
            .register_async_singleton("s", |_| async { Ok(1u8) }, &["a"])
            .unwrap()
            .register_value("a", 1u8)
            .unwrap();
        let container = builder.close();

        assert_eq!(container.len(), 2);
        assert!(container.contains("s"));
        assert_eq!(container.keys(), vec!["a", "s"]);

        let info = container.binding_info("s").unwrap();
        assert_eq!(info.kind, BindingKind::Factory);
        assert_eq!(info.cardinality, Cardinality::Async);
        assert_eq!(info.lifetime, Lifetime::Singleton);
        assert_eq!(info.dependencies, vec!["a"]);
        assert!(!info.resolved);
        assert!(container.binding_info("missing").is_none());

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("registered: 2"));
    }
}

//! Binding records: what a key produces and how.
//!
//! A binding owns its factory and, for singletons, the memo cell the
//! factory result is stored in. Sync and async bindings are distinct types
//! so each key space can only hold the producers it knows how to run.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::deps::{Deps, Value};
use crate::error::Result;
use crate::lifetime::{BindingKind, Cardinality, Lifetime};

/// Owned, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased synchronous factory.
///
/// `Arc` so a factory can be shared with the tasks resolving it.
pub type SyncFactoryFn = Arc<dyn Fn(Deps) -> Result<Value> + Send + Sync>;

/// Type-erased asynchronous factory.
pub type AsyncFactoryFn = Arc<dyn Fn(Deps) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// How a synchronous binding produces its value.
pub(crate) enum SyncProducer {
    /// Fixed value, handed out as is.
    Value(Value),
    Transient(SyncFactoryFn),
    Singleton {
        factory: SyncFactoryFn,
        cell: once_cell::sync::OnceCell<Value>,
    },
}

/// How an asynchronous binding produces its value.
pub(crate) enum AsyncProducer {
    Transient(AsyncFactoryFn),
    Singleton {
        factory: AsyncFactoryFn,
        /// Holds the awaited value, not the pending future.
        cell: tokio::sync::OnceCell<Value>,
    },
}

impl SyncProducer {
    pub(crate) fn singleton(factory: SyncFactoryFn) -> Self {
        SyncProducer::Singleton {
            factory,
            cell: once_cell::sync::OnceCell::new(),
        }
    }
}

impl AsyncProducer {
    pub(crate) fn singleton(factory: AsyncFactoryFn) -> Self {
        AsyncProducer::Singleton {
            factory,
            cell: tokio::sync::OnceCell::new(),
        }
    }
}

/// Descriptor shared by both producer kinds.
pub(crate) trait Producer {
    const CARDINALITY: Cardinality;

    fn kind(&self) -> BindingKind;
    fn lifetime(&self) -> Lifetime;
    /// Whether a singleton value has already been computed.
    fn is_resolved(&self) -> bool;
}

impl Producer for SyncProducer {
    const CARDINALITY: Cardinality = Cardinality::Sync;

    fn kind(&self) -> BindingKind {
        match self {
            SyncProducer::Value(_) => BindingKind::Value,
            _ => BindingKind::Factory,
        }
    }

    fn lifetime(&self) -> Lifetime {
        match self {
            SyncProducer::Transient(_) => Lifetime::Transient,
            _ => Lifetime::Singleton,
        }
    }

    fn is_resolved(&self) -> bool {
        match self {
            SyncProducer::Value(_) => true,
            SyncProducer::Transient(_) => false,
            SyncProducer::Singleton { cell, .. } => cell.get().is_some(),
        }
    }
}

impl Producer for AsyncProducer {
    const CARDINALITY: Cardinality = Cardinality::Async;

    fn kind(&self) -> BindingKind {
        BindingKind::Factory
    }

    fn lifetime(&self) -> Lifetime {
        match self {
            AsyncProducer::Transient(_) => Lifetime::Transient,
            AsyncProducer::Singleton { .. } => Lifetime::Singleton,
        }
    }

    fn is_resolved(&self) -> bool {
        match self {
            AsyncProducer::Transient(_) => false,
            AsyncProducer::Singleton { cell, .. } => cell.initialized(),
        }
    }
}

/// Registration entry for a single key.
pub(crate) struct Binding<P> {
    pub key: String,
    pub dependencies: Vec<String>,
    pub producer: P,
}

impl<P: Producer> Binding<P> {
    pub fn new(key: &str, producer: P, dependencies: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            producer,
        }
    }

    pub fn info(&self) -> BindingInfo {
        BindingInfo {
            key: self.key.clone(),
            kind: self.producer.kind(),
            cardinality: P::CARDINALITY,
            lifetime: self.producer.lifetime(),
            dependencies: self.dependencies.clone(),
            resolved: self.producer.is_resolved(),
        }
    }
}

impl<P: Producer> fmt::Debug for Binding<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("kind", &self.producer.kind())
            .field("cardinality", &P::CARDINALITY)
            .field("lifetime", &self.producer.lifetime())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Public description of a registered binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    pub key: String,
    pub kind: BindingKind,
    pub cardinality: Cardinality,
    pub lifetime: Lifetime,
    /// Declared dependency keys, in order.
    pub dependencies: Vec<String>,
    /// `true` for values and for singletons whose value is memoized.
    pub resolved: bool,
}

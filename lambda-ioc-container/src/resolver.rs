//! Resolution surface shared by [`ContainerBuilder`] and [`Container`].
//!
//! [`Resolver`] and [`AsyncResolver`] are object safe and work with
//! type-erased [`Value`]s; [`ResolverApi`] adds the typed helpers on top and
//! is implemented for every async resolver.
//!
//! [`ContainerBuilder`]: crate::container::ContainerBuilder
//! [`Container`]: crate::container::Container

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::deps::{Group, LabelledGroup, Labels, Value, downcast, downcast_group, downcast_labelled};
use crate::error::Result;

/// Synchronous, type-erased resolution.
pub trait Resolver: Send + Sync {
    /// Resolves `key` through the sync path.
    ///
    /// Plain keys are looked up among sync bindings only; `"group:@"`
    /// enumerates labels. `"group:*"` and `"group:#"` need the async path.
    fn resolve_value(&self, key: &str) -> Result<Value>;

    /// Labels of every member of `prefix`. Unknown groups are empty.
    fn group_labels(&self, prefix: &str) -> Labels;
}

/// Asynchronous, type-erased resolution.
#[async_trait]
pub trait AsyncResolver: Resolver {
    /// Resolves `key` through the async path: group queries, then sync
    /// bindings, then async bindings.
    async fn resolve_value_async(&self, key: &str) -> Result<Value>;

    /// Every value of group `prefix`, sync members first.
    async fn group_values(&self, prefix: &str) -> Result<Group>;

    /// Every `(label, value)` pair of group `prefix`, sync members first.
    async fn labelled_group_values(&self, prefix: &str) -> Result<LabelledGroup>;
}

/// Typed resolution helpers.
///
/// ```rust
/// use lambda_ioc_container::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let mut builder = Container::builder();
/// builder
///     .register_value("g:a", 2i32)?
///     .register_value("g:b", 3i32)?;
/// let container = builder.close();
///
/// let values = container.resolve_group::<i32>("g").await?;
/// assert_eq!(values.iter().map(|v| **v).sum::<i32>(), 5);
/// assert_eq!(container.resolve_group_labels("g"), vec!["a", "b"]);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ResolverApi: AsyncResolver {
    /// Resolves `key` synchronously and downcasts it to `T`.
    fn resolve<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        downcast(key, self.resolve_value(key)?)
    }

    /// Resolves `key` asynchronously and downcasts it to `T`.
    async fn resolve_async<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        let value = self.resolve_value_async(key).await?;
        downcast(key, value)
    }

    /// Resolves every member of `prefix` as `T`.
    async fn resolve_group<T: Any + Send + Sync>(&self, prefix: &str) -> Result<Vec<Arc<T>>> {
        let group = self.group_values(prefix).await?;
        downcast_group(prefix, &group)
    }

    /// Resolves every member of `prefix` as `T`, with its label.
    async fn resolve_labelled_group<T: Any + Send + Sync>(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, Arc<T>)>> {
        let group = self.labelled_group_values(prefix).await?;
        downcast_labelled(prefix, &group)
    }

    /// Labels of group `prefix`. Never fails.
    fn resolve_group_labels(&self, prefix: &str) -> Labels {
        self.group_labels(prefix)
    }
}

impl<R: AsyncResolver + ?Sized> ResolverApi for R {}

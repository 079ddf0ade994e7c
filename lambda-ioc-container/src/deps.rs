//! Resolved values and the positional dependency accessor handed to
//! factories.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use lambda_ioc_support::rendering::shorten_type_name;

use crate::error::{IocError, Result};

/// A type-erased resolved value.
///
/// Resolving a value or singleton twice yields the same `Arc`
/// (`Arc::ptr_eq` holds); transient factories yield fresh ones.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Result of a `"group:*"` query.
pub type Group = Vec<Value>;

/// Result of a `"group:#"` query.
pub type LabelledGroup = Vec<(String, Value)>;

/// Result of a `"group:@"` query.
pub type Labels = Vec<String>;

/// Downcasts a resolved value, naming `key` in the error.
pub fn downcast<T: Any + Send + Sync>(key: &str, value: Value) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| IocError::TypeMismatch {
        key: key.to_string(),
        expected: shorten_type_name(type_name::<T>()),
    })
}

pub(crate) fn downcast_group<T: Any + Send + Sync>(
    key: &str,
    group: &[Value],
) -> Result<Vec<Arc<T>>> {
    group
        .iter()
        .map(|value| downcast::<T>(key, value.clone()))
        .collect()
}

pub(crate) fn downcast_labelled<T: Any + Send + Sync>(
    key: &str,
    group: &[(String, Value)],
) -> Result<Vec<(String, Arc<T>)>> {
    group
        .iter()
        .map(|(label, value)| Ok((label.clone(), downcast::<T>(key, value.clone())?)))
        .collect()
}

/// The resolved dependencies of one factory invocation, in declared order.
///
/// ```rust
/// use lambda_ioc_container::prelude::*;
///
/// let mut builder = Container::builder();
/// builder
///     .register_value("a", 2i32)?
///     .register_value("b", 3i32)?
///     .register_factory("sum", |deps: Deps| {
///         Ok(*deps.get::<i32>(0)? + *deps.get::<i32>(1)?)
///     }, &["a", "b"])?;
///
/// assert_eq!(*builder.resolve::<i32>("sum")?, 5);
/// # Ok::<(), IocError>(())
/// ```
pub struct Deps {
    owner: String,
    entries: Vec<(String, Value)>,
}

impl Deps {
    pub(crate) fn new(owner: &str, entries: Vec<(String, Value)>) -> Self {
        Self {
            owner: owner.to_string(),
            entries,
        }
    }

    /// Key of the binding being constructed.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Number of resolved dependencies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared key of dependency `index`.
    pub fn key(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(key, _)| key.as_str())
    }

    /// Untyped dependency `index`.
    ///
    /// # Errors
    /// [`IocError::MissingArgument`] if fewer dependencies were declared.
    pub fn value(&self, index: usize) -> Result<&Value> {
        self.entries
            .get(index)
            .map(|(_, value)| value)
            .ok_or_else(|| IocError::MissingArgument {
                key: self.owner.clone(),
                index,
                available: self.entries.len(),
            })
    }

    /// Dependency `index`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        let value = self.value(index)?.clone();
        downcast(self.dep_key(index), value)
    }

    /// Dependency `index` declared as `"group:*"`, each member downcast to `T`.
    pub fn group<T: Any + Send + Sync>(&self, index: usize) -> Result<Vec<Arc<T>>> {
        let group = self.get::<Group>(index)?;
        downcast_group(self.dep_key(index), &group)
    }

    /// Dependency `index` declared as `"group:#"`, values downcast to `T`.
    pub fn labelled_group<T: Any + Send + Sync>(
        &self,
        index: usize,
    ) -> Result<Vec<(String, Arc<T>)>> {
        let group = self.get::<LabelledGroup>(index)?;
        downcast_labelled(self.dep_key(index), &group)
    }

    /// Dependency `index` declared as `"group:@"`.
    pub fn labels(&self, index: usize) -> Result<Labels> {
        Ok(self.get::<Labels>(index)?.as_ref().clone())
    }

    /// Iterates over `(declared key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    fn dep_key(&self, index: usize) -> &str {
        self.key(index).unwrap_or(&self.owner)
    }
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deps")
            .field("owner", &self.owner)
            .field("keys", &self.entries.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

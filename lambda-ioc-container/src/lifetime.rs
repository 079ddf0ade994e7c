//! Binding descriptors: how long a value lives, how it is produced and
//! whether producing it has to be awaited.
//!
//! - [`Lifetime::Singleton`]: computed once, then memoized
//! - [`Lifetime::Transient`]: a fresh value on every resolution
use std::fmt;

/// Defines whether a resolved value is memoized by its binding.
///
/// # Examples
/// ```
/// use lambda_ioc_container::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton.is_cached());
/// assert!(!Lifetime::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One value per binding.
    ///
    /// Registered values and singleton factories. The factory runs on the
    /// first resolution; every later resolution returns the same `Arc`.
    Singleton,

    /// New value on every resolution.
    ///
    /// The factory runs again, with freshly resolved dependencies, each
    /// time the key is resolved.
    Transient,
}

impl Lifetime {
    /// Returns `true` if resolutions share one value.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "Singleton"),
            Lifetime::Transient => write!(f, "Transient"),
        }
    }
}

/// Whether a binding produces its value immediately or through a future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Resolvable from both `resolve` and `resolve_async`.
    Sync,
    /// Resolvable from `resolve_async` only.
    Async,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Sync => write!(f, "Sync"),
            Cardinality::Async => write!(f, "Async"),
        }
    }
}

/// How a binding was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// A fixed value, handed out as is.
    Value,
    /// A factory invoked with its resolved dependencies.
    Factory,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Value => write!(f, "Value"),
            BindingKind::Factory => write!(f, "Factory"),
        }
    }
}

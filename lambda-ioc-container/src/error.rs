//! Error types for lambda-ioc container operations.
//!
//! Every error names the offending key and, where it helps, carries a
//! hint about what to change.

use std::fmt;

use lambda_ioc_support::rendering::{render_chain, render_key_list};

/// Boxed error produced by user factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all lambda-ioc operations.
#[derive(Debug, thiserror::Error)]
pub enum IocError {
    /// The key cannot be used for a binding.
    #[error("{}", .0)]
    InvalidKey(InvalidKeyError),

    /// The key is already taken, in either the sync or the async key space.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// Requested dependency was never registered.
    #[error("{}", .0)]
    NotFound(NotFoundError),

    /// A binding (transitively) depends on itself.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A resolved value is not of the requested type.
    #[error("Type mismatch for {key:?}: expected {expected}")]
    TypeMismatch { key: String, expected: String },

    /// A factory asked for a dependency position it was not given.
    #[error(
        "Factory for {key:?} asked for dependency #{index}, but only {available} were declared"
    )]
    MissingArgument {
        key: String,
        index: usize,
        available: usize,
    },

    /// Error raised by a user factory. Propagated unchanged.
    #[error("{0}")]
    Factory(#[source] BoxError),

    /// Several independent problems found by a validation pass.
    #[error("{}", .0)]
    Validation(ValidationError),
}

impl IocError {
    /// Wraps an arbitrary error raised inside a factory.
    ///
    /// ```
    /// use lambda_ioc_container::IocError;
    ///
    /// let err = IocError::factory("connection refused");
    /// assert_eq!(err.to_string(), "connection refused");
    /// ```
    pub fn factory(err: impl Into<BoxError>) -> Self {
        IocError::Factory(err.into())
    }

    /// The key this error is about, if it concerns a single key.
    pub fn key(&self) -> Option<&str> {
        match self {
            IocError::InvalidKey(e) => Some(&e.key),
            IocError::AlreadyRegistered(e) => Some(&e.key),
            IocError::NotFound(e) => Some(&e.requested),
            IocError::TypeMismatch { key, .. } | IocError::MissingArgument { key, .. } => {
                Some(key)
            }
            IocError::CircularDependency(_) | IocError::Factory(_) | IocError::Validation(_) => {
                None
            }
        }
    }
}

/// Why a key was rejected at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidKeyReason {
    Empty,
    LeadingSeparator,
    ReservedSuffix,
}

impl fmt::Display for InvalidKeyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidKeyReason::Empty => write!(f, "keys cannot be empty"),
            InvalidKeyReason::LeadingSeparator => write!(f, "keys cannot start with ':'"),
            InvalidKeyReason::ReservedSuffix => {
                write!(f, "keys cannot end with ':', ':*', ':#' or ':@'")
            }
        }
    }
}

/// Error when a key is not usable for a binding.
#[derive(Debug)]
pub struct InvalidKeyError {
    pub key: String,
    pub reason: InvalidKeyReason,
}

impl fmt::Display for InvalidKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid dependency key {:?}: {}", self.key, self.reason)?;
        if self.reason == InvalidKeyReason::ReservedSuffix {
            write!(
                f,
                "\n  Hint: ':*', ':#' and ':@' are queries, register members as \"group:label\""
            )?;
        }
        Ok(())
    }
}

/// Error when trying to register a key that already exists.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub key: String,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency already registered: {:?}", self.key)?;
        write!(
            f,
            "\n  Hint: keys are unique across values, factories and singletons, sync or async"
        )
    }
}

/// Error when a dependency was not registered.
#[derive(Debug)]
pub struct NotFoundError {
    /// The key that was requested.
    pub requested: String,
    /// The binding whose factory needed it, if any.
    pub required_by: Option<String>,
    /// The key exists, but only as an async binding (or async-only group
    /// query) and was requested from the sync path.
    pub async_only: bool,
    /// Registered keys that look similar.
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency {:?} not found", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent:?}")?;
        }

        if self.async_only {
            write!(
                f,
                "\n  Hint: resolve it with resolve_async or from an async factory"
            )?;
        } else if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of: {}", render_key_list(&self.suggestions))?;
        }

        Ok(())
    }
}

/// Error when a circular dependency is detected.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The keys forming the cycle, first and last being the same key.
    pub chain: Vec<String>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))
    }
}

/// Aggregate of independent errors, kept in the order they were found.
#[derive(Debug)]
pub struct ValidationError {
    pub errors: Vec<IocError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Container validation failed with {} error(s):", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            let text = err.to_string().replace('\n', "\n     ");
            write!(f, "\n  {}. {text}", i + 1)?;
        }
        Ok(())
    }
}

/// Convenient Result type for lambda-ioc operations.
pub type Result<T> = std::result::Result<T, IocError>;

//! Core container implementation for lambda-ioc.
//!
//! Bindings are registered under string keys on a [`ContainerBuilder`] and
//! produced lazily on resolution. Keys of the form `"group:label"` form
//! groups that can be queried as a whole with `"group:*"`, `"group:#"` and
//! `"group:@"`.

pub mod binding;
pub mod container;
pub mod deps;
pub mod error;
pub(crate) mod graph;
pub mod key;
pub mod lifetime;
pub(crate) mod registry;
pub mod resolver;

pub use binding::BindingInfo;
pub use container::{Container, ContainerBuilder, prelude};
pub use deps::{Deps, Group, LabelledGroup, Labels, Value};
pub use error::{IocError, Result};
pub use key::KeyQuery;
pub use lifetime::{BindingKind, Cardinality, Lifetime};
pub use registry::DEFAULT_SUGGESTION_LIMIT;
pub use resolver::{AsyncResolver, Resolver, ResolverApi};

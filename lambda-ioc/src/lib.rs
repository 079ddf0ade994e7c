//! # lambda-ioc: a lazy, string-keyed dependency injection container
//!
//! Values and factories are registered under string keys together with the
//! keys they depend on. Nothing is built until it is asked for.
//!
//! ```rust
//! use lambda_ioc::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let mut builder = lambda_ioc::create_container();
//! builder
//!     .register_value("a", 2i64)?
//!     .register_value("b", 3i64)?
//!     .register_factory(
//!         "sum",
//!         |deps| Ok(*deps.get::<i64>(0)? + *deps.get::<i64>(1)?),
//!         &["a", "b"],
//!     )?
//!     .register_value("g:a", 2i64)?
//!     .register_value("g:b", 3i64)?;
//! let container = builder.close();
//!
//! assert_eq!(*container.resolve::<i64>("sum")?, 5);
//!
//! let total: i64 = container.resolve_group::<i64>("g").await?.iter().map(|v| **v).sum();
//! assert_eq!(total, 5);
//! # Ok(())
//! # }
//! ```

pub use lambda_ioc_container::*;
pub use lambda_ioc_support::*;

/// Creates an empty, open container.
pub fn create_container() -> ContainerBuilder {
    Container::builder()
}

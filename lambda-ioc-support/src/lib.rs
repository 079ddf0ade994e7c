//! # lambda-ioc support
//!
//! Shared utilities for the lambda-ioc crates.
//!
//! This crate provides:
//! - Text rendering for error messages (dependency chains, type names)
//! - "Did you mean?" suggestions for mistyped binding keys

pub mod rendering;

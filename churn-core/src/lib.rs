//! Core types and caching primitives for churn data loading
//!
//! This crate provides the pieces the loading services are built from: the
//! shared error type, read-only settings and the environment context that
//! every log event carries, the in-memory [`Table`] handle, a single-flight
//! cache and the instrumented memoizer built on it, and artifact file I/O.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod io;
pub mod logging;
pub mod memo;
pub mod settings;
pub mod table;

// Re-export key types for convenience
pub use cache::{CacheEntry, CacheStats, FlightCache, Lookup};
pub use error::{Error, ErrorKind, Result};
pub use memo::{instrumented, memoize, CacheKey, Memoized, DATA_LOAD, MODEL_LOAD};
pub use settings::{DataPaths, EnvironmentContext, Settings};
pub use table::Table;

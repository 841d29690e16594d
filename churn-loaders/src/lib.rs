//! Dataset and model loading services for churn analysis
//!
//! This crate builds the two loading services on top of `churn-core`:
//! [`DatasetLoader`] for the memoized CSV datasets and the stratified
//! splitter, and [`ModelStore`] for disk-backed, cached model artifacts.

#![warn(missing_docs)]

mod error;

pub mod csv;
pub mod data_loader;
pub mod model_store;
pub mod splitter;

pub use data_loader::{DatasetLoader, DEFAULT_PROCESSED_FILE};
pub use error::{Error, ErrorKind, Result};
pub use model_store::{ModelStore, ARTIFACT_EXTENSION, MODEL_SAVE};
pub use splitter::{get_splits, SplitOptions, Splits};

// Re-export core types
pub use churn_core::{DataPaths, EnvironmentContext, Settings, Table};

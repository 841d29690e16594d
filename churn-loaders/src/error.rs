//! Error handling for the loading services
//!
//! The services report through the core error type so callers match on a
//! single [`ErrorKind`]; this module adds the mapping from reader errors.

use std::path::Path;

pub use churn_core::error::{Error, ErrorKind, Result};

/// Map a CSV error for `path` onto the core error kinds.
///
/// Missing files become `NotFound`, other I/O failures stay `Io`, and
/// everything the decoder rejects becomes `Parse`.
pub(crate) fn from_csv(path: &Path, err: csv::Error) -> Error {
    let position = err.position().map(|p| p.line());
    match err.into_kind() {
        csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            Error::not_found(path)
        }
        csv::ErrorKind::Io(io) => Error::Io(io),
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => Error::parse(
            path,
            format!(
                "line {}: found {len} fields, expected {expected_len}",
                position.unwrap_or_default()
            ),
        ),
        csv::ErrorKind::Utf8 { err, .. } => Error::parse(
            path,
            format!("line {}: invalid UTF-8: {err}", position.unwrap_or_default()),
        ),
        other => Error::parse(path, format!("{other:?}")),
    }
}

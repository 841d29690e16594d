//! Error types for churn data loading

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for churn data loading operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for churn data loading operations
#[derive(Error, Debug)]
pub enum Error {
    /// A dataset or model file does not exist
    #[error("File not found: {}", path.display())]
    NotFound {
        /// The path that was looked up
        path: PathBuf,
    },

    /// A dataset file exists but cannot be decoded into a table
    #[error("Failed to parse {}: {message}", path.display())]
    Parse {
        /// The offending file
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// A model artifact exists but cannot be deserialized
    #[error("Corrupt artifact {}: {message}", path.display())]
    CorruptArtifact {
        /// The offending artifact
        path: PathBuf,
        /// Deserializer message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Directory creation or write failed while persisting
    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        /// The target path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration could not be read
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of [`Error`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::NotFound`]
    NotFound,
    /// See [`Error::Parse`]
    Parse,
    /// See [`Error::CorruptArtifact`]
    CorruptArtifact,
    /// See [`Error::InvalidArgument`]
    InvalidArgument,
    /// See [`Error::Persistence`]
    Persistence,
    /// See [`Error::Io`]
    Io,
    /// See [`Error::Config`]
    Config,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::CorruptArtifact { .. } => ErrorKind::CorruptArtifact,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Persistence { .. } => ErrorKind::Persistence,
            Error::Io(_) => ErrorKind::Io,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Build a [`Error::NotFound`] for `path`
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Build a [`Error::Parse`] for `path`
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Build a [`Error::Persistence`] for `path`
    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }
}

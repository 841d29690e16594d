//! Read-only configuration consumed by the loaders

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Locations of the raw and processed datasets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// Labelled training CSV; the test set and submission template live next to it
    pub train_csv: PathBuf,

    /// Directory for processed datasets
    pub processed_dir: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            train_csv: PathBuf::from("app/data/raw/customer-churn-prediction-2020/train.csv"),
            processed_dir: PathBuf::from("app/data/processed"),
        }
    }
}

impl DataPaths {
    /// Directory holding the raw CSV files
    pub fn raw_dir(&self) -> &Path {
        self.train_csv.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Unlabelled test CSV
    pub fn test_csv(&self) -> PathBuf {
        self.raw_dir().join("test.csv")
    }

    /// Sample submission template
    pub fn sample_submission_csv(&self) -> PathBuf {
        self.raw_dir().join("sampleSubmission.csv")
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Environment label attached to every log event (dev, staging, prod)
    pub env: String,

    /// Log verbosity (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: String,

    /// Dataset locations
    pub data: DataPaths,

    /// Directory holding serialized model artifacts
    pub model_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            log_level: "INFO".to_string(),
            data: DataPaths::default(),
            model_dir: PathBuf::from("app/models/weights"),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; absent keys keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::not_found(path));
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Snapshot the fields every log event carries
    pub fn context(&self) -> EnvironmentContext {
        EnvironmentContext::new(&self.env, &self.log_level)
    }
}

/// Immutable environment information attached to log events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug, PartialEq, Eq)]
struct ContextInner {
    env: String,
    log_level: String,
}

impl EnvironmentContext {
    /// Create a new context
    pub fn new(env: impl Into<String>, log_level: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                env: env.into(),
                log_level: log_level.into(),
            }),
        }
    }

    /// Environment label
    pub fn env(&self) -> &str {
        &self.inner.env
    }

    /// Configured log level
    pub fn log_level(&self) -> &str {
        &self.inner.log_level
    }
}

impl Default for EnvironmentContext {
    fn default() -> Self {
        Settings::default().context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sibling_paths() {
        let paths = DataPaths {
            train_csv: PathBuf::from("/data/raw/train.csv"),
            processed_dir: PathBuf::from("/data/processed"),
        };
        assert_eq!(paths.test_csv(), PathBuf::from("/data/raw/test.csv"));
        assert_eq!(
            paths.sample_submission_csv(),
            PathBuf::from("/data/raw/sampleSubmission.csv")
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"env": "prod", "model_dir": "/srv/models"}}"#).unwrap();

        let settings = Settings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.env, "prod");
        assert_eq!(settings.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(settings.log_level, "INFO");
        assert_eq!(settings.data, DataPaths::default());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ env = prod").unwrap();

        let err = Settings::from_json_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_context_carries_env() {
        let settings = Settings {
            env: "staging".into(),
            ..Settings::default()
        };
        let ctx = settings.context();
        assert_eq!(ctx.env(), "staging");
        assert_eq!(ctx.log_level(), "INFO");
    }
}

//! Persistence and in-process caching of trained models
//!
//! A [`ModelStore`] owns the model cache: a map from model name to the
//! deserialized artifact, shared out as `Arc<M>`. `load` fills it from disk
//! on first use, one deserialization per name even under concurrent callers.
//! `save` writes the artifact durably and replaces the cached entry while
//! holding the name's slot, so concurrent saves land on disk and in memory in
//! the same order and a cached model always matches what reached disk.
//!
//! `load` is instrumented like a memoized producer (`MODEL_LOAD` events) but
//! has no memo layer of its own; the model cache is the only cache, which
//! keeps `save` and `load` from disagreeing about the current model.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use churn_core::io::{read_artifact, write_artifact};
use churn_core::{
    instrumented, CacheStats, EnvironmentContext, FlightCache, Settings, MODEL_LOAD,
};

use crate::error::{Error, Result};

/// Log label for model saves
pub const MODEL_SAVE: &str = "MODEL_SAVE";

/// File extension of model artifacts
pub const ARTIFACT_EXTENSION: &str = "bin";

/// Disk-backed store of models of type `M`
pub struct ModelStore<M> {
    /// Directory holding `<name>.bin` artifacts
    model_dir: PathBuf,

    /// Environment tagged onto log events
    context: EnvironmentContext,

    /// Model name to loaded model
    cache: FlightCache<String, Arc<M>>,

    _model: PhantomData<fn() -> M>,
}

impl<M> ModelStore<M>
where
    M: Serialize + DeserializeOwned + Send + Sync,
{
    /// Create a store over `model_dir`
    pub fn new(model_dir: impl Into<PathBuf>, context: EnvironmentContext) -> Self {
        Self {
            model_dir: model_dir.into(),
            context,
            cache: FlightCache::new(),
            _model: PhantomData,
        }
    }

    /// Create a store from application settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.model_dir.clone(), settings.context())
    }

    /// Directory holding the artifacts
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Artifact path for `name`
    pub fn artifact_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self
            .model_dir
            .join(format!("{name}.{ARTIFACT_EXTENSION}")))
    }

    /// Return the model called `name`, reading it from disk on first use.
    ///
    /// Fails with `NotFound` if no artifact exists and `CorruptArtifact` if it
    /// does not deserialize. Failures are not cached.
    pub fn load(&self, name: &str) -> Result<Arc<M>> {
        instrumented(MODEL_LOAD, "load_model", &self.context, || {
            let path = self.artifact_path(name)?;
            let lookup = self.cache.get_or_try_insert_with(&name.to_string(), || {
                let model: M = read_artifact(&path)?;
                tracing::info!(
                    env = self.context.env(),
                    model = name,
                    path = %path.display(),
                    "loaded model from disk"
                );
                Ok::<_, Error>(Arc::new(model))
            })?;

            if lookup.hit {
                tracing::debug!(env = self.context.env(), model = name, "model cache hit");
            }
            Ok(lookup.value)
        })
    }

    /// Persist `model` as `name` and make it the cached value.
    ///
    /// The artifact is written before the cache is touched; if the write
    /// fails the cache keeps its previous state. Saves and loads of the same
    /// name are serialized.
    pub fn save(&self, model: M, name: &str) -> Result<Arc<M>> {
        self.save_shared(Arc::new(model), name)
    }

    /// Like [`save`](Self::save) for a model that is already shared
    pub fn save_shared(&self, model: Arc<M>, name: &str) -> Result<Arc<M>> {
        let path = self.artifact_path(name)?;
        self.cache.try_replace_with(name.to_string(), || {
            write_artifact(&path, model.as_ref())?;
            Ok::<_, Error>(Arc::clone(&model))
        })?;

        tracing::info!(
            env = self.context.env(),
            label = MODEL_SAVE,
            model = name,
            path = %path.display(),
            "saved model"
        );
        Ok(model)
    }

    /// Whether `name` is in the cache
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(&name.to_string())
    }

    /// Names currently in the cache
    pub fn cached_names(&self) -> Vec<String> {
        let mut names = self.cache.keys();
        names.sort();
        names
    }

    /// Cache activity counters; `misses` counts disk reads attempted
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl<M> std::fmt::Debug for ModelStore<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("model_dir", &self.model_dir)
            .field("env", &self.context.env())
            .finish_non_exhaustive()
    }
}

/// Reject names that would escape the model directory
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(Error::InvalidArgument(format!("invalid model name '{name}'")));
    }
    Ok(())
}

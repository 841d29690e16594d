//! Dataset loading service
//!
//! [`DatasetLoader`] exposes the training set, the test set and the sample
//! submission template. Each loader is memoized on its own (label
//! `DATA_LOAD`), so each file is read at most once per loader instance and
//! every later call returns the same shared `Arc<Table>`. A failed read is
//! not remembered; the next call reads the file again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use churn_core::{
    memoize, CacheStats, DataPaths, EnvironmentContext, Memoized, Settings, Table, DATA_LOAD,
};

use crate::csv::{CsvReader, CsvWriter};
use crate::error::{Error, Result};
use crate::splitter::{self, SplitOptions, Splits};

/// Default file name for the processed training set
pub const DEFAULT_PROCESSED_FILE: &str = "train_processed.csv";

type TableProducer = Box<dyn Fn(&()) -> Result<Arc<Table>> + Send + Sync>;
type TableLoader = Memoized<(), Arc<Table>, Error, TableProducer>;

/// Memoized loaders for the configured datasets
pub struct DatasetLoader {
    /// Dataset locations
    paths: DataPaths,

    /// Environment tagged onto log events
    context: EnvironmentContext,

    train: TableLoader,
    test: TableLoader,
    sample_submission: TableLoader,
}

fn table_loader(
    producer: &'static str,
    description: &'static str,
    path: PathBuf,
    context: &EnvironmentContext,
) -> TableLoader {
    let reader = CsvReader::default();
    let ctx = context.clone();
    let func: TableProducer = Box::new(move |&()| {
        let table = reader.read_path(&path)?;
        tracing::info!(
            env = ctx.env(),
            rows = table.num_rows(),
            columns = table.num_columns(),
            "Loaded {description}: {:?}",
            table.shape()
        );
        Ok(Arc::new(table))
    });
    memoize(DATA_LOAD, producer, context.clone(), func)
}

impl DatasetLoader {
    /// Create loaders over the given paths
    pub fn new(paths: DataPaths, context: EnvironmentContext) -> Self {
        let train = table_loader(
            "load_train",
            "train data",
            paths.train_csv.clone(),
            &context,
        );
        let test = table_loader("load_test", "test data", paths.test_csv(), &context);
        let sample_submission = table_loader(
            "load_sample_submission",
            "sample submission",
            paths.sample_submission_csv(),
            &context,
        );

        Self {
            paths,
            context,
            train,
            test,
            sample_submission,
        }
    }

    /// Create loaders from application settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.data.clone(), settings.context())
    }

    /// Configured dataset locations
    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Labelled training set
    pub fn load_train(&self) -> Result<Arc<Table>> {
        self.train.get()
    }

    /// Unlabelled test set
    pub fn load_test(&self) -> Result<Arc<Table>> {
        self.test.get()
    }

    /// Sample submission template
    pub fn load_sample_submission(&self) -> Result<Arc<Table>> {
        self.sample_submission.get()
    }

    /// Stratified train/validation split of `table`; not cached
    pub fn get_splits(&self, table: &Table, options: &SplitOptions) -> Result<Splits> {
        tracing::info!(
            env = self.context.env(),
            label = "DATA_SPLIT",
            "Splitting {} samples",
            table.num_rows()
        );
        let splits = splitter::get_splits(table, options)?;
        tracing::info!(
            env = self.context.env(),
            target_column = %options.target,
            train = splits.y_train.len(),
            validation = splits.y_val.len(),
            "split dataset"
        );
        Ok(splits)
    }

    /// Write a processed table under the processed directory
    pub fn save_processed(&self, table: &Table, file_name: &str) -> Result<PathBuf> {
        let path = self.processed_path(file_name)?;
        CsvWriter::default().write_path(table, &path)?;
        tracing::info!(env = self.context.env(), path = %path.display(), "Saved processed data");
        Ok(path)
    }

    /// Read a processed table back; reads the file on every call
    pub fn load_processed(&self, file_name: &str) -> Result<Table> {
        let path = self.processed_path(file_name)?;
        let table = CsvReader::default().read_path(&path)?;
        tracing::info!(
            env = self.context.env(),
            path = %path.display(),
            "Loaded processed data: {:?}",
            table.shape()
        );
        Ok(table)
    }

    /// Cache counters per loader
    pub fn stats(&self) -> Vec<(&'static str, CacheStats)> {
        [&self.train, &self.test, &self.sample_submission]
            .into_iter()
            .map(|loader| (loader.producer(), loader.stats()))
            .collect()
    }

    fn processed_path(&self, file_name: &str) -> Result<PathBuf> {
        let name = Path::new(file_name);
        let plain = name.file_name().is_some_and(|n| n == name.as_os_str());
        if !plain {
            return Err(Error::InvalidArgument(format!(
                "processed file name must be a plain file name, got '{file_name}'"
            )));
        }
        Ok(self.paths.processed_dir.join(name))
    }
}

impl std::fmt::Debug for DatasetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetLoader")
            .field("paths", &self.paths)
            .field("env", &self.context.env())
            .finish_non_exhaustive()
    }
}

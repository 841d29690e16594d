//! CSV writer implementation

use std::path::Path;

use csv::WriterBuilder;

use churn_core::io::write_atomic;
use churn_core::Table;

use crate::error::{Error, Result};

/// Options for CSV writer
#[derive(Debug, Clone)]
pub struct CsvWriterOptions {
    /// Delimiter character
    pub delimiter: u8,

    /// Quote character
    pub quote: u8,

    /// Whether to quote all fields
    pub quote_all: bool,
}

impl Default for CsvWriterOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            quote_all: false,
        }
    }
}

/// Writes a [`Table`] as CSV with a header row
#[derive(Debug, Clone, Default)]
pub struct CsvWriter {
    options: CsvWriterOptions,
}

impl CsvWriter {
    /// Create a new CSV writer
    pub fn new(options: CsvWriterOptions) -> Self {
        Self { options }
    }

    /// Encode `table` into CSV bytes
    pub fn to_bytes(&self, table: &Table) -> Result<Vec<u8>> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .quote_style(if self.options.quote_all {
                csv::QuoteStyle::Always
            } else {
                csv::QuoteStyle::Necessary
            })
            .from_writer(Vec::new());

        let encode = |e: csv::Error| Error::InvalidArgument(format!("cannot encode table: {e}"));
        writer.write_record(table.columns()).map_err(encode)?;
        for row in table.rows() {
            writer.write_record(row).map_err(encode)?;
        }

        writer
            .into_inner()
            .map_err(|e| Error::InvalidArgument(format!("cannot encode table: {e}")))
    }

    /// Atomically write `table` to `path`, creating parent directories.
    ///
    /// Fails with `Persistence` if the directory or file cannot be written.
    pub fn write_path(&self, table: &Table, path: &Path) -> Result<()> {
        let bytes = self.to_bytes(table)?;
        write_atomic(path, &bytes)?;
        tracing::debug!(path = %path.display(), rows = table.num_rows(), "wrote csv");
        Ok(())
    }
}

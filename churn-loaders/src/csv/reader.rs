//! CSV reader implementation

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use churn_core::Table;

use crate::error::{from_csv, Error, Result};

/// Options for CSV reader
#[derive(Debug, Clone)]
pub struct CsvReaderOptions {
    /// Delimiter character
    pub delimiter: u8,

    /// Quote character
    pub quote: u8,

    /// Comment character
    pub comment: Option<u8>,

    /// Whether to trim whitespace around fields
    pub trim: bool,

    /// Buffer size for file reads
    pub buffer_size: usize,
}

impl Default for CsvReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            comment: None,
            trim: false,
            buffer_size: 64 * 1024, // 64KB
        }
    }
}

/// Reads a delimited file with a header row into a [`Table`]
#[derive(Debug, Clone, Default)]
pub struct CsvReader {
    options: CsvReaderOptions,
}

impl CsvReader {
    /// Create a new CSV reader
    pub fn new(options: CsvReaderOptions) -> Self {
        Self { options }
    }

    /// Reader options
    pub fn options(&self) -> &CsvReaderOptions {
        &self.options
    }

    /// Read the file at `path`.
    ///
    /// Fails with `NotFound` if the file is missing and `Parse` if it has no
    /// header, a row of the wrong width, or bytes that are not UTF-8.
    pub fn read_path(&self, path: &Path) -> Result<Table> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::not_found(path),
            _ => Error::Io(e),
        })?;
        let table = self.read(BufReader::with_capacity(self.options.buffer_size, file), path)?;

        tracing::debug!(
            path = %path.display(),
            rows = table.num_rows(),
            columns = table.num_columns(),
            "read csv"
        );
        Ok(table)
    }

    /// Read CSV from any byte source; `source` only labels errors
    pub fn read<R: Read>(&self, reader: R, source: &Path) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .comment(self.options.comment)
            .trim(if self.options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let header = reader.headers().map_err(|e| from_csv(source, e))?.clone();
        if header.is_empty() {
            return Err(Error::parse(source, "missing header row"));
        }
        let columns: Vec<String> = header.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while reader
            .read_record(&mut record)
            .map_err(|e| from_csv(source, e))?
        {
            rows.push(record.iter().map(str::to_string).collect());
        }

        Table::new(columns, rows).map_err(|e| Error::parse(source, e))
    }
}

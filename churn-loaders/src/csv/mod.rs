//! CSV reading and writing for tabular datasets
//!
//! Files are expected to carry a header row. Every data row must match the
//! header width; cells are kept as strings.

mod reader;
mod writer;

pub use reader::{CsvReader, CsvReaderOptions};
pub use writer::{CsvWriter, CsvWriterOptions};

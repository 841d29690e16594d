//! In-memory tabular data
//!
//! A [`Table`] is the handle the dataset loaders hand out. Cells are kept as
//! the strings read from disk; typing them is left to downstream consumers.
//! Loaders share tables behind an `Arc`, so a `Table` has no in-place
//! mutation: every derivation (row selection, column removal) returns a new
//! owned table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A column-named, row-major table of string cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    /// Column names, in file order
    columns: Vec<String>,

    /// Rows; each has exactly `columns.len()` cells
    rows: Vec<Vec<String>>,
}

/// Unchecked wire form; deserialization goes through [`Table::new`]
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TryFrom<RawTable> for Table {
    type Error = Error;

    fn try_from(raw: RawTable) -> Result<Self> {
        Table::new(raw.columns, raw.rows)
    }
}

impl Table {
    /// Create a table, checking that every row matches the header width
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(Error::InvalidArgument(format!(
                "row {index} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// Create a table with no rows
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Position of a column, or `InvalidArgument` naming it
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            Error::InvalidArgument(format!("column '{name}' not found in table"))
        })
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let index = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// A single cell
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|r| r[index].as_str())
    }

    /// Copy the given rows, in the given order, into a new table
    pub fn take_rows(&self, indices: &[usize]) -> Result<Table> {
        let rows = indices
            .iter()
            .map(|&i| {
                self.rows.get(i).cloned().ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "row index {i} out of bounds for {} rows",
                        self.rows.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Copy of this table without the named column
    pub fn drop_column(&self, name: &str) -> Result<Table> {
        let index = self.require_column(name)?;
        let mut columns = self.columns.clone();
        columns.remove(index);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.remove(index);
                row
            })
            .collect();

        Ok(Table { columns, rows })
    }

    /// Occurrences of each distinct value in a column, ordered by value
    pub fn value_counts(&self, name: &str) -> Result<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for value in self.column(name)? {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::io::{read_artifact, write_artifact};
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct RawRows {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    }

    fn churn_table() -> Table {
        Table::new(
            vec!["feature1".into(), "feature2".into(), "churn".into()],
            vec![
                vec!["0".into(), "4".into(), "no".into()],
                vec!["1".into(), "5".into(), "yes".into()],
                vec!["2".into(), "6".into(), "no".into()],
                vec!["3".into(), "7".into(), "yes".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into(), "2".into()], vec!["3".into()]],
        );
        assert!(matches!(result, Err(Error::InvalidArgument(msg)) if msg.contains("row 1")));
    }

    #[test]
    fn test_drop_column_copies() {
        let table = churn_table();
        let features = table.drop_column("churn").unwrap();

        assert_eq!(features.shape(), (4, 2));
        assert!(!features.has_column("churn"));
        assert_eq!(table.shape(), (4, 3));
    }

    #[test]
    fn test_missing_column_named_in_error() {
        let err = churn_table().column("tenure").unwrap_err();
        assert!(err.to_string().contains("tenure"));
    }

    #[test]
    fn test_take_rows_in_order() {
        let table = churn_table();
        let subset = table.take_rows(&[3, 0]).unwrap();
        assert_eq!(subset.column("feature1").unwrap(), vec!["3", "0"]);
        assert!(table.take_rows(&[4]).is_err());
    }

    #[test]
    fn test_stored_table_is_revalidated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.bin");

        write_artifact(&path, &churn_table()).unwrap();
        assert_eq!(read_artifact::<Table>(&path).unwrap(), churn_table());

        let ragged = RawRows {
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec!["1".into()]],
        };
        write_artifact(&path, &ragged).unwrap();
        let err = read_artifact::<Table>(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptArtifact);
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn test_value_counts() {
        let counts = churn_table().value_counts("churn").unwrap();
        assert_eq!(counts.get("no"), Some(&2));
        assert_eq!(counts.get("yes"), Some(&2));
    }
}

// In-memory record table: ordered rows over a shared named-column schema.
// Every stage of the pipeline takes a table and returns a new one.

mod csv_codec;
mod json_codec;
mod value;

pub use value::Value;

use crate::error::{PipelineError, Result};
use std::collections::HashSet;

/// An ordered sequence of rows sharing one column set. The column set is
/// determined by the input source, not fixed a priori; the invariant is
/// that every row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Resolve a column that a declared operation requires; absence is a
    /// fatal configuration error, not a silent skip.
    pub fn require_column(&self, name: &str, table_name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: name.to_string(),
                table: table_name.to_string(),
            })
    }

    pub fn cell(&self, row: usize, col: usize) -> &Value {
        &self.rows[row][col]
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::Config(format!(
                "Row width {} does not match column count {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Iterate one column's cells in row order.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[col])
    }

    /// Fraction of null cells in a column; 0.0 for an empty table.
    pub fn missing_fraction(&self, col: usize) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let nulls = self.column_values(col).filter(|v| v.is_null()).count();
        nulls as f64 / self.rows.len() as f64
    }

    /// Rewrite one column cell-by-cell.
    pub fn map_column<F>(&mut self, col: usize, f: F)
    where
        F: Fn(&Value) -> Value,
    {
        for row in &mut self.rows {
            row[col] = f(&row[col]);
        }
    }

    /// Append a new column. The value vector must cover every row.
    pub fn add_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::Config(format!(
                "Column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Replace an existing column's values in place, or append the column
    /// if it does not exist yet.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        match self.column_index(name) {
            Some(col) => {
                if values.len() != self.rows.len() {
                    return Err(PipelineError::Config(format!(
                        "Column '{}' has {} values for {} rows",
                        name,
                        values.len(),
                        self.rows.len()
                    )));
                }
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
                Ok(())
            }
            None => self.add_column(name, values),
        }
    }

    /// Rename a column if present.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(col) = self.column_index(from) {
            self.columns[col] = to.to_string();
        }
    }

    /// Remove the named columns; returns the names actually removed.
    pub fn drop_columns(&mut self, names: &[&str]) -> Vec<String> {
        let targets: HashSet<&str> = names.iter().copied().collect();
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !targets.contains(self.columns[i].as_str()))
            .collect();
        let dropped: Vec<String> = self
            .columns
            .iter()
            .filter(|c| targets.contains(c.as_str()))
            .cloned()
            .collect();
        if dropped.is_empty() {
            return dropped;
        }
        self.columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| row[i].clone()).collect();
        }
        dropped
    }

    /// New table holding the given rows, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Remove exact duplicate rows, keeping first occurrences. Returns the
    /// number of rows removed.
    pub fn dedup_rows(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<String> = HashSet::with_capacity(before);
        self.rows.retain(|row| {
            let key = row
                .iter()
                .map(|v| v.canonical())
                .collect::<Vec<_>>()
                .join("\u{1f}");
            seen.insert(key)
        });
        before - self.rows.len()
    }
}

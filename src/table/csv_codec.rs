// CSV encode/decode for record tables. All tabular artifacts in the store
// are delimited text with a header row.

use super::{Table, Value};
use crate::error::{PipelineError, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::io;

impl Table {
    /// Parse CSV bytes into a table, inferring a type for every cell.
    pub fn from_csv(bytes: &[u8]) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(bytes);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut table = Table::new(columns);

        for record in reader.records() {
            let record = record?;
            let row: Vec<Value> = record.iter().map(Value::infer).collect();
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Serialize the table as CSV with a header row. Null cells become
    /// empty fields.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(self.columns())?;
        for row in self.rows() {
            writer.write_record(row.iter().map(|v| v.to_field()))?;
        }
        writer
            .into_inner()
            .map_err(|e| PipelineError::Io(io::Error::new(io::ErrorKind::Other, e)))
    }
}

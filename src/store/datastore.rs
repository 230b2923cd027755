use std::future::Future;

use crate::error::DatastoreError;
use crate::state_machine::Row;

/// A row-oriented table with no transactions or row locks.
///
/// Data rows are addressed by their 0-based position below the header row.
/// Rows are never removed, so a position stays valid once observed.
pub trait Datastore: Send + Sync {
    /// First row of the table; empty if the table is empty.
    fn read_header(&self) -> impl Future<Output = Result<Vec<String>, DatastoreError>> + Send;

    /// Overwrites the first row in a single operation.
    fn replace_header(
        &self,
        columns: &[String],
    ) -> impl Future<Output = Result<(), DatastoreError>> + Send;

    /// Every data row in insertion order, keyed by header column.
    fn read_all_rows(&self) -> impl Future<Output = Result<Vec<Row>, DatastoreError>> + Send;

    /// Adds a row after the last data row. Cells are placed by header column.
    fn append_row(&self, row: &Row) -> impl Future<Output = Result<(), DatastoreError>> + Send;

    /// Writes a single cell of an existing data row.
    fn write_cell(
        &self,
        row_index: usize,
        column: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), DatastoreError>> + Send;
}

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::Datastore;
use crate::error::DatastoreError;
use crate::state_machine::Row;

#[derive(Debug, Default)]
struct Sheet {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct Faults {
    append_failures: AtomicU32,
    write_failures: AtomicU32,
    failing_column: Mutex<Option<String>>,
    latency_ms: AtomicU64,
}

/// In-process sheet: a header row plus positional data rows.
///
/// Clones share the same sheet, so a test can keep a handle for inspection
/// while the service owns another. Latency and transient failures can be
/// injected.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatastore {
    sheet: Arc<Mutex<Sheet>>,
    faults: Arc<Faults>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(columns: Vec<String>) -> Self {
        let store = Self::default();
        store.lock().header = columns;
        store
    }

    /// Delay applied before every operation.
    pub fn set_latency(&self, latency: Duration) {
        self.faults
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// The next `n` appends fail with `Unavailable`.
    pub fn fail_next_appends(&self, n: u32) {
        self.faults.append_failures.store(n, Ordering::SeqCst);
    }

    /// The next `n` cell writes fail with `Unavailable`.
    pub fn fail_next_writes(&self, n: u32) {
        self.faults.write_failures.store(n, Ordering::SeqCst);
    }

    /// The next write to `column` fails with `Unavailable`; writes to other
    /// columns go through.
    pub fn fail_next_write_to(&self, column: &str) {
        *self.faults.failing_column.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(column.to_string());
    }

    fn take_column_failure(&self, column: &str) -> bool {
        let mut target = self
            .faults
            .failing_column
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if target.as_deref() == Some(column) {
            *target = None;
            return true;
        }
        false
    }

    pub fn header(&self) -> Vec<String> {
        self.lock().header.clone()
    }

    /// Snapshot of the data rows, keyed by header column.
    pub fn rows(&self) -> Vec<Row> {
        let sheet = self.lock();
        sheet.rows.iter().map(|cells| to_row(&sheet.header, cells)).collect()
    }

    /// Inserts a raw data row without going through the header mapping.
    pub fn push_raw(&self, cells: Vec<String>) {
        self.lock().rows.push(cells);
    }

    fn lock(&self) -> MutexGuard<'_, Sheet> {
        self.sheet.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        let ms = self.faults.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn to_row(header: &[String], cells: &[String]) -> Row {
    header
        .iter()
        .enumerate()
        .map(|(i, column)| (column.clone(), cells.get(i).cloned().unwrap_or_default()))
        .collect()
}

impl Datastore for MemoryDatastore {
    async fn read_header(&self) -> Result<Vec<String>, DatastoreError> {
        self.delay().await;
        Ok(self.header())
    }

    async fn replace_header(&self, columns: &[String]) -> Result<(), DatastoreError> {
        self.delay().await;
        self.lock().header = columns.to_vec();
        Ok(())
    }

    async fn read_all_rows(&self) -> Result<Vec<Row>, DatastoreError> {
        self.delay().await;
        Ok(self.rows())
    }

    async fn append_row(&self, row: &Row) -> Result<(), DatastoreError> {
        self.delay().await;
        if take_failure(&self.faults.append_failures) {
            return Err(DatastoreError::Unavailable("injected append failure".into()));
        }
        let mut sheet = self.lock();
        if sheet.header.is_empty() {
            return Err(DatastoreError::Unavailable("sheet has no header row".into()));
        }
        let cells = sheet
            .header
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or_default())
            .collect();
        sheet.rows.push(cells);
        Ok(())
    }

    async fn write_cell(
        &self,
        row_index: usize,
        column: &str,
        value: &str,
    ) -> Result<(), DatastoreError> {
        self.delay().await;
        if take_failure(&self.faults.write_failures) || self.take_column_failure(column) {
            return Err(DatastoreError::Unavailable("injected write failure".into()));
        }
        let mut sheet = self.lock();
        let position = sheet
            .header
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DatastoreError::NotFound(format!("column {column}")))?;
        let width = sheet.header.len();
        let cells = sheet
            .rows
            .get_mut(row_index)
            .ok_or_else(|| DatastoreError::NotFound(format!("row {row_index}")))?;
        if cells.len() < width {
            cells.resize(width, String::new());
        }
        cells[position] = value.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        vec!["id".into(), "status".into()]
    }

    fn row(id: &str, status: &str) -> Row {
        [("id", id), ("status", status)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn append_places_cells_by_header() {
        let store = MemoryDatastore::with_header(header());
        store.append_row(&row("a", "AVAILABLE")).await.unwrap();
        store.append_row(&row("b", "CANCELLED")).await.unwrap();

        let rows = store.read_all_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "a");
        assert_eq!(rows[1]["status"], "CANCELLED");
    }

    #[tokio::test]
    async fn append_without_header_fails() {
        let store = MemoryDatastore::new();
        let err = store.append_row(&row("a", "AVAILABLE")).await.unwrap_err();
        assert!(matches!(err, DatastoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn write_cell_checks_row_and_column() {
        let store = MemoryDatastore::with_header(header());
        store.append_row(&row("a", "AVAILABLE")).await.unwrap();

        store.write_cell(0, "status", "IN_PROGRESS").await.unwrap();
        assert_eq!(store.rows()[0]["status"], "IN_PROGRESS");

        assert!(matches!(
            store.write_cell(1, "status", "X").await,
            Err(DatastoreError::NotFound(_))
        ));
        assert!(matches!(
            store.write_cell(0, "rating", "5").await,
            Err(DatastoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = MemoryDatastore::with_header(header());
        store.fail_next_appends(1);
        assert!(store.append_row(&row("a", "AVAILABLE")).await.is_err());
        assert!(store.append_row(&row("a", "AVAILABLE")).await.is_ok());
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn column_failure_hits_only_that_column_once() {
        let store = MemoryDatastore::with_header(header());
        store.append_row(&row("a", "AVAILABLE")).await.unwrap();
        store.fail_next_write_to("status");

        store.write_cell(0, "id", "b").await.unwrap();
        assert!(store.write_cell(0, "status", "CANCELLED").await.is_err());
        store.write_cell(0, "status", "CANCELLED").await.unwrap();
        assert_eq!(store.rows()[0]["status"], "CANCELLED");
    }

    #[tokio::test]
    async fn replace_header_keeps_positional_rows() {
        let store = MemoryDatastore::with_header(vec!["a".into(), "b".into()]);
        store.push_raw(vec!["x1".into(), "STATUS".into()]);
        store.replace_header(&header()).await.unwrap();

        assert_eq!(store.read_header().await.unwrap(), header());
        assert_eq!(store.rows()[0]["id"], "x1");
    }

    #[tokio::test]
    async fn clones_share_the_sheet() {
        let store = MemoryDatastore::with_header(header());
        let handle = store.clone();
        store.append_row(&row("a", "AVAILABLE")).await.unwrap();
        assert_eq!(handle.rows().len(), 1);
    }
}

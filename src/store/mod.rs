//! Key-addressable job table over an external [`Datastore`].

mod datastore;
mod memory;
mod sheets;

pub use datastore::Datastore;
pub use memory::MemoryDatastore;
pub use sheets::SheetsDatastore;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};
use tracing::{info, instrument, warn};

use crate::error::{BoardError, DatastoreError};
use crate::state_machine::{Column, Job, JobId, Row};

/// Timing knobs for datastore calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Wait before the single append retry.
    #[serde(default = "default_append_retry_delay_ms")]
    pub append_retry_delay_ms: u64,

    /// Upper bound on any one datastore call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_append_retry_delay_ms() -> u64 {
    3000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            append_retry_delay_ms: default_append_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn append_retry_delay(&self) -> Duration {
        Duration::from_millis(self.append_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Jobs stored one per row, looked up by `id`.
///
/// Rows are never deleted; row order is creation order.
pub struct JobStore<D> {
    datastore: D,
    config: StoreConfig,
}

impl<D: Datastore> JobStore<D> {
    pub fn new(datastore: D, config: StoreConfig) -> Self {
        Self { datastore, config }
    }

    pub fn datastore(&self) -> &D {
        &self.datastore
    }

    async fn call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, DatastoreError>>,
    ) -> Result<T, DatastoreError> {
        let limit = self.config.request_timeout();
        timeout(limit, fut).await.unwrap_or_else(|_| {
            Err(DatastoreError::Unavailable(format!(
                "{op} timed out after {}ms",
                limit.as_millis()
            )))
        })
    }

    /// Makes the first row match the canonical header. Returns whether it
    /// had to be replaced.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<bool, BoardError> {
        let expected = Column::header();
        let current = self.call("read_header", self.datastore.read_header()).await?;
        if current == expected {
            return Ok(false);
        }
        warn!(found = ?current, "header row does not match, replacing it");
        self.call("replace_header", self.datastore.replace_header(&expected))
            .await?;
        info!("header row reconciled");
        Ok(true)
    }

    /// Every decodable job, in creation order.
    pub async fn list_all(&self) -> Result<Vec<Job>, BoardError> {
        let rows = self.call("read_all_rows", self.datastore.read_all_rows()).await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| match Job::from_row(row) {
                Ok(job) => Some(job),
                Err(e) => {
                    warn!(row = index, error = %e, "skipping undecodable row");
                    None
                }
            })
            .collect())
    }

    /// Position of the job's row, by linear scan.
    #[instrument(skip(self), fields(job_id = %id))]
    pub async fn find_index_by_id(&self, id: &JobId) -> Result<usize, BoardError> {
        self.find_by_id(id).await.map(|(index, _)| index)
    }

    /// Row position and decoded job for `id`.
    pub async fn find_by_id(&self, id: &JobId) -> Result<(usize, Job), BoardError> {
        let (index, row) = self.locate(id).await?;
        let job = Job::from_row(&row).map_err(|e| {
            BoardError::StoreUnavailable(format!("row for job {id} is unreadable: {e}"))
        })?;
        Ok((index, job))
    }

    async fn locate(&self, id: &JobId) -> Result<(usize, Row), BoardError> {
        let rows = self.call("read_all_rows", self.datastore.read_all_rows()).await?;
        rows.into_iter()
            .enumerate()
            .find(|(_, row)| {
                row.get(Column::Id.as_str())
                    .is_some_and(|cell| cell.trim() == id.as_str())
            })
            .ok_or_else(|| BoardError::NotFound(format!("job {id}")))
    }

    /// Appends a new job row, retrying once after a transient failure.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn append(&self, job: &Job) -> Result<(), BoardError> {
        let row = job.to_row();
        match self.call("append_row", self.datastore.append_row(&row)).await {
            Ok(()) => Ok(()),
            Err(DatastoreError::Unavailable(reason)) => {
                let delay = self.config.append_retry_delay();
                warn!(%reason, delay_ms = delay.as_millis() as u64, "append failed, retrying once");
                sleep(delay).await;
                self.call("append_row", self.datastore.append_row(&row))
                    .await
                    .map_err(BoardError::from)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes only the given cells of the job's row, in order.
    ///
    /// Callers put `status` last so that it commits the change. If any write
    /// fails, the cells touched so far get their previous values back before
    /// the error is returned.
    #[instrument(skip(self, changes), fields(job_id = %id, fields = changes.len()))]
    pub async fn update_fields(
        &self,
        id: &JobId,
        changes: &[(Column, String)],
    ) -> Result<(), BoardError> {
        if changes.is_empty() {
            return Ok(());
        }
        let (index, before) = self.locate(id).await?;
        let mut touched = Vec::with_capacity(changes.len());
        for (column, value) in changes {
            // A timed-out write may still land, so it counts as touched.
            touched.push(*column);
            let written = self
                .call(
                    "write_cell",
                    self.datastore.write_cell(index, column.as_str(), value),
                )
                .await;
            if let Err(e) = written {
                warn!(column = column.as_str(), error = %e, "cell write failed, restoring row");
                self.restore(index, &before, &touched).await;
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn restore(&self, index: usize, before: &Row, columns: &[Column]) {
        for column in columns.iter().rev() {
            let previous = before.get(column.as_str()).map(String::as_str).unwrap_or_default();
            let restored = self
                .call(
                    "write_cell",
                    self.datastore.write_cell(index, column.as_str(), previous),
                )
                .await;
            if let Err(e) = restored {
                warn!(column = column.as_str(), error = %e, "could not restore cell");
            }
        }
    }
}

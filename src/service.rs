use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::config::BoardConfig;
use crate::error::BoardError;
use crate::pricing::PricingPolicy;
use crate::state_machine::{CompletionFlow, Event, Job, JobId, JobStatus, StateMachine};
use crate::store::{Datastore, JobStore};
use crate::visibility::redact;

/// What a customer supplies to post a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitJob {
    #[serde(rename = "customer_name", default)]
    pub customer_name: String,
    #[serde(rename = "customer_phone", default)]
    pub customer_phone: String,
    #[serde(rename = "dateTime", default)]
    pub scheduled_at: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to 1.
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
    /// Proposed cost; only read under the range price model.
    #[serde(rename = "costVND", default)]
    pub cost_vnd: Option<i64>,
}

/// Returned to the poster after a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub id: JobId,
    #[serde(rename = "costVND")]
    pub cost_vnd: i64,
    #[serde(rename = "costUSD")]
    pub cost_usd: f64,
}

/// Redacted listing split into board columns, each in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Board {
    pub available: Vec<Job>,
    pub in_progress: Vec<Job>,
    pub waiting_feedback: Vec<Job>,
    pub completed: Vec<Job>,
    pub cancelled: Vec<Job>,
}

impl Board {
    pub fn column(&self, status: JobStatus) -> &[Job] {
        match status {
            JobStatus::Available => &self.available,
            JobStatus::InProgress => &self.in_progress,
            JobStatus::WaitingFeedback => &self.waiting_feedback,
            JobStatus::Completed => &self.completed,
            JobStatus::Cancelled => &self.cancelled,
        }
    }

    fn push(&mut self, job: Job) {
        match job.status {
            JobStatus::Available => self.available.push(job),
            JobStatus::InProgress => self.in_progress.push(job),
            JobStatus::WaitingFeedback => self.waiting_feedback.push(job),
            JobStatus::Completed => self.completed.push(job),
            JobStatus::Cancelled => self.cancelled.push(job),
        }
    }
}

/// Entry point for the API layer: submit, list and move jobs through their
/// lifecycle.
///
/// The datastore has no transactions, so every guard is check-then-act. All
/// mutations (and the one-time header reconciliation) run under a single
/// per-service lock; the status guard is re-checked against a fresh read
/// inside it. Listings take the lock only for that first reconciliation.
pub struct JobService<D> {
    store: JobStore<D>,
    pricing: PricingPolicy,
    machine: StateMachine,
    write_lock: Mutex<()>,
    schema_ready: AtomicBool,
}

impl<D: Datastore> JobService<D> {
    pub fn new(store: JobStore<D>, pricing: PricingPolicy, flow: CompletionFlow) -> Self {
        Self {
            store,
            pricing,
            machine: StateMachine::new(flow),
            write_lock: Mutex::new(()),
            schema_ready: AtomicBool::new(false),
        }
    }

    pub fn from_config(datastore: D, config: &BoardConfig) -> Self {
        Self::new(
            JobStore::new(datastore, config.store),
            config.pricing.clone(),
            config.lifecycle.completion_flow,
        )
    }

    pub fn store(&self) -> &JobStore<D> {
        &self.store
    }

    /// Reconciles the header row now instead of on the first write.
    pub async fn reconcile_schema(&self) -> Result<(), BoardError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_schema_locked().await
    }

    // Caller holds `write_lock`.
    async fn ensure_schema_locked(&self) -> Result<(), BoardError> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.store.ensure_schema().await?;
        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Validates and prices a new job, then appends it as `AVAILABLE`.
    #[instrument(skip(self, input))]
    pub async fn submit(&self, input: SubmitJob) -> Result<SubmitReceipt, BoardError> {
        let customer_name = required("customer_name", &input.customer_name)?;
        let customer_phone = required("customer_phone", &input.customer_phone)?;
        let scheduled_at = required("dateTime", &input.scheduled_at)?;
        let description = required("description", &input.description)?;
        let quantity = input.quantity.unwrap_or(1);
        let cost = self.pricing.quote(quantity, input.cost_vnd)?;

        let job = Job {
            id: JobId::new(),
            customer_name,
            customer_phone,
            scheduled_at,
            description,
            quantity,
            cost_vnd: cost.vnd,
            cost_usd: cost.usd,
            note: input.note.map(|n| n.trim().to_string()).unwrap_or_default(),
            status: JobStatus::Available,
            waiter_name: None,
            waiter_phone: None,
            accepter_id: None,
            created_at: Utc::now(),
            accepted_at: None,
            completed_at: None,
            rating: None,
            feedback: None,
        };

        {
            let _guard = self.write_lock.lock().await;
            self.ensure_schema_locked().await?;
            self.store.append(&job).await?;
        }

        info!(job_id = %job.id, quantity, cost_vnd = cost.vnd, "job submitted");
        Ok(SubmitReceipt {
            id: job.id,
            cost_vnd: cost.vnd,
            cost_usd: cost.usd,
        })
    }

    /// All jobs in creation order, with personal fields of open jobs hidden.
    pub async fn list_jobs(&self) -> Result<Vec<Job>, BoardError> {
        if !self.schema_ready.load(Ordering::Acquire) {
            self.reconcile_schema().await?;
        }
        Ok(self.store.list_all().await?.into_iter().map(redact).collect())
    }

    /// The redacted listing grouped by status.
    pub async fn board(&self) -> Result<Board, BoardError> {
        let mut board = Board::default();
        for job in self.list_jobs().await? {
            board.push(job);
        }
        Ok(board)
    }

    pub async fn accept(
        &self,
        id: &JobId,
        waiter_name: &str,
        waiter_phone: &str,
    ) -> Result<Job, BoardError> {
        self.transition(
            id,
            Event::Accept {
                waiter_name: waiter_name.to_string(),
                waiter_phone: waiter_phone.to_string(),
            },
        )
        .await
    }

    pub async fn cancel(&self, id: &JobId) -> Result<Job, BoardError> {
        self.transition(id, Event::Cancel).await
    }

    /// Out-of-range ratings are dropped rather than rejected.
    pub async fn complete(
        &self,
        id: &JobId,
        rating: Option<i64>,
        feedback: Option<String>,
    ) -> Result<Job, BoardError> {
        self.transition(id, Event::Complete { rating, feedback }).await
    }

    pub async fn feedback(
        &self,
        id: &JobId,
        rating: Option<i64>,
        feedback: &str,
    ) -> Result<Job, BoardError> {
        self.transition(
            id,
            Event::Feedback {
                rating,
                feedback: feedback.to_string(),
            },
        )
        .await
    }

    #[instrument(skip(self, event), fields(job_id = %id, event = event.name()))]
    async fn transition(&self, id: &JobId, event: Event) -> Result<Job, BoardError> {
        if id.as_str().is_empty() {
            return Err(BoardError::Validation("missing required field: id".into()));
        }

        let _guard = self.write_lock.lock().await;
        self.ensure_schema_locked().await?;

        let (_, current) = self.store.find_by_id(id).await?;
        let transition = self
            .machine
            .next(&current, event, Utc::now())
            .inspect_err(|e| info!(status = %current.status, reason = %e, "transition rejected"))?;

        self.store.update_fields(id, &transition.changes()).await?;
        info!(from = %transition.from, to = %transition.to, "job transitioned");
        Ok(transition.job)
    }
}

fn required(field: &str, value: &str) -> Result<String, BoardError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BoardError::Validation(format!("missing required field: {field}")));
    }
    Ok(value.to_string())
}

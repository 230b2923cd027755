use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BoardError;
use crate::pricing::format_usd;

/// One datastore row: column name to cell value.
pub type Row = HashMap<String, String>;

/// Timestamp layout used in every timestamp cell.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Opaque job identifier. Minted at submission, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a job.
///
/// AVAILABLE → IN_PROGRESS → [WAITING_FEEDBACK →] COMPLETED, or
/// AVAILABLE → CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Available,
    InProgress,
    WaitingFeedback,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Available => "AVAILABLE",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::WaitingFeedback => "WAITING_FEEDBACK",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Whether `next` is a legal single step from `self`.
    pub fn can_move_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Available, InProgress)
                | (Available, Cancelled)
                | (InProgress, WaitingFeedback)
                | (InProgress, Completed)
                | (WaitingFeedback, Completed)
        )
    }
}

impl FromStr for JobStatus {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AVAILABLE" => Ok(JobStatus::Available),
            "IN_PROGRESS" => Ok(JobStatus::InProgress),
            "WAITING_FEEDBACK" => Ok(JobStatus::WaitingFeedback),
            "COMPLETED" => Ok(JobStatus::Completed),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            other => Err(BoardError::Validation(format!("invalid job status: {other:?}"))),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical column set, in header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    CustomerName,
    CustomerPhone,
    DateTime,
    Description,
    Quantity,
    CostVnd,
    CostUsd,
    Note,
    Status,
    WaiterName,
    WaiterPhone,
    AccepterId,
    CreatedAt,
    AcceptedAt,
    CompletedAt,
    Rating,
    Feedback,
}

impl Column {
    pub const ALL: [Column; 18] = [
        Column::Id,
        Column::CustomerName,
        Column::CustomerPhone,
        Column::DateTime,
        Column::Description,
        Column::Quantity,
        Column::CostVnd,
        Column::CostUsd,
        Column::Note,
        Column::Status,
        Column::WaiterName,
        Column::WaiterPhone,
        Column::AccepterId,
        Column::CreatedAt,
        Column::AcceptedAt,
        Column::CompletedAt,
        Column::Rating,
        Column::Feedback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::CustomerName => "customer_name",
            Column::CustomerPhone => "customer_phone",
            Column::DateTime => "dateTime",
            Column::Description => "description",
            Column::Quantity => "quantity",
            Column::CostVnd => "costVND",
            Column::CostUsd => "costUSD",
            Column::Note => "note",
            Column::Status => "status",
            Column::WaiterName => "waiter_name",
            Column::WaiterPhone => "waiter_phone",
            Column::AccepterId => "accepterId",
            Column::CreatedAt => "createdAt",
            Column::AcceptedAt => "acceptedAt",
            Column::CompletedAt => "completedAt",
            Column::Rating => "rating",
            Column::Feedback => "feedback",
        }
    }

    /// Header row as owned strings.
    pub fn header() -> Vec<String> {
        Self::ALL.iter().map(|c| c.as_str().to_string()).collect()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task posted by a customer and tracked through its lifecycle.
///
/// Serialized field names match the datastore column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "customer_name")]
    pub customer_name: String,
    #[serde(rename = "customer_phone")]
    pub customer_phone: String,
    #[serde(rename = "dateTime")]
    pub scheduled_at: String,
    pub description: String,
    pub quantity: i64,
    #[serde(rename = "costVND")]
    pub cost_vnd: i64,
    #[serde(rename = "costUSD")]
    pub cost_usd: f64,
    pub note: String,
    pub status: JobStatus,
    #[serde(rename = "waiter_name")]
    pub waiter_name: Option<String>,
    #[serde(rename = "waiter_phone")]
    pub waiter_phone: Option<String>,
    #[serde(rename = "accepterId")]
    pub accepter_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "acceptedAt")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
}

impl Job {
    /// Whether the acceptance fields are consistently populated or empty.
    pub fn acceptance_is_consistent(&self) -> bool {
        let set = [
            self.waiter_name.is_some(),
            self.waiter_phone.is_some(),
            self.accepter_id.is_some(),
            self.accepted_at.is_some(),
        ];
        set.iter().all(|s| *s) || set.iter().all(|s| !*s)
    }

    /// Encodes the job as a datastore row.
    pub fn to_row(&self) -> Row {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let ts = |v: &Option<DateTime<Utc>>| v.map(|t| format_timestamp(&t)).unwrap_or_default();

        Column::ALL
            .iter()
            .map(|column| {
                let value = match column {
                    Column::Id => self.id.to_string(),
                    Column::CustomerName => self.customer_name.clone(),
                    Column::CustomerPhone => self.customer_phone.clone(),
                    Column::DateTime => self.scheduled_at.clone(),
                    Column::Description => self.description.clone(),
                    Column::Quantity => self.quantity.to_string(),
                    Column::CostVnd => self.cost_vnd.to_string(),
                    Column::CostUsd => format_usd(self.cost_usd),
                    Column::Note => self.note.clone(),
                    Column::Status => self.status.to_string(),
                    Column::WaiterName => opt(&self.waiter_name),
                    Column::WaiterPhone => opt(&self.waiter_phone),
                    Column::AccepterId => opt(&self.accepter_id),
                    Column::CreatedAt => format_timestamp(&self.created_at),
                    Column::AcceptedAt => ts(&self.accepted_at),
                    Column::CompletedAt => ts(&self.completed_at),
                    Column::Rating => self.rating.map(|r| r.to_string()).unwrap_or_default(),
                    Column::Feedback => opt(&self.feedback),
                };
                (column.as_str().to_string(), value)
            })
            .collect()
    }

    /// Decodes a datastore row. Empty cells decode to "not set".
    pub fn from_row(row: &Row) -> Result<Self, BoardError> {
        let cell = |c: Column| row.get(c.as_str()).map(|v| v.trim()).unwrap_or("");
        let text = |c: Column| cell(c).to_string();
        let optional = |c: Column| Some(cell(c)).filter(|v| !v.is_empty()).map(String::from);
        let malformed = |c: Column| {
            BoardError::Validation(format!("malformed {c} cell: {:?}", cell(c)))
        };

        let id = cell(Column::Id);
        if id.is_empty() {
            return Err(BoardError::Validation("row has no id".to_string()));
        }

        let optional_ts = |c: Column| -> Result<Option<DateTime<Utc>>, BoardError> {
            match cell(c) {
                "" => Ok(None),
                raw => parse_timestamp(raw).map(Some).ok_or_else(|| malformed(c)),
            }
        };

        let rating = match cell(Column::Rating) {
            "" => None,
            raw => Some(raw.parse::<u8>().map_err(|_| malformed(Column::Rating))?),
        };

        Ok(Job {
            id: JobId::from(id),
            customer_name: text(Column::CustomerName),
            customer_phone: text(Column::CustomerPhone),
            scheduled_at: text(Column::DateTime),
            description: text(Column::Description),
            quantity: cell(Column::Quantity)
                .parse()
                .map_err(|_| malformed(Column::Quantity))?,
            cost_vnd: cell(Column::CostVnd)
                .parse()
                .map_err(|_| malformed(Column::CostVnd))?,
            cost_usd: cell(Column::CostUsd)
                .parse()
                .map_err(|_| malformed(Column::CostUsd))?,
            note: text(Column::Note),
            status: cell(Column::Status).parse()?,
            waiter_name: optional(Column::WaiterName),
            waiter_phone: optional(Column::WaiterPhone),
            accepter_id: optional(Column::AccepterId),
            created_at: optional_ts(Column::CreatedAt)?
                .ok_or_else(|| malformed(Column::CreatedAt))?,
            accepted_at: optional_ts(Column::AcceptedAt)?,
            completed_at: optional_ts(Column::CompletedAt)?,
            rating,
            feedback: optional(Column::Feedback),
        })
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

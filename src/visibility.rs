//! Redaction of personal fields in job listings.

use crate::state_machine::{Job, JobStatus};

/// Placeholder shown instead of customer contact details on open jobs.
pub const HIDDEN: &str = "Hidden until accepted";

/// Hides customer and waiter contact details while a job is `AVAILABLE`.
/// Every other status passes through unchanged.
pub fn redact(mut job: Job) -> Job {
    if job.status == JobStatus::Available {
        job.customer_name = HIDDEN.to_string();
        job.customer_phone = HIDDEN.to_string();
        job.waiter_name = None;
        job.waiter_phone = None;
    }
    job
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{Column, Job, JobStatus};
use crate::error::BoardError;

/// Note written on a job cancelled by its poster.
pub const CANCELLATION_NOTE: &str = "Cancelled by customer";

/// How a job reaches `COMPLETED` after it has been worked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionFlow {
    /// `complete` moves straight to `COMPLETED`.
    #[default]
    Direct,
    /// `complete` without feedback text parks the job in `WAITING_FEEDBACK`
    /// until `feedback` arrives.
    DeferredFeedback,
}

/// Something that happens to a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Accept {
        waiter_name: String,
        waiter_phone: String,
    },
    Cancel,
    Complete {
        rating: Option<i64>,
        feedback: Option<String>,
    },
    Feedback {
        rating: Option<i64>,
        feedback: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Accept { .. } => "accept",
            Event::Cancel => "cancel",
            Event::Complete { .. } => "complete",
            Event::Feedback { .. } => "feedback",
        }
    }
}

/// A validated state change: the job after the event, and the columns the
/// event is allowed to write.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: JobStatus,
    pub to: JobStatus,
    pub job: Job,
    /// Columns to write; `Status` is always last.
    pub fields: Vec<Column>,
}

impl Transition {
    /// Column/value pairs to hand to the store, `status` last.
    pub fn changes(&self) -> Vec<(Column, String)> {
        let mut row = self.job.to_row();
        self.fields
            .iter()
            .map(|column| (*column, row.remove(column.as_str()).unwrap_or_default()))
            .collect()
    }
}

/// Validates events against a job's current status and produces the
/// resulting [`Transition`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMachine {
    pub flow: CompletionFlow,
}

impl StateMachine {
    pub fn new(flow: CompletionFlow) -> Self {
        Self { flow }
    }

    /// Compute the transition `event` causes on `job` at time `now`.
    ///
    /// Input is validated before the status guard. The job passed in is not
    /// modified; a rejected event writes nothing.
    pub fn next(&self, job: &Job, event: Event, now: DateTime<Utc>) -> Result<Transition, BoardError> {
        let from = job.status;
        let mut next = job.clone();

        let fields = match event {
            Event::Accept {
                waiter_name,
                waiter_phone,
            } => {
                let waiter_name = required("waiter_name", waiter_name)?;
                let waiter_phone = required("waiter_phone", waiter_phone)?;
                if from != JobStatus::Available {
                    return Err(BoardError::InvalidTransition("job is not available".into()));
                }
                next.status = JobStatus::InProgress;
                next.waiter_name = Some(waiter_name);
                next.waiter_phone = Some(waiter_phone);
                next.accepter_id = Some(Uuid::new_v4().to_string());
                next.accepted_at = Some(now);
                vec![
                    Column::WaiterName,
                    Column::WaiterPhone,
                    Column::AccepterId,
                    Column::AcceptedAt,
                    Column::Status,
                ]
            }
            Event::Cancel => {
                match from {
                    JobStatus::Available => {}
                    JobStatus::Cancelled => {
                        return Err(BoardError::InvalidTransition(
                            "job is already cancelled".into(),
                        ));
                    }
                    _ => {
                        return Err(BoardError::InvalidTransition(
                            "Cannot cancel — job already accepted".into(),
                        ));
                    }
                }
                next.status = JobStatus::Cancelled;
                next.completed_at = Some(now);
                next.note = CANCELLATION_NOTE.to_string();
                vec![Column::CompletedAt, Column::Note, Column::Status]
            }
            Event::Complete { rating, feedback } => {
                if from != JobStatus::InProgress {
                    return Err(BoardError::InvalidTransition("job is not in progress".into()));
                }
                let feedback = feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
                next.status = match (self.flow, &feedback) {
                    (CompletionFlow::DeferredFeedback, None) => JobStatus::WaitingFeedback,
                    _ => JobStatus::Completed,
                };
                next.completed_at = Some(now);

                let mut fields = vec![Column::CompletedAt];
                if let Some(r) = valid_rating(rating) {
                    next.rating = Some(r);
                    fields.push(Column::Rating);
                }
                if let Some(text) = feedback {
                    next.feedback = Some(text);
                    fields.push(Column::Feedback);
                }
                fields.push(Column::Status);
                fields
            }
            Event::Feedback { rating, feedback } => {
                let feedback = required("feedback", feedback)?;
                if from != JobStatus::WaitingFeedback {
                    return Err(BoardError::InvalidTransition(
                        "job is not waiting for feedback".into(),
                    ));
                }
                next.status = JobStatus::Completed;

                let mut fields = Vec::new();
                // A rating given at completion stays.
                if next.rating.is_none()
                    && let Some(r) = valid_rating(rating)
                {
                    next.rating = Some(r);
                    fields.push(Column::Rating);
                }
                next.feedback = Some(feedback);
                fields.push(Column::Feedback);
                fields.push(Column::Status);
                fields
            }
        };

        debug_assert!(from.can_move_to(next.status));
        Ok(Transition {
            from,
            to: next.status,
            job: next,
            fields,
        })
    }
}

fn required(field: &str, value: String) -> Result<String, BoardError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BoardError::Validation(format!("missing required field: {field}")));
    }
    Ok(value.to_string())
}

/// Ratings outside 1..=5 are dropped, not rejected.
fn valid_rating(rating: Option<i64>) -> Option<u8> {
    match rating {
        Some(r @ 1..=5) => Some(r as u8),
        Some(r) => {
            tracing::debug!(rating = r, "ignoring out-of-range rating");
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::JobId;

    fn make_job() -> Job {
        Job {
            id: JobId::new(),
            customer_name: "Lan".into(),
            customer_phone: "0911111111".into(),
            scheduled_at: "2026-10-20 09:00".into(),
            description: "Stand in line at the clinic".into(),
            quantity: 1,
            cost_vnd: 5_000,
            cost_usd: 0.2,
            note: "bring a chair".into(),
            status: JobStatus::Available,
            waiter_name: None,
            waiter_phone: None,
            accepter_id: None,
            created_at: Utc::now(),
            accepted_at: None,
            completed_at: None,
            rating: None,
            feedback: None,
        }
    }

    fn accept() -> Event {
        Event::Accept {
            waiter_name: "Tu".into(),
            waiter_phone: "0900000000".into(),
        }
    }

    fn complete(rating: Option<i64>, feedback: Option<&str>) -> Event {
        Event::Complete {
            rating,
            feedback: feedback.map(String::from),
        }
    }

    fn apply(sm: &StateMachine, job: &Job, event: Event) -> Result<Job, BoardError> {
        sm.next(job, event, Utc::now()).map(|t| t.job)
    }

    #[test]
    fn accept_populates_all_acceptance_fields() {
        let sm = StateMachine::default();
        let job = make_job();

        let t = sm.next(&job, accept(), Utc::now()).unwrap();
        assert_eq!(t.from, JobStatus::Available);
        assert_eq!(t.to, JobStatus::InProgress);
        assert_eq!(t.job.waiter_name.as_deref(), Some("Tu"));
        assert!(t.job.accepter_id.as_deref().is_some_and(|id| !id.is_empty()));
        assert!(t.job.accepted_at.is_some());
        assert!(t.job.acceptance_is_consistent());
        assert_eq!(*t.fields.last().unwrap(), Column::Status);
        assert!(!t.fields.contains(&Column::CustomerName));
    }

    #[test]
    fn second_accept_is_rejected() {
        let sm = StateMachine::default();
        let accepted = apply(&sm, &make_job(), accept()).unwrap();

        let err = sm.next(&accepted, accept(), Utc::now()).unwrap_err();
        assert_eq!(err, BoardError::InvalidTransition("job is not available".into()));
    }

    #[test]
    fn accept_requires_waiter_identity() {
        let sm = StateMachine::default();
        let err = sm
            .next(
                &make_job(),
                Event::Accept {
                    waiter_name: "  ".into(),
                    waiter_phone: "0900000000".into(),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
    }

    #[test]
    fn cancel_available_job() {
        let sm = StateMachine::default();
        let t = sm.next(&make_job(), Event::Cancel, Utc::now()).unwrap();
        assert_eq!(t.to, JobStatus::Cancelled);
        assert_eq!(t.job.note, CANCELLATION_NOTE);
        assert!(t.job.completed_at.is_some());
        assert_eq!(t.fields, vec![Column::CompletedAt, Column::Note, Column::Status]);
    }

    #[test]
    fn cancel_in_progress_job_is_rejected() {
        let sm = StateMachine::default();
        let accepted = apply(&sm, &make_job(), accept()).unwrap();
        let err = sm.next(&accepted, Event::Cancel, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            BoardError::InvalidTransition("Cannot cancel — job already accepted".into())
        );
    }

    #[test]
    fn cancelled_is_terminal() {
        let sm = StateMachine::default();
        let cancelled = apply(&sm, &make_job(), Event::Cancel).unwrap();
        assert!(sm.next(&cancelled, Event::Cancel, Utc::now()).is_err());
        assert!(sm.next(&cancelled, accept(), Utc::now()).is_err());
        assert!(sm.next(&cancelled, complete(None, None), Utc::now()).is_err());
    }

    #[test]
    fn complete_with_out_of_range_rating_ignores_it() {
        let sm = StateMachine::default();
        let accepted = apply(&sm, &make_job(), accept()).unwrap();

        let t = sm.next(&accepted, complete(Some(6), None), Utc::now()).unwrap();
        assert_eq!(t.to, JobStatus::Completed);
        assert!(t.job.rating.is_none());
        assert!(!t.fields.contains(&Column::Rating));
    }

    #[test]
    fn complete_writes_rating_and_feedback() {
        let sm = StateMachine::default();
        let accepted = apply(&sm, &make_job(), accept()).unwrap();

        let t = sm
            .next(&accepted, complete(Some(5), Some(" quick and polite ")), Utc::now())
            .unwrap();
        assert_eq!(t.job.rating, Some(5));
        assert_eq!(t.job.feedback.as_deref(), Some("quick and polite"));
        let changes = t.changes();
        assert_eq!(changes.last().unwrap(), &(Column::Status, "COMPLETED".to_string()));
        assert!(changes.contains(&(Column::Rating, "5".to_string())));
    }

    #[test]
    fn complete_twice_is_rejected() {
        let sm = StateMachine::default();
        let accepted = apply(&sm, &make_job(), accept()).unwrap();
        let done = apply(&sm, &accepted, complete(None, None)).unwrap();

        for _ in 0..2 {
            let err = sm.next(&done, complete(Some(4), None), Utc::now()).unwrap_err();
            assert!(matches!(err, BoardError::InvalidTransition(_)));
        }
    }

    #[test]
    fn complete_requires_in_progress() {
        let sm = StateMachine::default();
        assert!(sm.next(&make_job(), complete(None, None), Utc::now()).is_err());
    }

    #[test]
    fn deferred_flow_waits_for_feedback() {
        let sm = StateMachine::new(CompletionFlow::DeferredFeedback);
        let accepted = apply(&sm, &make_job(), accept()).unwrap();

        let waiting = apply(&sm, &accepted, complete(Some(4), None)).unwrap();
        assert_eq!(waiting.status, JobStatus::WaitingFeedback);
        assert_eq!(waiting.rating, Some(4));

        let t = sm
            .next(
                &waiting,
                Event::Feedback {
                    rating: Some(2),
                    feedback: "arrived late".into(),
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(t.to, JobStatus::Completed);
        // Rating is set at most once.
        assert_eq!(t.job.rating, Some(4));
        assert_eq!(t.fields, vec![Column::Feedback, Column::Status]);
    }

    #[test]
    fn deferred_flow_completes_directly_with_feedback() {
        let sm = StateMachine::new(CompletionFlow::DeferredFeedback);
        let accepted = apply(&sm, &make_job(), accept()).unwrap();
        let done = apply(&sm, &accepted, complete(None, Some("great"))).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
    }

    #[test]
    fn feedback_requires_waiting_state() {
        let sm = StateMachine::default();
        let accepted = apply(&sm, &make_job(), accept()).unwrap();
        let done = apply(&sm, &accepted, complete(None, None)).unwrap();

        let err = sm
            .next(
                &done,
                Event::Feedback {
                    rating: None,
                    feedback: "late".into(),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            BoardError::InvalidTransition("job is not waiting for feedback".into())
        );
    }

    #[test]
    fn feedback_text_is_required() {
        let sm = StateMachine::new(CompletionFlow::DeferredFeedback);
        let accepted = apply(&sm, &make_job(), accept()).unwrap();
        let waiting = apply(&sm, &accepted, complete(None, None)).unwrap();
        let err = sm
            .next(
                &waiting,
                Event::Feedback {
                    rating: Some(5),
                    feedback: String::new(),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
    }

    #[test]
    fn transitions_never_touch_creation_fields() {
        let sm = StateMachine::new(CompletionFlow::DeferredFeedback);
        let job = make_job();
        let accepted = sm.next(&job, accept(), Utc::now()).unwrap();
        let waiting = sm.next(&accepted.job, complete(None, None), Utc::now()).unwrap();

        for t in [&accepted, &waiting] {
            for column in [
                Column::Id,
                Column::CustomerName,
                Column::CustomerPhone,
                Column::Quantity,
                Column::CostVnd,
                Column::CostUsd,
                Column::CreatedAt,
            ] {
                assert!(!t.fields.contains(&column));
            }
            assert_eq!(t.job.cost_vnd, job.cost_vnd);
            assert_eq!(t.job.created_at, job.created_at);
        }
    }
}

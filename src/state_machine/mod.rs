mod job;
mod transition;

pub use job::{
    Column, Job, JobId, JobStatus, Row, TIMESTAMP_FORMAT, format_timestamp, parse_timestamp,
};
pub use transition::{CANCELLATION_NOTE, CompletionFlow, Event, StateMachine, Transition};

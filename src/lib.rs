//! Job marketplace board.
//!
//! Customers post small paid tasks, waiters accept them, and both sides
//! close the loop with completion and feedback. Jobs live in an external
//! row-oriented [`Datastore`](store::Datastore) with no transactions;
//! [`JobService`] serializes every mutation so that a job is accepted by at
//! most one waiter.

pub mod config;
pub mod error;
pub mod logging;
pub mod pricing;
pub mod service;
pub mod state_machine;
pub mod store;
pub mod visibility;

pub use config::BoardConfig;
pub use error::{BoardError, ConfigError, DatastoreError};
pub use pricing::{Cost, PriceModel, PricingPolicy};
pub use service::{Board, JobService, SubmitJob, SubmitReceipt};
pub use state_machine::{CompletionFlow, Job, JobId, JobStatus};
pub use store::{Datastore, JobStore, MemoryDatastore, SheetsDatastore, StoreConfig};

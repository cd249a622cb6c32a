//! Clockodo Entry Scheduler Library
//!
//! This library automates time entry creation in Clockodo: it filters a
//! date range down to working days, splits each day into two work blocks
//! around a randomized-start break, and submits the resulting entries to
//! the Clockodo API.

pub mod error;
pub mod helpers;
pub mod models;
pub mod service;

pub use service::{RunMode, RunSummary, SchedulerService};

// Re-export key types for convenience
pub use error::{ConfigError, SchedulerError, SubmissionError};
pub use helpers::client::{ApiCredentials, RetryPolicy, SubmissionClient};
pub use models::config::Config;
pub use models::entry::{EntryId, EntryRecord, TimeInterval};

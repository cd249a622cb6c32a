use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Errors raised while loading or validating the scheduler configuration.
///
/// All of these are fatal and surface before any entry is submitted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("start_time_options must contain at least one entry")]
    NoStartOptions,

    #[error(
        "end_time {end_time} must be later than the latest start option {latest_start} \
         plus the {break_minutes} minute break"
    )]
    EndTimeTooEarly {
        end_time: NaiveTime,
        latest_start: NaiveTime,
        break_minutes: i64,
    },

    #[error(
        "working span on {day} starting at {start} is too short to fit a \
         {break_minutes} minute break"
    )]
    DayTooShort {
        day: NaiveDate,
        start: NaiveTime,
        break_minutes: i64,
    },

    #[error("local time {time} on {day} does not exist or is ambiguous in timezone {timezone}")]
    InvalidLocalTime {
        day: NaiveDate,
        time: NaiveTime,
        timezone: chrono_tz::Tz,
    },
}

/// Errors raised while talking to the Clockodo API.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Rate-limit or transient failures kept recurring past the retry budget.
    #[error("retry budget exhausted after {attempts} attempts against the Clockodo API")]
    RetriesExhausted { attempts: u32 },

    /// The API rejected the request outright (authentication or validation).
    #[error("Clockodo API rejected the request with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("transport error talking to the Clockodo API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API credentials contain characters not valid in a header: {0}")]
    InvalidCredentials(#[from] reqwest::header::InvalidHeaderValue),
}

/// Top-level error for a scheduler run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

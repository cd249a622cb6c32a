use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::models::config::Config;

/// Identifier assigned by the Clockodo API when an entry is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half of a working day, in UTC. Invariant: `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeInterval {
    #[serde(rename = "time_since", serialize_with = "compact_utc")]
    pub start: DateTime<Utc>,
    #[serde(rename = "time_until", serialize_with = "compact_utc")]
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

/// One time entry ready for submission.
///
/// Serializes directly into the Clockodo v2 wire form: `customers_id`,
/// `services_id`, `billable` as 0/1 and the interval flattened into
/// `time_since`/`time_until`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRecord {
    #[serde(rename = "customers_id")]
    pub customer_id: i64,
    #[serde(rename = "services_id")]
    pub service_id: i64,
    #[serde(serialize_with = "bool_as_int")]
    pub billable: bool,
    #[serde(flatten)]
    pub interval: TimeInterval,
    #[serde(rename = "text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntryRecord {
    /// Map a day's two slots onto two submission-ready records.
    pub fn pair_for_day(
        before_break: TimeInterval,
        after_break: TimeInterval,
        config: &Config,
    ) -> (EntryRecord, EntryRecord) {
        let build = |interval: TimeInterval| EntryRecord {
            customer_id: config.customer_id,
            service_id: config.service_id,
            billable: config.billable,
            interval,
            description: None,
        };

        (build(before_break), build(after_break))
    }

    pub fn duration(&self) -> Duration {
        self.interval.duration()
    }
}

impl fmt::Display for EntryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, customer {}, service {}{})",
            self.interval,
            format_hours(self.duration()),
            self.customer_id,
            self.service_id,
            if self.billable { ", billable" } else { "" }
        )
    }
}

/// Render a duration as "4h 45m" for log lines and summaries.
pub fn format_hours(duration: Duration) -> String {
    format!("{}h {:02}m", duration.num_hours(), duration.num_minutes() % 60)
}

fn compact_utc<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

fn bool_as_int<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u8(if *value { 1 } else { 0 })
}

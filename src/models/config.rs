use std::collections::BTreeSet;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;

/// Fully-resolved scheduler configuration, loaded once per run.
///
/// Deserialized from a JSON document; only `customer_id`, `service_id`,
/// `start_date` and `end_date` are required, everything else falls back to
/// the documented defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub customer_id: i64,
    pub service_id: i64,
    #[serde(default = "default_billable")]
    pub billable: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub excluded_dates: BTreeSet<NaiveDate>,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    #[serde(default = "default_start_options", deserialize_with = "hhmm::vec")]
    pub start_time_options: Vec<NaiveTime>,
    #[serde(default = "default_end_time", deserialize_with = "hhmm::single")]
    pub end_time: NaiveTime,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: i64,
    #[serde(default = "default_external_app")]
    pub external_app: String,
}

impl Config {
    /// Load a configuration from a JSON file without validating it.
    ///
    /// Callers apply any command-line overrides first and then run
    /// [`Config::validate`] before using the value.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}", path.display());

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Check the cross-field invariants that serde cannot express.
    ///
    /// Every start option plus the break must still fit before `end_time`.
    /// A start date after the end date is deliberately not an error; it
    /// simply yields an empty run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let latest_start = *self
            .start_time_options
            .iter()
            .max()
            .ok_or(ConfigError::NoStartOptions)?;

        if self.end_time - latest_start <= Duration::minutes(self.break_minutes) {
            return Err(ConfigError::EndTimeTooEarly {
                end_time: self.end_time,
                latest_start,
                break_minutes: self.break_minutes,
            });
        }

        Ok(())
    }
}

fn default_billable() -> bool {
    true
}

fn default_timezone() -> Tz {
    chrono_tz::UTC
}

fn default_start_options() -> Vec<NaiveTime> {
    vec![
        NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
    ]
}

fn default_end_time() -> NaiveTime {
    NaiveTime::from_hms_opt(21, 0, 0).unwrap()
}

fn default_break_minutes() -> i64 {
    30
}

fn default_external_app() -> String {
    "Python Scheduler".to_string()
}

/// Wall-clock times appear in the config as "HH:MM" strings.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer};

    pub fn single<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn vec<'de, D>(deserializer: D) -> Result<Vec<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|value| parse(value).map_err(serde::de::Error::custom))
            .collect()
    }

    fn parse(value: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .map_err(|e| format!("invalid time of day {value:?} (expected HH:MM): {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> serde_json::Value {
        serde_json::json!({
            "customer_id": 1234,
            "service_id": 5678,
            "start_date": "2025-05-01",
            "end_date": "2025-05-07"
        })
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = serde_json::from_value(minimal_json()).unwrap();

        assert!(config.billable);
        assert!(config.excluded_dates.is_empty());
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert_eq!(
            config.start_time_options,
            vec![
                NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            ]
        );
        assert_eq!(config.end_time, NaiveTime::from_hms_opt(21, 0, 0).unwrap());
        assert_eq!(config.break_minutes, 30);
        assert_eq!(config.external_app, "Python Scheduler");
        config.validate().unwrap();
    }

    #[test]
    fn missing_required_field_fails() {
        let mut json = minimal_json();
        json.as_object_mut().unwrap().remove("customer_id");

        assert!(serde_json::from_value::<Config>(json).is_err());
    }

    #[test]
    fn malformed_date_fails() {
        let mut json = minimal_json();
        json["start_date"] = serde_json::json!("01.05.2025");

        assert!(serde_json::from_value::<Config>(json).is_err());
    }

    #[test]
    fn malformed_time_option_fails() {
        let mut json = minimal_json();
        json["start_time_options"] = serde_json::json!(["11:00", "noonish"]);

        assert!(serde_json::from_value::<Config>(json).is_err());
    }

    #[test]
    fn full_config_parses() {
        let json = serde_json::json!({
            "customer_id": 1,
            "service_id": 2,
            "billable": false,
            "start_date": "2025-05-01",
            "end_date": "2025-05-31",
            "excluded_dates": ["2025-05-02", "2025-05-09"],
            "timezone": "Europe/Berlin",
            "start_time_options": ["09:00", "09:30"],
            "end_time": "17:30",
            "break_minutes": 45,
            "external_app": "Rust Scheduler"
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert!(!config.billable);
        assert_eq!(config.excluded_dates.len(), 2);
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.break_minutes, 45);
        config.validate().unwrap();
    }

    #[test]
    fn end_time_must_clear_latest_start_plus_break() {
        let mut json = minimal_json();
        json["start_time_options"] = serde_json::json!(["20:45"]);

        let config: Config = serde_json::from_value(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EndTimeTooEarly { .. })
        ));
    }

    #[test]
    fn start_after_end_is_not_a_validation_error() {
        let mut json = minimal_json();
        json["start_date"] = serde_json::json!("2025-06-01");
        json["end_date"] = serde_json::json!("2025-05-01");

        let config: Config = serde_json::from_value(json).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn empty_start_options_fail_validation() {
        let mut json = minimal_json();
        json["start_time_options"] = serde_json::json!([]);

        let config: Config = serde_json::from_value(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoStartOptions)
        ));
    }
}

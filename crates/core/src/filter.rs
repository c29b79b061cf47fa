use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::warn;

use crate::config::{FilterConfig, DEFAULT_MIN_DURATION_SECS};
use crate::domain::call::CallRecord;
use crate::domain::row::{FilteredRow, NOT_AVAILABLE};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid timestamp `{value}`: {reason}")]
pub struct TimestampError {
    pub value: String,
    pub reason: String,
}

/// ISO-8601 forms RFC 3339 rejects: compact `+hhmm` offsets and times without
/// seconds.
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%z",
];

const NAIVE_FORMATS: [&str; 4] =
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Parses an ISO-8601 timestamp. A trailing `Z` is read as `+00:00` and
/// timestamps without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = raw.trim();
    let normalized = match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
        Some(prefix) => format!("{prefix}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let with_offset = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&normalized, format).ok())
        .map(|parsed| parsed.with_timezone(&Utc));
    if let Some(parsed) = with_offset {
        return Ok(parsed);
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError {
            value: raw.to_string(),
            reason: "expected ISO-8601 date and time".to_string(),
        })
}

/// Seconds between `started_at` and `ended_at`, with microsecond precision.
pub fn call_duration_secs(started_at: &str, ended_at: &str) -> Result<f64, TimestampError> {
    let start = parse_timestamp(started_at)?;
    let end = parse_timestamp(ended_at)?;
    let delta = end - start;

    Ok(delta
        .num_microseconds()
        .map(|micros| micros as f64 / 1_000_000.0)
        .unwrap_or_else(|| delta.num_seconds() as f64))
}

/// Keeps calls that lasted strictly longer than the threshold and were not
/// placed to or from an excluded number.
#[derive(Clone, Debug)]
pub struct RelevanceFilter {
    min_duration_secs: f64,
    excluded_numbers: HashSet<String>,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DURATION_SECS)
    }
}

impl RelevanceFilter {
    pub fn new(min_duration_secs: u64) -> Self {
        Self { min_duration_secs: min_duration_secs as f64, excluded_numbers: HashSet::new() }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.min_duration_secs)
            .with_excluded_numbers(config.excluded_numbers.iter().cloned())
    }

    pub fn with_excluded_numbers(mut self, numbers: impl IntoIterator<Item = String>) -> Self {
        self.excluded_numbers.extend(numbers);
        self
    }

    pub fn min_duration_secs(&self) -> f64 {
        self.min_duration_secs
    }

    pub fn apply(&self, calls: &[CallRecord]) -> Vec<FilteredRow> {
        calls.iter().filter_map(|call| self.row_for(call)).collect()
    }

    fn row_for(&self, call: &CallRecord) -> Option<FilteredRow> {
        let (started_at, ended_at) = match (&call.started_at, &call.ended_at) {
            (Some(started_at), Some(ended_at)) => (started_at, ended_at),
            _ => return None,
        };

        let duration_secs = match call_duration_secs(started_at, ended_at) {
            Ok(duration_secs) => duration_secs,
            Err(error) => {
                warn!(
                    event_name = "export.filter.invalid_timestamp",
                    call_id = %call.id,
                    error = %error,
                    "skipping call with unparseable timestamp"
                );
                return None;
            }
        };

        if duration_secs <= self.min_duration_secs {
            return None;
        }

        let phone = call.customer_number().unwrap_or(NOT_AVAILABLE);
        if self.excluded_numbers.contains(phone) {
            return None;
        }

        Some(FilteredRow {
            id: call.id.clone(),
            phone: phone.to_string(),
            duration_secs,
            started_at: started_at.clone(),
            ended_at: ended_at.clone(),
            summary: call.summary().unwrap_or(NOT_AVAILABLE).to_string(),
            success_evaluation: call
                .success_evaluation()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            transcript: call.transcript().to_string(),
        })
    }
}

//! Typed view of the headers the queue attaches when delivering a task.
//!
//! Handlers can use these to tell redeliveries apart from first attempts or
//! to stop acknowledging work after too many retries. All fields are
//! optional on the wire and default to zero/empty; a request without any of
//! them parses cleanly (it just is not a queue delivery).

use chrono::{DateTime, Utc};
use http::HeaderMap;

use crate::constants::{
    HEADER_QUEUE_NAME, HEADER_TASK_ETA, HEADER_TASK_EXECUTION_COUNT, HEADER_TASK_NAME,
    HEADER_TASK_PREVIOUS_RESPONSE, HEADER_TASK_RETRY_COUNT, HEADER_TASK_RETRY_REASON,
};

/// Dispatch metadata parsed from the inbound headers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskDispatchInfo {
    /// Retries so far; zero on the first attempt.
    pub retry_count: u32,
    /// Total executions, including responses the queue did not count as
    /// retries.
    pub execution_count: u32,
    pub queue_name: String,
    pub task_name: String,
    /// Originally scheduled dispatch time.
    pub eta: Option<DateTime<Utc>>,
    /// HTTP status the previous attempt returned, if any.
    pub previous_response: Option<u16>,
    pub retry_reason: String,
}

impl TaskDispatchInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            retry_count: parse_or_default(headers, HEADER_TASK_RETRY_COUNT),
            execution_count: parse_or_default(headers, HEADER_TASK_EXECUTION_COUNT),
            queue_name: string_or_empty(headers, HEADER_QUEUE_NAME),
            task_name: string_or_empty(headers, HEADER_TASK_NAME),
            eta: parse_eta(headers),
            previous_response: header_str(headers, HEADER_TASK_PREVIOUS_RESPONSE)
                .and_then(|v| v.parse().ok()),
            retry_reason: string_or_empty(headers, HEADER_TASK_RETRY_REASON),
        }
    }

    /// True once `max` attempts have been retried. Counting starts at zero,
    /// so equality is part of the check.
    pub fn retries_exhausted(&self, max: u32) -> bool {
        self.retry_count >= max
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_or_default(headers: &HeaderMap, name: &str) -> u32 {
    header_str(headers, name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn string_or_empty(headers: &HeaderMap, name: &str) -> String {
    header_str(headers, name).unwrap_or("").to_string()
}

/// The eta header carries fractional epoch seconds.
fn parse_eta(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let raw: f64 = header_str(headers, HEADER_TASK_ETA)?.parse().ok()?;
    if raw <= 0.0 {
        return None;
    }
    DateTime::from_timestamp(raw.trunc() as i64, (raw.fract() * 1e9) as u32)
}

//! Wire models for the task-queue and scheduler backends.
//!
//! These mirror the Cloud Tasks v2 / Cloud Scheduler v1 REST encoding:
//! camelCase field names, base64 request bodies, `"<n>s"` duration strings
//! and RFC3339 timestamps. Equality on [`Job`] is structural and drives the
//! schedule reconciliation check; [`Job::sanitized`] strips the fields the
//! backend owns so two definitions compare on intent only.

use chrono::{DateTime, Utc};
use ordermap::OrderMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// HTTP methods the backends can dispatch with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
    Get,
    Head,
    Put,
    Delete,
    Patch,
    Options,
}

impl HttpMethod {
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "POST" => Some(Self::Post),
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Service-account identity token attached to an outbound HTTP target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcToken {
    pub service_account_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl OidcToken {
    pub fn new(service_account_email: impl Into<String>) -> Self {
        Self {
            service_account_email: service_account_email.into(),
            audience: None,
        }
    }
}

/// The HTTP request a queued task delivers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    pub http_method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "OrderMap::is_empty")]
    pub headers: OrderMap<String, String>,
    #[serde(
        default,
        with = "opt_base64_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_token: Option<OidcToken>,
}

/// A single unit of deferred HTTP work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Fully-qualified task name; set only when the caller wants dedup by
    /// task id, otherwise the backend assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub http_request: HttpRequest,
    /// Absolute dispatch time; absent means immediate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "opt_duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub dispatch_deadline: Option<Duration>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub parent: String,
    pub task: Task,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueueRequest {
    pub parent: String,
    pub queue: Queue,
}

/// The HTTP request a recurring job dispatches on each tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpTarget {
    pub http_method: HttpMethod,
    pub uri: String,
    #[serde(default, skip_serializing_if = "OrderMap::is_empty")]
    pub headers: OrderMap<String, String>,
    #[serde(
        default,
        with = "opt_base64_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_token: Option<OidcToken>,
}

/// Declarative retry policy for a recurring job. Retrying is the backend's
/// responsibility; no local retry loop exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub retry_count: i32,
    /// Zero means retry for as long as the policy allows, with no overall
    /// time cap.
    #[serde(with = "duration_secs")]
    pub max_retry_duration: Duration,
    #[serde(with = "duration_secs")]
    pub min_backoff_duration: Duration,
    #[serde(with = "duration_secs")]
    pub max_backoff_duration: Duration,
    pub max_doublings: i32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: 5,
            max_retry_duration: Duration::ZERO,
            min_backoff_duration: Duration::from_secs(5),
            max_backoff_duration: Duration::from_secs(120),
            max_doublings: 5,
        }
    }
}

/// A recurring schedule definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub name: String,
    pub http_target: HttpTarget,
    /// Cron expression driving dispatch.
    pub schedule: String,
    pub time_zone: String,
    pub retry_config: RetryConfig,
    #[serde(
        default,
        with = "opt_duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub attempt_deadline: Option<Duration>,

    // Output-only fields the backend assigns; excluded from reconciliation
    // comparison via `sanitized`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_update_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<DateTime<Utc>>,
}

impl Job {
    /// Copy of this job with every backend-owned field stripped: update time,
    /// state, status, attempt times, next schedule time and the user-agent
    /// header the backend injects into the target. Target headers are put in
    /// sorted order so two sanitized jobs compare equal regardless of the
    /// order the backend returns them in.
    pub fn sanitized(&self) -> Job {
        let mut job = self.clone();
        job.user_update_time = None;
        job.state = None;
        job.status = None;
        job.last_attempt_time = None;
        job.schedule_time = None;
        let mut headers: Vec<(String, String)> = std::mem::take(&mut job.http_target.headers)
            .into_iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("user-agent"))
            .collect();
        headers.sort();
        job.http_target.headers = headers.into_iter().collect();
        job
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub parent: String,
    pub job: Job,
}

/// Serde adapter for the REST duration encoding (`"120s"`, `"3.5s"`).
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&render(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {}", raw)))
    }

    pub(crate) fn render(value: &Duration) -> String {
        if value.subsec_nanos() == 0 {
            format!("{}s", value.as_secs())
        } else {
            format!("{}s", value.as_secs_f64())
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Duration> {
        let secs: f64 = raw.strip_suffix('s')?.parse().ok()?;
        if secs < 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(secs))
    }
}

pub(crate) mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_str(&super::duration_secs::render(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => super::duration_secs::parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {}", raw))),
        }
    }
}

/// Serde adapter for base64-encoded request bodies.
pub(crate) mod opt_base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => STANDARD
                .decode(raw.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

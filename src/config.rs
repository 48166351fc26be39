//! Configuration loading for services using taskroute.
//!
//! Everything comes from environment variables, validated into newtype
//! wrappers at load time so the rest of the code never re-checks formats.

use std::time::Duration;

use crate::constants::DEFAULT_CREATE_TIMEOUT_MS;
use crate::errors::ConfigError;
use crate::queue::{location_path, queue_path};

type Result<T> = std::result::Result<T, ConfigError>;

/// Base URL the queue delivers reconstructed requests back to.
///
/// Must be an absolute http(s) URL; a trailing slash is tolerated and
/// stripped at request-build time.
#[derive(Clone, Debug)]
pub struct ListenerBaseUrl(String);

impl ListenerBaseUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ListenerBaseUrl {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl { value });
        }
        Ok(Self(value))
    }
}

/// Timeout for backend create/delete calls, in milliseconds on the wire.
#[derive(Clone, Debug)]
pub struct CreateTimeout(Duration);

impl CreateTimeout {
    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Default for CreateTimeout {
    fn default() -> Self {
        Self(Duration::from_millis(DEFAULT_CREATE_TIMEOUT_MS))
    }
}

impl TryFrom<String> for CreateTimeout {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        let ms: u64 = value
            .parse()
            .map_err(|_| ConfigError::InvalidTimeout {
                value: value.clone(),
            })?;
        if ms == 0 {
            return Err(ConfigError::InvalidTimeout { value });
        }
        Ok(Self(Duration::from_millis(ms)))
    }
}

/// A single path segment of a resource identifier (project, location or
/// queue name). The backend validates full paths; locally we only reject
/// values that would corrupt path construction.
#[derive(Clone, Debug)]
pub struct ResourceSegment(String);

impl ResourceSegment {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceSegment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        if value.is_empty() || value.contains('/') {
            return Err(ConfigError::InvalidIdentifier { value });
        }
        Ok(Self(value))
    }
}

/// Emulator address, e.g. `localhost:8123`.
#[derive(Clone, Debug)]
pub struct EmulatorAddress {
    pub host: String,
    pub port: u16,
}

impl TryFrom<String> for EmulatorAddress {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        let (host, port) = value
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidIdentifier {
                value: value.clone(),
            })?;
        let port: u16 = port.parse().map_err(|_| ConfigError::InvalidPortNumber {
            port: port.to_string(),
        })?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// Full service configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: ListenerBaseUrl,
    pub project_id: ResourceSegment,
    pub location: ResourceSegment,
    pub queue: ResourceSegment,
    /// Scheduler location; defaults to the task location.
    pub scheduled_location: ResourceSegment,
    pub create_timeout: CreateTimeout,
    /// When set, the REST clients target this emulator over plain HTTP.
    pub emulator: Option<EmulatorAddress>,
    /// Bearer token for the hosted backends.
    pub api_token: Option<String>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Required: `TASK_LISTENER_BASE_URL`, `TASK_PROJECT_ID`, `TASK_LOCATION`,
    /// `TASK_QUEUE`. Optional: `SCHEDULED_LOCATION` (defaults to
    /// `TASK_LOCATION`), `TASK_CREATE_TIMEOUT_MS`, `CLOUD_TASKS_EMULATOR_HOST`
    /// + `CLOUD_TASKS_EMULATOR_PORT`, `GCP_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let base_url = ListenerBaseUrl::try_from(require("TASK_LISTENER_BASE_URL")?)?;
        let project_id = ResourceSegment::try_from(require("TASK_PROJECT_ID")?)?;
        let location = ResourceSegment::try_from(require("TASK_LOCATION")?)?;
        let queue = ResourceSegment::try_from(require("TASK_QUEUE")?)?;

        let scheduled_location = match optional("SCHEDULED_LOCATION") {
            Some(value) => ResourceSegment::try_from(value)?,
            None => location.clone(),
        };

        let create_timeout = match optional("TASK_CREATE_TIMEOUT_MS") {
            Some(value) => CreateTimeout::try_from(value)?,
            None => CreateTimeout::default(),
        };

        let emulator = match optional("CLOUD_TASKS_EMULATOR_HOST") {
            Some(host) => {
                let port = optional("CLOUD_TASKS_EMULATOR_PORT").unwrap_or_else(|| "8123".into());
                Some(EmulatorAddress::try_from(format!("{}:{}", host, port))?)
            }
            None => None,
        };

        Ok(Self {
            base_url,
            project_id,
            location,
            queue,
            scheduled_location,
            create_timeout,
            emulator,
            api_token: optional("GCP_API_TOKEN"),
        })
    }

    /// Queue path for the configured task queue.
    pub fn queue_path(&self) -> String {
        queue_path(
            self.project_id.as_str(),
            self.location.as_str(),
            self.queue.as_str(),
        )
    }

    /// Location path for the configured scheduler location.
    pub fn scheduled_location_path(&self) -> String {
        location_path(self.project_id.as_str(), self.scheduled_location.as_str())
    }
}

fn require(var_name: &str) -> Result<String> {
    std::env::var(var_name).map_err(|_| ConfigError::EnvVarRequired {
        var_name: var_name.to_string(),
    })
}

fn optional(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_validation() {
        assert!(ListenerBaseUrl::try_from("http://svc.example.com".to_string()).is_ok());
        assert!(ListenerBaseUrl::try_from("https://svc.example.com/base".to_string()).is_ok());
        assert!(ListenerBaseUrl::try_from("svc.example.com".to_string()).is_err());
        assert!(ListenerBaseUrl::try_from("ftp://svc.example.com".to_string()).is_err());
    }

    #[test]
    fn test_create_timeout_validation() {
        assert_eq!(
            CreateTimeout::try_from("2500".to_string())
                .unwrap()
                .duration(),
            Duration::from_millis(2500)
        );
        assert!(CreateTimeout::try_from("0".to_string()).is_err());
        assert!(CreateTimeout::try_from("fast".to_string()).is_err());
        assert_eq!(
            CreateTimeout::default().duration(),
            Duration::from_millis(10_000)
        );
    }

    #[test]
    fn test_resource_segment_validation() {
        assert!(ResourceSegment::try_from("sample-project".to_string()).is_ok());
        assert!(ResourceSegment::try_from("".to_string()).is_err());
        assert!(ResourceSegment::try_from("a/b".to_string()).is_err());
    }

    #[test]
    fn test_emulator_address_parsing() {
        let addr = EmulatorAddress::try_from("localhost:8123".to_string()).unwrap();
        assert_eq!(addr.host, "localhost");
        assert_eq!(addr.port, 8123);
        assert!(EmulatorAddress::try_from("localhost".to_string()).is_err());
        assert!(EmulatorAddress::try_from("localhost:banana".to_string()).is_err());
    }
}

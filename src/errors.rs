//! Error types for request reconstruction, configuration and submission.
//!
//! All error strings use the format: `error-taskroute-<domain>-<number> <message>`.
//! Build and config errors are local programmer errors and always surface before
//! any network call; backend errors propagate from the queue/scheduler clients
//! untouched.

use thiserror::Error;

/// Errors raised while reconstructing an HTTP request from a route descriptor.
///
/// These abort the submission before any network call and are never retried.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("error-taskroute-build-1 Required parameter missing: {name}")]
    MissingParameter { name: String },

    #[error("error-taskroute-build-2 Expected parameter {name} to be of type {expected}")]
    WrongType { name: String, expected: String },

    #[error("error-taskroute-build-3 {details}")]
    BadMethod { details: String },

    #[error("error-taskroute-build-4 Invalid base URL {url}: {details}")]
    InvalidBaseUrl { url: String, details: String },
}

/// Configuration errors raised while loading environment variables.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error-taskroute-config-1 Required environment variable not set: {var_name}")]
    EnvVarRequired { var_name: String },

    #[error("error-taskroute-config-2 Invalid base URL: {value}")]
    InvalidBaseUrl { value: String },

    #[error("error-taskroute-config-3 Invalid timeout value: {value}")]
    InvalidTimeout { value: String },

    #[error("error-taskroute-config-4 Invalid resource identifier: {value}")]
    InvalidIdentifier { value: String },

    #[error("error-taskroute-config-5 Invalid port number: {port}")]
    InvalidPortNumber { port: String },
}

/// Errors surfaced by `delay()` / `schedule()` and submitter construction.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("error-taskroute-submit-1 Request reconstruction failed: {0}")]
    Build(#[from] BuildError),

    #[error("error-taskroute-submit-2 Backend call failed: {0}")]
    Backend(#[from] crate::backend::BackendError),

    #[error("error-taskroute-submit-3 Invalid cron expression {expression}: {details}")]
    InvalidCron { expression: String, details: String },
}

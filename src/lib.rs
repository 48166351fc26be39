//! # taskroute
//!
//! taskroute lets an HTTP service declare endpoints as asynchronously
//! invocable tasks: instead of calling an endpoint directly, a caller
//! enqueues a request that a Cloud-Tasks-style queue delivers back to the
//! service over HTTP, optionally after a countdown or on a recurring cron
//! schedule via a Cloud-Scheduler-style backend.
//!
//! ## Architecture Overview
//!
//! The crate is built around three layers:
//!
//! ### Request reconstruction
//! - A [`route::RouteDescriptor`] captures what the routing layer knows
//!   about an endpoint: methods, path template and converters, parameter
//!   schemas, body schema
//! - The [`request::Requester`] deterministically rebuilds the HTTP request
//!   the endpoint would have received from call-time arguments, before any
//!   network call
//!
//! ### Submission
//! - [`delayer::Delayer`] wraps a reconstructed request into a task for
//!   immediate or countdown-delayed execution, with optional dedup by task
//!   id
//! - [`scheduler::Scheduler`] wraps it into a recurring-job definition and
//!   reconciles against backend state, replacing the job only when the
//!   definition materially changed
//! - [`hooks`] provides the pure pre-create transformation pipeline (OIDC
//!   identity tokens, dispatch deadlines, chaining)
//!
//! ### Backends
//! - [`backend::TaskQueueClient`] and [`backend::SchedulerClient`] are the
//!   seams to the remote services, with in-memory implementations for
//!   development and tests and REST implementations for the hosted services
//!
//! ## Configuration
//!
//! Services load settings from environment variables via
//! [`config::Config::from_env`]. Key variables: `TASK_LISTENER_BASE_URL`,
//! `TASK_PROJECT_ID`, `TASK_LOCATION`, `TASK_QUEUE`,
//! `CLOUD_TASKS_EMULATOR_HOST`.
//!
//! ## Error Handling
//!
//! All error strings use the format: `error-taskroute-<domain>-<number> <message>`.
//! Local reconstruction failures abort before any network call; backend
//! failures propagate to the caller untouched and are never retried locally.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use taskroute::{
//!     backend::memory::InMemoryTaskQueue,
//!     endpoints::DelayedRouteBuilder,
//!     route::{BodySpec, CallArguments, JsonType, RouteDescriptor},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Arc::new(InMemoryTaskQueue::new());
//!     let delayed = DelayedRouteBuilder::new(
//!         "http://listener.example.com",
//!         "projects/sample/locations/us-central1/queues/main",
//!         client,
//!     );
//!
//!     let on_user_create = delayed
//!         .register(
//!             RouteDescriptor::new("POST", "/on_user_create/{user_id}")
//!                 .unique_id("on_user_create")
//!                 .body(BodySpec::new("data", JsonType::Object)),
//!         )
//!         .await?;
//!
//!     on_user_create
//!         .delay(
//!             &CallArguments::new()
//!                 .arg("user_id", "007")
//!                 .arg("data", json!({"name": "Piyush"})),
//!         )
//!         .await?;
//!     Ok(())
//! }
//! ```

/// Backend client traits, wire models and the in-memory/REST
/// implementations.
pub mod backend;

/// Environment-driven configuration with validated newtype wrappers.
pub mod config;

pub(crate) mod constants;

/// Delay submitter: one-shot task creation with countdown and dedup.
pub mod delayer;

/// Route registration builders and the per-endpoint submission handles.
pub mod endpoints;

pub mod errors;

/// Pure pre-create transformation hooks (OIDC tokens, deadlines, chaining).
pub mod hooks;

/// Typed parsing of the dispatch headers the queue adds on delivery.
pub mod inbound;

/// Resource path helpers and idempotent queue provisioning.
pub mod queue;

/// The request reconstruction engine.
pub mod request;

/// Route descriptors and call-time arguments.
pub mod route;

/// Schedule submitter: recurring jobs with change-based reconciliation.
pub mod scheduler;

pub use delayer::{DelayOptions, Delayer};
pub use endpoints::{
    DelayOverrides, DelayedEndpoint, DelayedRouteBuilder, ScheduleOverrides, ScheduledEndpoint,
    ScheduledRouteBuilder,
};
pub use errors::{BuildError, ConfigError, SubmitError};
pub use request::{BuiltRequest, Requester};
pub use route::{BodySpec, CallArguments, JsonType, ParamSpec, RouteDescriptor};
pub use scheduler::{DeleteOutcome, ScheduleOptions, Scheduler};

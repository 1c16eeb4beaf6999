//! HTTP surface: CloudEvent intake, health, and metrics.

/// Problem response helpers and error types.
pub mod errors;
/// CloudEvent parsing for storage notifications.
pub mod event;
/// Route handlers.
pub mod handlers;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;

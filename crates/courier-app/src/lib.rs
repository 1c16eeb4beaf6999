#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Courier application bootstrap and HTTP event intake.
//!
//! Layout: `bootstrap.rs` (boot sequence), `context.rs` (process-wide state),
//! `http/` (CloudEvent intake, health, metrics), `error.rs` (startup errors).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Process-wide context shared by every invocation.
pub mod context;
/// Application error types.
pub mod error;
/// HTTP surface.
pub mod http;

pub use bootstrap::run_app;
pub use context::{AppContext, Backends, resolve_credential};
pub use error::{AppError, AppResult};
pub use http::handlers::HEADER_OUTCOME;
pub use http::router::CourierServer;

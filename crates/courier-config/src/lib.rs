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

//! Environment-backed configuration for the courier relocation functions.
//!
//! Layout: `model.rs` (typed settings), `validate.rs` (parsing and cross-field
//! checks), `loader.rs` (`CourierConfig::from_env` / `from_lookup`).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    CourierConfig, DelimiterRule, LogSettings, NamingMode, RelocationPolicy, RemoteEndpoint,
    SecretRefs, SecretService, ServerSettings, Timeouts, TransformPreset, TransportKind,
};

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

//! Secret resolution with CRC32C integrity verification.
//!
//! Layout: `secret.rs` (verified `Secret` values), `store.rs` (`SecretBackend`
//! seam and `SecretStore`), `http.rs` (Secret Manager REST backend).

pub mod error;
pub mod http;
pub mod secret;
pub mod store;

pub use error::{SecretError, SecretResult};
pub use http::{HttpSecretBackend, TokenSource, decode_access_response};
pub use secret::{Secret, SecretPayload, crc32c_checksum};
pub use store::{SecretBackend, SecretStore, secret_resource};

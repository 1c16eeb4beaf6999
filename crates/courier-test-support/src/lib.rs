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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (env lookups, credentials), secrets.rs (fake secret service),
//! storage.rs (counting object source), remote.rs (in-memory share transport).

pub mod fixtures;
pub mod remote;
pub mod secrets;
pub mod storage;

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

//! Object storage access for relocation: validated object references, the
//! per-bucket store registry, and the `ObjectSource` capability used by the
//! pipeline.

pub mod error;
pub mod object_ref;
pub mod registry;
pub mod source;

pub use error::{StorageError, StorageResult};
pub use object_ref::StorageObjectRef;
pub use registry::BucketRegistry;
pub use source::{ObjectSource, Precondition, StoreSource};

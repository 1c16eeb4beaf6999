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

//! Single-object relocation: naming, byte transforms, destination writers, and
//! the pipeline that ties them together.
//!
//! Layout: `naming.rs` (eligibility and destination names), `transform.rs`
//! (streaming substitutions), `writer/` (SMB, SFTP, same-store sinks),
//! `service.rs` (`RelocationPipeline`), `model.rs` (reports and deadlines).

pub mod error;
pub mod model;
pub mod naming;
pub mod service;
pub mod transform;
pub mod writer;

pub use error::{BoxError, ErrorKind, RelocateError, RelocateResult, TransportError};
pub use model::{
    Deadline, RelocationOutcome, RelocationReport, StepKind, StepRecord, StepStatus, TransferTask,
};
pub use naming::{DestinationNamer, Eligibility, NamingDecision, NamingPolicy, SkipReason};
pub use service::RelocationPipeline;
pub use transform::{ByteTransform, SubstitutingReader, SubstitutionRule};
pub use writer::{
    RemoteCredential, RemoteSession, RemoteWriter, SameStoreRewriter, SessionConnector,
    SessionGuard, ShareWriter, ensure_directory, parent_directory, remote_path,
};
#[cfg(feature = "sftp")]
pub use writer::{SftpConnector, SftpSession};
#[cfg(feature = "smb")]
pub use writer::{SmbConnector, SmbSession};

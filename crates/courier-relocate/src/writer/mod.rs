//! Destination writers.
//!
//! # Design
//! - `RemoteWriter` is the single seam the pipeline writes through; the
//!   deployment picks one variant (SMB share, SFTP server, same-store rewrite).
//! - Share transports are blocking clients. They implement `SessionConnector`
//!   and `RemoteSession`, and `ShareWriter` drives connect, ensure-directory,
//!   write, and close on a blocking thread.
//! - A `SessionGuard` closes the session on every exit path.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use courier_config::TransportKind;
use courier_secrets::Secret;
use tracing::{debug, warn};

use crate::error::{RelocateResult, TransportError};
use crate::model::TransferTask;

mod same_store;
mod share;
#[cfg(feature = "sftp")]
mod sftp;
#[cfg(feature = "smb")]
mod smb;

pub use same_store::SameStoreRewriter;
pub use share::ShareWriter;
#[cfg(feature = "sftp")]
pub use sftp::{SftpConnector, SftpSession};
#[cfg(feature = "smb")]
pub use smb::{SmbConnector, SmbSession};

/// Connection details for a share transport, resolved once at startup.
#[derive(Clone)]
pub struct RemoteCredential {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Verified password secret.
    pub password: Secret,
    /// Folder every destination is placed under; empty means share/home relative.
    pub root_folder: String,
    /// SMB share name.
    pub share: Option<String>,
}

impl RemoteCredential {
    /// `host:port` of the remote.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for RemoteCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredential")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("root_folder", &self.root_folder)
            .field("share", &self.share)
            .finish()
    }
}

/// Sink that places one payload at its destination.
#[async_trait]
pub trait RemoteWriter: Send + Sync {
    /// Transport this writer speaks.
    fn kind(&self) -> TransportKind;

    /// Write `task.payload` to `task.destination_name`, returning bytes written.
    ///
    /// # Errors
    ///
    /// Connect, authentication, directory, write, precondition, and deadline
    /// failures are returned as [`crate::RelocateError`].
    async fn deliver(&self, task: &TransferTask, deadline: Duration) -> RelocateResult<u64>;
}

/// Opens sessions against a share transport. Calls are blocking.
pub trait SessionConnector: Send + Sync + 'static {
    /// Session type produced by [`SessionConnector::connect`].
    type Session: RemoteSession;

    /// Transport this connector speaks.
    fn kind(&self) -> TransportKind;

    /// Connect, authenticate, and mount/open the share or subsystem.
    ///
    /// # Errors
    ///
    /// [`TransportError::Auth`] when credentials are refused,
    /// [`TransportError::Connect`] when the remote is unreachable.
    fn connect(
        &self,
        credential: &RemoteCredential,
        timeout: Duration,
    ) -> Result<Self::Session, TransportError>;
}

/// An open, exclusively owned session. Calls are blocking.
pub trait RemoteSession {
    /// Whether `path` exists and is a directory; a missing path is `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Operation`] when the check itself fails.
    fn is_dir(&mut self, path: &str) -> Result<bool, TransportError>;

    /// Create one directory whose parent exists.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Operation`] when the directory cannot be created.
    fn create_dir(&mut self, path: &str) -> Result<(), TransportError>;

    /// Create or truncate `path` and write all of `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Operation`] when the file cannot be written.
    fn write_file(&mut self, path: &str, payload: &[u8]) -> Result<u64, TransportError>;

    /// Release the session (unmount, log off, close socket).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Operation`] when the remote rejects the shutdown.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Closes the wrapped session when dropped unless it was closed explicitly.
pub struct SessionGuard<S: RemoteSession> {
    session: Option<S>,
}

impl<S: RemoteSession> SessionGuard<S> {
    /// Take ownership of `session`.
    pub const fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Borrow the session.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Operation`] if the session was already closed.
    pub fn session(&mut self) -> Result<&mut S, TransportError> {
        self.session
            .as_mut()
            .ok_or_else(|| TransportError::operation("session", "", "session already closed"))
    }

    /// Close the session now and report the result.
    ///
    /// # Errors
    ///
    /// Returns the session's close error.
    pub fn close(mut self) -> Result<(), TransportError> {
        self.session.take().map_or(Ok(()), |mut session| session.close())
    }
}

impl<S: RemoteSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.close() {
                warn!(error = %err, "remote session close failed");
            } else {
                debug!("remote session released");
            }
        }
    }
}

/// Make sure `directory` and all of its ancestors exist.
///
/// A failed create counts as success when the directory exists afterwards, so
/// concurrent invocations creating the same tree do not fail each other.
///
/// # Errors
///
/// Returns the create error when the directory is still missing.
pub fn ensure_directory<S: RemoteSession + ?Sized>(
    session: &mut S,
    directory: &str,
) -> Result<(), TransportError> {
    let trimmed = directory.trim_end_matches('/');
    if trimmed.is_empty() || session.is_dir(trimmed)? {
        return Ok(());
    }
    for ancestor in ancestors(trimmed) {
        if session.is_dir(ancestor)? {
            continue;
        }
        if let Err(err) = session.create_dir(ancestor) {
            if session.is_dir(ancestor)? {
                debug!(path = ancestor, "directory created concurrently");
                continue;
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Prefixes of `path` ending at each separator, shortest first, then `path` itself.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.char_indices()
        .filter(|(index, ch)| *ch == '/' && *index > 0)
        .map(move |(index, _)| &path[..index])
        .chain(std::iter::once(path))
}

/// Remote path of `name` under `root`; an empty root leaves `name` share-relative.
#[must_use]
pub fn remote_path(root: &str, name: &str) -> String {
    let root = root.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if root.is_empty() {
        name.to_string()
    } else {
        format!("{root}/{name}")
    }
}

/// Parent directory of a remote path, empty when there is none.
#[must_use]
pub fn parent_directory(path: &str) -> &str {
    path.rfind('/').map_or("", |index| &path[..index])
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct MemorySession {
        dirs: BTreeSet<String>,
        files: Vec<(String, Vec<u8>)>,
        racing: Option<String>,
        closed: Arc<AtomicUsize>,
        log: Vec<String>,
    }

    impl RemoteSession for MemorySession {
        fn is_dir(&mut self, path: &str) -> Result<bool, TransportError> {
            Ok(self.dirs.contains(path))
        }

        fn create_dir(&mut self, path: &str) -> Result<(), TransportError> {
            self.log.push(format!("mkdir {path}"));
            if self.racing.as_deref() == Some(path) {
                self.dirs.insert(path.to_string());
                return Err(TransportError::operation("create_dir", path, "exists"));
            }
            self.dirs.insert(path.to_string());
            Ok(())
        }

        fn write_file(&mut self, path: &str, payload: &[u8]) -> Result<u64, TransportError> {
            self.files.push((path.to_string(), payload.to_vec()));
            Ok(payload.len() as u64)
        }

        fn close(&mut self) -> Result<(), TransportError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn remote_path_joins_root_and_name() {
        assert_eq!(remote_path("", "a/b.csv"), "a/b.csv");
        assert_eq!(remote_path("/inbound/", "a/b.csv"), "/inbound/a/b.csv");
        assert_eq!(remote_path("exports", "/b.csv"), "exports/b.csv");
        assert_eq!(parent_directory("/inbound/a/b.csv"), "/inbound/a");
        assert_eq!(parent_directory("b.csv"), "");
    }

    #[test]
    fn ancestors_walk_shortest_first() {
        let relative: Vec<&str> = ancestors("a/b/c").collect();
        assert_eq!(relative, ["a", "a/b", "a/b/c"]);
        let absolute: Vec<&str> = ancestors("/in/x").collect();
        assert_eq!(absolute, ["/in", "/in/x"]);
    }

    #[test]
    fn ensure_directory_creates_missing_ancestors_once() -> Result<(), TransportError> {
        let mut session = MemorySession::default();
        session.dirs.insert("/in".into());
        ensure_directory(&mut session, "/in/a/b")?;
        assert_eq!(session.log, ["mkdir /in/a", "mkdir /in/a/b"]);

        ensure_directory(&mut session, "/in/a/b/")?;
        assert_eq!(session.log.len(), 2);
        ensure_directory(&mut session, "")?;
        Ok(())
    }

    #[test]
    fn ensure_directory_tolerates_concurrent_creation() -> Result<(), TransportError> {
        let mut session = MemorySession {
            racing: Some("x/y".into()),
            ..MemorySession::default()
        };
        ensure_directory(&mut session, "x/y")?;
        assert!(session.dirs.contains("x/y"));
        Ok(())
    }

    #[test]
    fn guard_closes_exactly_once_on_every_path() -> Result<(), TransportError> {
        let closed = Arc::new(AtomicUsize::new(0));
        let session = || MemorySession {
            closed: closed.clone(),
            ..MemorySession::default()
        };

        let mut guard = SessionGuard::new(session());
        guard.session()?.write_file("a", b"x")?;
        guard.close()?;
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        let early_exit = || -> Result<(), TransportError> {
            let mut guard = SessionGuard::new(session());
            guard.session()?;
            Err(TransportError::operation("write_file", "a", "disk full"))
        };
        assert!(early_exit().is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 2);
        Ok(())
    }
}

//! Writer for blocking share transports (SMB, SFTP).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use courier_config::TransportKind;
use tracing::{debug, info, warn};

use super::{
    RemoteCredential, RemoteSession, RemoteWriter, SessionConnector, SessionGuard,
    ensure_directory, parent_directory, remote_path,
};
use crate::error::{RelocateError, RelocateResult, TransportError};
use crate::model::TransferTask;

/// [`RemoteWriter`] that runs one session per delivery on a blocking thread.
///
/// If the deadline elapses the caller gets a timeout immediately; the blocking
/// task keeps ownership of the session and its guard closes it when the
/// in-flight client call returns.
pub struct ShareWriter<C: SessionConnector> {
    connector: Arc<C>,
    credential: Arc<RemoteCredential>,
}

impl<C: SessionConnector> ShareWriter<C> {
    /// Writer using `connector` with a credential resolved at startup.
    #[must_use]
    pub const fn new(connector: Arc<C>, credential: Arc<RemoteCredential>) -> Self {
        Self {
            connector,
            credential,
        }
    }

    /// Credential shared by every delivery.
    #[must_use]
    pub fn credential(&self) -> &RemoteCredential {
        &self.credential
    }
}

#[async_trait]
impl<C: SessionConnector> RemoteWriter for ShareWriter<C> {
    fn kind(&self) -> TransportKind {
        self.connector.kind()
    }

    async fn deliver(&self, task: &TransferTask, deadline: Duration) -> RelocateResult<u64> {
        let connector = Arc::clone(&self.connector);
        let credential = Arc::clone(&self.credential);
        let path = remote_path(&credential.root_folder, &task.destination_name);
        let payload = task.payload.clone();
        let object = task.source.to_string();

        debug!(
            transport = self.kind().as_str(),
            endpoint = %credential.endpoint(),
            path = %path,
            "starting remote delivery"
        );
        let worker_path = path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            deliver_blocking(connector.as_ref(), &credential, &worker_path, &payload, deadline)
        });

        match tokio::time::timeout(deadline, handle).await {
            Err(_) => {
                warn!(object = %object, path = %path, "remote delivery timed out");
                Err(RelocateError::Timeout {
                    operation: "write",
                    object,
                    budget: deadline,
                })
            }
            Ok(Err(source)) => Err(RelocateError::Join {
                operation: "write",
                object,
                source,
            }),
            Ok(Ok(Err(source))) => Err(RelocateError::transport("write", object, source)),
            Ok(Ok(Ok(written))) => {
                info!(
                    transport = self.kind().as_str(),
                    path = %path,
                    bytes = written,
                    "remote delivery complete"
                );
                Ok(written)
            }
        }
    }
}

fn deliver_blocking<C: SessionConnector>(
    connector: &C,
    credential: &RemoteCredential,
    path: &str,
    payload: &Bytes,
    timeout: Duration,
) -> Result<u64, TransportError> {
    let mut guard = SessionGuard::new(connector.connect(credential, timeout)?);
    let session = guard.session()?;
    ensure_directory(session, parent_directory(path))?;
    let written = session.write_file(path, payload)?;
    guard.close()?;
    Ok(written)
}

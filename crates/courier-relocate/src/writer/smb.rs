//! SMB share sessions backed by `pavao` (libsmbclient).

use std::io::{self, Write};
use std::time::Duration;

use courier_config::TransportKind;
use pavao::{SmbClient, SmbCredentials, SmbError, SmbMode, SmbOpenOptions, SmbOptions};
use tracing::debug;

use super::{RemoteCredential, RemoteSession, SessionConnector};
use crate::error::TransportError;

const DIRECTORY_MODE: u32 = 0o755;

/// Opens authenticated SMB sessions against one share.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmbConnector;

impl SessionConnector for SmbConnector {
    type Session = SmbSession;

    fn kind(&self) -> TransportKind {
        TransportKind::Smb
    }

    fn connect(
        &self,
        credential: &RemoteCredential,
        timeout: Duration,
    ) -> Result<SmbSession, TransportError> {
        let endpoint = credential.endpoint();
        let share = credential.share.as_deref().unwrap_or_default();
        let credentials = SmbCredentials::default()
            .server(format!("smb://{endpoint}"))
            .share(absolute(share))
            .username(credential.username.as_str())
            .password(credential.password.expose());
        let client = SmbClient::new(credentials, SmbOptions::default()).map_err(|source| {
            TransportError::Connect {
                endpoint: endpoint.clone(),
                source: source.into(),
            }
        })?;
        client
            .set_timeout(timeout)
            .map_err(|err| connect_failure(&endpoint, err))?;

        // libsmbclient connects lazily; stat the share root.
        client
            .stat("/")
            .map_err(|err| connect_failure(&endpoint, err))?;
        debug!(endpoint = %endpoint, share, "smb share mounted");
        Ok(SmbSession {
            client: Some(client),
        })
    }
}

/// One mounted share; the client context is freed on close.
pub struct SmbSession {
    client: Option<SmbClient>,
}

impl SmbSession {
    fn client(&self, operation: &'static str, path: &str) -> Result<&SmbClient, TransportError> {
        self.client
            .as_ref()
            .ok_or_else(|| TransportError::operation(operation, path, "session closed"))
    }
}

impl RemoteSession for SmbSession {
    fn is_dir(&mut self, path: &str) -> Result<bool, TransportError> {
        let target = absolute(path);
        match self.client("stat", path)?.stat(target.as_str()) {
            Ok(stat) => Ok(stat.mode.is_dir()),
            Err(err) => match io_kind(&err) {
                Some(io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => Ok(false),
                _ => Err(TransportError::operation("stat", target, err)),
            },
        }
    }

    fn create_dir(&mut self, path: &str) -> Result<(), TransportError> {
        let target = absolute(path);
        self.client("create_dir", path)?
            .mkdir(target.as_str(), SmbMode::from(DIRECTORY_MODE))
            .map_err(|source| TransportError::operation("create_dir", target, source))
    }

    fn write_file(&mut self, path: &str, payload: &[u8]) -> Result<u64, TransportError> {
        let target = absolute(path);
        let mut file = self
            .client("write_file", path)?
            .open_with(
                target.as_str(),
                SmbOpenOptions::default()
                    .create(true)
                    .write(true)
                    .truncate(true),
            )
            .map_err(|source| TransportError::operation("open_file", target.as_str(), source))?;
        let mut reader = payload;
        let written = io::copy(&mut reader, &mut file)
            .map_err(|source| TransportError::operation("write_file", target.as_str(), source))?;
        file.flush()
            .map_err(|source| TransportError::operation("write_file", target, source))?;
        Ok(written)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        drop(self.client.take());
        Ok(())
    }
}

/// libsmbclient paths are share-rooted and must start with `/`.
fn absolute(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// OS error kind carried by a client error.
///
/// `SmbError::Io` does not expose its `io::Error` through `source()`, so the
/// variant is matched directly.
fn io_kind(err: &SmbError) -> Option<io::ErrorKind> {
    match err {
        SmbError::Io(io) => Some(io.kind()),
        _ => None,
    }
}

/// Refused credentials become [`TransportError::Auth`], anything else is a connect failure.
fn connect_failure(endpoint: &str, err: SmbError) -> TransportError {
    let endpoint = endpoint.to_string();
    if io_kind(&err) == Some(io::ErrorKind::PermissionDenied) {
        TransportError::Auth {
            endpoint,
            source: err.into(),
        }
    } else {
        TransportError::Connect {
            endpoint,
            source: err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn paths_are_share_rooted() {
        assert_eq!(absolute("in/a.csv"), "/in/a.csv");
        assert_eq!(absolute("/in"), "/in");
        assert_eq!(absolute(""), "/");
    }

    #[test]
    fn io_kind_reads_the_wrapped_os_error() {
        let missing = SmbError::Io(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(io_kind(&missing), Some(io::ErrorKind::NotFound));
        assert_eq!(io_kind(&SmbError::BadValue), None);
    }

    #[test]
    fn refused_credentials_are_auth_failures() {
        let denied = SmbError::Io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(
            connect_failure("files:445", denied).kind(),
            ErrorKind::Auth
        );
        let refused = SmbError::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(
            connect_failure("files:445", refused).kind(),
            ErrorKind::Connect
        );
        assert_eq!(
            connect_failure("files:445", SmbError::Mutex).kind(),
            ErrorKind::Connect
        );
    }
}

//! SFTP sessions backed by `ssh2` (libssh2).
//!
//! # Design
//! - Password authentication only; the server host key is not verified.
//! - The socket timeout bounds every blocking libssh2 call of the session.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use courier_config::TransportKind;
use ssh2::{ErrorCode, OpenFlags, OpenType, Session, Sftp};
use tracing::debug;

use super::{RemoteCredential, RemoteSession, SessionConnector};
use crate::error::TransportError;

const DIRECTORY_MODE: i32 = 0o755;
const FILE_MODE: i32 = 0o644;
/// `LIBSSH2_FX_NO_SUCH_FILE`.
const SFTP_NO_SUCH_FILE: i32 = 2;

/// Opens password-authenticated SFTP sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SftpConnector;

impl SessionConnector for SftpConnector {
    type Session = SftpSession;

    fn kind(&self) -> TransportKind {
        TransportKind::Sftp
    }

    fn connect(
        &self,
        credential: &RemoteCredential,
        timeout: Duration,
    ) -> Result<SftpSession, TransportError> {
        let endpoint = credential.endpoint();
        let connect_err = |source: ssh2::Error| TransportError::Connect {
            endpoint: endpoint.clone(),
            source: source.into(),
        };

        let address = resolve(&credential.host, credential.port).map_err(|source| {
            TransportError::Connect {
                endpoint: endpoint.clone(),
                source: source.into(),
            }
        })?;
        let stream = TcpStream::connect_timeout(&address, timeout).map_err(|source| {
            TransportError::Connect {
                endpoint: endpoint.clone(),
                source: source.into(),
            }
        })?;

        let mut session = Session::new().map_err(connect_err)?;
        session.set_tcp_stream(stream);
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake().map_err(connect_err)?;
        session
            .userauth_password(&credential.username, credential.password.expose())
            .map_err(|source| TransportError::Auth {
                endpoint: endpoint.clone(),
                source: source.into(),
            })?;
        let sftp = session.sftp().map_err(connect_err)?;
        debug!(endpoint = %endpoint, "sftp subsystem opened");
        Ok(SftpSession {
            session,
            sftp: Some(sftp),
        })
    }
}

/// One authenticated SSH connection with its SFTP channel.
pub struct SftpSession {
    session: Session,
    sftp: Option<Sftp>,
}

impl SftpSession {
    fn sftp(&self, operation: &'static str, path: &str) -> Result<&Sftp, TransportError> {
        self.sftp
            .as_ref()
            .ok_or_else(|| TransportError::operation(operation, path, "session closed"))
    }
}

impl RemoteSession for SftpSession {
    fn is_dir(&mut self, path: &str) -> Result<bool, TransportError> {
        match self.sftp("stat", path)?.stat(Path::new(path)) {
            Ok(stat) => Ok(stat.is_dir()),
            Err(err) if err.code() == ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => Ok(false),
            Err(source) => Err(TransportError::operation("stat", path, source)),
        }
    }

    fn create_dir(&mut self, path: &str) -> Result<(), TransportError> {
        self.sftp("create_dir", path)?
            .mkdir(Path::new(path), DIRECTORY_MODE)
            .map_err(|source| TransportError::operation("create_dir", path, source))
    }

    fn write_file(&mut self, path: &str, payload: &[u8]) -> Result<u64, TransportError> {
        let mut file = self
            .sftp("write_file", path)?
            .open_mode(
                Path::new(path),
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
                FILE_MODE,
                OpenType::File,
            )
            .map_err(|source| TransportError::operation("open_file", path, source))?;
        file.write_all(payload)
            .and_then(|()| file.flush())
            .map_err(|source| TransportError::operation("write_file", path, source))?;
        Ok(payload.len() as u64)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        drop(self.sftp.take());
        self.session
            .disconnect(None, "courier done", None)
            .map_err(|source| TransportError::operation("disconnect", "", source))
    }
}

fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host resolved to no address"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_accepts_literal_addresses() -> io::Result<()> {
        let address = resolve("127.0.0.1", 2222)?;
        assert_eq!(address.port(), 2222);
        assert!(address.ip().is_loopback());
        Ok(())
    }

    #[test]
    fn connect_to_closed_port_is_a_connect_error() -> anyhow::Result<()> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);

        let credential = RemoteCredential {
            host: "127.0.0.1".into(),
            port,
            username: "courier".into(),
            password: courier_secrets::Secret::verify(
                "pw",
                courier_secrets::SecretPayload::checksummed(b"hunter2".to_vec()),
            )?,
            root_folder: String::new(),
            share: None,
        };
        let err = SftpConnector
            .connect(&credential, Duration::from_secs(2))
            .err()
            .ok_or_else(|| anyhow::anyhow!("connect unexpectedly succeeded"))?;
        assert!(matches!(err, TransportError::Connect { .. }));
        Ok(())
    }
}

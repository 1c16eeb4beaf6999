//! In-memory share transport implementing the session seams.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use courier_config::TransportKind;
use courier_relocate::{RemoteCredential, RemoteSession, SessionConnector, TransportError};

/// Failure injected into [`FakeConnector::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// Credentials refused.
    Auth,
    /// Host unreachable.
    Unreachable,
}

#[derive(Debug, Default)]
struct State {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    connects: usize,
    closes: usize,
    writes: usize,
    connect_failure: Option<ConnectFailure>,
    fail_writes: bool,
    write_delay: Option<Duration>,
    last_credential: Option<(String, String)>,
}

/// Shared remote filesystem observed by tests and mutated by fake sessions.
#[derive(Debug, Clone, Default)]
pub struct FakeRemoteFs {
    state: Arc<Mutex<State>>,
}

impl FakeRemoteFs {
    /// Empty filesystem with no injected failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pre-create a directory.
    pub fn add_dir(&self, path: &str) {
        self.state().dirs.insert(path.to_string());
    }

    /// Fail the next connects with `failure`, or stop failing with `None`.
    pub fn fail_connect(&self, failure: Option<ConnectFailure>) {
        self.state().connect_failure = failure;
    }

    /// Fail every file write.
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Sleep this long inside every file write.
    pub fn delay_writes(&self, delay: Option<Duration>) {
        self.state().write_delay = delay;
    }

    /// Content of `path`, if written.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    /// Paths of all written files, sorted.
    #[must_use]
    pub fn file_paths(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }

    /// Whether `path` exists as a directory.
    #[must_use]
    pub fn has_dir(&self, path: &str) -> bool {
        self.state().dirs.contains(path)
    }

    /// Sessions opened so far.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.state().connects
    }

    /// Sessions closed so far.
    #[must_use]
    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Completed file writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.state().writes
    }

    /// Host and username of the most recent connect.
    #[must_use]
    pub fn last_login(&self) -> Option<(String, String)> {
        self.state().last_credential.clone()
    }
}

/// [`SessionConnector`] opening sessions on a [`FakeRemoteFs`].
#[derive(Debug, Clone)]
pub struct FakeConnector {
    fs: FakeRemoteFs,
    kind: TransportKind,
}

impl FakeConnector {
    /// Connector reporting `kind` over `fs`.
    #[must_use]
    pub const fn new(fs: FakeRemoteFs, kind: TransportKind) -> Self {
        Self { fs, kind }
    }
}

impl SessionConnector for FakeConnector {
    type Session = FakeSession;

    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn connect(
        &self,
        credential: &RemoteCredential,
        _timeout: Duration,
    ) -> Result<FakeSession, TransportError> {
        let mut state = self.fs.state();
        state.last_credential = Some((credential.host.clone(), credential.username.clone()));
        match state.connect_failure {
            Some(ConnectFailure::Auth) => Err(TransportError::Auth {
                endpoint: credential.endpoint(),
                source: "permission denied".into(),
            }),
            Some(ConnectFailure::Unreachable) => Err(TransportError::Connect {
                endpoint: credential.endpoint(),
                source: "connection refused".into(),
            }),
            None => {
                state.connects += 1;
                Ok(FakeSession {
                    fs: self.fs.clone(),
                })
            }
        }
    }
}

/// Session over a [`FakeRemoteFs`]; counts its close.
#[derive(Debug)]
pub struct FakeSession {
    fs: FakeRemoteFs,
}

impl RemoteSession for FakeSession {
    fn is_dir(&mut self, path: &str) -> Result<bool, TransportError> {
        Ok(self.fs.has_dir(path))
    }

    fn create_dir(&mut self, path: &str) -> Result<(), TransportError> {
        let mut state = self.fs.state();
        let parent = path.rfind('/').map_or("", |index| &path[..index]);
        if !parent.is_empty() && !state.dirs.contains(parent) {
            return Err(TransportError::operation("create_dir", path, "parent missing"));
        }
        if !state.dirs.insert(path.to_string()) {
            return Err(TransportError::operation("create_dir", path, "already exists"));
        }
        Ok(())
    }

    fn write_file(&mut self, path: &str, payload: &[u8]) -> Result<u64, TransportError> {
        let delay = self.fs.state().write_delay;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        let mut state = self.fs.state();
        if state.fail_writes {
            return Err(TransportError::operation("write_file", path, "disk full"));
        }
        state.files.insert(path.to_string(), payload.to_vec());
        state.writes += 1;
        Ok(payload.len() as u64)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.fs.state().closes += 1;
        Ok(())
    }
}

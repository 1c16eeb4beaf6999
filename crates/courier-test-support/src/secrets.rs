//! In-memory secret service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use courier_secrets::{SecretBackend, SecretError, SecretPayload, SecretResult};

/// [`SecretBackend`] serving payloads from a map and counting every access.
#[derive(Debug, Default)]
pub struct FakeSecretBackend {
    payloads: Mutex<HashMap<String, SecretPayload>>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl FakeSecretBackend {
    /// Empty backend; every name is missing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `name` with a matching checksum.
    pub fn insert(&self, name: &str, value: &str) {
        self.insert_payload(name, SecretPayload::checksummed(value));
    }

    /// Store a raw payload, checksum included as given.
    pub fn insert_payload(&self, name: &str, payload: SecretPayload) {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), payload);
    }

    /// Make every access fail as if the service were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of access attempts so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretBackend for FakeSecretBackend {
    async fn access_secret(&self, name: &str) -> SecretResult<SecretPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SecretError::Unavailable {
                name: name.to_string(),
                detail: "fake_unavailable",
                status: Some(503),
            });
        }
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                name: name.to_string(),
            })
    }
}

//! Secret backend seam and the verifying store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{SecretError, SecretResult};
use crate::secret::{Secret, SecretPayload};

/// Capability trait over a secret service.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Fetch the raw payload of one secret version.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::NotFound`] when the version does not exist and a
    /// reachability error when the service cannot be contacted.
    async fn access_secret(&self, name: &str) -> SecretResult<SecretPayload>;
}

/// Resolves secret resource names to verified values.
#[derive(Clone)]
pub struct SecretStore {
    backend: Arc<dyn SecretBackend>,
    timeout: Duration,
}

impl SecretStore {
    /// Create a store over `backend`, bounding each call by `timeout`.
    #[must_use]
    pub fn new(backend: Arc<dyn SecretBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Resolve one secret and verify its checksum. No retry is attempted.
    ///
    /// # Errors
    ///
    /// Returns the backend error, [`SecretError::Timeout`] when the deadline
    /// elapses, or a verification error from [`Secret::verify`].
    pub async fn resolve(&self, name: &str) -> SecretResult<Secret> {
        let payload = tokio::time::timeout(self.timeout, self.backend.access_secret(name))
            .await
            .map_err(|_| SecretError::Timeout {
                name: name.to_string(),
                budget: self.timeout,
            })?
            .inspect_err(|err| warn!(secret = %name, error = %err, "secret access failed"))?;

        let secret = Secret::verify(name, payload)
            .inspect_err(|err| warn!(secret = %name, error = %err, "secret rejected"))?;
        debug!(secret = %name, "secret resolved");
        Ok(secret)
    }

    /// Resolve several secrets in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by [`SecretStore::resolve`].
    pub async fn resolve_all<'a, I>(&self, names: I) -> SecretResult<Vec<Secret>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolved = Vec::new();
        for name in names {
            resolved.push(self.resolve(name).await?);
        }
        Ok(resolved)
    }
}

/// Build the resource name of the latest version of `secret` in `project`.
#[must_use]
pub fn secret_resource(project: &str, secret: &str) -> String {
    format!("projects/{project}/secrets/{secret}/versions/latest")
}

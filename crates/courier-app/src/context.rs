//! Process-wide context built once before the listener binds.
//!
//! # Design
//! - Secrets are resolved once; the credential is shared read-only for the
//!   process lifetime and never refreshed.
//! - Backends are injected through `Backends` so tests assemble the same
//!   context over in-memory stores and fake secret services.

use std::sync::Arc;

use courier_config::{CourierConfig, RemoteEndpoint, SecretRefs, TransportKind};
use courier_relocate::{RelocationPipeline, RemoteCredential, RemoteWriter, SameStoreRewriter};
use courier_secrets::{HttpSecretBackend, Secret, SecretBackend, SecretStore, TokenSource};
use courier_storage::{BucketRegistry, ObjectSource, StoreSource};
use courier_telemetry::Metrics;
use tracing::info;

use crate::error::{AppError, AppResult};

/// External services the context is assembled from.
pub struct Backends {
    /// Object access for every configured bucket.
    pub source: Arc<dyn ObjectSource>,
    /// Secret service used for startup credential resolution.
    pub secrets: Arc<dyn SecretBackend>,
}

impl Backends {
    /// Production backends: GCS handles per bucket and the Secret Manager REST API.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Storage`] when a bucket handle cannot be built.
    pub fn from_config(config: &CourierConfig) -> AppResult<Self> {
        let registry = BucketRegistry::gcs(&config.buckets)
            .map_err(|err| AppError::storage("registry.gcs", err))?;
        let secrets = HttpSecretBackend::new(
            config.secret_service.endpoint.clone(),
            TokenSource::from_token(config.secret_service.token.clone()),
        );
        Ok(Self {
            source: Arc::new(StoreSource::new(registry)),
            secrets: Arc::new(secrets),
        })
    }
}

/// Immutable state shared by every invocation.
#[derive(Clone)]
pub struct AppContext {
    pipeline: RelocationPipeline,
    metrics: Metrics,
    credential: Option<Arc<RemoteCredential>>,
}

impl AppContext {
    /// Build the context with production backends.
    ///
    /// # Errors
    ///
    /// Returns the first storage, secret, or transport setup failure.
    pub async fn build(config: &CourierConfig, metrics: Metrics) -> AppResult<Self> {
        let backends = Backends::from_config(config)?;
        Self::assemble(config, backends, metrics).await
    }

    /// Build the context over the given backends.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::TransportUnavailable`] when the transport was not
    /// compiled in, [`AppError::Secrets`] when a credential secret fails, and
    /// [`AppError::Relocate`] when the naming policy is incomplete.
    pub async fn assemble(
        config: &CourierConfig,
        backends: Backends,
        metrics: Metrics,
    ) -> AppResult<Self> {
        let (writer, credential): (Arc<dyn RemoteWriter>, _) = match config.transport {
            TransportKind::SameStore => (
                Arc::new(SameStoreRewriter::new(Arc::clone(&backends.source))),
                None,
            ),
            kind @ (TransportKind::Smb | TransportKind::Sftp) => {
                ensure_compiled(kind)?;
                let store = SecretStore::new(backends.secrets, config.timeouts.secret);
                let credential =
                    Arc::new(resolve_credential(&config.remote, &config.secrets, &store).await?);
                (share_writer(kind, Arc::clone(&credential))?, Some(credential))
            }
        };

        let pipeline = RelocationPipeline::from_policy(
            backends.source,
            writer,
            &config.policy,
            config.timeouts,
            metrics.clone(),
        )
        .map_err(|err| AppError::relocate("pipeline.from_policy", err))?;

        info!(
            transport = config.transport.as_str(),
            buckets = config.buckets.len(),
            remote = %credential
                .as_deref()
                .map(RemoteCredential::endpoint)
                .unwrap_or_default(),
            "courier context ready"
        );
        Ok(Self {
            pipeline,
            metrics,
            credential,
        })
    }

    /// Relocation pipeline shared by every invocation.
    #[must_use]
    pub const fn pipeline(&self) -> &RelocationPipeline {
        &self.pipeline
    }

    /// Metrics registry.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Credential resolved at startup, for share transports.
    #[must_use]
    pub fn credential(&self) -> Option<&RemoteCredential> {
        self.credential.as_deref()
    }
}

/// Resolve host, username, and password for a share transport.
///
/// Secret overrides win over plain settings; secrets are resolved in the order
/// host, username, password.
///
/// # Errors
///
/// Returns [`AppError::Secrets`] for any secret failure and
/// [`AppError::InvalidConfig`] when a value is missing or blank.
pub async fn resolve_credential(
    remote: &RemoteEndpoint,
    refs: &SecretRefs,
    store: &SecretStore,
) -> AppResult<RemoteCredential> {
    let host = setting_or_secret(
        store,
        remote.host.as_deref(),
        refs.host.as_deref(),
        "COURIER_REMOTE_HOST",
    )
    .await?;
    let username = setting_or_secret(
        store,
        remote.username.as_deref(),
        refs.username.as_deref(),
        "COURIER_REMOTE_USER",
    )
    .await?;
    let password_ref = refs.password.as_deref().ok_or(AppError::InvalidConfig {
        field: "COURIER_PASSWORD_SECRET",
        reason: "missing",
        value: None,
    })?;
    let password = store
        .resolve(password_ref)
        .await
        .map_err(|err| AppError::secrets("secrets.password", err))?;

    Ok(RemoteCredential {
        host,
        port: remote.port,
        username,
        password,
        root_folder: remote.root_folder.clone(),
        share: remote.share.clone(),
    })
}

async fn setting_or_secret(
    store: &SecretStore,
    setting: Option<&str>,
    secret_ref: Option<&str>,
    field: &'static str,
) -> AppResult<String> {
    let value = match secret_ref {
        Some(name) => store
            .resolve(name)
            .await
            .map(Secret::into_inner)
            .map_err(|err| AppError::secrets("secrets.override", err))?,
        None => setting.unwrap_or_default().to_string(),
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidConfig {
            field,
            reason: "missing",
            value: None,
        });
    }
    Ok(trimmed.to_string())
}

fn ensure_compiled(kind: TransportKind) -> AppResult<()> {
    let compiled = match kind {
        TransportKind::Smb => cfg!(feature = "smb"),
        TransportKind::Sftp => cfg!(feature = "sftp"),
        TransportKind::SameStore => true,
    };
    if compiled {
        Ok(())
    } else {
        Err(AppError::TransportUnavailable {
            transport: kind.as_str(),
            feature: kind.as_str(),
        })
    }
}

#[allow(clippy::unnecessary_wraps, clippy::needless_pass_by_value)]
#[cfg_attr(
    not(any(feature = "smb", feature = "sftp")),
    allow(unused_variables)
)]
fn share_writer(
    kind: TransportKind,
    credential: Arc<RemoteCredential>,
) -> AppResult<Arc<dyn RemoteWriter>> {
    match kind {
        #[cfg(feature = "smb")]
        TransportKind::Smb => Ok(Arc::new(courier_relocate::ShareWriter::new(
            Arc::new(courier_relocate::SmbConnector),
            credential,
        ))),
        #[cfg(feature = "sftp")]
        TransportKind::Sftp => Ok(Arc::new(courier_relocate::ShareWriter::new(
            Arc::new(courier_relocate::SftpConnector),
            credential,
        ))),
        other => Err(AppError::TransportUnavailable {
            transport: other.as_str(),
            feature: other.as_str(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_store_is_always_compiled() {
        assert!(ensure_compiled(TransportKind::SameStore).is_ok());
    }

    #[cfg(not(any(feature = "smb", feature = "sftp")))]
    #[test]
    fn share_writer_without_transport_features_is_unavailable() -> anyhow::Result<()> {
        use courier_secrets::SecretPayload;

        let credential = Arc::new(RemoteCredential {
            host: "files.example.internal".into(),
            port: 445,
            username: "courier".into(),
            password: Secret::verify("password", SecretPayload::checksummed("hunter2"))?,
            root_folder: String::new(),
            share: Some("exports".into()),
        });
        for kind in [TransportKind::Smb, TransportKind::Sftp] {
            assert!(matches!(
                share_writer(kind, Arc::clone(&credential)),
                Err(AppError::TransportUnavailable { .. })
            ));
        }
        Ok(())
    }

    #[cfg(not(feature = "sftp"))]
    #[test]
    fn sftp_without_feature_is_rejected() {
        assert!(matches!(
            ensure_compiled(TransportKind::Sftp),
            Err(AppError::TransportUnavailable {
                transport: "sftp",
                ..
            })
        ));
    }
}

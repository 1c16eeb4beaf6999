//! # Design
//!
//! - Centralize startup errors for configuration, secrets, storage, and serving.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: courier_config::ConfigError,
    },
    /// Telemetry setup failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: courier_telemetry::TelemetryError,
    },
    /// A startup secret could not be resolved or verified.
    #[error("secret resolution failed")]
    Secrets {
        /// Operation identifier.
        operation: &'static str,
        /// Source secret error.
        source: courier_secrets::SecretError,
    },
    /// Object store handles could not be built.
    #[error("storage operation failed")]
    Storage {
        /// Operation identifier.
        operation: &'static str,
        /// Source storage error.
        source: courier_storage::StorageError,
    },
    /// The relocation pipeline could not be assembled.
    #[error("relocation setup failed")]
    Relocate {
        /// Operation identifier.
        operation: &'static str,
        /// Source relocation error.
        source: courier_relocate::RelocateError,
    },
    /// The configured transport was not compiled into this binary.
    #[error("transport not compiled in")]
    TransportUnavailable {
        /// Configured transport.
        transport: &'static str,
        /// Cargo feature that enables it.
        feature: &'static str,
    },
    /// A resolved setting was missing or unusable.
    #[error("invalid configuration")]
    InvalidConfig {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: courier_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: courier_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn secrets(
        operation: &'static str,
        source: courier_secrets::SecretError,
    ) -> Self {
        Self::Secrets { operation, source }
    }

    pub(crate) const fn storage(
        operation: &'static str,
        source: courier_storage::StorageError,
    ) -> Self {
        Self::Storage { operation, source }
    }

    pub(crate) const fn relocate(
        operation: &'static str,
        source: courier_relocate::RelocateError,
    ) -> Self {
        Self::Relocate { operation, source }
    }

    pub(crate) const fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "load",
            courier_config::ConfigError::MissingField {
                field: "COURIER_TRANSPORT",
            },
        );
        assert!(matches!(config, AppError::Config { .. }));

        let secrets = AppError::secrets(
            "resolve",
            courier_secrets::SecretError::NotFound {
                name: "projects/p/secrets/s/versions/latest".into(),
            },
        );
        assert!(matches!(secrets, AppError::Secrets { .. }));

        let storage = AppError::storage(
            "registry",
            courier_storage::StorageError::UnknownBucket {
                bucket: "landing".into(),
            },
        );
        assert_eq!(storage.to_string(), "storage operation failed");

        let io = AppError::io("bind", io::Error::other("in use"));
        assert!(matches!(io, AppError::Io { operation: "bind", .. }));
    }
}

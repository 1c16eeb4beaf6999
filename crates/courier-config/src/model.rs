//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; parsing lives in `validate.rs` and `loader.rs`.
//! - One `CourierConfig` describes one deployable variant (transport + naming + transform).

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Destination transport selected for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Copy to an SMB network share.
    Smb,
    /// Copy to an SFTP server.
    Sftp,
    /// Rewrite the object inside the source bucket under a new name.
    SameStore,
}

impl TransportKind {
    /// Render the transport as its configuration string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smb => "smb",
            Self::Sftp => "sftp",
            Self::SameStore => "same_store",
        }
    }

    /// Whether the transport talks to a remote host that needs credentials.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(self, Self::Smb | Self::Sftp)
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smb" | "nas" => Ok(Self::Smb),
            "sftp" => Ok(Self::Sftp),
            "same_store" | "rename" => Ok(Self::SameStore),
            _ => Err(ConfigError::invalid("COURIER_TRANSPORT", "unknown_transport", s)),
        }
    }
}

/// Destination naming strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingMode {
    /// Destination name equals the source name.
    Passthrough,
    /// Strip a literal prefix from the source name.
    PrefixTrim,
    /// Keep the part of the file name before the reserved delimiter.
    DelimiterCut,
}

impl FromStr for NamingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(Self::Passthrough),
            "prefix_trim" => Ok(Self::PrefixTrim),
            "delimiter_cut" => Ok(Self::DelimiterCut),
            _ => Err(ConfigError::invalid("COURIER_NAMING", "unknown_naming", s)),
        }
    }
}

/// How the reserved delimiter gates eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterRule {
    /// Only names containing the delimiter are processed.
    Required,
    /// Names containing the delimiter are skipped.
    Forbidden,
    /// The delimiter does not affect eligibility.
    Ignored,
}

impl FromStr for DelimiterRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "forbidden" => Ok(Self::Forbidden),
            "ignored" => Ok(Self::Ignored),
            _ => Err(ConfigError::invalid(
                "COURIER_DELIMITER_RULE",
                "unknown_delimiter_rule",
                s,
            )),
        }
    }
}

/// Content rewriting applied between fetch and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformPreset {
    /// Bytes are written unchanged.
    None,
    /// `~~` becomes `,`, then `"",""` becomes `","`.
    EscapeRewrite,
}

impl FromStr for TransformPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "identity" => Ok(Self::None),
            "escape_rewrite" => Ok(Self::EscapeRewrite),
            _ => Err(ConfigError::invalid("COURIER_TRANSFORM", "unknown_transform", s)),
        }
    }
}

/// Per-object relocation policy: eligibility, naming, transform, and source handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationPolicy {
    /// Naming strategy for the destination.
    pub naming: NamingMode,
    /// Literal prefix removed by [`NamingMode::PrefixTrim`].
    pub trim_prefix: Option<String>,
    /// Reserved delimiter character.
    pub delimiter: char,
    /// Extension appended by [`NamingMode::DelimiterCut`]; falls back to the matched extension.
    pub target_extension: Option<String>,
    /// Eligible name suffixes; empty means every name is eligible.
    pub extensions: Vec<String>,
    /// Delimiter eligibility gate.
    pub delimiter_rule: DelimiterRule,
    /// Content transform preset.
    pub transform: TransformPreset,
    /// Delete the source object after a confirmed write.
    pub delete_source: bool,
}

impl Default for RelocationPolicy {
    fn default() -> Self {
        Self {
            naming: NamingMode::Passthrough,
            trim_prefix: None,
            delimiter: crate::defaults::DELIMITER,
            target_extension: None,
            extensions: Vec::new(),
            delimiter_rule: DelimiterRule::Ignored,
            transform: TransformPreset::None,
            delete_source: false,
        }
    }
}

/// Remote host coordinates for SMB and SFTP transports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteEndpoint {
    /// Host name or address; may instead come from a secret.
    pub host: Option<String>,
    /// TCP port.
    pub port: u16,
    /// Login name; may instead come from a secret.
    pub username: Option<String>,
    /// SMB share name (ignored for SFTP).
    pub share: Option<String>,
    /// Folder prefix on the remote side; empty means share/home relative.
    pub root_folder: String,
}

/// Secret resource names resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecretRefs {
    /// Resource name of the password secret.
    pub password: Option<String>,
    /// Optional resource name overriding the remote host.
    pub host: Option<String>,
    /// Optional resource name overriding the remote user.
    pub username: Option<String>,
}

/// Secret service access settings.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SecretService {
    /// Base URL override; `None` selects the public endpoint.
    pub endpoint: Option<String>,
    /// Static bearer token; `None` asks the metadata server.
    pub token: Option<String>,
}

impl std::fmt::Debug for SecretService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretService")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Deadlines applied to network calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Object download deadline.
    pub fetch: Duration,
    /// Remote connect + write deadline.
    pub write: Duration,
    /// Secret access deadline.
    pub secret: Duration,
    /// Whole-invocation budget.
    pub invocation: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        use crate::defaults::{
            FETCH_TIMEOUT_SECS, INVOCATION_TIMEOUT_SECS, SECRET_TIMEOUT_SECS, WRITE_TIMEOUT_SECS,
        };
        Self {
            fetch: Duration::from_secs(FETCH_TIMEOUT_SECS),
            write: Duration::from_secs(WRITE_TIMEOUT_SECS),
            secret: Duration::from_secs(SECRET_TIMEOUT_SECS),
            invocation: Duration::from_secs(INVOCATION_TIMEOUT_SECS),
        }
    }
}

/// HTTP listener settings for event intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Interface to bind.
    pub bind_addr: IpAddr,
    /// Port to bind.
    pub port: u16,
}

/// Logging settings handed to the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is absent.
    pub level: String,
    /// `json` or `pretty`; `None` infers from the build profile.
    pub format: Option<String>,
}

/// Complete configuration for one courier deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourierConfig {
    /// Destination transport.
    pub transport: TransportKind,
    /// Per-object relocation policy.
    pub policy: RelocationPolicy,
    /// Source buckets this deployment accepts events for.
    pub buckets: Vec<String>,
    /// Remote endpoint for SMB/SFTP.
    pub remote: RemoteEndpoint,
    /// Secret resource names.
    pub secrets: SecretRefs,
    /// How secrets are fetched.
    pub secret_service: SecretService,
    /// Network deadlines.
    pub timeouts: Timeouts,
    /// HTTP intake listener.
    pub server: ServerSettings,
    /// Logging settings.
    pub log: LogSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_aliases_and_reject_unknown_values() {
        assert_eq!("NAS".parse::<TransportKind>(), Ok(TransportKind::Smb));
        assert_eq!("rename".parse::<TransportKind>(), Ok(TransportKind::SameStore));
        assert_eq!(
            " delimiter_cut ".parse::<NamingMode>(),
            Ok(NamingMode::DelimiterCut)
        );
        assert_eq!("forbidden".parse::<DelimiterRule>(), Ok(DelimiterRule::Forbidden));
        assert_eq!(
            "escape_rewrite".parse::<TransformPreset>(),
            Ok(TransformPreset::EscapeRewrite)
        );
        assert!(matches!(
            "ftp".parse::<TransportKind>(),
            Err(ConfigError::InvalidField {
                field: "COURIER_TRANSPORT",
                reason: "unknown_transport",
                ..
            })
        ));
    }

    #[test]
    fn secret_service_debug_redacts_token() {
        let service = SecretService {
            endpoint: None,
            token: Some("ya29.token".into()),
        };
        let rendered = format!("{service:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("ya29"));
    }

    #[test]
    fn transport_remote_flag() {
        assert!(TransportKind::Smb.is_remote());
        assert!(TransportKind::Sftp.is_remote());
        assert!(!TransportKind::SameStore.is_remote());
        assert_eq!(TransportKind::SameStore.as_str(), "same_store");
    }
}

//! Environment loader for [`CourierConfig`].
//!
//! # Design
//! - All reads go through a lookup closure so tests never touch process env.
//! - Blank values are treated the same as absent ones.

use tracing::debug;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    CourierConfig, DelimiterRule, LogSettings, NamingMode, RelocationPolicy, RemoteEndpoint,
    SecretRefs, SecretService, ServerSettings, Timeouts, TransformPreset, TransportKind,
};
use crate::validate::{
    normalize_extension, parse_bind_addr, parse_delimiter, parse_flag, parse_list, parse_port,
    parse_seconds, validate_config,
};

struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn require(&self, key: &'static str) -> ConfigResult<String> {
        self.get(key)
            .ok_or(ConfigError::MissingField { field: key })
    }

    fn parse_or<T>(
        &self,
        key: &'static str,
        default: T,
        parse: impl FnOnce(&'static str, &str) -> ConfigResult<T>,
    ) -> ConfigResult<T> {
        self.get(key)
            .map_or(Ok(default), |value| parse(key, &value))
    }

    /// A secret may be given as a full resource name or as a secret id under `COURIER_PROJECT_ID`.
    fn secret_ref(&self, full_key: &'static str, id_key: &'static str) -> Option<String> {
        self.get(full_key).or_else(|| {
            let id = self.get(id_key)?;
            let project = self.get("COURIER_PROJECT_ID")?;
            Some(format!(
                "projects/{project}/secrets/{id}/versions/{}",
                defaults::SECRET_VERSION
            ))
        })
    }
}

impl CourierConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns the first missing, malformed, or conflicting setting.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns the first missing, malformed, or conflicting setting.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };

        let transport: TransportKind = source.require("COURIER_TRANSPORT")?.parse()?;
        let policy = load_policy(&source, transport)?;
        let buckets = source
            .get("COURIER_BUCKETS")
            .map(|value| parse_list(&value))
            .unwrap_or_default();

        let default_port = match transport {
            TransportKind::Sftp => defaults::SFTP_PORT,
            TransportKind::Smb | TransportKind::SameStore => defaults::SMB_PORT,
        };
        let remote = RemoteEndpoint {
            host: source.get("COURIER_REMOTE_HOST"),
            port: source.parse_or("COURIER_REMOTE_PORT", default_port, parse_port)?,
            username: source.get("COURIER_REMOTE_USER"),
            share: source.get("COURIER_REMOTE_SHARE"),
            root_folder: source
                .get("COURIER_REMOTE_ROOT")
                .map(|root| root.trim().trim_end_matches('/').to_string())
                .unwrap_or_default(),
        };

        let secrets = SecretRefs {
            password: source.secret_ref("COURIER_PASSWORD_SECRET", "COURIER_PASSWORD_SECRET_ID"),
            host: source.secret_ref("COURIER_HOST_SECRET", "COURIER_HOST_SECRET_ID"),
            username: source.secret_ref("COURIER_USER_SECRET", "COURIER_USER_SECRET_ID"),
        };

        let secret_service = SecretService {
            endpoint: source.get("COURIER_SECRETS_ENDPOINT"),
            token: source.get("COURIER_SECRETS_TOKEN"),
        };

        let fallback = Timeouts::default();
        let timeouts = Timeouts {
            fetch: source.parse_or("COURIER_FETCH_TIMEOUT_SECS", fallback.fetch, parse_seconds)?,
            write: source.parse_or("COURIER_WRITE_TIMEOUT_SECS", fallback.write, parse_seconds)?,
            secret: source.parse_or(
                "COURIER_SECRET_TIMEOUT_SECS",
                fallback.secret,
                parse_seconds,
            )?,
            invocation: source.parse_or(
                "COURIER_INVOCATION_TIMEOUT_SECS",
                fallback.invocation,
                parse_seconds,
            )?,
        };

        let server = ServerSettings {
            bind_addr: source.parse_or(
                "COURIER_BIND_ADDR",
                std::net::IpAddr::from([0, 0, 0, 0]),
                parse_bind_addr,
            )?,
            port: source.parse_or("PORT", defaults::HTTP_PORT, parse_port)?,
        };

        let log = LogSettings {
            level: source
                .get("COURIER_LOG_LEVEL")
                .unwrap_or_else(|| defaults::LOG_LEVEL.to_string()),
            format: source.get("COURIER_LOG_FORMAT"),
        };

        let config = Self {
            transport,
            policy,
            buckets,
            remote,
            secrets,
            secret_service,
            timeouts,
            server,
            log,
        };
        validate_config(&config)?;

        debug!(
            transport = config.transport.as_str(),
            buckets = config.buckets.len(),
            "courier configuration loaded"
        );
        Ok(config)
    }
}

fn load_policy<F>(source: &Source<F>, transport: TransportKind) -> ConfigResult<RelocationPolicy>
where
    F: Fn(&str) -> Option<String>,
{
    let naming = source
        .get("COURIER_NAMING")
        .map_or(Ok(NamingMode::Passthrough), |value| value.parse())?;

    let delimiter_rule = match source.get("COURIER_DELIMITER_RULE") {
        Some(value) => value.parse()?,
        None if naming == NamingMode::DelimiterCut => DelimiterRule::Required,
        None => DelimiterRule::Ignored,
    };

    let extensions = source
        .get("COURIER_EXTENSIONS")
        .map(|value| parse_list(&value))
        .unwrap_or_default()
        .iter()
        .map(|entry| normalize_extension("COURIER_EXTENSIONS", entry))
        .collect::<ConfigResult<Vec<_>>>()?;

    let target_extension = source
        .get("COURIER_TARGET_EXTENSION")
        .map(|value| normalize_extension("COURIER_TARGET_EXTENSION", &value))
        .transpose()?;

    Ok(RelocationPolicy {
        naming,
        trim_prefix: source.get("COURIER_TRIM_PREFIX"),
        delimiter: source.parse_or("COURIER_DELIMITER", defaults::DELIMITER, parse_delimiter)?,
        target_extension,
        extensions,
        delimiter_rule,
        transform: source
            .get("COURIER_TRANSFORM")
            .map_or(Ok(TransformPreset::None), |value| value.parse())?,
        delete_source: source.parse_or(
            "COURIER_DELETE_SOURCE",
            transport == TransportKind::SameStore,
            parse_flag,
        )?,
    })
}

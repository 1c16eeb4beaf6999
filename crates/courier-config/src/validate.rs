//! Parsing helpers and cross-field validation.

use std::net::IpAddr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{CourierConfig, NamingMode, TransportKind};

/// Parse a TCP port, rejecting zero.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not in `1..=65535`.
pub fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    let port = value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::invalid(field, "not_a_port", value))?;
    if port == 0 {
        return Err(ConfigError::invalid(field, "zero", value));
    }
    Ok(port)
}

/// Interpret common truthy/falsey spellings.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for anything that is not a recognised flag.
pub fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, "not_a_flag", value)),
    }
}

/// Parse a positive number of seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a positive integer.
pub fn parse_seconds(field: &'static str, value: &str) -> ConfigResult<Duration> {
    let secs = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(field, "not_an_integer", value))?;
    if secs == 0 {
        return Err(ConfigError::invalid(field, "zero", value));
    }
    Ok(Duration::from_secs(secs))
}

/// Split a comma separated list, trimming entries and dropping empty ones.
#[must_use]
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalise an extension so it always carries its leading dot.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for an extension that is only a dot or
/// contains a path separator.
pub fn normalize_extension(field: &'static str, value: &str) -> ConfigResult<String> {
    let trimmed = value.trim();
    let bare = trimmed.trim_start_matches('.');
    if bare.is_empty() {
        return Err(ConfigError::invalid(field, "empty_extension", value));
    }
    if bare.contains('/') {
        return Err(ConfigError::invalid(field, "path_separator", value));
    }
    Ok(format!(".{bare}"))
}

/// Parse the reserved delimiter, which must be exactly one non-separator character.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for empty, multi-character, or `/` delimiters.
pub fn parse_delimiter(field: &'static str, value: &str) -> ConfigResult<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some('/'), None) => Err(ConfigError::invalid(field, "path_separator", value)),
        (Some(delimiter), None) => Ok(delimiter),
        _ => Err(ConfigError::invalid(field, "not_single_character", value)),
    }
}

/// Parse the listener address.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an IP address.
pub fn parse_bind_addr(field: &'static str, value: &str) -> ConfigResult<IpAddr> {
    value
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ConfigError::invalid(field, "not_an_ip_address", value))
}

/// Cross-field checks run after every individual value parsed.
///
/// # Errors
///
/// Returns the first missing or conflicting setting.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    if config.buckets.is_empty() {
        return Err(ConfigError::MissingField {
            field: "COURIER_BUCKETS",
        });
    }

    let policy = &config.policy;
    if policy.naming == NamingMode::PrefixTrim
        && policy.trim_prefix.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::MissingField {
            field: "COURIER_TRIM_PREFIX",
        });
    }

    match config.transport {
        TransportKind::SameStore => {
            if policy.naming == NamingMode::Passthrough {
                return Err(ConfigError::Conflict {
                    field: "COURIER_NAMING",
                    reason: "passthrough_rewrites_source",
                });
            }
        }
        TransportKind::Smb | TransportKind::Sftp => {
            if policy.delete_source {
                return Err(ConfigError::Conflict {
                    field: "COURIER_DELETE_SOURCE",
                    reason: "delete_requires_same_store",
                });
            }
            if config.remote.host.is_none() && config.secrets.host.is_none() {
                return Err(ConfigError::MissingField {
                    field: "COURIER_REMOTE_HOST",
                });
            }
            if config.remote.username.is_none() && config.secrets.username.is_none() {
                return Err(ConfigError::MissingField {
                    field: "COURIER_REMOTE_USER",
                });
            }
            if config.secrets.password.is_none() {
                return Err(ConfigError::MissingField {
                    field: "COURIER_PASSWORD_SECRET",
                });
            }
            if config.transport == TransportKind::Smb && config.remote.share.is_none() {
                return Err(ConfigError::MissingField {
                    field: "COURIER_REMOTE_SHARE",
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_port_bounds() {
        assert_eq!(parse_port("PORT", "22"), Ok(22));
        assert!(matches!(
            parse_port("PORT", "0"),
            Err(ConfigError::InvalidField { reason: "zero", .. })
        ));
        assert!(matches!(
            parse_port("PORT", "70000"),
            Err(ConfigError::InvalidField {
                reason: "not_a_port",
                ..
            })
        ));
    }

    #[test]
    fn parse_flag_handles_truthy_and_falsey() {
        for value in ["1", "true", "YES", " on "] {
            assert_eq!(parse_flag("F", value), Ok(true));
        }
        for value in ["0", "false", "No", "off"] {
            assert_eq!(parse_flag("F", value), Ok(false));
        }
        assert!(parse_flag("F", "maybe").is_err());
    }

    #[test]
    fn extensions_gain_leading_dot() {
        assert_eq!(normalize_extension("E", "csv"), Ok(".csv".to_string()));
        assert_eq!(normalize_extension("E", ".txt"), Ok(".txt".to_string()));
        assert!(normalize_extension("E", ".").is_err());
        assert!(normalize_extension("E", "a/b").is_err());
    }

    #[test]
    fn delimiter_must_be_single_char() {
        assert_eq!(parse_delimiter("D", "|"), Ok('|'));
        assert!(parse_delimiter("D", "").is_err());
        assert!(parse_delimiter("D", "||").is_err());
        assert!(parse_delimiter("D", "/").is_err());
    }

    #[test]
    fn list_drops_blank_entries() {
        assert_eq!(parse_list(" a, ,b,"), vec!["a".to_string(), "b".to_string()]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn seconds_reject_zero() {
        assert_eq!(parse_seconds("T", "5"), Ok(Duration::from_secs(5)));
        assert!(parse_seconds("T", "0").is_err());
        assert!(parse_seconds("T", "-1").is_err());
    }
}

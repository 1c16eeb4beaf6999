//! Secret Manager v1 REST backend.
//!
//! # Design
//! - `GET {endpoint}/v1/{name}:access` with a bearer token.
//! - The token is either static or fetched from the instance metadata server per call.
//! - Response decoding is a pure function so it can be tested without a server.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::{SecretError, SecretResult};
use crate::secret::SecretPayload;
use crate::store::SecretBackend;

/// Public Secret Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://secretmanager.googleapis.com";
/// Metadata server token URL for the default service account.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Where bearer tokens come from.
#[derive(Clone)]
pub enum TokenSource {
    /// A fixed token supplied through configuration.
    Static(String),
    /// Ask the metadata server at the given URL.
    Metadata(String),
}

impl TokenSource {
    /// Use `token` when present, otherwise the default metadata server.
    #[must_use]
    pub fn from_token(token: Option<String>) -> Self {
        token.map_or_else(|| Self::Metadata(METADATA_TOKEN_URL.to_string()), Self::Static)
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::Metadata(url) => f.debug_tuple("Metadata").field(url).finish(),
        }
    }
}

/// HTTP implementation of [`SecretBackend`].
#[derive(Debug, Clone)]
pub struct HttpSecretBackend {
    client: reqwest::Client,
    endpoint: String,
    tokens: TokenSource,
}

impl HttpSecretBackend {
    /// Create a backend against `endpoint` (or [`DEFAULT_ENDPOINT`]).
    #[must_use]
    pub fn new(endpoint: Option<String>, tokens: TokenSource) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, tokens)
    }

    /// Create a backend reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        endpoint: Option<String>,
        tokens: TokenSource,
    ) -> Self {
        let endpoint = endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            client,
            endpoint,
            tokens,
        }
    }

    /// URL of the access call for `name`.
    #[must_use]
    pub fn access_url(&self, name: &str) -> String {
        format!("{}/v1/{}:access", self.endpoint, name.trim_start_matches('/'))
    }

    async fn bearer_token(&self, name: &str) -> SecretResult<String> {
        match &self.tokens {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata(url) => {
                let response = self
                    .client
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|source| transport("metadata_token", name, source))?;
                if !response.status().is_success() {
                    return Err(SecretError::Unavailable {
                        name: name.to_string(),
                        detail: "metadata_token_rejected",
                        status: Some(response.status().as_u16()),
                    });
                }
                let token: MetadataToken = response
                    .json()
                    .await
                    .map_err(|source| transport("metadata_token_decode", name, source))?;
                Ok(token.access_token)
            }
        }
    }
}

#[async_trait]
impl SecretBackend for HttpSecretBackend {
    async fn access_secret(&self, name: &str) -> SecretResult<SecretPayload> {
        let token = self.bearer_token(name).await?;
        let response = self
            .client
            .get(self.access_url(name))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| transport("access_secret", name, source))?;

        let status = response.status();
        debug!(secret = %name, status = status.as_u16(), "secret access response");
        check_status(name, status)?;

        let body = response
            .bytes()
            .await
            .map_err(|source| transport("access_secret_body", name, source))?;
        decode_access_response(name, &body)
    }
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

#[derive(Deserialize)]
struct AccessResponse {
    payload: Option<AccessPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessPayload {
    #[serde(default)]
    data: String,
    data_crc32c: Option<Int64>,
}

/// int64 fields arrive as JSON strings, though some emulators send numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Int64 {
    Text(String),
    Number(i64),
}

fn check_status(name: &str, status: StatusCode) -> SecretResult<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        return Err(SecretError::NotFound {
            name: name.to_string(),
        });
    }
    Err(SecretError::Unavailable {
        name: name.to_string(),
        detail: "unexpected_status",
        status: Some(status.as_u16()),
    })
}

/// Decode a Secret Manager access response body.
///
/// # Errors
///
/// Returns [`SecretError::InvalidPayload`] when the body is not the expected
/// JSON shape, the data is not base64, or the checksum is not an integer.
pub fn decode_access_response(name: &str, body: &[u8]) -> SecretResult<SecretPayload> {
    let invalid = |reason| SecretError::InvalidPayload {
        name: name.to_string(),
        reason,
    };
    let response: AccessResponse =
        serde_json::from_slice(body).map_err(|_| invalid("malformed_json"))?;
    let payload = response.payload.ok_or_else(|| invalid("missing_payload"))?;
    let data = STANDARD
        .decode(payload.data.as_bytes())
        .map_err(|_| invalid("malformed_base64"))?;
    let data_crc32c = match payload.data_crc32c {
        None => None,
        Some(Int64::Number(value)) => Some(value),
        Some(Int64::Text(text)) => Some(
            text.trim()
                .parse::<i64>()
                .map_err(|_| invalid("malformed_checksum"))?,
        ),
    };
    Ok(SecretPayload { data, data_crc32c })
}

fn transport(operation: &'static str, name: &str, source: reqwest::Error) -> SecretError {
    SecretError::Transport {
        operation,
        name: name.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::{Secret, crc32c_checksum};

    const NAME: &str = "projects/acme/secrets/nas-password/versions/latest";

    #[test]
    fn decodes_string_checksum() -> anyhow::Result<()> {
        let checksum = crc32c_checksum(b"hunter2");
        let body = format!(
            r#"{{"name":"{NAME}","payload":{{"data":"aHVudGVyMg==","dataCrc32c":"{checksum}"}}}}"#
        );
        let payload = decode_access_response(NAME, body.as_bytes())?;
        assert_eq!(payload.data, b"hunter2");
        assert_eq!(payload.data_crc32c, Some(checksum));
        assert_eq!(Secret::verify(NAME, payload)?.expose(), "hunter2");
        Ok(())
    }

    #[test]
    fn decodes_numeric_and_missing_checksum() -> anyhow::Result<()> {
        let payload = decode_access_response(
            NAME,
            br#"{"payload":{"data":"aGk=","dataCrc32c":42}}"#,
        )?;
        assert_eq!(payload.data_crc32c, Some(42));

        let payload = decode_access_response(NAME, br#"{"payload":{"data":"aGk="}}"#)?;
        assert_eq!(payload.data_crc32c, None);
        Ok(())
    }

    #[test]
    fn rejects_malformed_bodies() {
        for (body, reason) in [
            (&b"not json"[..], "malformed_json"),
            (&br#"{"name":"x"}"#[..], "missing_payload"),
            (&br#"{"payload":{"data":"***"}}"#[..], "malformed_base64"),
            (
                &br#"{"payload":{"data":"aGk=","dataCrc32c":"abc"}}"#[..],
                "malformed_checksum",
            ),
        ] {
            let err = decode_access_response(NAME, body);
            assert!(
                matches!(err, Err(SecretError::InvalidPayload { reason: r, .. }) if r == reason),
                "expected {reason}"
            );
        }
    }

    #[test]
    fn status_mapping() {
        assert!(check_status(NAME, StatusCode::OK).is_ok());
        assert!(matches!(
            check_status(NAME, StatusCode::NOT_FOUND),
            Err(SecretError::NotFound { .. })
        ));
        assert!(matches!(
            check_status(NAME, StatusCode::FORBIDDEN),
            Err(SecretError::Unavailable {
                status: Some(403),
                ..
            })
        ));
    }

    #[test]
    fn access_url_and_token_source() {
        let backend = HttpSecretBackend::new(
            Some("http://localhost:9000/".into()),
            TokenSource::from_token(Some("abc".into())),
        );
        assert_eq!(
            backend.access_url(NAME),
            format!("http://localhost:9000/v1/{NAME}:access")
        );
        assert_eq!(format!("{:?}", TokenSource::Static("abc".into())), "Static(<redacted>)");
        assert!(matches!(
            TokenSource::from_token(None),
            TokenSource::Metadata(url) if url == METADATA_TOKEN_URL
        ));
    }
}

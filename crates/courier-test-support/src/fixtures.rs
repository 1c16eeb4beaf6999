//! Test fixtures: configuration lookups and resolved credentials.

use std::collections::HashMap;

use courier_relocate::RemoteCredential;
use courier_secrets::{Secret, SecretPayload, SecretResult};

/// Environment lookup over a fixed set of pairs, for `CourierConfig::from_lookup`.
pub fn env_lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

/// Verified secret holding `value`.
///
/// # Errors
///
/// Returns the verification error; only non-UTF-8 input can fail.
pub fn secret(value: &str) -> SecretResult<Secret> {
    Secret::verify("fixture", SecretPayload::checksummed(value))
}

/// Credential for a share rooted at `root_folder`.
///
/// # Errors
///
/// Returns the secret verification error.
pub fn credential(root_folder: &str) -> SecretResult<RemoteCredential> {
    Ok(RemoteCredential {
        host: "files.example.internal".into(),
        port: 445,
        username: "courier".into(),
        password: secret("hunter2")?,
        root_folder: root_folder.to_string(),
        share: Some("exports".into()),
    })
}

//! Verified secret values.

use std::fmt;

use crate::error::{SecretError, SecretResult};

/// Raw payload returned by a secret backend, before verification.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretPayload {
    /// Secret bytes.
    pub data: Vec<u8>,
    /// CRC32C checksum reported alongside the bytes.
    pub data_crc32c: Option<i64>,
}

impl SecretPayload {
    /// Build a payload whose checksum matches its bytes.
    #[must_use]
    pub fn checksummed(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let data_crc32c = Some(crc32c_checksum(&data));
        Self { data, data_crc32c }
    }
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPayload")
            .field("len", &self.data.len())
            .field("data_crc32c", &self.data_crc32c)
            .finish()
    }
}

/// A secret value whose integrity has been verified.
///
/// The only constructor is [`Secret::verify`]; a payload with a missing or
/// wrong checksum never becomes a `Secret`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    value: String,
}

impl Secret {
    /// Verify `payload` against its CRC32C and decode it as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Integrity`] on a missing or mismatched checksum and
    /// [`SecretError::InvalidPayload`] when the bytes are not UTF-8.
    pub fn verify(name: &str, payload: SecretPayload) -> SecretResult<Self> {
        let actual = crc32c_checksum(&payload.data);
        if payload.data_crc32c != Some(actual) {
            return Err(SecretError::Integrity {
                name: name.to_string(),
                expected: payload.data_crc32c,
                actual,
            });
        }
        let value = String::from_utf8(payload.data).map_err(|_| SecretError::InvalidPayload {
            name: name.to_string(),
            reason: "not_utf8",
        })?;
        Ok(Self { value })
    }

    /// Borrow the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Consume the secret, returning its value.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.value
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// CRC32C (Castagnoli) checksum widened the way the secret service reports it.
#[must_use]
pub fn crc32c_checksum(data: &[u8]) -> i64 {
    i64::from(crc32c::crc32c(data))
}

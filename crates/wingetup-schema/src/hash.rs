//! Installer digests.

use serde::{Deserialize, Deserializer, Serialize};

/// Errors produced when validating an [`InstallerSha256`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Wrong number of hex characters.
    #[error("Invalid SHA256 digest: expected 64 hex characters, got {0} in '{1}'")]
    Length(usize, String),

    /// Non-hex characters present.
    #[error("Invalid SHA256 digest: contains non-hex characters in '{0}'")]
    NotHex(String),
}

/// A validated SHA256 digest (64 hex characters), stored uppercase.
///
/// `WinGet` manifests spell `InstallerSha256` and `SignatureSha256` in
/// uppercase hex, so the digest is normalized at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct InstallerSha256(String);

impl InstallerSha256 {
    /// Create a new digest, validating the input.
    ///
    /// Accepts strings with or without a `sha256:` prefix, in either case.
    ///
    /// # Errors
    ///
    /// Returns an error if the hex portion is not exactly 64 ASCII hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, HashError> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(HashError::Length(hex.len(), s.clone()));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::NotHex(s.clone()));
        }

        Ok(Self(hex.to_uppercase()))
    }

    /// Build a digest from raw hash output bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode_upper(bytes))
    }

    /// Get the digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for InstallerSha256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for InstallerSha256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for InstallerSha256 {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "667b8d31b0d85fdc2ca17d54c4eab870ba7269063c1dd53acec7897a97af04e3";

    #[test]
    fn normalizes_to_uppercase() {
        let h = InstallerSha256::new(DIGEST).unwrap();
        assert_eq!(h.as_str(), DIGEST.to_uppercase());
    }

    #[test]
    fn accepts_prefixed_digest() {
        let h = InstallerSha256::new(format!("sha256:{DIGEST}")).unwrap();
        assert_eq!(h.as_str().len(), 64);
    }

    #[test]
    fn rejects_bad_digests() {
        assert!(matches!(
            InstallerSha256::new("ABC123"),
            Err(HashError::Length(6, _))
        ));
        let not_hex = "Z".repeat(64);
        assert!(matches!(
            InstallerSha256::new(not_hex),
            Err(HashError::NotHex(_))
        ));
    }

    #[test]
    fn from_bytes_is_uppercase_hex() {
        let h = InstallerSha256::from_bytes(&[0xab; 32]);
        assert_eq!(h.as_str(), "AB".repeat(32));
    }
}

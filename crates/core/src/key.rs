//! PublicKey - hex-encoded ed25519 public key
//!
//! Accounts and signers are both identified by a 32-byte ed25519 public key.
//! We carry it around in its canonical lowercase hex form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing public keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid public key hex: {0}")]
    InvalidHex(String),

    #[error("Public key must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 32-byte public key, stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(String);

impl PublicKey {
    /// Build from raw bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Decode to raw bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // Validated at construction
        if let Ok(bytes) = hex::decode(&self.0) {
            out.copy_from_slice(&bytes);
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 hex chars, for log lines
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let bytes = hex::decode(&s).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        Ok(Self(s))
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        let upper = "AB".repeat(32);
        let key: PublicKey = upper.parse().unwrap();
        assert_eq!(key.as_str(), "ab".repeat(32));
        assert_eq!(key.short(), "abababab");
    }

    #[test]
    fn test_wrong_length_rejected() {
        let result: Result<PublicKey, _> = "abcd".parse();
        assert!(matches!(result, Err(KeyError::InvalidLength(2))));
    }

    #[test]
    fn test_bad_hex_rejected() {
        let result: Result<PublicKey, _> = "zz".repeat(32).parse();
        assert!(matches!(result, Err(KeyError::InvalidHex(_))));
    }

    #[test]
    fn test_bytes_roundtrip() {
        let bytes = [7u8; 32];
        let key = PublicKey::from_bytes(&bytes);
        assert_eq!(key.to_bytes(), bytes);
    }
}

//! Asset - the native ledger asset or an issued credit
//!
//! The code `XLM` always denotes the network's native asset. Every other
//! code names a credit asset and requires the issuer's public key.

use crate::key::PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Code reserved for the network's native asset
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// Errors that can occur when building assets
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Empty asset code")]
    EmptyCode,

    #[error("Asset code too long (max 12 chars): {0}")]
    TooLong(String),

    #[error("Invalid asset code format: {0}")]
    InvalidFormat(String),

    #[error("Asset {0} requires an issuer")]
    MissingIssuer(String),
}

/// A credit asset code (1-12 ASCII alphanumerics).
///
/// # Examples
/// ```
/// use quorum_core::AssetCode;
///
/// let code: AssetCode = "USD".parse().unwrap();
/// assert_eq!(code.to_string(), "USD");
///
/// assert!("BTC-USD".parse::<AssetCode>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetCode(String);

impl AssetCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_native(&self) -> bool {
        self.0 == NATIVE_ASSET_CODE
    }
}

impl fmt::Display for AssetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetCode {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() {
            return Err(AssetError::EmptyCode);
        }

        if s.len() > 12 {
            return Err(AssetError::TooLong(s.to_string()));
        }

        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AssetError::InvalidFormat(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for AssetCode {
    type Error = AssetError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AssetCode> for String {
    fn from(c: AssetCode) -> Self {
        c.0
    }
}

/// An asset held or traded on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
    /// The network's native asset
    Native,
    /// An asset issued by an account
    Credit { code: AssetCode, issuer: PublicKey },
}

impl Asset {
    /// Resolve an asset from a code and an optional issuer.
    ///
    /// `XLM` is native and ignores the issuer; anything else needs one.
    pub fn resolve(code: &str, issuer: Option<&PublicKey>) -> Result<Self, AssetError> {
        let code: AssetCode = code.parse()?;
        if code.is_native() {
            return Ok(Asset::Native);
        }
        match issuer {
            Some(issuer) => Ok(Asset::Credit {
                code,
                issuer: issuer.clone(),
            }),
            None => Err(AssetError::MissingIssuer(code.0)),
        }
    }

    /// The asset code, `XLM` for native
    pub fn code(&self) -> &str {
        match self {
            Asset::Native => NATIVE_ASSET_CODE,
            Asset::Credit { code, .. } => code.as_str(),
        }
    }

    pub fn issuer(&self) -> Option<&PublicKey> {
        match self {
            Asset::Native => None,
            Asset::Credit { issuer, .. } => Some(issuer),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str(NATIVE_ASSET_CODE),
            Asset::Credit { code, issuer } => write!(f, "{}:{}", code, issuer.short()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> PublicKey {
        "11".repeat(32).parse().unwrap()
    }

    #[test]
    fn test_native_ignores_issuer() {
        assert_eq!(Asset::resolve("XLM", None).unwrap(), Asset::Native);
        assert_eq!(Asset::resolve("XLM", Some(&issuer())).unwrap(), Asset::Native);
    }

    #[test]
    fn test_credit_requires_issuer() {
        let result = Asset::resolve("USD", None);
        assert_eq!(result, Err(AssetError::MissingIssuer("USD".to_string())));

        let asset = Asset::resolve("USD", Some(&issuer())).unwrap();
        assert_eq!(asset.code(), "USD");
        assert_eq!(asset.issuer(), Some(&issuer()));
    }

    #[test]
    fn test_code_is_case_sensitive() {
        // Only the exact code XLM is native
        let asset = Asset::resolve("xlm", Some(&issuer())).unwrap();
        assert!(!asset.is_native());
    }

    #[test]
    fn test_invalid_codes() {
        assert!(matches!("".parse::<AssetCode>(), Err(AssetError::EmptyCode)));
        assert!(matches!(
            "ABCDEFGHIJKLM".parse::<AssetCode>(),
            Err(AssetError::TooLong(_))
        ));
        assert!(matches!(
            "BTC-USD".parse::<AssetCode>(),
            Err(AssetError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Asset::Native.to_string(), "XLM");
        let asset = Asset::resolve("EUR", Some(&issuer())).unwrap();
        assert_eq!(asset.to_string(), "EUR:11111111");
    }

    #[test]
    fn test_serde_roundtrip() {
        let assets = vec![Asset::Native, Asset::resolve("USD", Some(&issuer())).unwrap()];

        for asset in assets {
            let json = serde_json::to_string(&asset).unwrap();
            let parsed: Asset = serde_json::from_str(&json).unwrap();
            assert_eq!(asset, parsed);
        }
    }
}

//! Validation errors for composed operations

use quorum_core::{AmountError, AssetError, KeyError};
use thiserror::Error;

/// Malformed intent parameters, detected before anything is staged
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("A zero sell amount deletes an offer and needs a nonzero offer id")]
    InvalidDeleteOffer,

    #[error("Sell amount cannot be negative: {0}")]
    NegativeSellAmount(String),

    #[error("Buy amount cannot be negative: {0}")]
    NegativeBuyAmount(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid offer id: {0}")]
    InvalidOfferId(String),

    #[error("Asset {0} requires an issuer")]
    MissingIssuer(String),

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Home domain too long ({0} bytes, max 32)")]
    InvalidHomeDomain(usize),

    #[error("Unknown flag: {0}")]
    InvalidFlag(String),
}

impl ComposeError {
    /// Stable dotted code for API consumers
    pub fn code(&self) -> &'static str {
        match self {
            ComposeError::InvalidDeleteOffer => "invalid.deleteOffer",
            ComposeError::NegativeSellAmount(_) => "negative.sellAmount",
            ComposeError::NegativeBuyAmount(_) => "negative.buyAmount",
            ComposeError::InvalidAmount(_) => "invalid.amount",
            ComposeError::InvalidOfferId(_) => "invalid.offerId",
            ComposeError::MissingIssuer(_) => "missing.issuer",
            ComposeError::InvalidAsset(_) => "invalid.asset",
            ComposeError::InvalidKey(_) => "invalid.publicKey",
            ComposeError::InvalidHomeDomain(_) => "invalid.homeDomain",
            ComposeError::InvalidFlag(_) => "invalid.flag",
        }
    }
}

impl From<AssetError> for ComposeError {
    fn from(error: AssetError) -> Self {
        match error {
            AssetError::MissingIssuer(code) => ComposeError::MissingIssuer(code),
            other => ComposeError::InvalidAsset(other.to_string()),
        }
    }
}

impl From<AmountError> for ComposeError {
    fn from(error: AmountError) -> Self {
        ComposeError::InvalidAmount(error.to_string())
    }
}

impl From<KeyError> for ComposeError {
    fn from(error: KeyError) -> Self {
        ComposeError::InvalidKey(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ComposeError::InvalidDeleteOffer.code(), "invalid.deleteOffer");
        assert_eq!(
            ComposeError::NegativeSellAmount("-1".into()).code(),
            "negative.sellAmount"
        );
        assert_eq!(ComposeError::MissingIssuer("USD".into()).code(), "missing.issuer");
    }

    #[test]
    fn test_asset_error_mapping() {
        let error: ComposeError = AssetError::MissingIssuer("EUR".into()).into();
        assert_eq!(error, ComposeError::MissingIssuer("EUR".into()));

        let error: ComposeError = AssetError::EmptyCode.into();
        assert!(matches!(error, ComposeError::InvalidAsset(_)));
    }
}

//! Engine configuration
//!
//! Every field has a serde default, so a partial JSON file (or none at all)
//! is valid.

use quorum_core::{Amount, PublicKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the authorization engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for every ledger call
    #[serde(default = "default_ledger_timeout_ms")]
    pub ledger_timeout_ms: u64,

    /// Read-modify-write attempts before a concurrent update is reported
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,

    /// Service fees appended to payment and offer transactions
    #[serde(default)]
    pub fees: Option<FeeSchedule>,
}

/// A fee paid in the native asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Shown in the transaction memo as `tx contains <name>`
    pub name: String,
    pub destination: PublicKey,
    pub rate: Amount,
}

/// Fees by intent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Charged when an issuer pays out its own asset
    #[serde(default)]
    pub issuance: Option<Fee>,

    /// Charged for every new offer
    #[serde(default)]
    pub offer: Option<Fee>,
}

fn default_ledger_timeout_ms() -> u64 {
    10_000
}

fn default_max_write_attempts() -> u32 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ledger_timeout_ms: default_ledger_timeout_ms(),
            max_write_attempts: default_max_write_attempts(),
            fees: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Get ledger timeout as Duration
    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.ledger_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_write_attempts, 5);
        assert!(config.fees.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_write_attempts": 2}"#).unwrap();
        assert_eq!(config.max_write_attempts, 2);
        assert_eq!(config.ledger_timeout_ms, 10_000);
    }

    #[test]
    fn test_from_file_with_fees() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let destination = "ab".repeat(32);
        write!(
            file,
            r#"{{"fees": {{"offer": {{"name": "FEE_OFFER", "destination": "{}", "rate": "0.5"}}}}}}"#,
            destination
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        let fees = config.fees.unwrap();
        assert!(fees.issuance.is_none());
        let offer = fees.offer.unwrap();
        assert_eq!(offer.name, "FEE_OFFER");
        assert_eq!(offer.rate.to_string(), "0.5");
    }

    #[test]
    fn test_invalid_file_is_invalid_data() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let error = EngineConfig::from_file(file.path()).unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::InvalidData);
    }
}

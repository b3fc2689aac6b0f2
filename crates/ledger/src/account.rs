//! Account state as reported by the ledger
//!
//! Signers and thresholds live on the ledger and can change at any time, so
//! the engine reloads them whenever it decides whether a transaction is
//! sufficiently signed.

use crate::operation::{SignerKey, ThresholdCategory};
use quorum_core::PublicKey;
use serde::{Deserialize, Serialize};

/// One signer on an account's roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSigner {
    pub key: SignerKey,
    pub weight: u8,
}

/// Weighted thresholds of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: u8,
    pub med: u8,
    pub high: u8,
    /// Weight of the account's own (master) key
    pub master_weight: u8,
}

impl Thresholds {
    pub fn new(master_weight: u8, low: u8, med: u8, high: u8) -> Self {
        Self {
            low,
            med,
            high,
            master_weight,
        }
    }

    /// Low → low, Medium → med, High → high
    pub fn for_category(&self, category: ThresholdCategory) -> u32 {
        let threshold = match category {
            ThresholdCategory::Low => self.low,
            ThresholdCategory::Medium => self.med,
            ThresholdCategory::High => self.high,
        };
        u32::from(threshold)
    }
}

/// Snapshot of an account loaded from the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub account_id: PublicKey,
    pub sequence: i64,
    pub thresholds: Thresholds,
    pub signers: Vec<AccountSigner>,
    #[serde(default)]
    pub home_domain: Option<String>,
    #[serde(default)]
    pub flags: u32,
}

impl AccountState {
    /// A fresh account: master key weight 1, all thresholds 0
    pub fn new(account_id: PublicKey) -> Self {
        Self {
            signers: vec![AccountSigner {
                key: SignerKey::Ed25519(account_id.clone()),
                weight: 1,
            }],
            account_id,
            sequence: 0,
            thresholds: Thresholds::new(1, 0, 0, 0),
            home_domain: None,
            flags: 0,
        }
    }

    /// Threshold the signers must reach for a category
    pub fn threshold_for(&self, category: ThresholdCategory) -> u32 {
        self.thresholds.for_category(category)
    }

    /// Signers that sign with an ed25519 key, with their weights
    pub fn key_signers(&self) -> impl Iterator<Item = (&PublicKey, u8)> {
        self.signers
            .iter()
            .filter_map(|s| s.key.as_ed25519().map(|key| (key, s.weight)))
    }

    /// Add, update, or (weight 0) remove a signer
    pub fn apply_signer(&mut self, key: SignerKey, weight: u8) {
        if key == SignerKey::Ed25519(self.account_id.clone()) {
            self.set_master_weight(weight);
            return;
        }
        self.signers.retain(|s| s.key != key);
        if weight > 0 {
            self.signers.push(AccountSigner { key, weight });
        }
    }

    /// The master key is kept on the roster even at weight 0
    pub fn set_master_weight(&mut self, weight: u8) {
        self.thresholds.master_weight = weight;
        let master = SignerKey::Ed25519(self.account_id.clone());
        match self.signers.iter_mut().find(|s| s.key == master) {
            Some(signer) => signer.weight = weight,
            None => self.signers.insert(0, AccountSigner { key: master, weight }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: &str) -> PublicKey {
        byte.repeat(32).parse().unwrap()
    }

    #[test]
    fn test_new_account_defaults() {
        let account = AccountState::new(key("aa"));
        assert_eq!(account.signers.len(), 1);
        assert_eq!(account.threshold_for(ThresholdCategory::High), 0);
        assert_eq!(account.thresholds.master_weight, 1);
    }

    #[test]
    fn test_threshold_lookup() {
        let mut account = AccountState::new(key("aa"));
        account.thresholds = Thresholds::new(1, 1, 2, 3);

        assert_eq!(account.threshold_for(ThresholdCategory::Low), 1);
        assert_eq!(account.threshold_for(ThresholdCategory::Medium), 2);
        assert_eq!(account.threshold_for(ThresholdCategory::High), 3);
    }

    #[test]
    fn test_apply_signer_add_update_remove() {
        let mut account = AccountState::new(key("aa"));

        account.apply_signer(SignerKey::Ed25519(key("bb")), 1);
        assert_eq!(account.signers.len(), 2);

        account.apply_signer(SignerKey::Ed25519(key("bb")), 5);
        assert_eq!(account.signers.len(), 2);
        assert_eq!(account.signers[1].weight, 5);

        account.apply_signer(SignerKey::Ed25519(key("bb")), 0);
        assert_eq!(account.signers.len(), 1);
    }

    #[test]
    fn test_master_weight_updates_roster() {
        let mut account = AccountState::new(key("aa"));
        account.apply_signer(SignerKey::Ed25519(key("aa")), 0);

        assert_eq!(account.thresholds.master_weight, 0);
        assert_eq!(account.signers.len(), 1);
        assert_eq!(account.signers[0].weight, 0);
    }

    #[test]
    fn test_key_signers_skip_hash_signers() {
        let mut account = AccountState::new(key("aa"));
        account.apply_signer(SignerKey::PreAuthTx("ff".repeat(32)), 2);

        let keys: Vec<_> = account.key_signers().collect();
        assert_eq!(keys, vec![(&key("aa"), 1)]);
    }
}

//! Transaction envelopes and their content hash
//!
//! The hash covers the transaction body only. Adding signatures never
//! changes it, which is what lets a pre-authorized transaction be named by
//! its hash before anyone has signed it.

use crate::error::LedgerError;
use crate::keys::{DecoratedSignature, KeyPair};
use crate::operation::{Memo, Operation, ThresholdCategory};
use quorum_core::PublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fee charged per operation (in the smallest native unit)
pub const BASE_FEE: u32 = 100;

/// The signed part of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    /// Network passphrase; binds the hash to one network
    pub network: String,
    pub source_account: PublicKey,
    pub sequence: i64,
    pub fee: u32,
    pub memo: Option<Memo>,
    pub operations: Vec<Operation>,
}

impl TransactionBody {
    pub fn new(
        network: impl Into<String>,
        source_account: PublicKey,
        sequence: i64,
        memo: Option<Memo>,
        operations: Vec<Operation>,
    ) -> Self {
        let fee = BASE_FEE.saturating_mul(operations.len() as u32);
        Self {
            network: network.into(),
            source_account,
            sequence,
            fee,
            memo,
            operations,
        }
    }

    /// Strictest category over all operations
    pub fn threshold_category(&self) -> ThresholdCategory {
        ThresholdCategory::max_of(self.operations.iter().map(Operation::threshold_category))
    }
}

/// Body plus the signatures collected so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub body: TransactionBody,
    pub signatures: Vec<DecoratedSignature>,
}

impl Envelope {
    pub fn new(body: TransactionBody) -> Self {
        Self {
            body,
            signatures: Vec::new(),
        }
    }

    /// SHA256 over the canonical JSON of the body
    pub fn hash(&self) -> [u8; 32] {
        calculate_body_hash(&self.body)
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    /// Sign the hash. Returns false when this key already signed.
    pub fn sign(&mut self, keypair: &KeyPair) -> bool {
        let public_key = keypair.public_key();
        if self.is_signed_by(&public_key) {
            return false;
        }
        let signature = keypair.sign(&self.hash());
        self.signatures.push(signature);
        true
    }

    pub fn is_signed_by(&self, public_key: &PublicKey) -> bool {
        self.signatures.iter().any(|s| &s.public_key == public_key)
    }

    /// Public keys whose signatures verify against this envelope's hash
    pub fn verified_signers(&self) -> Vec<PublicKey> {
        let hash = self.hash();
        self.signatures
            .iter()
            .filter(|s| s.verify(&hash).is_ok())
            .map(|s| s.public_key.clone())
            .collect()
    }

    /// Opaque wire form: hex of the canonical JSON
    pub fn encode(&self) -> String {
        hex::encode(to_canonical_bytes(self))
    }

    pub fn decode(encoded: &str) -> Result<Self, LedgerError> {
        let bytes = hex::decode(encoded.trim()).map_err(|e| LedgerError::InvalidEnvelope(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| LedgerError::InvalidEnvelope(e.to_string()))
    }
}

/// Calculate SHA256 hash of a transaction body
pub fn calculate_body_hash(body: &TransactionBody) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(to_canonical_bytes(body));
    hasher.finalize().into()
}

fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    // Plain data with string map keys only; cannot fail
    serde_json::to_vec(value).unwrap_or_default()
}

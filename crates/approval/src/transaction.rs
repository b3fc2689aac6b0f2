//! Persisted transaction record
//!
//! A staged transaction carries its encoded envelope plus a snapshot of who
//! may sign it: the source account's signers and, per operation, the signers
//! of that operation's source account. Rosters are fixed at staging time;
//! afterwards only the `signed` flags change.

use chrono::{DateTime, Utc};
use quorum_core::PublicKey;
use quorum_ledger::{
    Envelope, LedgerError, Memo, OperationType, SubmissionFailure, ThresholdCategory,
};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Where a transaction stands in its signing lifecycle.
///
/// Derived, never stored. `Submittable` needs live thresholds, so only
/// the engine's evaluation reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Unsigned,
    PartiallySigned,
    Submittable,
    Submitted,
    SubmissionFailed,
}

/// One signer on a roster snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerEntry {
    pub public_key: PublicKey,
    pub weight: u8,
    pub signed: bool,
}

impl SignerEntry {
    pub fn new(public_key: PublicKey, weight: u8) -> Self {
        Self {
            public_key,
            weight,
            signed: false,
        }
    }
}

/// Final approver of a pre-authorized transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverEntry {
    pub public_key: PublicKey,
    pub signed: bool,
}

/// Per-operation bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub op_type: OperationType,
    pub source_account: PublicKey,
    pub threshold_category: ThresholdCategory,
    pub same_source_account: bool,
    /// Cleared once this operation's own signers reach its threshold
    pub needs_signatures: bool,
    pub signatures: Vec<SignerEntry>,
}

/// Link from an enabling transaction to the transaction it pre-authorizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAuthLink {
    pub target_id: String,
    pub target_hash: String,
    pub final_approver: Option<PublicKey>,
}

/// A staged transaction and its signing state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTransaction {
    pub id: String,
    pub source_account: PublicKey,
    /// Encoded envelope, signatures included
    pub envelope: String,
    /// Hash of the envelope body; signatures do not change it
    pub hash: String,
    pub description: Option<String>,
    pub submitted: bool,
    pub error: Option<SubmissionFailure>,
    pub threshold_category: ThresholdCategory,
    pub signatures: Vec<SignerEntry>,
    pub operations: Vec<OperationRecord>,
    #[serde(default)]
    pub approvers: Vec<ApproverEntry>,
    pub has_different_source_operation: bool,
    #[serde(default)]
    pub memo: Option<Memo>,
    #[serde(default)]
    pub pre_auth: Option<PreAuthLink>,
    #[serde(default)]
    pub enabled_by: Option<String>,
    /// Bumped by the store on every successful update
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersistedTransaction {
    pub fn decode_envelope(&self) -> Result<Envelope, LedgerError> {
        Envelope::decode(&self.envelope)
    }

    /// Listed on the transaction roster or on any operation roster
    pub fn is_listed_signer(&self, public_key: &PublicKey) -> bool {
        self.all_signer_entries().any(|s| &s.public_key == public_key)
    }

    /// Flip every unsigned entry for `public_key`. Returns how many flipped.
    pub fn mark_signed(&mut self, public_key: &PublicKey) -> usize {
        let mut flipped = 0;
        let entries = self
            .signatures
            .iter_mut()
            .chain(self.operations.iter_mut().flat_map(|op| op.signatures.iter_mut()));
        for entry in entries {
            if &entry.public_key == public_key && !entry.signed {
                entry.signed = true;
                flipped += 1;
            }
        }
        flipped
    }

    /// Sum of signed transaction-level weights
    pub fn signed_weight(&self) -> u32 {
        signed_weight(&self.signatures)
    }

    /// Still waiting on `public_key`, as signer or as approver
    pub fn awaits_signature_from(&self, public_key: &PublicKey) -> bool {
        !self.submitted
            && (unsigned_entry(&self.signatures, public_key)
                || self
                    .operations
                    .iter()
                    .any(|op| op.needs_signatures && unsigned_entry(&op.signatures, public_key)))
    }

    pub fn awaits_approval_from(&self, public_key: &PublicKey) -> bool {
        !self.submitted
            && self
                .approvers
                .iter()
                .any(|a| &a.public_key == public_key && !a.signed)
    }

    pub fn status(&self) -> TransactionStatus {
        if self.submitted {
            TransactionStatus::Submitted
        } else if self.error.is_some() {
            TransactionStatus::SubmissionFailed
        } else if self.all_signer_entries().any(|s| s.signed) {
            TransactionStatus::PartiallySigned
        } else {
            TransactionStatus::Unsigned
        }
    }

    pub fn view(&self) -> TransactionView {
        TransactionView::from(self)
    }

    fn all_signer_entries(&self) -> impl Iterator<Item = &SignerEntry> {
        self.signatures
            .iter()
            .chain(self.operations.iter().flat_map(|op| op.signatures.iter()))
    }
}

pub(crate) fn signed_weight(entries: &[SignerEntry]) -> u32 {
    entries
        .iter()
        .filter(|s| s.signed)
        .map(|s| u32::from(s.weight))
        .sum()
}

fn unsigned_entry(entries: &[SignerEntry], public_key: &PublicKey) -> bool {
    entries.iter().any(|s| &s.public_key == public_key && !s.signed)
}

/// Public projection of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    pub id: String,
    /// Type of the first operation
    #[serde(rename = "type")]
    pub op_type: Option<OperationType>,
    pub source_account: PublicKey,
    pub envelope: String,
    pub description: Option<String>,
    pub submitted: bool,
    pub error: Option<String>,
    pub signers: Vec<SignerEntry>,
    pub approvers: Vec<ApproverEntry>,
    pub operations: Vec<OperationRecord>,
    pub created_at: DateTime<Utc>,
    pub hash: String,
}

impl From<&PersistedTransaction> for TransactionView {
    fn from(tx: &PersistedTransaction) -> Self {
        Self {
            id: tx.id.clone(),
            op_type: tx.operations.first().map(|op| op.op_type),
            source_account: tx.source_account.clone(),
            envelope: tx.envelope.clone(),
            description: tx.description.clone(),
            submitted: tx.submitted,
            error: tx.error.as_ref().map(ToString::to_string),
            signers: tx.signatures.clone(),
            approvers: tx.approvers.clone(),
            operations: tx.operations.clone(),
            created_at: tx.created_at,
            hash: tx.hash.clone(),
        }
    }
}

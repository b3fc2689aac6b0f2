//! Transaction builder - stages unsigned transactions
//!
//! Collects operations and an optional memo for one source account, then on
//! `build`:
//! 1. loads the source account (its sequence + 1 becomes the envelope's)
//! 2. encodes and hashes the envelope
//! 3. snapshots the signer rosters of the source and of every operation
//!    source
//! 4. persists the record under a fresh id
//!
//! A transaction with no operations stages with category `Low`; the ledger
//! refuses it on submission.

use crate::error::EngineError;
use crate::store::TransactionStore;
use crate::transaction::{OperationRecord, PersistedTransaction, SignerEntry};
use chrono::Utc;
use quorum_core::PublicKey;
use quorum_ledger::{
    AccountState, Envelope, LedgerGateway, Memo, Operation, ThresholdCategory, TransactionBody,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Stages one transaction
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    source_account: PublicKey,
    description: Option<String>,
    operations: Vec<Operation>,
    memo: Option<Memo>,
}

fn roster(account: &AccountState) -> Vec<SignerEntry> {
    account
        .key_signers()
        .map(|(key, weight)| SignerEntry::new(key.clone(), weight))
        .collect()
}

impl TransactionBuilder {
    pub fn stage(source_account: PublicKey, description: Option<String>) -> Self {
        Self {
            source_account,
            description,
            operations: Vec::new(),
            memo: None,
        }
    }

    pub fn add_operation(&mut self, operation: Operation) -> &mut Self {
        self.operations.push(operation);
        self
    }

    /// Set the memo. A later call replaces an earlier one.
    pub fn add_memo(&mut self, memo: Memo) -> &mut Self {
        if let Some(previous) = self.memo.replace(memo) {
            warn!(
                source = %self.source_account,
                previous = ?previous,
                "Replacing transaction memo"
            );
        }
        self
    }

    pub fn source_account(&self) -> &PublicKey {
        &self.source_account
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Build, snapshot rosters and persist. Every call stages a new record.
    pub async fn build(
        &self,
        gateway: &dyn LedgerGateway,
        store: &dyn TransactionStore,
    ) -> Result<PersistedTransaction, EngineError> {
        let source = gateway.load_account(&self.source_account).await?;
        let body = TransactionBody::new(
            gateway.network(),
            self.source_account.clone(),
            source.sequence + 1,
            self.memo.clone(),
            self.operations.clone(),
        );
        let envelope = Envelope::new(body);

        let mut accounts: HashMap<PublicKey, AccountState> = HashMap::new();
        let mut operations = Vec::with_capacity(self.operations.len());
        for operation in &self.operations {
            let op_source = operation.effective_source(&self.source_account).clone();
            let same_source_account = op_source == self.source_account;

            let signatures = if same_source_account {
                roster(&source)
            } else {
                if !accounts.contains_key(&op_source) {
                    let account = gateway.load_account(&op_source).await?;
                    accounts.insert(op_source.clone(), account);
                }
                accounts.get(&op_source).map(roster).unwrap_or_default()
            };

            operations.push(OperationRecord {
                op_type: operation.op_type(),
                source_account: op_source,
                threshold_category: operation.threshold_category(),
                same_source_account,
                needs_signatures: !same_source_account,
                signatures,
            });
        }

        let threshold_category =
            ThresholdCategory::max_of(operations.iter().map(|op| op.threshold_category));
        let has_different_source_operation = operations.iter().any(|op| !op.same_source_account);

        let now = Utc::now();
        let tx = PersistedTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            source_account: self.source_account.clone(),
            envelope: envelope.encode(),
            hash: envelope.hash_hex(),
            description: self.description.clone(),
            submitted: false,
            error: None,
            threshold_category,
            signatures: roster(&source),
            operations,
            approvers: Vec::new(),
            has_different_source_operation,
            memo: self.memo.clone(),
            pre_auth: None,
            enabled_by: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        store.insert(&tx)?;
        debug!(transaction_id = %tx.id, hash = %tx.hash, "Envelope built");
        info!(
            transaction_id = %tx.id,
            source = %tx.source_account,
            category = %tx.threshold_category,
            operations = tx.operations.len(),
            "Transaction staged"
        );
        Ok(tx)
    }
}

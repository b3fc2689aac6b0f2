//! Threshold authorization engine
//!
//! Collects signatures on staged transactions and submits them once every
//! involved account's weighted threshold is met.
//!
//! # Flow
//! ```text
//! sign(key, secret, id)
//!   -> keypair check
//!   -> flip roster flags + sign envelope     (compare-and-swap write)
//!   -> evaluate against live thresholds
//!   -> submit when submittable               (record success or error)
//! ```
//!
//! Thresholds are always reloaded from the ledger: rosters are snapshots,
//! thresholds are not.

use crate::builder::TransactionBuilder;
use crate::config::EngineConfig;
use crate::error::{AuthorizationError, EngineError, StoreError};
use crate::store::TransactionStore;
use crate::transaction::{signed_weight, PersistedTransaction, TransactionStatus};
use quorum_core::PublicKey;
use quorum_ledger::{
    AccountState, KeyPair, LedgerGateway, SubmissionFailure, ThresholdCategory,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Weight collected for one differently-sourced operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationEvaluation {
    pub index: usize,
    pub source_account: PublicKey,
    pub threshold_category: ThresholdCategory,
    pub signed_weight: u32,
    pub required_weight: u32,
    pub satisfied: bool,
}

/// Collected weights against the ledger's current thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub transaction_id: String,
    pub threshold_category: ThresholdCategory,
    pub signed_weight: u32,
    pub required_weight: u32,
    pub operations: Vec<OperationEvaluation>,
    pub operations_satisfied: bool,
    pub submittable: bool,
    pub status: TransactionStatus,
}

impl Evaluation {
    /// Clear `needs_signatures` on operations that reached their threshold
    pub fn apply_to(&self, tx: &mut PersistedTransaction) -> bool {
        let mut changed = false;
        for op in self.operations.iter().filter(|op| op.satisfied) {
            if let Some(record) = tx.operations.get_mut(op.index) {
                if record.needs_signatures {
                    record.needs_signatures = false;
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Secret must derive the claimed public key
pub(crate) fn verify_keypair(public_key: &PublicKey, secret: &str) -> Result<KeyPair, EngineError> {
    let keypair = KeyPair::from_secret_hex(secret)
        .map_err(|_| EngineError::KeypairMismatch(public_key.clone()))?;
    if &keypair.public_key() != public_key {
        return Err(EngineError::KeypairMismatch(public_key.clone()));
    }
    Ok(keypair)
}

/// The authorization engine
pub struct ThresholdAuthorizationEngine {
    pub(crate) gateway: Arc<dyn LedgerGateway>,
    pub(crate) store: Arc<dyn TransactionStore>,
    config: EngineConfig,
    /// One submission at a time per transaction id
    submissions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ThresholdAuthorizationEngine {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        store: Arc<dyn TransactionStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            config,
            submissions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gateway(&self) -> &dyn LedgerGateway {
        self.gateway.as_ref()
    }

    pub fn store(&self) -> &dyn TransactionStore {
        self.store.as_ref()
    }

    /// Build and persist a staged transaction
    pub async fn stage(&self, builder: &TransactionBuilder) -> Result<PersistedTransaction, EngineError> {
        builder.build(self.gateway.as_ref(), self.store.as_ref()).await
    }

    pub fn get(&self, transaction_id: &str) -> Result<PersistedTransaction, EngineError> {
        Ok(self.store.get(transaction_id)?)
    }

    /// Add a signature, then submit if the transaction became submittable.
    ///
    /// Signing twice with the same key changes nothing.
    pub async fn sign(
        &self,
        public_key: &PublicKey,
        secret: &str,
        transaction_id: &str,
    ) -> Result<PersistedTransaction, EngineError> {
        let keypair = verify_keypair(public_key, secret)?;

        let (tx, changed) = self.modify(transaction_id, |tx| {
            if tx.submitted {
                return Err(AuthorizationError::AlreadySubmitted(tx.id.clone()).into());
            }
            if !tx.is_listed_signer(public_key) {
                return Err(AuthorizationError::NotAuthorized(public_key.clone()).into());
            }
            if tx.mark_signed(public_key) == 0 {
                return Ok(false);
            }
            let mut envelope = tx.decode_envelope()?;
            envelope.sign(&keypair);
            tx.envelope = envelope.encode();
            Ok(true)
        })?;

        if changed {
            info!(transaction_id = %tx.id, signer = %public_key, "Signature recorded");
        } else {
            debug!(transaction_id = %tx.id, signer = %public_key, "Signer already signed");
        }

        self.submit_when_ready(tx).await
    }

    /// Every differently-sourced operation meets its own account's threshold.
    ///
    /// Satisfied operations get `needs_signatures` cleared on `tx`.
    pub async fn can_operations_be_submitted(
        &self,
        tx: &mut PersistedTransaction,
    ) -> Result<bool, EngineError> {
        let evaluation = self.assess(tx).await?;
        evaluation.apply_to(tx);
        Ok(evaluation.operations_satisfied)
    }

    /// Operations pass and the source account's signed weight meets the
    /// threshold for the transaction's category
    pub async fn can_transaction_be_submitted(
        &self,
        tx: &mut PersistedTransaction,
    ) -> Result<bool, EngineError> {
        let evaluation = self.assess(tx).await?;
        evaluation.apply_to(tx);
        Ok(evaluation.submittable)
    }

    /// Read-only view of a transaction's weights against live thresholds
    pub async fn evaluate(&self, transaction_id: &str) -> Result<Evaluation, EngineError> {
        let tx = self.store.get(transaction_id)?;
        self.assess(&tx).await
    }

    /// Submit a transaction that already has enough signatures.
    ///
    /// This is the retry path after a failed submission.
    pub async fn submit(&self, transaction_id: &str) -> Result<PersistedTransaction, EngineError> {
        let tx = self.store.get(transaction_id)?;
        if tx.submitted {
            return Err(AuthorizationError::AlreadySubmitted(tx.id).into());
        }

        let evaluation = self.assess(&tx).await?;
        let tx = self.record_progress(tx, &evaluation)?;
        if !evaluation.submittable {
            return Err(AuthorizationError::NotSubmittable(tx.id).into());
        }
        self.submit_envelope(tx).await
    }

    pub(crate) async fn assess(&self, tx: &PersistedTransaction) -> Result<Evaluation, EngineError> {
        let mut accounts: HashMap<PublicKey, AccountState> = HashMap::new();
        let mut operations = Vec::new();

        if tx.has_different_source_operation {
            for (index, op) in tx.operations.iter().enumerate() {
                if op.same_source_account {
                    continue;
                }
                let required_weight = self
                    .load_cached(&mut accounts, &op.source_account)
                    .await?
                    .threshold_for(op.threshold_category);
                let signed_weight = signed_weight(&op.signatures);
                operations.push(OperationEvaluation {
                    index,
                    source_account: op.source_account.clone(),
                    threshold_category: op.threshold_category,
                    signed_weight,
                    required_weight,
                    satisfied: signed_weight >= required_weight,
                });
            }
        }
        let operations_satisfied = operations.iter().all(|op| op.satisfied);

        let required_weight = self
            .load_cached(&mut accounts, &tx.source_account)
            .await?
            .threshold_for(tx.threshold_category);
        let signed_weight = tx.signed_weight();
        let submittable = !tx.submitted && operations_satisfied && signed_weight >= required_weight;

        let status = if submittable {
            TransactionStatus::Submittable
        } else {
            tx.status()
        };

        debug!(
            transaction_id = %tx.id,
            signed_weight,
            required_weight,
            operations_satisfied,
            submittable,
            "Evaluated signatures"
        );

        Ok(Evaluation {
            transaction_id: tx.id.clone(),
            threshold_category: tx.threshold_category,
            signed_weight,
            required_weight,
            operations,
            operations_satisfied,
            submittable,
            status,
        })
    }

    async fn load_cached<'a>(
        &self,
        accounts: &'a mut HashMap<PublicKey, AccountState>,
        account_id: &PublicKey,
    ) -> Result<&'a AccountState, EngineError> {
        if !accounts.contains_key(account_id) {
            let account = self.gateway.load_account(account_id).await?;
            accounts.insert(account_id.clone(), account);
        }
        accounts
            .get(account_id)
            .ok_or_else(|| EngineError::NotFound(account_id.to_string()))
    }

    /// Persist cleared `needs_signatures` flags, if any
    fn record_progress(
        &self,
        tx: PersistedTransaction,
        evaluation: &Evaluation,
    ) -> Result<PersistedTransaction, EngineError> {
        let mut preview = tx.clone();
        if !evaluation.apply_to(&mut preview) {
            return Ok(tx);
        }
        let (tx, _) = self.modify(&tx.id, |tx| Ok(evaluation.apply_to(tx)))?;
        Ok(tx)
    }

    async fn submit_when_ready(
        &self,
        tx: PersistedTransaction,
    ) -> Result<PersistedTransaction, EngineError> {
        let evaluation = self.assess(&tx).await?;
        let tx = self.record_progress(tx, &evaluation)?;
        if !evaluation.submittable {
            return Ok(tx);
        }
        self.submit_envelope(tx).await
    }

    fn submission_lock(&self, transaction_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut submissions = self
            .submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(submissions.entry(transaction_id.to_string()).or_default())
    }

    /// Send the stored envelope and record the outcome.
    ///
    /// Callers that lose a race to a submission that landed get the
    /// submitted record back instead of the ledger's replay rejection.
    pub(crate) async fn submit_envelope(
        &self,
        tx: PersistedTransaction,
    ) -> Result<PersistedTransaction, EngineError> {
        let lock = self.submission_lock(&tx.id);
        let _guard = lock.lock().await;

        let tx = self.store.get(&tx.id)?;
        if tx.submitted {
            debug!(transaction_id = %tx.id, "Already submitted by a concurrent caller");
            return Ok(tx);
        }
        let envelope = tx.decode_envelope()?;

        match self.gateway.submit(&envelope).await {
            Ok(receipt) => {
                let (tx, _) = self.modify(&tx.id, |tx| {
                    if tx.submitted {
                        return Ok(false);
                    }
                    tx.submitted = true;
                    tx.error = None;
                    Ok(true)
                })?;
                info!(
                    transaction_id = %tx.id,
                    hash = %receipt.hash,
                    ledger = receipt.ledger_sequence,
                    "Transaction submitted"
                );
                self.release_pre_authorized(&tx)?;
                Ok(tx)
            }
            Err(gateway_error) => {
                let failure = SubmissionFailure::from(&gateway_error);
                let (tx, _) = self.modify(&tx.id, |tx| {
                    if tx.submitted {
                        return Ok(false);
                    }
                    tx.error = Some(failure.clone());
                    Ok(true)
                })?;
                if tx.submitted {
                    debug!(transaction_id = %tx.id, error = %failure, "Rejected resubmission of a submitted transaction");
                    return Ok(tx);
                }
                error!(transaction_id = %tx.id, error = %failure, "Submission failed");
                Err(EngineError::Submission(failure))
            }
        }
    }

    /// Read-modify-write with compare-and-swap, retried on version conflicts.
    ///
    /// `f` returns whether it changed anything; unchanged records are not
    /// written.
    pub(crate) fn modify<F>(
        &self,
        transaction_id: &str,
        mut f: F,
    ) -> Result<(PersistedTransaction, bool), EngineError>
    where
        F: FnMut(&mut PersistedTransaction) -> Result<bool, EngineError>,
    {
        let attempts = self.config.max_write_attempts.max(1);
        for attempt in 1..=attempts {
            let mut tx = self.store.get(transaction_id)?;
            if !f(&mut tx)? {
                return Ok((tx, false));
            }
            match self.store.update(&mut tx) {
                Ok(()) => return Ok((tx, true)),
                Err(StoreError::VersionConflict { .. }) => {
                    debug!(transaction_id, attempt, "Version conflict, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }

        warn!(transaction_id, attempts, "Giving up after repeated version conflicts");
        Err(EngineError::Conflict(transaction_id.to_string(), attempts))
    }
}

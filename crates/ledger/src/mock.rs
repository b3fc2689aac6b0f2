//! Mock ledger for tests and the CLI sandbox
//!
//! Keeps accounts in memory (optionally mirrored to a JSON file) and enforces
//! the same authorization rule a real ledger does: for every account that
//! sources part of a transaction, the verified signers' weights must reach
//! that account's threshold for the strictest category it is involved in.
//! Accepted transactions apply their signer/threshold changes.

use crate::account::{AccountState, Thresholds};
use crate::envelope::Envelope;
use crate::gateway::{GatewayError, LedgerGateway, ResultCodes, SubmitReceipt};
use crate::operation::{OperationBody, SignerKey, ThresholdCategory};
use async_trait::async_trait;
use chrono::Utc;
use quorum_core::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, info};

/// Default passphrase of the sandbox network
pub const SANDBOX_NETWORK: &str = "Quorum Sandbox Network";

#[derive(Debug, Default, Serialize, Deserialize)]
struct MockState {
    accounts: BTreeMap<PublicKey, AccountState>,
    ledger_sequence: u64,
    applied: Vec<String>,
}

/// In-process ledger
pub struct MockLedger {
    network: String,
    state: RwLock<MockState>,
    path: Option<PathBuf>,
    injected_failures: Mutex<VecDeque<GatewayError>>,
}

impl MockLedger {
    /// Create an empty in-memory ledger
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            state: RwLock::new(MockState::default()),
            path: None,
            injected_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Open a ledger mirrored to a JSON file, creating it if missing
    pub fn open(path: impl AsRef<Path>, network: impl Into<String>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
        } else {
            MockState::default()
        };

        Ok(Self {
            network: network.into(),
            state: RwLock::new(state),
            path: Some(path),
            injected_failures: Mutex::new(VecDeque::new()),
        })
    }

    /// Create (or reset) an account with the default roster
    pub fn fund_account(&self, account_id: &PublicKey) -> std::io::Result<AccountState> {
        let account = AccountState::new(account_id.clone());
        self.modify(|state| {
            state.accounts.insert(account_id.clone(), account.clone());
        })?;
        Ok(account)
    }

    /// Directly add/update/remove a signer (bypassing transactions)
    pub fn set_signer(&self, account_id: &PublicKey, signer: &PublicKey, weight: u8) -> std::io::Result<()> {
        self.modify(|state| {
            if let Some(account) = state.accounts.get_mut(account_id) {
                account.apply_signer(SignerKey::Ed25519(signer.clone()), weight);
            }
        })
    }

    /// Directly replace an account's thresholds
    pub fn set_thresholds(&self, account_id: &PublicKey, thresholds: Thresholds) -> std::io::Result<()> {
        self.modify(|state| {
            if let Some(account) = state.accounts.get_mut(account_id) {
                account.set_master_weight(thresholds.master_weight);
                account.thresholds = thresholds;
            }
        })
    }

    /// Make the next submission fail with `error`
    pub fn fail_next_submit(&self, error: GatewayError) {
        self.injected_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    pub fn account(&self, account_id: &PublicKey) -> Option<AccountState> {
        self.read().accounts.get(account_id).cloned()
    }

    /// Hashes of accepted transactions, in order
    pub fn applied_hashes(&self) -> Vec<String> {
        self.read().applied.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn modify<F: FnOnce(&mut MockState)>(&self, f: F) -> std::io::Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
        self.persist(&state)
    }

    fn persist(&self, state: &MockState) -> std::io::Result<()> {
        if let Some(path) = &self.path {
            let json = serde_json::to_string_pretty(state)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }
}

fn rejected(code: &str, message: impl Into<String>) -> GatewayError {
    GatewayError::SubmissionRejected {
        message: message.into(),
        result_codes: Some(ResultCodes {
            transaction: code.to_string(),
            operations: Vec::new(),
        }),
    }
}

/// Weight the envelope carries for one account
fn signed_weight(account: &AccountState, verified: &[PublicKey], hash_hex: &str) -> u32 {
    account
        .signers
        .iter()
        .filter(|signer| match &signer.key {
            SignerKey::Ed25519(key) => verified.contains(key),
            SignerKey::PreAuthTx(hash) => hash == hash_hex,
            SignerKey::HashX(_) => false,
        })
        .map(|signer| u32::from(signer.weight))
        .sum()
}

fn apply_effects(state: &mut MockState, envelope: &Envelope, hash_hex: &str) {
    let body = &envelope.body;
    for operation in &body.operations {
        let source = operation.effective_source(&body.source_account).clone();
        match &operation.body {
            OperationBody::SetOptions(options) => {
                if let Some(account) = state.accounts.get_mut(&source) {
                    if let Some(weight) = options.master_weight {
                        account.set_master_weight(weight);
                    }
                    if let Some(low) = options.low_threshold {
                        account.thresholds.low = low;
                    }
                    if let Some(med) = options.med_threshold {
                        account.thresholds.med = med;
                    }
                    if let Some(high) = options.high_threshold {
                        account.thresholds.high = high;
                    }
                    if let Some(signer) = &options.signer {
                        account.apply_signer(signer.key.clone(), signer.weight);
                    }
                    if let Some(domain) = &options.home_domain {
                        account.home_domain = Some(domain.clone());
                    }
                    if let Some(flags) = options.set_flags {
                        account.flags |= flags;
                    }
                    if let Some(flags) = options.clear_flags {
                        account.flags &= !flags;
                    }
                }
            }
            OperationBody::CreateAccount { destination, .. } => {
                state
                    .accounts
                    .entry(destination.clone())
                    .or_insert_with(|| AccountState::new(destination.clone()));
            }
            OperationBody::AccountMerge { .. } => {
                state.accounts.remove(&source);
            }
            _ => {}
        }
    }

    // A pre-authorized transaction signer is consumed once used
    let used = SignerKey::PreAuthTx(hash_hex.to_string());
    for account in state.accounts.values_mut() {
        account.signers.retain(|s| s.key != used);
    }

    if let Some(source) = state.accounts.get_mut(&body.source_account) {
        source.sequence = source.sequence.max(body.sequence);
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    fn network(&self) -> &str {
        &self.network
    }

    async fn load_account(&self, account_id: &PublicKey) -> Result<AccountState, GatewayError> {
        self.account(account_id)
            .ok_or_else(|| GatewayError::AccountNotFound(account_id.to_string()))
    }

    async fn submit(&self, envelope: &Envelope) -> Result<SubmitReceipt, GatewayError> {
        let injected = self
            .injected_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(error) = injected {
            debug!(error = %error, "Injected submission failure");
            return Err(error);
        }

        let body = &envelope.body;
        if body.network != self.network {
            return Err(rejected("tx_bad_network", format!("wrong network: {}", body.network)));
        }
        if body.operations.is_empty() {
            return Err(rejected("tx_missing_operation", "transaction has no operations"));
        }

        let hash_hex = envelope.hash_hex();
        let verified = envelope.verified_signers();

        // Strictest category each involved account has to satisfy
        let mut required: BTreeMap<PublicKey, ThresholdCategory> = BTreeMap::new();
        required.insert(body.source_account.clone(), ThresholdCategory::Low);
        for operation in &body.operations {
            let source = operation.effective_source(&body.source_account).clone();
            let category = operation.threshold_category();
            let entry = required.entry(source).or_insert(category);
            *entry = (*entry).max(category);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.applied.contains(&hash_hex) {
            return Err(rejected("tx_bad_seq", "transaction already applied"));
        }

        for (account_id, category) in &required {
            let account = state
                .accounts
                .get(account_id)
                .ok_or_else(|| rejected("tx_no_source_account", format!("missing account {}", account_id)))?;
            let weight = signed_weight(account, &verified, &hash_hex);
            let needed = account.threshold_for(*category).max(1);
            if weight < needed {
                debug!(
                    account = %account_id.short(),
                    weight,
                    needed,
                    "Insufficient signature weight"
                );
                return Err(rejected(
                    "tx_bad_auth",
                    format!("account {} signed with weight {} of {}", account_id.short(), weight, needed),
                ));
            }
        }

        apply_effects(&mut state, envelope, &hash_hex);
        state.ledger_sequence += 1;
        state.applied.push(hash_hex.clone());
        let ledger_sequence = state.ledger_sequence;
        self.persist(&state)
            .map_err(|e| GatewayError::NetworkError(format!("sandbox persistence failed: {}", e)))?;

        info!(hash = %hash_hex, ledger_sequence, "Transaction applied");

        Ok(SubmitReceipt {
            hash: hash_hex,
            ledger_sequence,
            closed_at: Utc::now(),
        })
    }
}

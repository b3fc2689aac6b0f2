//! Ledger gateway - the engine's only view of the ledger network
//!
//! Implementations can be:
//! - `MockLedger`: in-process ledger for tests and the CLI sandbox
//! - a network client talking to a real ledger node
//!
//! `ResilientGateway` wraps any implementation with bounded timeouts and a
//! single transparent retry of failed submissions.

use crate::account::AccountState;
use crate::envelope::Envelope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quorum_core::PublicKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Result codes reported by the ledger for a rejected transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCodes {
    /// Transaction-level code, e.g. `tx_bad_auth`
    pub transaction: String,
    /// One code per operation, when the ledger got that far
    #[serde(default)]
    pub operations: Vec<String>,
}

/// Errors returned by a ledger gateway
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Transaction rejected: {message}")]
    SubmissionRejected {
        message: String,
        result_codes: Option<ResultCodes>,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Ledger call timed out after {0}ms")]
    Timeout(u64),
}

impl GatewayError {
    /// Transport failures may succeed on retry; rejections will not
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::NetworkError(_) | GatewayError::Timeout(_))
    }
}

/// Normalized submission failure, suitable for persisting on a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFailure {
    pub message: String,
    pub result_codes: Option<ResultCodes>,
    pub failed_at: DateTime<Utc>,
}

impl From<&GatewayError> for SubmissionFailure {
    fn from(error: &GatewayError) -> Self {
        let result_codes = match error {
            GatewayError::SubmissionRejected { result_codes, .. } => result_codes.clone(),
            _ => None,
        };
        Self {
            message: error.to_string(),
            result_codes,
            failed_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(codes) = &self.result_codes {
            write!(f, " [{}", codes.transaction)?;
            if !codes.operations.is_empty() {
                write!(f, ": {}", codes.operations.join(", "))?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Receipt for an accepted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub hash: String,
    pub ledger_sequence: u64,
    pub closed_at: DateTime<Utc>,
}

/// Ledger Gateway trait - loads accounts and submits envelopes
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Passphrase of the network this gateway talks to
    fn network(&self) -> &str;

    /// Load the current signer roster, thresholds and sequence of an account
    async fn load_account(&self, account_id: &PublicKey) -> Result<AccountState, GatewayError>;

    /// Submit a signed envelope
    async fn submit(&self, envelope: &Envelope) -> Result<SubmitReceipt, GatewayError>;
}

#[async_trait]
impl<G: LedgerGateway + ?Sized> LedgerGateway for Arc<G> {
    fn network(&self) -> &str {
        (**self).network()
    }

    async fn load_account(&self, account_id: &PublicKey) -> Result<AccountState, GatewayError> {
        (**self).load_account(account_id).await
    }

    async fn submit(&self, envelope: &Envelope) -> Result<SubmitReceipt, GatewayError> {
        (**self).submit(envelope).await
    }
}

/// Bounded timeouts plus one retry of transiently failed submissions
pub struct ResilientGateway<G> {
    inner: G,
    timeout: Duration,
}

impl<G: LedgerGateway> ResilientGateway<G> {
    pub fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    async fn submit_once(&self, envelope: &Envelope) -> Result<SubmitReceipt, GatewayError> {
        match tokio::time::timeout(self.timeout, self.inner.submit(envelope)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout_ms())),
        }
    }
}

#[async_trait]
impl<G: LedgerGateway> LedgerGateway for ResilientGateway<G> {
    fn network(&self) -> &str {
        self.inner.network()
    }

    async fn load_account(&self, account_id: &PublicKey) -> Result<AccountState, GatewayError> {
        match tokio::time::timeout(self.timeout, self.inner.load_account(account_id)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout_ms())),
        }
    }

    async fn submit(&self, envelope: &Envelope) -> Result<SubmitReceipt, GatewayError> {
        match self.submit_once(envelope).await {
            Err(error) if error.is_transient() => {
                warn!(error = %error, "Submission failed, retrying once");
                self.submit_once(envelope).await
            }
            other => {
                debug!(ok = other.is_ok(), "Submission finished");
                other
            }
        }
    }
}

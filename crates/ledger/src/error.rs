//! Ledger errors

use thiserror::Error;

/// Errors raised by the ledger model (keys, envelopes, signatures)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid secret key: {0}")]
    InvalidSecret(String),

    #[error("Invalid signature from {signer}: {reason}")]
    InvalidSignature { signer: String, reason: String },

    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("Envelope decoding failed: {0}")]
    InvalidEnvelope(String),

    #[error("Memo text too long ({len} bytes, max {max})")]
    MemoTooLong { len: usize, max: usize },
}

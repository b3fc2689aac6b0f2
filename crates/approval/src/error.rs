//! Engine error types

use quorum_compose::ComposeError;
use quorum_core::PublicKey;
use quorum_ledger::{GatewayError, LedgerError, SubmissionFailure};
use thiserror::Error;

/// Errors from the transaction store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction not found: {0}")]
    NotFound(String),

    #[error("Transaction {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: String, expected: u64 },
}

/// Caller is not allowed to do what it asked
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Signer {0} is not authorized for this transaction")]
    NotAuthorized(PublicKey),

    #[error("Approver {0} is not authorized for this transaction")]
    ApproverNotAuthorized(PublicKey),

    #[error("Transaction {0} was already submitted")]
    AlreadySubmitted(String),

    #[error("Transaction {0} does not have enough signatures to submit")]
    NotSubmittable(String),
}

/// Errors surfaced by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation failed ({code}): {0}", code = .0.code())]
    Validation(#[from] ComposeError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error("Secret does not belong to public key {0}")]
    KeypairMismatch(PublicKey),

    #[error("Ledger read failed: {0}")]
    LedgerRead(GatewayError),

    #[error("Submission failed: {0}")]
    Submission(SubmissionFailure),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Transaction not found: {0}")]
    NotFound(String),

    #[error("Transaction {0} kept changing underneath us; gave up after {1} attempts")]
    Conflict(String, u32),

    #[error("Envelope error: {0}")]
    Envelope(#[from] LedgerError),
}

impl EngineError {
    /// Whether repeating the same call may succeed
    pub fn is_retriable(&self) -> bool {
        match self {
            EngineError::Submission(_) | EngineError::Conflict(..) => true,
            EngineError::LedgerRead(error) => error.is_transient(),
            _ => false,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Store(other),
        }
    }
}

impl From<GatewayError> for EngineError {
    fn from(error: GatewayError) -> Self {
        EngineError::LedgerRead(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable() {
        let failure = SubmissionFailure::from(&GatewayError::NetworkError("reset".into()));
        assert!(EngineError::Submission(failure).is_retriable());
        assert!(EngineError::Conflict("tx".into(), 5).is_retriable());
        assert!(EngineError::LedgerRead(GatewayError::Timeout(10)).is_retriable());
        assert!(!EngineError::LedgerRead(GatewayError::AccountNotFound("a".into())).is_retriable());
        assert!(!EngineError::from(AuthorizationError::AlreadySubmitted("tx".into())).is_retriable());
        assert!(!EngineError::from(ComposeError::InvalidDeleteOffer).is_retriable());
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let error = EngineError::from(StoreError::NotFound("abc".into()));
        assert!(matches!(error, EngineError::NotFound(id) if id == "abc"));
    }

    #[test]
    fn test_validation_message_carries_code() {
        let error = EngineError::from(ComposeError::InvalidDeleteOffer);
        assert!(error.to_string().contains("invalid.deleteOffer"));
    }
}

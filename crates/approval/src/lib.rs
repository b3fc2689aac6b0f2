//! # Quorum Approval
//!
//! Threshold authorization for multi-signer ledger transactions.
//!
//! ## Scope
//! - Staging unsigned transactions with snapshotted signer rosters
//! - Incremental signature collection from independent signers
//! - Submission once every involved account's weighted threshold is met
//! - Pre-authorization: a transaction authorized ahead of time by its hash,
//!   released later by a final approver
//!
//! ## Features
//! - Live thresholds reloaded from the ledger on every evaluation
//! - SQLite storage with compare-and-swap updates
//! - Failed submissions are recorded and can be retried

mod builder;
mod config;
mod engine;
mod error;
mod intents;
mod preauth;
mod store;
mod transaction;

pub use builder::TransactionBuilder;
pub use config::{EngineConfig, Fee, FeeSchedule};
pub use engine::{Evaluation, OperationEvaluation, ThresholdAuthorizationEngine};
pub use error::{AuthorizationError, EngineError, StoreError};
pub use intents::{Inbox, IntentService, OfferRequest};
pub use preauth::PRE_AUTH_MEMO;
pub use store::{SqliteTransactionStore, TransactionStore};
pub use transaction::{
    ApproverEntry, OperationRecord, PersistedTransaction, PreAuthLink, SignerEntry,
    TransactionStatus, TransactionView,
};

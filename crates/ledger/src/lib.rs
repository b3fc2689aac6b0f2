//! Quorum Ledger - the ledger network as the engine sees it
//!
//! # Key Types
//! - `Operation` / `OperationBody`: one state change, classified into a
//!   `ThresholdCategory`
//! - `Envelope`: transaction body plus collected signatures; its hash is the
//!   transaction's identity
//! - `AccountState`: signer roster, thresholds and sequence of an account
//! - `LedgerGateway`: load accounts, submit envelopes

pub mod account;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod mock;
pub mod operation;

pub use account::{AccountSigner, AccountState, Thresholds};
pub use envelope::{Envelope, TransactionBody};
pub use error::LedgerError;
pub use gateway::{
    GatewayError, LedgerGateway, ResilientGateway, ResultCodes, SubmissionFailure, SubmitReceipt,
};
pub use keys::{DecoratedSignature, KeyPair};
pub use mock::{MockLedger, SANDBOX_NETWORK};
pub use operation::{
    Memo, Operation, OperationBody, OperationType, SetOptions, SignerKey, SignerSpec,
    ThresholdCategory,
};

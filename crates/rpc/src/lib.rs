//! Quorum RPC - CLI orchestrator
//!
//! This crate provides the CLI binary and command orchestration over a
//! sandbox ledger kept in the data directory.

pub mod commands;
pub mod context;

pub use context::AppContext;

//! Quorum Core - Domain types
//!
//! This crate contains the fundamental types shared by every Quorum crate:
//! - `Amount`: Non-negative decimal wrapper for ledger amounts
//! - `Asset`: Native asset or an issued credit (code + issuer)
//! - `PublicKey`: Hex-encoded ed25519 account/signer key

pub mod amount;
pub mod asset;
pub mod key;

pub use amount::{Amount, AmountError};
pub use asset::{Asset, AssetCode, AssetError, NATIVE_ASSET_CODE};
pub use key::{KeyError, PublicKey};

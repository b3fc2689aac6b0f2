//! Set-options builders: home domain, signer, weights/thresholds, flags

use crate::error::ComposeError;
use quorum_core::PublicKey;
use quorum_ledger::operation::{AUTH_IMMUTABLE_FLAG, AUTH_REQUIRED_FLAG, AUTH_REVOCABLE_FLAG};
use quorum_ledger::{Operation, OperationBody, SetOptions, SignerKey, SignerSpec};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Longest home domain the ledger stores
pub const MAX_HOME_DOMAIN: usize = 32;

/// Whether a flags operation sets or clears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum FlagOperation {
    #[strum(serialize = "setFlags")]
    #[serde(rename = "setFlags")]
    Set,
    #[strum(serialize = "clearFlags")]
    #[serde(rename = "clearFlags")]
    Clear,
}

/// Named account flag selections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum AccountFlag {
    /// Authorization required, and revocable
    #[strum(serialize = "AuthRequiredFlag")]
    AuthRequired,
    #[strum(serialize = "AuthRequiredFlagOnly")]
    AuthRequiredOnly,
    #[strum(serialize = "AuthImmutableFlag")]
    AuthImmutable,
    #[strum(serialize = "AuthRevocableFlag")]
    AuthRevocable,
}

impl AccountFlag {
    pub fn bits(self) -> u32 {
        match self {
            AccountFlag::AuthRequired => AUTH_REQUIRED_FLAG | AUTH_REVOCABLE_FLAG,
            AccountFlag::AuthRequiredOnly => AUTH_REQUIRED_FLAG,
            AccountFlag::AuthImmutable => AUTH_IMMUTABLE_FLAG,
            AccountFlag::AuthRevocable => AUTH_REVOCABLE_FLAG,
        }
    }
}

/// Parse a flag name such as `AuthRequiredFlag`
pub fn parse_flag(name: &str) -> Result<AccountFlag, ComposeError> {
    name.parse()
        .map_err(|_| ComposeError::InvalidFlag(name.to_string()))
}

/// Parse `setFlags` / `clearFlags`
pub fn parse_flag_operation(name: &str) -> Result<FlagOperation, ComposeError> {
    name.parse()
        .map_err(|_| ComposeError::InvalidFlag(name.to_string()))
}

fn set_options(account: &PublicKey, options: SetOptions) -> Operation {
    Operation::new(Some(account.clone()), OperationBody::SetOptions(options))
}

pub fn set_options_home_domain(
    account: &PublicKey,
    home_domain: &str,
) -> Result<Operation, ComposeError> {
    if home_domain.len() > MAX_HOME_DOMAIN {
        return Err(ComposeError::InvalidHomeDomain(home_domain.len()));
    }
    Ok(set_options(
        account,
        SetOptions {
            home_domain: Some(home_domain.to_string()),
            ..Default::default()
        },
    ))
}

/// Add, reweight or (weight 0) remove a signer
pub fn set_options_signer(account: &PublicKey, signer: SignerKey, weight: u8) -> Operation {
    set_options(
        account,
        SetOptions {
            signer: Some(SignerSpec { key: signer, weight }),
            ..Default::default()
        },
    )
}

/// Master weight plus all three thresholds
pub fn set_options_weights(
    account: &PublicKey,
    master_weight: u8,
    low: u8,
    medium: u8,
    high: u8,
) -> Operation {
    set_options(
        account,
        SetOptions {
            master_weight: Some(master_weight),
            low_threshold: Some(low),
            med_threshold: Some(medium),
            high_threshold: Some(high),
            ..Default::default()
        },
    )
}

pub fn set_options_flags(account: &PublicKey, operation: FlagOperation, flag: AccountFlag) -> Operation {
    let bits = Some(flag.bits());
    let options = match operation {
        FlagOperation::Set => SetOptions {
            set_flags: bits,
            ..Default::default()
        },
        FlagOperation::Clear => SetOptions {
            clear_flags: bits,
            ..Default::default()
        },
    };
    set_options(account, options)
}

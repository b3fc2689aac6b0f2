//! Ledger operations and their threshold classification
//!
//! An operation is one state change inside a transaction. Each operation runs
//! against a source account (the transaction's source unless overridden) and
//! needs that account's signers to reach a weighted threshold. Which threshold
//! applies depends on the operation's `ThresholdCategory`.

use crate::error::LedgerError;
use quorum_core::{Amount, Asset, AssetCode, PublicKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Maximum length of a text memo in bytes
pub const MAX_MEMO_TEXT: usize = 28;

/// Flag: trustlines must be authorized by the issuer
pub const AUTH_REQUIRED_FLAG: u32 = 0x1;
/// Flag: the issuer may revoke trustline authorization
pub const AUTH_REVOCABLE_FLAG: u32 = 0x2;
/// Flag: account flags can never change again
pub const AUTH_IMMUTABLE_FLAG: u32 = 0x4;

/// Required signing weight class of an operation.
///
/// Ordering is `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumString, Display,
)]
pub enum ThresholdCategory {
    Low,
    Medium,
    High,
}

impl ThresholdCategory {
    /// Strictest category over a set, `Low` for an empty set
    pub fn max_of<I: IntoIterator<Item = ThresholdCategory>>(categories: I) -> Self {
        categories.into_iter().max().unwrap_or(ThresholdCategory::Low)
    }
}

/// Operation kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    CreateAccount,
    Payment,
    ChangeTrust,
    AllowTrust,
    ManageOffer,
    SetOptions,
    AccountMerge,
    BumpSequence,
}

/// Key of an account signer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum SignerKey {
    /// An ed25519 public key that signs envelopes
    Ed25519(PublicKey),
    /// Hash of a specific transaction that is authorized in advance
    PreAuthTx(String),
    /// SHA-256 hash whose preimage acts as a signature
    HashX(String),
}

impl SignerKey {
    pub fn as_ed25519(&self) -> Option<&PublicKey> {
        match self {
            SignerKey::Ed25519(key) => Some(key),
            _ => None,
        }
    }
}

/// Signer added, updated or (weight 0) removed by a set-options operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSpec {
    pub key: SignerKey,
    pub weight: u8,
}

/// Parameters of a set-options operation; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOptions {
    pub set_flags: Option<u32>,
    pub clear_flags: Option<u32>,
    pub master_weight: Option<u8>,
    pub low_threshold: Option<u8>,
    pub med_threshold: Option<u8>,
    pub high_threshold: Option<u8>,
    pub home_domain: Option<String>,
    pub signer: Option<SignerSpec>,
}

impl SetOptions {
    /// Touching signers, master weight or thresholds needs the high threshold
    pub fn changes_authorization(&self) -> bool {
        self.signer.is_some()
            || self.master_weight.is_some()
            || self.low_threshold.is_some()
            || self.med_threshold.is_some()
            || self.high_threshold.is_some()
    }
}

/// The state change an operation performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OperationBody {
    CreateAccount {
        destination: PublicKey,
        starting_balance: Amount,
    },
    Payment {
        destination: PublicKey,
        asset: Asset,
        amount: Amount,
    },
    ChangeTrust {
        asset: Asset,
        limit: Option<Amount>,
    },
    AllowTrust {
        trustor: PublicKey,
        asset_code: AssetCode,
        authorize: bool,
    },
    /// Offer id 0 creates; nonzero updates, or deletes when amount is 0
    ManageOffer {
        selling: Asset,
        buying: Asset,
        amount: Amount,
        price: Decimal,
        offer_id: u64,
    },
    SetOptions(SetOptions),
    AccountMerge {
        destination: PublicKey,
    },
    BumpSequence {
        bump_to: i64,
    },
}

/// One operation inside a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Explicit source account; `None` runs against the transaction source
    pub source: Option<PublicKey>,
    pub body: OperationBody,
}

impl Operation {
    pub fn new(source: Option<PublicKey>, body: OperationBody) -> Self {
        Self { source, body }
    }

    pub fn op_type(&self) -> OperationType {
        match &self.body {
            OperationBody::CreateAccount { .. } => OperationType::CreateAccount,
            OperationBody::Payment { .. } => OperationType::Payment,
            OperationBody::ChangeTrust { .. } => OperationType::ChangeTrust,
            OperationBody::AllowTrust { .. } => OperationType::AllowTrust,
            OperationBody::ManageOffer { .. } => OperationType::ManageOffer,
            OperationBody::SetOptions(_) => OperationType::SetOptions,
            OperationBody::AccountMerge { .. } => OperationType::AccountMerge,
            OperationBody::BumpSequence { .. } => OperationType::BumpSequence,
        }
    }

    /// Source account this operation runs against
    pub fn effective_source<'a>(&'a self, transaction_source: &'a PublicKey) -> &'a PublicKey {
        self.source.as_ref().unwrap_or(transaction_source)
    }

    /// Threshold category the source account's signers must reach
    pub fn threshold_category(&self) -> ThresholdCategory {
        match &self.body {
            OperationBody::SetOptions(options) if options.changes_authorization() => {
                ThresholdCategory::High
            }
            OperationBody::AccountMerge { .. } => ThresholdCategory::High,
            OperationBody::BumpSequence { .. } | OperationBody::AllowTrust { .. } => {
                ThresholdCategory::Low
            }
            _ => ThresholdCategory::Medium,
        }
    }
}

/// Optional note attached to a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Memo {
    Text(String),
    Id(u64),
}

impl Memo {
    /// Text memo, checked against the ledger's length limit
    pub fn text(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        if value.len() > MAX_MEMO_TEXT {
            return Err(LedgerError::MemoTooLong {
                len: value.len(),
                max: MAX_MEMO_TEXT,
            });
        }
        Ok(Memo::Text(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: &str) -> PublicKey {
        byte.repeat(32).parse().unwrap()
    }

    fn set_options(options: SetOptions) -> Operation {
        Operation::new(None, OperationBody::SetOptions(options))
    }

    #[test]
    fn test_set_options_categories() {
        let home_domain = set_options(SetOptions {
            home_domain: Some("example.com".to_string()),
            ..Default::default()
        });
        assert_eq!(home_domain.threshold_category(), ThresholdCategory::Medium);

        let flags = set_options(SetOptions {
            set_flags: Some(AUTH_REQUIRED_FLAG),
            ..Default::default()
        });
        assert_eq!(flags.threshold_category(), ThresholdCategory::Medium);

        let signer = set_options(SetOptions {
            signer: Some(SignerSpec {
                key: SignerKey::Ed25519(key("aa")),
                weight: 1,
            }),
            ..Default::default()
        });
        assert_eq!(signer.threshold_category(), ThresholdCategory::High);

        // Zero is still a change to the master weight
        let master = set_options(SetOptions {
            master_weight: Some(0),
            ..Default::default()
        });
        assert_eq!(master.threshold_category(), ThresholdCategory::High);

        let threshold = set_options(SetOptions {
            high_threshold: Some(3),
            ..Default::default()
        });
        assert_eq!(threshold.threshold_category(), ThresholdCategory::High);
    }

    #[test]
    fn test_other_categories() {
        let merge = Operation::new(None, OperationBody::AccountMerge { destination: key("bb") });
        assert_eq!(merge.threshold_category(), ThresholdCategory::High);

        let bump = Operation::new(None, OperationBody::BumpSequence { bump_to: 10 });
        assert_eq!(bump.threshold_category(), ThresholdCategory::Low);

        let allow = Operation::new(
            None,
            OperationBody::AllowTrust {
                trustor: key("cc"),
                asset_code: "USD".parse().unwrap(),
                authorize: true,
            },
        );
        assert_eq!(allow.threshold_category(), ThresholdCategory::Low);

        let payment = Operation::new(
            None,
            OperationBody::Payment {
                destination: key("dd"),
                asset: Asset::Native,
                amount: "5".parse().unwrap(),
            },
        );
        assert_eq!(payment.threshold_category(), ThresholdCategory::Medium);
        assert_eq!(payment.op_type(), OperationType::Payment);
    }

    #[test]
    fn test_category_ordering_and_max() {
        assert!(ThresholdCategory::Low < ThresholdCategory::Medium);
        assert!(ThresholdCategory::Medium < ThresholdCategory::High);
        assert_eq!(ThresholdCategory::max_of(vec![]), ThresholdCategory::Low);
        assert_eq!(
            ThresholdCategory::max_of(vec![ThresholdCategory::Medium, ThresholdCategory::Low]),
            ThresholdCategory::Medium
        );
    }

    #[test]
    fn test_effective_source() {
        let tx_source = key("01");
        let own = key("02");

        let inherited = Operation::new(None, OperationBody::BumpSequence { bump_to: 1 });
        assert_eq!(inherited.effective_source(&tx_source), &tx_source);

        let explicit = Operation::new(Some(own.clone()), OperationBody::BumpSequence { bump_to: 1 });
        assert_eq!(explicit.effective_source(&tx_source), &own);
    }

    #[test]
    fn test_operation_type_strings() {
        assert_eq!(OperationType::ManageOffer.to_string(), "manageOffer");
        assert_eq!(
            "setOptions".parse::<OperationType>().unwrap(),
            OperationType::SetOptions
        );
    }

    #[test]
    fn test_memo_length() {
        assert!(Memo::text("PreAuthTx signer").is_ok());
        assert!(matches!(
            Memo::text("x".repeat(29)),
            Err(LedgerError::MemoTooLong { len: 29, max: 28 })
        ));
    }
}

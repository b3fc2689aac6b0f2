//! Account, payment and trustline operations

use crate::error::ComposeError;
use quorum_core::{Amount, Asset, AssetCode, PublicKey};
use quorum_ledger::{Operation, OperationBody};

/// Parse a non-negative amount string
pub(crate) fn parse_amount(value: &str) -> Result<Amount, ComposeError> {
    Ok(value.parse::<Amount>()?)
}

/// Resolve an asset; `XLM` is native, anything else needs an issuer
pub fn resolve_asset(code: &str, issuer: Option<&PublicKey>) -> Result<Asset, ComposeError> {
    Ok(Asset::resolve(code, issuer)?)
}

/// Create and fund a new account
pub fn create_account(
    source: Option<&PublicKey>,
    destination: &PublicKey,
    starting_balance: &str,
) -> Result<Operation, ComposeError> {
    let starting_balance = parse_amount(starting_balance)?;
    Ok(Operation::new(
        source.cloned(),
        OperationBody::CreateAccount {
            destination: destination.clone(),
            starting_balance,
        },
    ))
}

/// Send an amount of an asset
pub fn payment(
    source: Option<&PublicKey>,
    destination: &PublicKey,
    asset_code: &str,
    asset_issuer: Option<&PublicKey>,
    amount: &str,
) -> Result<Operation, ComposeError> {
    let asset = resolve_asset(asset_code, asset_issuer)?;
    let amount = parse_amount(amount)?;
    Ok(Operation::new(
        source.cloned(),
        OperationBody::Payment {
            destination: destination.clone(),
            asset,
            amount,
        },
    ))
}

/// Create, change or (limit 0) remove a trustline
pub fn change_trust(
    source: Option<&PublicKey>,
    asset_code: &str,
    asset_issuer: &PublicKey,
    limit: Option<&str>,
) -> Result<Operation, ComposeError> {
    let asset = resolve_asset(asset_code, Some(asset_issuer))?;
    if asset.is_native() {
        return Err(ComposeError::InvalidAsset("the native asset needs no trustline".into()));
    }
    let limit = limit.map(parse_amount).transpose()?;
    Ok(Operation::new(source.cloned(), OperationBody::ChangeTrust { asset, limit }))
}

/// Issuer authorizes (or revokes) a trustor's trustline
pub fn allow_trust(
    issuer: &PublicKey,
    asset_code: &str,
    trustor: &PublicKey,
    authorize: bool,
) -> Result<Operation, ComposeError> {
    let asset_code: AssetCode = asset_code.parse()?;
    if asset_code.is_native() {
        return Err(ComposeError::InvalidAsset("the native asset has no issuer".into()));
    }
    Ok(Operation::new(
        Some(issuer.clone()),
        OperationBody::AllowTrust {
            trustor: trustor.clone(),
            asset_code,
            authorize,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_ledger::{OperationType, ThresholdCategory};

    fn key(byte: &str) -> PublicKey {
        byte.repeat(32).parse().unwrap()
    }

    #[test]
    fn test_native_payment_needs_no_issuer() {
        let op = payment(Some(&key("aa")), &key("bb"), "XLM", None, "12.5").unwrap();
        assert_eq!(op.op_type(), OperationType::Payment);
        assert_eq!(op.source, Some(key("aa")));
        match op.body {
            OperationBody::Payment { asset, amount, .. } => {
                assert!(asset.is_native());
                assert_eq!(amount.to_string(), "12.5");
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_credit_payment_requires_issuer() {
        let result = payment(None, &key("bb"), "USD", None, "1");
        assert_eq!(result, Err(ComposeError::MissingIssuer("USD".into())));

        let op = payment(None, &key("bb"), "USD", Some(&key("cc")), "1").unwrap();
        assert_eq!(op.source, None);
        assert_eq!(op.threshold_category(), ThresholdCategory::Medium);
    }

    #[test]
    fn test_negative_payment_rejected() {
        let result = payment(None, &key("bb"), "XLM", None, "-3");
        assert!(matches!(result, Err(ComposeError::InvalidAmount(_))));
    }

    #[test]
    fn test_create_account() {
        let op = create_account(Some(&key("aa")), &key("bb"), "100").unwrap();
        assert_eq!(op.op_type(), OperationType::CreateAccount);
        assert_eq!(op.threshold_category(), ThresholdCategory::Medium);
    }

    #[test]
    fn test_change_trust() {
        let op = change_trust(Some(&key("aa")), "EUR", &key("cc"), Some("1000")).unwrap();
        assert_eq!(op.op_type(), OperationType::ChangeTrust);

        let native = change_trust(None, "XLM", &key("cc"), None);
        assert!(matches!(native, Err(ComposeError::InvalidAsset(_))));
    }

    #[test]
    fn test_allow_trust_is_low_threshold_and_issuer_sourced() {
        let op = allow_trust(&key("cc"), "EUR", &key("aa"), true).unwrap();
        assert_eq!(op.source, Some(key("cc")));
        assert_eq!(op.threshold_category(), ThresholdCategory::Low);
    }
}

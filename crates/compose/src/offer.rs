//! Manage-offer composition
//!
//! One operation covers three intents, told apart by the offer id and the
//! sell amount:
//!
//! | offer id | sell amount | intent                      |
//! |----------|-------------|-----------------------------|
//! | 0        | > 0         | create                      |
//! | nonzero  | > 0         | update                      |
//! | nonzero  | 0           | delete (price 1, amount 0)  |
//! | 0        | 0           | rejected                    |

use crate::error::ComposeError;
use quorum_core::{Amount, Asset, PublicKey};
use quorum_ledger::{Operation, OperationBody};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimal places of an offer price
pub const PRICE_SCALE: u32 = 10;

/// Parse an optional offer id; absent or empty means a new offer
pub fn parse_offer_id(offer_id: Option<&str>) -> Result<u64, ComposeError> {
    match offer_id.map(str::trim) {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ComposeError::InvalidOfferId(raw.to_string())),
    }
}

fn parse_signed(raw: &str) -> Result<Decimal, ComposeError> {
    Decimal::from_str(raw.trim()).map_err(|_| ComposeError::InvalidAmount(raw.to_string()))
}

/// Compose a create, update or delete offer operation.
///
/// Negative amounts are rejected before anything else is looked at.
pub fn manage_offer(
    source: Option<&PublicKey>,
    offer_id: u64,
    selling: Asset,
    sell_amount: &str,
    buying: Asset,
    buy_amount: &str,
) -> Result<Operation, ComposeError> {
    let sell = parse_signed(sell_amount)?;
    if sell.is_sign_negative() && !sell.is_zero() {
        return Err(ComposeError::NegativeSellAmount(sell_amount.to_string()));
    }
    let buy = parse_signed(buy_amount)?;
    if buy.is_sign_negative() && !buy.is_zero() {
        return Err(ComposeError::NegativeBuyAmount(buy_amount.to_string()));
    }

    if sell.is_zero() {
        if offer_id == 0 {
            return Err(ComposeError::InvalidDeleteOffer);
        }
        return Ok(Operation::new(
            source.cloned(),
            OperationBody::ManageOffer {
                selling,
                buying,
                amount: Amount::ZERO,
                price: Decimal::ONE,
                offer_id,
            },
        ));
    }

    let amount = Amount::new(sell)?;
    Amount::new(buy)?;
    let price = buy
        .checked_div(sell)
        .ok_or_else(|| ComposeError::InvalidAmount(format!("{} / {}", buy_amount, sell_amount)))?;
    let mut price = price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    price.rescale(PRICE_SCALE);

    Ok(Operation::new(
        source.cloned(),
        OperationBody::ManageOffer {
            selling,
            buying,
            amount,
            price,
            offer_id,
        },
    ))
}

/// Human-readable summary of an offer intent
pub fn offer_description(
    selling: &Asset,
    sell_amount: &str,
    buying: &Asset,
    buy_amount: &str,
    offer_id: u64,
) -> String {
    let deleting = parse_signed(sell_amount).map(|v| v.is_zero()).unwrap_or(false);
    if deleting {
        format!("Deleting offer {}", offer_id)
    } else if offer_id == 0 {
        format!(
            "New offer to sell {} {} for {} {}",
            sell_amount,
            selling.code(),
            buy_amount,
            buying.code()
        )
    } else {
        format!(
            "Updating offer {} to sell {} {} for {} {}",
            offer_id,
            sell_amount,
            selling.code(),
            buy_amount,
            buying.code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd() -> Asset {
        Asset::resolve("USD", Some(&"cc".repeat(32).parse().unwrap())).unwrap()
    }

    fn offer(op: &Operation) -> (Amount, Decimal, u64) {
        match &op.body {
            OperationBody::ManageOffer {
                amount,
                price,
                offer_id,
                ..
            } => (*amount, *price, *offer_id),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_zero_sell_without_offer_id_is_invalid_delete() {
        let offer_id = parse_offer_id(None).unwrap();
        let result = manage_offer(None, offer_id, Asset::Native, "0", usd(), "10");
        assert_eq!(result, Err(ComposeError::InvalidDeleteOffer));
        assert_eq!(result.unwrap_err().code(), "invalid.deleteOffer");

        let result = manage_offer(None, 0, Asset::Native, "0", usd(), "10");
        assert_eq!(result, Err(ComposeError::InvalidDeleteOffer));
    }

    #[test]
    fn test_zero_sell_with_offer_id_deletes() {
        let offer_id = parse_offer_id(Some("5")).unwrap();
        let op = manage_offer(None, offer_id, Asset::Native, "0", usd(), "10").unwrap();
        let (amount, price, id) = offer(&op);
        assert_eq!(price.to_string(), "1");
        assert_eq!(amount.to_string(), "0");
        assert_eq!(id, 5);
    }

    #[test]
    fn test_price_is_buy_over_sell_at_ten_places() {
        let op = manage_offer(None, 0, Asset::Native, "100", usd(), "50").unwrap();
        let (amount, price, id) = offer(&op);
        assert_eq!(price.to_string(), "0.5000000000");
        assert_eq!(amount.to_string(), "100");
        assert_eq!(id, 0);
    }

    #[test]
    fn test_price_rounding() {
        let op = manage_offer(None, 7, usd(), "3", Asset::Native, "1").unwrap();
        let (_, price, _) = offer(&op);
        assert_eq!(price, dec!(0.3333333333));
        assert_eq!(price.scale(), PRICE_SCALE);

        let op = manage_offer(None, 7, usd(), "3", Asset::Native, "2").unwrap();
        let (_, price, _) = offer(&op);
        assert_eq!(price, dec!(0.6666666667));
    }

    #[test]
    fn test_price_overflow_is_an_error() {
        let result = manage_offer(
            None,
            0,
            Asset::Native,
            "0.0000001",
            usd(),
            "79228162514264337593543950",
        );
        assert_eq!(result.unwrap_err().code(), "invalid.amount");
    }

    #[test]
    fn test_buy_amount_precision() {
        let result = manage_offer(None, 0, Asset::Native, "1", usd(), "0.12345678");
        assert_eq!(result.unwrap_err().code(), "invalid.amount");

        assert!(manage_offer(None, 0, Asset::Native, "1", usd(), "0.1234567").is_ok());
    }

    #[test]
    fn test_negative_amounts_rejected_first() {
        let result = manage_offer(None, 0, Asset::Native, "-1", usd(), "10");
        assert_eq!(result.unwrap_err().code(), "negative.sellAmount");

        let result = manage_offer(None, 0, Asset::Native, "10", usd(), "-1");
        assert_eq!(result.unwrap_err().code(), "negative.buyAmount");

        let result = manage_offer(None, 5, Asset::Native, "0", usd(), "-1");
        assert_eq!(result.unwrap_err().code(), "negative.buyAmount");

        let result = manage_offer(None, 0, Asset::Native, "ten", usd(), "1");
        assert_eq!(result.unwrap_err().code(), "invalid.amount");
    }

    #[test]
    fn test_parse_offer_id() {
        assert_eq!(parse_offer_id(None), Ok(0));
        assert_eq!(parse_offer_id(Some("")), Ok(0));
        assert_eq!(parse_offer_id(Some("0")), Ok(0));
        assert_eq!(parse_offer_id(Some("42")), Ok(42));
        assert!(matches!(
            parse_offer_id(Some("abc")),
            Err(ComposeError::InvalidOfferId(_))
        ));
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            offer_description(&Asset::Native, "100", &usd(), "50", 0),
            "New offer to sell 100 XLM for 50 USD"
        );
        assert_eq!(
            offer_description(&Asset::Native, "100", &usd(), "50", 9),
            "Updating offer 9 to sell 100 XLM for 50 USD"
        );
        assert_eq!(
            offer_description(&Asset::Native, "0", &usd(), "50", 9),
            "Deleting offer 9"
        );
    }
}

//! Intent flows - one staged transaction per user intent
//!
//! Each flow composes its operation, attaches the standard description and,
//! where configured, appends a service fee payment with a memo naming it.

use crate::builder::TransactionBuilder;
use crate::config::Fee;
use crate::engine::ThresholdAuthorizationEngine;
use crate::error::EngineError;
use crate::preauth::add_signer_builder;
use crate::store::TransactionStore;
use crate::transaction::PersistedTransaction;
use quorum_compose::{
    allow_trust, change_trust, create_account, manage_offer, offer_description, parse_offer_id,
    payment, resolve_asset, set_options_flags, set_options_home_domain, set_options_weights,
    AccountFlag, FlagOperation,
};
use quorum_core::{PublicKey, NATIVE_ASSET_CODE};
use quorum_ledger::{Memo, SignerKey};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// An offer intent as entered by a user
#[derive(Debug, Clone)]
pub struct OfferRequest<'a> {
    pub offer_id: Option<&'a str>,
    pub sell_code: &'a str,
    pub sell_issuer: Option<&'a PublicKey>,
    pub sell_amount: &'a str,
    pub buy_code: &'a str,
    pub buy_issuer: Option<&'a PublicKey>,
    pub buy_amount: &'a str,
}

/// Stages transactions for user intents
pub struct IntentService {
    engine: Arc<ThresholdAuthorizationEngine>,
}

impl IntentService {
    pub fn new(engine: Arc<ThresholdAuthorizationEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ThresholdAuthorizationEngine {
        &self.engine
    }

    pub fn inbox(&self) -> Inbox {
        Inbox::new(self.engine.store.clone())
    }

    fn add_fee(
        builder: &mut TransactionBuilder,
        payer: &PublicKey,
        fee: &Fee,
    ) -> Result<(), EngineError> {
        let rate = fee.rate.to_string();
        let fee_payment = payment(Some(payer), &fee.destination, NATIVE_ASSET_CODE, None, &rate)?;
        builder
            .add_operation(fee_payment)
            .add_memo(Memo::text(format!("tx contains {}", fee.name))?);
        debug!(fee = %fee.name, payer = %payer, "Fee appended");
        Ok(())
    }

    pub async fn allow_trust(
        &self,
        tx_source: &PublicKey,
        issuer: &PublicKey,
        asset_code: &str,
        trustor: &PublicKey,
        authorize: bool,
    ) -> Result<PersistedTransaction, EngineError> {
        let operation = allow_trust(issuer, asset_code, trustor, authorize)?;
        let description = format!(
            "Allow Trust for {} of {} {} = {}",
            trustor, issuer, asset_code, authorize
        );
        let mut builder = TransactionBuilder::stage(tx_source.clone(), Some(description));
        builder.add_operation(operation);
        self.engine.stage(&builder).await
    }

    pub async fn change_trust(
        &self,
        tx_source: &PublicKey,
        account: &PublicKey,
        asset_code: &str,
        issuer: &PublicKey,
        limit: Option<&str>,
    ) -> Result<PersistedTransaction, EngineError> {
        let operation = change_trust(Some(account), asset_code, issuer, limit)?;
        let description = format!("Change Trust for {} for {} {}", account, issuer, asset_code);
        let mut builder = TransactionBuilder::stage(tx_source.clone(), Some(description));
        builder.add_operation(operation);
        self.engine.stage(&builder).await
    }

    pub async fn create_account(
        &self,
        tx_source: &PublicKey,
        funder: &PublicKey,
        new_account: &PublicKey,
        starting_balance: &str,
    ) -> Result<PersistedTransaction, EngineError> {
        let operation = create_account(Some(funder), new_account, starting_balance)?;
        let description = format!("Create Account {} from {}", new_account, funder);
        let mut builder = TransactionBuilder::stage(tx_source.clone(), Some(description));
        builder.add_operation(operation);
        self.engine.stage(&builder).await
    }

    /// Payment; an issuer paying out its own asset also pays the issuance fee
    pub async fn payment(
        &self,
        tx_source: &PublicKey,
        sender: &PublicKey,
        receiver: &PublicKey,
        asset_code: &str,
        asset_issuer: Option<&PublicKey>,
        amount: &str,
    ) -> Result<PersistedTransaction, EngineError> {
        let operation = payment(Some(sender), receiver, asset_code, asset_issuer, amount)?;
        let mut builder =
            TransactionBuilder::stage(tx_source.clone(), Some(format!("Payment to {}", receiver)));
        builder.add_operation(operation);

        let issuance_fee = self.engine.config().fees.as_ref().and_then(|f| f.issuance.as_ref());
        if let Some(fee) = issuance_fee {
            if asset_issuer == Some(sender) {
                Self::add_fee(&mut builder, sender, fee)?;
            }
        }
        self.engine.stage(&builder).await
    }

    /// Create, update or delete an offer; new offers pay the offer fee
    pub async fn manage_offer(
        &self,
        tx_source: &PublicKey,
        account: &PublicKey,
        request: &OfferRequest<'_>,
    ) -> Result<PersistedTransaction, EngineError> {
        let offer_id = parse_offer_id(request.offer_id)?;
        let selling = resolve_asset(request.sell_code, request.sell_issuer)?;
        let buying = resolve_asset(request.buy_code, request.buy_issuer)?;
        let description = offer_description(
            &selling,
            request.sell_amount,
            &buying,
            request.buy_amount,
            offer_id,
        );
        let operation = manage_offer(
            Some(account),
            offer_id,
            selling,
            request.sell_amount,
            buying,
            request.buy_amount,
        )?;

        let mut builder = TransactionBuilder::stage(tx_source.clone(), Some(description));
        builder.add_operation(operation);

        let offer_fee = self.engine.config().fees.as_ref().and_then(|f| f.offer.as_ref());
        if let Some(fee) = offer_fee {
            if offer_id == 0 {
                Self::add_fee(&mut builder, account, fee)?;
            }
        }
        self.engine.stage(&builder).await
    }

    pub async fn set_home_domain(
        &self,
        tx_source: &PublicKey,
        account: &PublicKey,
        home_domain: &str,
    ) -> Result<PersistedTransaction, EngineError> {
        let operation = set_options_home_domain(account, home_domain)?;
        let description = format!("Add home domain {} to {}", home_domain, account);
        let mut builder = TransactionBuilder::stage(tx_source.clone(), Some(description));
        builder.add_operation(operation);
        self.engine.stage(&builder).await
    }

    pub async fn add_signer(
        &self,
        tx_source: &PublicKey,
        account: &PublicKey,
        signer: SignerKey,
        weight: u8,
    ) -> Result<PersistedTransaction, EngineError> {
        let builder = add_signer_builder(tx_source, account, signer, weight)?;
        self.engine.stage(&builder).await
    }

    pub async fn set_weights(
        &self,
        tx_source: &PublicKey,
        account: &PublicKey,
        master_weight: u8,
        low: u8,
        medium: u8,
        high: u8,
    ) -> Result<PersistedTransaction, EngineError> {
        let description = format!("Set weights and thresholds for {}", account);
        let mut builder = TransactionBuilder::stage(tx_source.clone(), Some(description));
        builder.add_operation(set_options_weights(account, master_weight, low, medium, high));
        self.engine.stage(&builder).await
    }

    pub async fn set_flags(
        &self,
        tx_source: &PublicKey,
        account: &PublicKey,
        operation: FlagOperation,
        flag: AccountFlag,
    ) -> Result<PersistedTransaction, EngineError> {
        let description = format!("{} for {}", operation, flag);
        let mut builder = TransactionBuilder::stage(tx_source.clone(), Some(description));
        builder.add_operation(set_options_flags(account, operation, flag));
        self.engine.stage(&builder).await
    }
}

/// What is waiting on an account
pub struct Inbox {
    store: Arc<dyn TransactionStore>,
}

impl Inbox {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Transactions awaiting a signature from `public_key`, then those
    /// awaiting its final approval
    pub fn transactions_to_sign(
        &self,
        public_key: &PublicKey,
    ) -> Result<Vec<PersistedTransaction>, EngineError> {
        let mut seen = HashSet::new();
        let mut transactions = Vec::new();
        let to_sign = self.store.list_to_sign(public_key)?;
        let to_approve = self.store.list_to_approve(public_key)?;
        for tx in to_sign.into_iter().chain(to_approve) {
            if seen.insert(tx.id.clone()) {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    pub fn initiated_transactions(
        &self,
        source: &PublicKey,
    ) -> Result<Vec<PersistedTransaction>, EngineError> {
        Ok(self.store.list_initiated(source)?)
    }
}

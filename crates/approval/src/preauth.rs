//! Pre-authorization
//!
//! A target transaction can be authorized ahead of time by adding its body
//! hash as a `PreAuthTx` signer on the source account. That change is itself
//! a transaction (the *enabling* transaction) which goes through the normal
//! signing path. Once the enabling transaction is on the ledger, the final
//! approver is listed on the target and may release it with
//! `submit_pre_authorized`, no further signatures needed.

use crate::builder::TransactionBuilder;
use crate::engine::{verify_keypair, ThresholdAuthorizationEngine};
use crate::error::{AuthorizationError, EngineError};
use crate::transaction::{ApproverEntry, PersistedTransaction, PreAuthLink};
use quorum_compose::set_options_signer;
use quorum_core::PublicKey;
use quorum_ledger::{Memo, SignerKey};
use tracing::info;

/// Memo carried by every enabling transaction
pub const PRE_AUTH_MEMO: &str = "PreAuthTx signer";

/// Label used in signer descriptions
fn signer_label(signer: &SignerKey) -> &str {
    match signer {
        SignerKey::Ed25519(key) => key.as_str(),
        SignerKey::PreAuthTx(hash) | SignerKey::HashX(hash) => hash,
    }
}

/// Stage a set-options transaction adding `signer` to `account`.
///
/// A `PreAuthTx` signer makes this an enabling transaction, which carries
/// `PRE_AUTH_MEMO`.
pub(crate) fn add_signer_builder(
    tx_source: &PublicKey,
    account: &PublicKey,
    signer: SignerKey,
    weight: u8,
) -> Result<TransactionBuilder, EngineError> {
    let description = format!("Add Signer {} to {}", signer_label(&signer), account);
    let pre_auth = matches!(signer, SignerKey::PreAuthTx(_));

    let mut builder = TransactionBuilder::stage(tx_source.clone(), Some(description));
    builder.add_operation(set_options_signer(account, signer, weight));
    if pre_auth {
        builder.add_memo(Memo::text(PRE_AUTH_MEMO)?);
    }
    Ok(builder)
}

impl ThresholdAuthorizationEngine {
    /// Stage and sign the enabling transaction for `transaction_id`.
    ///
    /// Returns the target transaction. Its `enabled_by` names the enabling
    /// transaction; `final_approver` is listed on it once the enabling
    /// transaction is submitted.
    pub async fn pre_authorize(
        &self,
        public_key: &PublicKey,
        secret: &str,
        transaction_id: &str,
        final_approver: Option<&PublicKey>,
    ) -> Result<PersistedTransaction, EngineError> {
        verify_keypair(public_key, secret)?;

        let target = self.store.get(transaction_id)?;
        if target.submitted {
            return Err(AuthorizationError::AlreadySubmitted(target.id).into());
        }

        let account = self.gateway.load_account(&target.source_account).await?;
        if !account.key_signers().any(|(key, _)| key == public_key) {
            return Err(AuthorizationError::NotAuthorized(public_key.clone()).into());
        }

        let threshold = account.threshold_for(target.threshold_category);
        let weight = u8::try_from(threshold.max(1)).unwrap_or(u8::MAX);

        let builder = add_signer_builder(
            &target.source_account,
            &target.source_account,
            SignerKey::PreAuthTx(target.hash.clone()),
            weight,
        )?;
        let enabling = self.stage(&builder).await?;

        let link = PreAuthLink {
            target_id: target.id.clone(),
            target_hash: target.hash.clone(),
            final_approver: final_approver.cloned(),
        };
        self.modify(&enabling.id, |tx| {
            tx.pre_auth = Some(link.clone());
            Ok(true)
        })?;
        self.modify(&target.id, |tx| {
            tx.enabled_by = Some(enabling.id.clone());
            Ok(true)
        })?;

        info!(
            transaction_id = %target.id,
            enabling_id = %enabling.id,
            weight,
            "Pre-authorization staged"
        );

        self.sign(public_key, secret, &enabling.id).await?;
        self.get(&target.id)
    }

    /// Release a pre-authorized transaction on behalf of its final approver
    pub async fn submit_pre_authorized(
        &self,
        transaction_id: &str,
        final_approver: &PublicKey,
    ) -> Result<PersistedTransaction, EngineError> {
        let (tx, _) = self.modify(transaction_id, |tx| {
            if tx.submitted {
                return Err(AuthorizationError::AlreadySubmitted(tx.id.clone()).into());
            }
            let mut listed = false;
            let mut changed = false;
            for approver in tx.approvers.iter_mut().filter(|a| &a.public_key == final_approver) {
                listed = true;
                changed |= !approver.signed;
                approver.signed = true;
            }
            if !listed {
                return Err(AuthorizationError::ApproverNotAuthorized(final_approver.clone()).into());
            }
            Ok(changed)
        })?;

        info!(transaction_id = %tx.id, approver = %final_approver, "Releasing pre-authorized transaction");
        self.submit_envelope(tx).await
    }

    /// List the final approver on the target of a submitted enabling
    /// transaction
    pub(crate) fn release_pre_authorized(
        &self,
        enabling: &PersistedTransaction,
    ) -> Result<(), EngineError> {
        let Some(link) = &enabling.pre_auth else {
            return Ok(());
        };
        let Some(approver) = &link.final_approver else {
            return Ok(());
        };

        let (_, added) = self.modify(&link.target_id, |tx| {
            if tx.approvers.iter().any(|a| &a.public_key == approver) {
                return Ok(false);
            }
            tx.approvers.push(ApproverEntry {
                public_key: approver.clone(),
                signed: false,
            });
            Ok(true)
        })?;

        if added {
            info!(
                transaction_id = %link.target_id,
                approver = %approver,
                "Final approver listed"
            );
        }
        Ok(())
    }
}

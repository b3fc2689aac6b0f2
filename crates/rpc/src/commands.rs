//! CLI commands

use quorum_approval::{EngineError, OfferRequest, PersistedTransaction};
use quorum_compose::{parse_flag, parse_flag_operation};
use quorum_core::PublicKey;
use quorum_ledger::{KeyPair, SignerKey, Thresholds};
use serde_json::json;

use crate::context::AppContext;

fn print_transaction(action: &str, tx: &PersistedTransaction) {
    println!("✅ {} transaction {}", action, tx.id);
    if let Some(description) = &tx.description {
        println!("   {}", description);
    }
    println!("   Hash:   {}", tx.hash);
    println!("   Status: {}", tx.status());
}

/// Attach a retry hint to errors that may succeed on a second attempt
fn engine_error(transaction_id: &str, error: EngineError) -> anyhow::Error {
    if error.is_retriable() {
        anyhow::anyhow!("{} (retry with `quorum submit {}`)", error, transaction_id)
    } else {
        error.into()
    }
}

/// Generate a new keypair
pub fn keygen() -> KeyPair {
    let keypair = KeyPair::generate();
    println!("✅ Generated keypair");
    println!("   Public key: {}", keypair.public_key());
    println!("   Secret:     {}", keypair.secret_hex());
    println!();
    println!("To use: export QUORUM_SECRET={}", keypair.secret_hex());
    keypair
}

/// Create an account in the sandbox ledger, optionally with thresholds
pub fn sandbox_account(
    ctx: &AppContext,
    account: &PublicKey,
    thresholds: Option<Thresholds>,
) -> Result<(), anyhow::Error> {
    ctx.ledger.fund_account(account)?;
    if let Some(thresholds) = thresholds {
        ctx.ledger.set_thresholds(account, thresholds)?;
    }
    println!("✅ Sandbox account {} created", account);
    Ok(())
}

/// Add a signer to a sandbox account directly, without a transaction
pub fn sandbox_signer(
    ctx: &AppContext,
    account: &PublicKey,
    signer: &PublicKey,
    weight: u8,
) -> Result<(), anyhow::Error> {
    if ctx.ledger.account(account).is_none() {
        anyhow::bail!("Sandbox account {} does not exist", account);
    }
    ctx.ledger.set_signer(account, signer, weight)?;
    println!("✅ Signer {} set to weight {} on {}", signer, weight, account);
    Ok(())
}

/// Stage adding (or re-weighting) a signer
pub async fn add_signer(
    ctx: &AppContext,
    source: &PublicKey,
    account: &PublicKey,
    signer: &PublicKey,
    weight: u8,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .intents
        .add_signer(source, account, SignerKey::Ed25519(signer.clone()), weight)
        .await?;
    print_transaction("Staged", &tx);
    Ok(tx)
}

/// Stage a master weight and thresholds change
pub async fn set_thresholds(
    ctx: &AppContext,
    source: &PublicKey,
    account: &PublicKey,
    thresholds: Thresholds,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .intents
        .set_weights(
            source,
            account,
            thresholds.master_weight,
            thresholds.low,
            thresholds.med,
            thresholds.high,
        )
        .await?;
    print_transaction("Staged", &tx);
    Ok(tx)
}

/// Stage a payment
pub async fn pay(
    ctx: &AppContext,
    source: &PublicKey,
    from: &PublicKey,
    to: &PublicKey,
    amount: &str,
    asset_code: &str,
    asset_issuer: Option<&PublicKey>,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .intents
        .payment(source, from, to, asset_code, asset_issuer, amount)
        .await?;
    print_transaction("Staged", &tx);
    Ok(tx)
}

/// Stage an offer create, update or delete
pub async fn offer(
    ctx: &AppContext,
    source: &PublicKey,
    account: &PublicKey,
    request: &OfferRequest<'_>,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx.intents.manage_offer(source, account, request).await?;
    print_transaction("Staged", &tx);
    Ok(tx)
}

/// Stage a trustline change
pub async fn trust(
    ctx: &AppContext,
    source: &PublicKey,
    account: &PublicKey,
    asset_code: &str,
    issuer: &PublicKey,
    limit: Option<&str>,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .intents
        .change_trust(source, account, asset_code, issuer, limit)
        .await?;
    print_transaction("Staged", &tx);
    Ok(tx)
}

/// Stage an issuer authorizing (or revoking) a trustline
pub async fn allow_trust(
    ctx: &AppContext,
    source: &PublicKey,
    issuer: &PublicKey,
    asset_code: &str,
    trustor: &PublicKey,
    authorize: bool,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .intents
        .allow_trust(source, issuer, asset_code, trustor, authorize)
        .await?;
    print_transaction("Staged", &tx);
    Ok(tx)
}

/// Stage the creation of a new account
pub async fn create_account(
    ctx: &AppContext,
    source: &PublicKey,
    funder: &PublicKey,
    new_account: &PublicKey,
    starting_balance: &str,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .intents
        .create_account(source, funder, new_account, starting_balance)
        .await?;
    print_transaction("Staged", &tx);
    Ok(tx)
}

pub async fn home_domain(
    ctx: &AppContext,
    source: &PublicKey,
    account: &PublicKey,
    domain: &str,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx.intents.set_home_domain(source, account, domain).await?;
    print_transaction("Staged", &tx);
    Ok(tx)
}

/// Stage setting or clearing an account flag, e.g. `setFlags AuthRevocableFlag`
pub async fn set_flags(
    ctx: &AppContext,
    source: &PublicKey,
    account: &PublicKey,
    operation: &str,
    flag: &str,
) -> Result<PersistedTransaction, anyhow::Error> {
    let operation = parse_flag_operation(operation)?;
    let flag = parse_flag(flag)?;
    let tx = ctx.intents.set_flags(source, account, operation, flag).await?;
    print_transaction("Staged", &tx);
    Ok(tx)
}

/// Sign a staged transaction; submits it once enough weight is collected
pub async fn sign(
    ctx: &AppContext,
    public_key: &PublicKey,
    secret: &str,
    transaction_id: &str,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .engine
        .sign(public_key, secret, transaction_id)
        .await
        .map_err(|e| engine_error(transaction_id, e))?;
    let action = if tx.submitted { "Signed and submitted" } else { "Signed" };
    print_transaction(action, &tx);
    Ok(tx)
}

/// Pre-authorize a transaction, naming the approver who may release it
pub async fn pre_authorize(
    ctx: &AppContext,
    public_key: &PublicKey,
    secret: &str,
    transaction_id: &str,
    approver: Option<&PublicKey>,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .engine
        .pre_authorize(public_key, secret, transaction_id, approver)
        .await?;
    print_transaction("Pre-authorized", &tx);
    if let Some(enabling_id) = &tx.enabled_by {
        println!("   Enabled by: {}", enabling_id);
    }
    Ok(tx)
}

/// Release a pre-authorized transaction as its final approver
pub async fn approve(
    ctx: &AppContext,
    transaction_id: &str,
    approver: &PublicKey,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .engine
        .submit_pre_authorized(transaction_id, approver)
        .await
        .map_err(|e| engine_error(transaction_id, e))?;
    print_transaction("Approved and submitted", &tx);
    Ok(tx)
}

/// Submit (or resubmit) a sufficiently signed transaction
pub async fn submit(
    ctx: &AppContext,
    transaction_id: &str,
) -> Result<PersistedTransaction, anyhow::Error> {
    let tx = ctx
        .engine
        .submit(transaction_id)
        .await
        .map_err(|e| engine_error(transaction_id, e))?;
    print_transaction("Submitted", &tx);
    Ok(tx)
}

/// Print a transaction with its weights against the live thresholds
pub async fn show(ctx: &AppContext, transaction_id: &str) -> Result<(), anyhow::Error> {
    let tx = ctx.engine.get(transaction_id)?;
    let evaluation = ctx.engine.evaluate(transaction_id).await?;
    let output = json!({
        "transaction": tx.view(),
        "status": tx.status(),
        "evaluation": evaluation,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// List transactions waiting on `public_key`
pub fn inbox(ctx: &AppContext, public_key: &PublicKey) -> Result<Vec<PersistedTransaction>, anyhow::Error> {
    let transactions = ctx.intents.inbox().transactions_to_sign(public_key)?;
    println!("Inbox for {} ({} waiting)", public_key, transactions.len());
    for tx in &transactions {
        let role = if tx.awaits_approval_from(public_key) { "approve" } else { "sign" };
        println!(
            "  {} [{}] {}",
            tx.id,
            role,
            tx.description.as_deref().unwrap_or("-")
        );
    }
    Ok(transactions)
}

/// List transactions staged by `source`
pub fn initiated(ctx: &AppContext, source: &PublicKey) -> Result<Vec<PersistedTransaction>, anyhow::Error> {
    let transactions = ctx.intents.inbox().initiated_transactions(source)?;
    println!("Transactions initiated by {} ({})", source, transactions.len());
    for tx in &transactions {
        println!(
            "  {} [{}] {}",
            tx.id,
            tx.status(),
            tx.description.as_deref().unwrap_or("-")
        );
    }
    Ok(transactions)
}

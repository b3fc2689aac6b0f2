//! Integration tests for Quorum
//!
//! These tests drive the CLI commands against a sandbox data directory:
//! staging, signing, pre-authorization and reopening persisted state.

use quorum_approval::{EngineError, OfferRequest};
use quorum_ledger::{KeyPair, SignerKey, Thresholds};
use quorum_rpc::{commands, AppContext};
use tempfile::TempDir;

async fn context(dir: &TempDir) -> AppContext {
    AppContext::new(dir.path(), None).await.unwrap()
}

/// Test: sandbox account → stage → two signatures → submitted
#[tokio::test]
async fn test_full_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir).await;

    let owner = KeyPair::generate();
    let cosigner = KeyPair::generate();
    let receiver = KeyPair::generate().public_key();
    let owner_key = owner.public_key();

    commands::sandbox_account(&ctx, &owner_key, Some(Thresholds::new(1, 1, 2, 2))).unwrap();
    commands::sandbox_signer(&ctx, &owner_key, &cosigner.public_key(), 1).unwrap();

    let tx = commands::pay(&ctx, &owner_key, &owner_key, &receiver, "12.5", "XLM", None)
        .await
        .unwrap();

    // 1. Cosigner sees it in the inbox
    let inbox = commands::inbox(&ctx, &cosigner.public_key()).unwrap();
    assert_eq!(inbox.len(), 1);

    // 2. First signature is not enough
    let signed = commands::sign(&ctx, &owner_key, &owner.secret_hex(), &tx.id)
        .await
        .unwrap();
    assert!(!signed.submitted);

    // 3. Second signature submits
    let signed = commands::sign(&ctx, &cosigner.public_key(), &cosigner.secret_hex(), &tx.id)
        .await
        .unwrap();
    assert!(signed.submitted);
    assert!(ctx.ledger.applied_hashes().contains(&tx.hash));

    commands::show(&ctx, &tx.id).await.unwrap();
    let initiated = commands::initiated(&ctx, &owner_key).unwrap();
    assert_eq!(initiated.len(), 1);
}

/// Test: transactions and sandbox state survive a restart
#[tokio::test]
async fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let owner = KeyPair::generate();
    let cosigner = KeyPair::generate();
    let owner_key = owner.public_key();

    let tx_id = {
        let ctx = context(&temp_dir).await;
        commands::sandbox_account(&ctx, &owner_key, Some(Thresholds::new(1, 1, 2, 2))).unwrap();
        commands::sandbox_signer(&ctx, &owner_key, &cosigner.public_key(), 1).unwrap();
        let tx = commands::home_domain(&ctx, &owner_key, &owner_key, "example.org")
            .await
            .unwrap();
        commands::sign(&ctx, &owner_key, &owner.secret_hex(), &tx.id)
            .await
            .unwrap();
        tx.id
    };

    let ctx = context(&temp_dir).await;
    assert!(ctx.ledger.account(&owner_key).is_some());
    let tx = ctx.engine.get(&tx_id).unwrap();
    assert_eq!(tx.signed_weight(), 1);

    let tx = commands::sign(&ctx, &cosigner.public_key(), &cosigner.secret_hex(), &tx_id)
        .await
        .unwrap();
    assert!(tx.submitted);
    assert_eq!(
        ctx.ledger.account(&owner_key).unwrap().home_domain.as_deref(),
        Some("example.org")
    );
}

/// Test: staged signer changes are applied once submitted
#[tokio::test]
async fn test_add_signer_then_use_it() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir).await;

    let owner = KeyPair::generate();
    let new_signer = KeyPair::generate();
    let owner_key = owner.public_key();
    commands::sandbox_account(&ctx, &owner_key, None).unwrap();

    let tx = commands::add_signer(&ctx, &owner_key, &owner_key, &new_signer.public_key(), 1)
        .await
        .unwrap();
    commands::sign(&ctx, &owner_key, &owner.secret_hex(), &tx.id)
        .await
        .unwrap();

    let account = ctx.ledger.account(&owner_key).unwrap();
    assert!(account
        .signers
        .iter()
        .any(|s| s.key == SignerKey::Ed25519(new_signer.public_key()) && s.weight == 1));

    // the new signer is on the roster of the next transaction
    let tx = commands::set_thresholds(&ctx, &owner_key, &owner_key, Thresholds::new(1, 1, 2, 2))
        .await
        .unwrap();
    assert!(tx
        .signatures
        .iter()
        .any(|s| s.public_key == new_signer.public_key()));
}

/// Test: pre-authorize, then release as the final approver
#[tokio::test]
async fn test_pre_authorize_and_approve() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir).await;

    let owner = KeyPair::generate();
    let approver = KeyPair::generate().public_key();
    let receiver = KeyPair::generate().public_key();
    let owner_key = owner.public_key();
    commands::sandbox_account(&ctx, &owner_key, None).unwrap();

    let tx = commands::pay(&ctx, &owner_key, &owner_key, &receiver, "1", "XLM", None)
        .await
        .unwrap();
    let target = commands::pre_authorize(&ctx, &owner_key, &owner.secret_hex(), &tx.id, Some(&approver))
        .await
        .unwrap();
    assert!(target.enabled_by.is_some());

    let inbox = commands::inbox(&ctx, &approver).unwrap();
    assert_eq!(inbox.len(), 1);

    let released = commands::approve(&ctx, &tx.id, &approver).await.unwrap();
    assert!(released.submitted);
    assert!(ctx.ledger.applied_hashes().contains(&tx.hash));
}

/// Test: a failed submission is retried with `submit`
#[tokio::test]
async fn test_submit_retry() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir).await;

    let owner = KeyPair::generate();
    let receiver = KeyPair::generate().public_key();
    let owner_key = owner.public_key();
    commands::sandbox_account(&ctx, &owner_key, None).unwrap();

    let tx = commands::pay(&ctx, &owner_key, &owner_key, &receiver, "1", "XLM", None)
        .await
        .unwrap();

    // injected twice: the gateway retries a transient failure once
    for _ in 0..2 {
        ctx.ledger
            .fail_next_submit(quorum_ledger::GatewayError::NetworkError("reset".into()));
    }
    let error = commands::sign(&ctx, &owner_key, &owner.secret_hex(), &tx.id)
        .await
        .unwrap_err();
    assert!(error.to_string().contains("quorum submit"));

    let tx = commands::submit(&ctx, &tx.id).await.unwrap();
    assert!(tx.submitted);
}

/// Test: validation errors surface with their code and stage nothing
#[tokio::test]
async fn test_invalid_offer_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir).await;

    let owner = KeyPair::generate();
    let issuer = KeyPair::generate().public_key();
    let owner_key = owner.public_key();
    commands::sandbox_account(&ctx, &owner_key, None).unwrap();

    let request = OfferRequest {
        offer_id: None,
        sell_code: "USD",
        sell_issuer: Some(&issuer),
        sell_amount: "0",
        buy_code: "XLM",
        buy_issuer: None,
        buy_amount: "5",
    };
    let error = commands::offer(&ctx, &owner_key, &owner_key, &request)
        .await
        .unwrap_err();
    let engine_error = error.downcast_ref::<EngineError>().unwrap();
    assert!(engine_error.to_string().contains("invalid.deleteOffer"));

    assert!(commands::initiated(&ctx, &owner_key).unwrap().is_empty());

    let error = commands::set_flags(&ctx, &owner_key, &owner_key, "setFlags", "NoSuchFlag")
        .await
        .unwrap_err();
    assert!(error.to_string().contains("NoSuchFlag"));
}

/// Test: config.json in the data directory is picked up
#[tokio::test]
async fn test_config_from_data_dir() {
    let temp_dir = TempDir::new().unwrap();
    let treasury = KeyPair::generate().public_key();
    let config = format!(
        r#"{{"max_write_attempts": 3, "fees": {{"offer": {{"name": "FEE_OFFER", "destination": "{}", "rate": "0.1"}}}}}}"#,
        treasury
    );
    std::fs::write(temp_dir.path().join("config.json"), config).unwrap();

    let ctx = context(&temp_dir).await;
    assert_eq!(ctx.engine.config().max_write_attempts, 3);
    assert!(ctx.engine.config().fees.as_ref().unwrap().offer.is_some());

    let missing = temp_dir.path().join("missing.json");
    assert!(AppContext::new(temp_dir.path(), Some(&missing)).await.is_err());
}

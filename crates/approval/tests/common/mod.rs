//! Shared fixtures: an in-process ledger, an in-memory store and an engine

#![allow(dead_code)]

use std::sync::Arc;

use quorum_approval::{
    EngineConfig, Inbox, PersistedTransaction, SqliteTransactionStore, ThresholdAuthorizationEngine,
    TransactionBuilder,
};
use quorum_core::{Asset, PublicKey};
use quorum_ledger::{KeyPair, MockLedger, Operation, OperationBody, Thresholds, SANDBOX_NETWORK};

pub struct Harness {
    pub ledger: Arc<MockLedger>,
    pub store: Arc<SqliteTransactionStore>,
    pub engine: Arc<ThresholdAuthorizationEngine>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let ledger = Arc::new(MockLedger::new(SANDBOX_NETWORK));
        let store = Arc::new(SqliteTransactionStore::in_memory().unwrap());
        let engine = Arc::new(ThresholdAuthorizationEngine::new(
            ledger.clone(),
            store.clone(),
            config,
        ));
        Self {
            ledger,
            store,
            engine,
        }
    }

    pub fn engine_inbox(&self) -> Inbox {
        Inbox::new(self.store.clone())
    }

    /// A fresh account on the ledger: master weight 1, thresholds 0
    pub fn funded(&self) -> KeyPair {
        let keypair = KeyPair::generate();
        self.ledger.fund_account(&keypair.public_key()).unwrap();
        keypair
    }

    pub fn add_signer(&self, account: &KeyPair, signer: &KeyPair, weight: u8) {
        self.ledger
            .set_signer(&account.public_key(), &signer.public_key(), weight)
            .unwrap();
    }

    pub fn set_thresholds(&self, account: &KeyPair, master: u8, low: u8, med: u8, high: u8) {
        self.ledger
            .set_thresholds(&account.public_key(), Thresholds::new(master, low, med, high))
            .unwrap();
    }

    /// Stage a transaction made of `operations`, sourced by `source`
    pub async fn stage(&self, source: &KeyPair, operations: Vec<Operation>) -> PersistedTransaction {
        let mut builder = TransactionBuilder::stage(source.public_key(), Some("test".to_string()));
        for operation in operations {
            builder.add_operation(operation);
        }
        self.engine.stage(&builder).await.unwrap()
    }

    pub async fn sign(
        &self,
        signer: &KeyPair,
        transaction_id: &str,
    ) -> Result<PersistedTransaction, quorum_approval::EngineError> {
        self.engine
            .sign(&signer.public_key(), &signer.secret_hex(), transaction_id)
            .await
    }
}

pub fn native_payment(source: Option<&PublicKey>, destination: &PublicKey, amount: &str) -> Operation {
    Operation::new(
        source.cloned(),
        OperationBody::Payment {
            destination: destination.clone(),
            asset: Asset::Native,
            amount: amount.parse().unwrap(),
        },
    )
}

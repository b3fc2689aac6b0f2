//! Transaction persistence
//!
//! `SqliteTransactionStore` keeps one row per transaction: indexed scalar
//! columns for lookups plus the full record as JSON. Updates are
//! compare-and-swap on `version`.

use crate::error::StoreError;
use crate::transaction::PersistedTransaction;
use chrono::Utc;
use quorum_core::PublicKey;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Storage for staged transactions
pub trait TransactionStore: Send + Sync {
    /// Persist a newly staged transaction
    fn insert(&self, tx: &PersistedTransaction) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<PersistedTransaction, StoreError>;

    /// Write `tx` if the stored version still equals `tx.version`.
    ///
    /// On success `tx.version` is bumped to the stored version.
    fn update(&self, tx: &mut PersistedTransaction) -> Result<(), StoreError>;

    /// Transactions staged with `source` as their source account
    fn list_initiated(&self, source: &PublicKey) -> Result<Vec<PersistedTransaction>, StoreError>;

    /// Unsubmitted transactions still waiting on a signature from `public_key`
    fn list_to_sign(&self, public_key: &PublicKey) -> Result<Vec<PersistedTransaction>, StoreError>;

    /// Unsubmitted transactions where `public_key` is a pending final approver
    fn list_to_approve(&self, public_key: &PublicKey)
        -> Result<Vec<PersistedTransaction>, StoreError>;
}

/// SQLite-backed transaction store
pub struct SqliteTransactionStore {
    conn: Mutex<Connection>,
}

impl SqliteTransactionStore {
    /// Open (or create) a store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                source_account TEXT NOT NULL,
                hash TEXT NOT NULL,
                submitted INTEGER NOT NULL,
                version INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                record_json TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_transactions_source
             ON transactions(source_account)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_transactions_submitted
             ON transactions(submitted)",
            [],
        )?;

        Ok(())
    }

    fn query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<PersistedTransaction>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows: Vec<(String, i64)> = stmt
            .query_map(params, |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(json, version)| decode(&json, version))
            .collect()
    }

    fn unsubmitted(&self) -> Result<Vec<PersistedTransaction>, StoreError> {
        self.query(
            "SELECT record_json, version FROM transactions
             WHERE submitted = 0 ORDER BY created_at ASC",
            params![],
        )
    }
}

fn decode(json: &str, version: i64) -> Result<PersistedTransaction, StoreError> {
    let mut tx: PersistedTransaction = serde_json::from_str(json)?;
    tx.version = version as u64;
    Ok(tx)
}

impl TransactionStore for SqliteTransactionStore {
    fn insert(&self, tx: &PersistedTransaction) -> Result<(), StoreError> {
        let record_json = serde_json::to_string(tx)?;
        self.conn().execute(
            "INSERT INTO transactions
             (id, source_account, hash, submitted, version, created_at, record_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tx.id,
                tx.source_account.as_str(),
                tx.hash,
                tx.submitted,
                tx.version as i64,
                tx.created_at.to_rfc3339(),
                record_json,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<PersistedTransaction, StoreError> {
        let row: Option<(String, i64)> = self
            .conn()
            .query_row(
                "SELECT record_json, version FROM transactions WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((json, version)) => decode(&json, version),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn update(&self, tx: &mut PersistedTransaction) -> Result<(), StoreError> {
        let expected = tx.version;
        let mut next = tx.clone();
        next.version = expected + 1;
        next.updated_at = Utc::now();
        let record_json = serde_json::to_string(&next)?;

        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE transactions
             SET submitted = ?1, version = ?2, record_json = ?3
             WHERE id = ?4 AND version = ?5",
            params![
                next.submitted,
                next.version as i64,
                record_json,
                tx.id,
                expected as i64,
            ],
        )?;

        if rows == 0 {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT version FROM transactions WHERE id = ?1",
                    params![tx.id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match exists {
                Some(_) => StoreError::VersionConflict {
                    id: tx.id.clone(),
                    expected,
                },
                None => StoreError::NotFound(tx.id.clone()),
            });
        }

        *tx = next;
        Ok(())
    }

    fn list_initiated(&self, source: &PublicKey) -> Result<Vec<PersistedTransaction>, StoreError> {
        self.query(
            "SELECT record_json, version FROM transactions
             WHERE source_account = ?1 ORDER BY created_at ASC",
            params![source.as_str()],
        )
    }

    fn list_to_sign(&self, public_key: &PublicKey) -> Result<Vec<PersistedTransaction>, StoreError> {
        Ok(self
            .unsubmitted()?
            .into_iter()
            .filter(|tx| tx.awaits_signature_from(public_key))
            .collect())
    }

    fn list_to_approve(
        &self,
        public_key: &PublicKey,
    ) -> Result<Vec<PersistedTransaction>, StoreError> {
        Ok(self
            .unsubmitted()?
            .into_iter()
            .filter(|tx| tx.awaits_approval_from(public_key))
            .collect())
    }
}

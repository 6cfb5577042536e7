use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{TxId, TxRecord};
use crate::host::{CommitError, RwSet, StateKey, Version, VersionedValue, WorldState};

use super::MIGRATION_001_INITIAL;

/// What happened to a read/write set handed to [`Repository::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { sequence: Version },
    /// A key read during simulation changed in the meantime; nothing was written
    Conflict(CommitError),
}

/// Repository for persisting contract state and the transaction log.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // State operations
    // ========================

    /// Load the full committed state as a snapshot for simulation.
    pub async fn load_world_state(&self) -> Result<WorldState> {
        let rows = sqlx::query("SELECT namespace, key, value, version FROM world_state")
            .fetch_all(&self.pool)
            .await
            .context("Failed to load world state")?;

        let height: i64 = sqlx::query_scalar(
            "SELECT value FROM sequence_counter WHERE name = 'commit_sequence'",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to read commit sequence")?;

        let entries = rows.iter().map(|row| {
            (
                StateKey::new(row.get::<String, _>("namespace"), row.get::<String, _>("key")),
                VersionedValue {
                    value: row.get("value"),
                    version: row.get("version"),
                },
            )
        });

        Ok(WorldState::from_entries(entries, height))
    }

    /// Validate and persist a simulated transaction atomically.
    ///
    /// Every read version is checked against the stored one inside the same
    /// SQL transaction as the writes, so a stale simulation never lands.
    /// Assigns `record.sequence` on success.
    pub async fn commit(&self, record: &mut TxRecord, rw_set: &RwSet) -> Result<CommitOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin commit")?;

        for (key, read) in rw_set.reads() {
            let current: Option<Version> = sqlx::query_scalar(
                "SELECT version FROM world_state WHERE namespace = ? AND key = ?",
            )
            .bind(&key.namespace)
            .bind(&key.key)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to read state version")?;

            if current != *read {
                // Dropping `tx` rolls back
                return Ok(CommitOutcome::Conflict(CommitError::MvccConflict {
                    key: key.clone(),
                    read: *read,
                    current,
                }));
            }
        }

        let sequence: Version = sqlx::query_scalar(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'commit_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("Failed to get next sequence number")?;

        for (key, value) in rw_set.writes() {
            sqlx::query(
                r#"
                INSERT INTO world_state (namespace, key, value, version)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value, version = excluded.version
                "#,
            )
            .bind(&key.namespace)
            .bind(&key.key)
            .bind(value.as_slice())
            .bind(sequence)
            .execute(&mut *tx)
            .await
            .context("Failed to write state")?;
        }

        record.sequence = sequence;
        let args_json = serde_json::to_string(&record.args)?;

        sqlx::query(
            r#"
            INSERT INTO transactions (tx_id, sequence, contract, function, args, payload, committed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.tx_id.to_string())
        .bind(record.sequence)
        .bind(&record.contract)
        .bind(&record.function)
        .bind(&args_json)
        .bind(&record.payload)
        .bind(record.committed_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save transaction")?;

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(CommitOutcome::Committed { sequence })
    }

    // ========================
    // Transaction log
    // ========================

    /// List committed transactions, newest first.
    pub async fn list_transactions(&self, limit: Option<usize>) -> Result<Vec<TxRecord>> {
        let mut query = String::from(
            "SELECT tx_id, sequence, contract, function, args, payload, committed_at FROM transactions ORDER BY sequence DESC",
        );
        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_record).collect()
    }

    /// Get a committed transaction by ID.
    pub async fn get_transaction(&self, id: TxId) -> Result<Option<TxRecord>> {
        let row = sqlx::query(
            r#"
            SELECT tx_id, sequence, contract, function, args, payload, committed_at
            FROM transactions
            WHERE tx_id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<TxRecord> {
        let id_str: String = row.get("tx_id");
        let args_json: String = row.get("args");
        let committed_at_str: String = row.get("committed_at");

        Ok(TxRecord {
            tx_id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            contract: row.get("contract"),
            function: row.get("function"),
            args: serde_json::from_str(&args_json).context("Invalid transaction arguments")?,
            payload: row.get("payload"),
            committed_at: DateTime::parse_from_rfc3339(&committed_at_str)
                .context("Invalid committed_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}

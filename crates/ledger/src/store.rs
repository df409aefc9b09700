//! SQLite-backed dedup ledger.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use claims::{ClaimStore, ClaimStoreError, DedupEntry};
use ingest_core::{Error, Result};

use crate::config::LedgerConfig;
use crate::schema::init_schema;

/// Durable ledger of claims.
///
/// All mutation goes through single-statement writes; the fingerprint
/// primary key arbitrates concurrent claimers the same way the cache tier's
/// atomic insert does.
#[derive(Clone)]
pub struct DedupLedger {
    conn: Arc<Mutex<Connection>>,
}

impl DedupLedger {
    /// Opens (and migrates) the ledger at the configured path.
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let conn = if config.path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.path)
        }
        .map_err(|e| Error::ledger(format!("failed to open ledger at {}: {}", config.path, e)))?;

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| Error::ledger(format!("failed to set busy timeout: {}", e)))?;

        init_schema(&conn).map_err(|e| Error::ledger(format!("failed to init schema: {}", e)))?;

        info!(path = %config.path, "Opened dedup ledger");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an ephemeral in-memory ledger.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&LedgerConfig::in_memory())
    }

    /// Atomically records the entry iff no live claim exists for its
    /// fingerprint. An expired row is taken over in the same statement, so
    /// expiry needs no sweep to be observable. Returns `true` when the entry
    /// was recorded.
    pub fn try_insert(&self, entry: &DedupEntry) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "INSERT INTO dedup_entries (fingerprint, batch_id, project_id, first_seen_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(fingerprint) DO UPDATE SET
                     batch_id = excluded.batch_id,
                     project_id = excluded.project_id,
                     first_seen_at = excluded.first_seen_at,
                     expires_at = excluded.expires_at
                 WHERE dedup_entries.expires_at <= ?4",
                params![
                    entry.fingerprint,
                    entry.batch_id.to_string(),
                    entry.project_id,
                    entry.first_seen_at.timestamp_millis(),
                    entry.expires_at.timestamp_millis(),
                ],
            )
            .map_err(|e| Error::ledger(format!("try_insert failed: {}", e)))?;

        debug!(fingerprint = %entry.fingerprint, claimed = changed == 1, "ledger claim attempt");
        Ok(changed == 1)
    }

    /// Whether a live (non-expired) claim exists for the fingerprint.
    pub fn exists(&self, fingerprint: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT expires_at FROM dedup_entries WHERE fingerprint = ?1 AND expires_at > ?2",
                params![fingerprint, Utc::now().timestamp_millis()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::ledger(format!("exists failed: {}", e)))?;
        Ok(found.is_some())
    }

    /// Removes any entry for the fingerprint. Idempotent.
    pub fn delete(&self, fingerprint: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM dedup_entries WHERE fingerprint = ?1",
            params![fingerprint],
        )
        .map_err(|e| Error::ledger(format!("delete failed: {}", e)))?;
        Ok(())
    }

    /// Reads back the full entry for audit purposes.
    pub fn entry(&self, fingerprint: &str) -> Result<Option<DedupEntry>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT fingerprint, batch_id, project_id, first_seen_at, expires_at
             FROM dedup_entries WHERE fingerprint = ?1",
            params![fingerprint],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()
        .map_err(|e| Error::ledger(format!("entry lookup failed: {}", e)))?
        .map(|(fingerprint, batch_id, project_id, first_seen_at, expires_at)| {
            Ok(DedupEntry {
                fingerprint,
                batch_id: Uuid::from_str(&batch_id)
                    .map_err(|e| Error::ledger(format!("corrupt batch id: {}", e)))?,
                project_id,
                first_seen_at: millis_to_datetime(first_seen_at),
                expires_at: millis_to_datetime(expires_at),
            })
        })
        .transpose()
    }

    /// Fingerprints whose claims expired before `before`, capped at `limit`.
    pub fn find_expired(&self, before: DateTime<Utc>, limit: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT fingerprint FROM dedup_entries
                 WHERE expires_at <= ?1 ORDER BY expires_at LIMIT ?2",
            )
            .map_err(|e| Error::ledger(format!("find_expired failed: {}", e)))?;

        let rows = stmt
            .query_map(params![before.timestamp_millis(), limit as i64], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| Error::ledger(format!("find_expired failed: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::ledger(format!("find_expired failed: {}", e)))?;

        Ok(rows)
    }

    /// Deletes up to `limit` entries expired before `before`.
    /// Returns the number removed; repeat until zero for a full sweep.
    pub fn delete_expired(&self, before: DateTime<Utc>, limit: usize) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn
            .execute(
                "DELETE FROM dedup_entries WHERE fingerprint IN (
                     SELECT fingerprint FROM dedup_entries
                     WHERE expires_at <= ?1 ORDER BY expires_at LIMIT ?2
                 )",
                params![before.timestamp_millis(), limit as i64],
            )
            .map_err(|e| Error::ledger(format!("delete_expired failed: {}", e)))?;
        Ok(removed)
    }

    /// Deletes all of one project's entries expired before `before`.
    pub fn delete_expired_for_project(&self, project_id: &str, before: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn
            .execute(
                "DELETE FROM dedup_entries WHERE project_id = ?1 AND expires_at <= ?2",
                params![project_id, before.timestamp_millis()],
            )
            .map_err(|e| Error::ledger(format!("delete_expired_for_project failed: {}", e)))?;
        Ok(removed)
    }

    /// Connectivity check for health reporting.
    pub fn probe(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| Error::ledger(format!("probe failed: {}", e)))?;
        Ok(())
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

#[async_trait]
impl ClaimStore for DedupLedger {
    async fn try_claim(&self, entry: &DedupEntry) -> std::result::Result<bool, ClaimStoreError> {
        self.try_insert(entry)
            .map_err(|e| ClaimStoreError::Unavailable(e.to_string()))
    }

    async fn release(&self, fingerprint: &str) -> std::result::Result<(), ClaimStoreError> {
        self.delete(fingerprint)
            .map_err(|e| ClaimStoreError::Unavailable(e.to_string()))
    }

    async fn exists(&self, fingerprint: &str) -> std::result::Result<bool, ClaimStoreError> {
        DedupLedger::exists(self, fingerprint)
            .map_err(|e| ClaimStoreError::Unavailable(e.to_string()))
    }
}

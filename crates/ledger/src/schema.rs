//! Ledger schema.

use rusqlite::Connection;

/// Initializes the dedup ledger schema.
///
/// The fingerprint primary key is the uniqueness constraint the whole claim
/// protocol leans on; `expires_at` is indexed for bounded expiry sweeps.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS dedup_entries (
            fingerprint TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            first_seen_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dedup_entries_expires_at
         ON dedup_entries(expires_at)",
        [],
    )?;
    // Index for per-project cleanup
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dedup_entries_project_id
         ON dedup_entries(project_id)",
        [],
    )?;
    Ok(())
}

//! Database migrations for notes-sync.
//!
//! Each migration is a function that upgrades the schema by one version.
//! Migrations are run automatically when the database is opened.

use rusqlite::Connection;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

fn set_version(conn: &Connection, version: i32) -> rusqlite::Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
}

/// Run all pending migrations.
pub fn run(conn: &mut Connection) -> rusqlite::Result<()> {
    let current = get_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(());
    }

    // Each step commits together with its version bump
    for version in (current + 1)..=CURRENT_VERSION {
        let tx = conn.transaction()?;
        run_migration(&tx, version)?;
        set_version(&tx, version)?;
        tx.commit()?;
    }

    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> rusqlite::Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(rusqlite::Error::InvalidParameterName(format!(
            "unknown migration version {version}"
        ))),
    }
}

/// Migration v1: Initial schema.
///
/// Creates tables for:
/// - `queued_records`: notes waiting for delivery, with retry bookkeeping
/// - `completed_notes`: append-only log of delivered notes
fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS queued_records (
            id TEXT PRIMARY KEY,
            profile_url TEXT NOT NULL,
            note TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_retry_at INTEGER,
            last_error TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_queued_records_status
        ON queued_records(status);

        CREATE INDEX IF NOT EXISTS idx_queued_records_created
        ON queued_records(created_at);

        CREATE TABLE IF NOT EXISTS completed_notes (
            id TEXT PRIMARY KEY,
            profile_url TEXT NOT NULL,
            note TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            delivered_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_completed_notes_created
        ON completed_notes(created_at);
        ",
    )
}

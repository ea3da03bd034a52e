use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;

const MIGRATIONS: [(&str, &str); 2] = [
    ("0000_initial", include_str!("../migrations/0000_initial.sql")),
    ("0001_settings", include_str!("../migrations/0001_settings.sql")),
];

/// Opens (creating if needed) the catalog database at `db_path` and brings its
/// schema up to date.
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    prepare(&conn)?;
    log::info!("opened catalog at {}", db_path.display());
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
          id TEXT PRIMARY KEY NOT NULL,
          applied_at INTEGER NOT NULL
        );",
    )?;
    for (id, sql) in MIGRATIONS {
        apply_migration(conn, id, sql)?;
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

fn apply_migration(conn: &Connection, id: &str, sql: &str) -> Result<()> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM schema_migrations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(());
    }
    conn.execute_batch(sql)?;
    conn.execute(
        "INSERT INTO schema_migrations (id, applied_at) VALUES (?1, ?2)",
        params![id, chrono::Utc::now().timestamp_millis()],
    )?;
    log::info!("applied migration {}", id);
    Ok(())
}

/// Database connection and validation utilities
///
/// Opens the climate dataset read-only and checks that the tables the
/// service queries are present, so a bad path fails at startup rather than
/// on the first request.

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use log::warn;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Tables every query in this service reads from.
pub const REQUIRED_TABLES: &[&str] = &["measurement", "station"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(
        "Failed to open climate database '{0}'.\n\n  \
         The file must already exist; this service never creates it.\n  \
         Set database_path in climate.toml or CLIMATE_DATABASE in .env"
    )]
    Open(PathBuf, #[source] rusqlite::Error),

    #[error(
        "Required table '{0}' does not exist in the climate database.\n\n  \
         Expected tables: measurement(station, date, prcp, tobs) and station(station, name)"
    )]
    MissingTable(String),

    #[error("Database query failed")]
    Query(#[from] rusqlite::Error),
}

/// Opens `path` read-only. Fails if the file does not exist.
pub fn open_read_only(path: &Path) -> Result<Connection, StoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    Connection::open_with_flags(path, flags).map_err(|e| StoreError::Open(path.to_path_buf(), e))
}

/// Verify a table exists in the main schema.
pub fn verify_table(conn: &Connection, table: &str) -> Result<(), StoreError> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::MissingTable(table.to_string())),
    }
}

/// Verify all of `REQUIRED_TABLES`.
pub fn verify_schema(conn: &Connection) -> Result<(), StoreError> {
    for table in REQUIRED_TABLES {
        verify_table(conn, table)?;
    }
    Ok(())
}

/// Row count for a required table, used in the startup log.
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64, StoreError> {
    // Table names can't be bound as parameters; only accept known ones.
    if !REQUIRED_TABLES.contains(&table) {
        return Err(StoreError::MissingTable(table.to_string()));
    }
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// The single connection shared by all request handlers.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so access is serialized
/// through a mutex. Queries are short and local, so contention is not a
/// concern at this scale.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open and verify the dataset at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = open_read_only(path)?;
        Self::from_connection(conn)
    }

    /// Wrap an existing connection after verifying its schema.
    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        verify_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Lock the connection for the duration of one query.
    ///
    /// A panic in another handler poisons the mutex but cannot leave a
    /// read-only connection half-written, so the guard is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("Recovering database connection after a panicked request");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }
}

//! Connection pool creation and configuration.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Tunables for the SQLite pool, sourced from the `[database]` section of
/// the server config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// How long a connection waits on the writer lock before giving up, in
    /// milliseconds. The index allocator and the savepoint-wrapped workflow
    /// writes contend on this lock under concurrent ingestion.
    pub busy_timeout_ms: u64,

    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            max_connections: 8,
        }
    }
}

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool could not be built or its first connection failed init.
    #[error("database pool initialization failed: {0}")]
    Init(#[from] r2d2::Error),
}

/// Opens a pooled SQLite database configured for the ingestion workload.
///
/// Every connection is initialized with:
///
/// - WAL journaling, so the device and observation read endpoints are never
///   blocked by workflow writes;
/// - `synchronous = NORMAL`, the durability level WAL pairs with on a
///   write-heavy path;
/// - enforced foreign keys (`observations.device_id` references `devices`);
/// - the configured busy timeout, so contending writers queue instead of
///   surfacing `SQLITE_BUSY` to a workflow mid-savepoint.
///
/// # Arguments
///
/// * `db_path` - Path to the SQLite database file. Use `:memory:` for an
///   in-memory database (useful for testing).
///
/// # Errors
///
/// Returns `PoolError::Init` if the connection pool cannot be created.
pub fn create_pool(db_path: &str, settings: PoolSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| init_connection(conn, settings.busy_timeout_ms));

    let pool = Pool::builder()
        .max_size(settings.max_connections)
        .build(manager)?;

    Ok(pool)
}

fn init_connection(conn: &Connection, busy_timeout_ms: u64) -> Result<(), rusqlite::Error> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))?;
    // In-memory databases cannot use WAL and report "memory"; anything else
    // means the pragma was refused.
    if mode != "wal" && mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!(
                "journal_mode pragma refused, database reports '{mode}'"
            )),
        ));
    }

    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.pragma_update(None, "busy_timeout", busy_timeout_ms as i64)?;

    Ok(())
}

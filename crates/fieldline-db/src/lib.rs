//! Database layer for the Fieldline ingestion pipeline.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. Every table in Fieldline — devices,
//! observations, the per-table index counters, and the inbound message
//! intake — is created through versioned migrations managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: the ingestion path is write-heavy but
//!   single-node; WAL allows concurrent readers with a single writer, which
//!   matches the pipeline's access pattern without an external database
//!   process.
//! - **`r2d2` connection pool**: bounded connection reuse for the HTTP
//!   handlers without manual lifetime management.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema ships with the server and cannot drift
//!   from the code that depends on it. The index counter rows that the
//!   allocator consumes are seeded here as well.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, PoolError, PoolSettings};

//! Postgres persistence, one module per aggregate.
//!
//! Functions take any `PgExecutor` so they run against the pool or inside a
//! transaction. Embedded collections (rows, courses, seat blocks) live in
//! JSONB columns and are re-validated when loaded.

pub mod allocations;
pub mod categories;
pub mod ceremonies;
pub mod venues;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("stored {entity} {id} is corrupt: {reason}")]
    Corrupt {
        entity: &'static str,
        id: Uuid,
        reason: String,
    },
}

/// Turns a unique-index violation into `Duplicate`, anything else stays a
/// database error.
pub(crate) fn map_unique(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(what());
        }
    }
    StoreError::Database(err)
}

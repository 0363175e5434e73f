//! # cipherbox-database
//!
//! Document-store side of CipherBox: the per-user refresh-token sets and
//! the users collection. PostgreSQL implementations live in
//! [`repositories`]; process-local equivalents for tests and development
//! live in [`memory`].

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::{MemorySessionStore, MemoryUserDirectory};
pub use repositories::{PgSessionStore, PgUserDirectory};

use cipherbox_core::error::{AppError, ErrorKind};

/// Map a sqlx error into the application taxonomy.
///
/// Unique violations become `Conflict`; everything else is a retryable
/// `IoFailure` against the backing store.
pub(crate) fn db_error(err: sqlx::Error, message: &str) -> AppError {
    let kind = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::Conflict,
        _ => ErrorKind::IoFailure,
    };
    AppError::with_source(kind, format!("{message}: {err}"), err)
}

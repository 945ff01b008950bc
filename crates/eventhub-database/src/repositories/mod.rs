//! PostgreSQL repositories for EventHub entities.
//!
//! Pool-backed reads are methods on the repository structs. Statements that
//! must run inside a caller's transaction are associated functions taking
//! `&mut PgConnection`, so the row lock taken by one is held for the next.

pub mod event;
pub mod registration;
pub mod user;

pub use event::EventRepository;
pub use registration::RegistrationRepository;
pub use user::UserRepository;

use eventhub_core::error::{AppError, ErrorKind};

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";
/// SQLSTATE for `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE for `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

/// Map a driver error into an [`AppError`], keeping the driver error as source.
///
/// Constraint and lock-timeout failures become typed outcomes; everything
/// else is a `Database` error whose message never reaches clients.
pub(crate) fn map_db_error(err: sqlx::Error, message: &str) -> AppError {
    let code = match &err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    };

    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => {
            AppError::with_source(ErrorKind::Conflict, format!("{message}: duplicate entry"), err)
        }
        Some(FOREIGN_KEY_VIOLATION) => AppError::with_source(
            ErrorKind::NotFound,
            format!("{message}: referenced record does not exist"),
            err,
        ),
        Some(CHECK_VIOLATION) => AppError::with_source(
            ErrorKind::InvariantViolation,
            format!("{message}: check constraint violated"),
            err,
        ),
        Some(LOCK_NOT_AVAILABLE) | Some(DEADLOCK_DETECTED) => AppError::with_source(
            ErrorKind::ServiceUnavailable,
            "Timed out waiting for a row lock, please retry",
            err,
        ),
        _ if matches!(err, sqlx::Error::PoolTimedOut) => AppError::with_source(
            ErrorKind::ServiceUnavailable,
            "Database connection pool exhausted, please retry",
            err,
        ),
        _ => AppError::with_source(ErrorKind::Database, message, err),
    }
}

/// Escape `%`, `_` and `\` so user input is matched literally by `ILIKE`.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

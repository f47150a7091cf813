//! Record store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define per-collection data access contracts (students, classes,
//!   attendance).
//! - Isolate SQLite query details from the use-case services.
//! - Provide an in-memory implementation with identical observable semantics.
//!
//! # Invariants
//! - Writes validate the record before touching storage.
//! - Each mutation is one statement or one transaction: a failed write leaves
//!   the previous state readable and intact.
//! - Missing records are reported as `None`/`false`, never as errors.
//! - Uniqueness violations surface as `RepoError::DuplicateKey`.

pub mod attendance_repo;
pub mod class_repo;
pub mod memory;
pub mod student_repo;

use crate::db::DbError;
use crate::model::{ModelValidationError, DATE_FORMAT};
use chrono::NaiveDate;
use rusqlite::{ffi, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Store error shared by every collection.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    /// A uniqueness constraint was violated; `key` names the offending value.
    DuplicateKey {
        entity: &'static str,
        key: String,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateKey { entity, key } => write!(f, "{entity} already exists: {key}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::DuplicateKey { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Maps a UNIQUE or PRIMARY KEY violation to `DuplicateKey`, anything else
/// (including CHECK and NOT NULL failures) to `Db`.
pub(crate) fn map_insert_error(
    err: rusqlite::Error,
    entity: &'static str,
    key: impl FnOnce() -> String,
) -> RepoError {
    if is_uniqueness_violation(&err) {
        return RepoError::DuplicateKey { entity, key: key() };
    }
    err.into()
}

fn is_uniqueness_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

pub(crate) fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_db_date(value: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

//! Domain model for students, classes and attendance.
//!
//! # Responsibility
//! - Define the canonical records persisted by the record store.
//! - Own field-level validation shared by every store implementation.
//!
//! # Invariants
//! - `Student::student_id` is caller-assigned and unique.
//! - `Class::id` and `AttendanceRecord::id` are system-generated.
//! - At most one `AttendanceRecord` exists per `AttendanceKey`.

pub mod attendance;
pub mod class;
pub mod student;

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Calendar date format used on the wire and in storage.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field-level validation failure for a domain record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Required text field is empty after trim.
    BlankField {
        entity: &'static str,
        field: &'static str,
    },
    /// Date text is not a valid `YYYY-MM-DD` calendar date.
    InvalidDate(String),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField { entity, field } => {
                write!(f, "{entity}.{field} must not be blank")
            }
            Self::InvalidDate(value) => {
                write!(f, "invalid date `{value}`; expected YYYY-MM-DD")
            }
        }
    }
}

impl Error for ModelValidationError {}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ModelValidationError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| ModelValidationError::InvalidDate(trimmed.to_string()))
}

/// Current wall clock as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn require_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::BlankField { entity, field });
    }
    Ok(())
}

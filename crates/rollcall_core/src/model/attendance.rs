//! Attendance record and its logical key.
//!
//! # Invariants
//! - `AttendanceKey` (student, class, date) identifies at most one record.
//! - `status` is persisted and serialized as a boolean (`true` = present).

use super::{now_epoch_ms, require_text, ModelValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Physical identity of one attendance row.
pub type AttendanceId = Uuid;

/// Present/absent flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }
}

impl From<bool> for AttendanceStatus {
    fn from(value: bool) -> Self {
        if value {
            Self::Present
        } else {
            Self::Absent
        }
    }
}

impl From<AttendanceStatus> for bool {
    fn from(value: AttendanceStatus) -> Self {
        value.is_present()
    }
}

impl Display for AttendanceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical key of an attendance record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttendanceKey {
    pub student_id: String,
    pub class_id: String,
    pub date: NaiveDate,
}

impl AttendanceKey {
    pub fn new(student_id: impl Into<String>, class_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            student_id: student_id.into().trim().to_string(),
            class_id: class_id.into().trim().to_string(),
            date,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("attendance", "student_id", &self.student_id)?;
        require_text("attendance", "class_id", &self.class_id)?;
        Ok(())
    }
}

impl Display for AttendanceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.class_id, self.student_id, self.date)
    }
}

/// Persisted attendance entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub student_id: String,
    pub class_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<i64>,
}

impl AttendanceRecord {
    /// Creates a fresh record for `key`.
    pub fn new(key: AttendanceKey, status: AttendanceStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: key.student_id,
            class_id: key.class_id,
            date: key.date,
            status,
            created_at: now_epoch_ms(),
            updated_at: None,
        }
    }

    /// Returns the logical key of this record.
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey {
            student_id: self.student_id.clone(),
            class_id: self.class_id.clone(),
            date: self.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AttendanceKey, AttendanceRecord, AttendanceStatus};
    use chrono::NaiveDate;

    #[test]
    fn status_serializes_as_boolean() {
        let key = AttendanceKey::new("S1", "C1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let record = AttendanceRecord::new(key, AttendanceStatus::Absent);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], serde_json::Value::Bool(false));
        assert_eq!(json["date"], "2024-01-01");
        assert!(json.get("updated_at").is_none());

        let back: AttendanceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.status, AttendanceStatus::Absent);
    }

    #[test]
    fn key_validation_rejects_blank_student() {
        let key = AttendanceKey::new(" ", "C1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(key.validate().is_err());
    }
}

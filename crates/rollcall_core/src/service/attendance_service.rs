//! Attendance reconciliation service.
//!
//! # Responsibility
//! - Turn a recognition outcome into a complete present/absent ledger for one
//!   class on one date.
//! - Provide the manual override and report use-cases over the same records.
//!
//! # Invariants
//! - Every student on the roster gets exactly one record per reconciliation,
//!   present XOR absent.
//! - Records are written through `AttendanceRepository::upsert` only, so
//!   repeated runs and manual marks converge on one record per logical key.
//! - Matches for students outside the roster never produce records.
//! - A failed write for one student is logged and reported in
//!   `AttendanceReport::skipped`; the rest of the roster is still processed.
//! - Recognition failures propagate unchanged; nothing is written.

use crate::model::attendance::{AttendanceId, AttendanceKey, AttendanceRecord, AttendanceStatus};
use crate::model::{require_text, ModelValidationError};
use crate::recognition::{
    RecognitionError, RecognitionOutcome, RecognitionProvider, RecognizedStudent,
    UnrecognizedFace,
};
use crate::repo::attendance_repo::{AttendanceQuery, AttendanceRepository};
use crate::repo::student_repo::{StudentQuery, StudentRepository};
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDate;
use log::{error, info, warn};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

#[derive(Debug)]
pub enum AttendanceServiceError {
    Invalid(ModelValidationError),
    Recognition(RecognitionError),
    /// Create-only path hit an existing record.
    DuplicateRecord(String),
    Repo(RepoError),
}

impl Display for AttendanceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::Recognition(err) => write!(f, "{err}"),
            Self::DuplicateRecord(key) => write!(f, "attendance record already exists: {key}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AttendanceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Recognition(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::DuplicateRecord(_) => None,
        }
    }
}

impl From<RepoError> for AttendanceServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateKey {
                entity: "attendance",
                key,
            } => Self::DuplicateRecord(key),
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

impl From<RecognitionError> for AttendanceServiceError {
    fn from(value: RecognitionError) -> Self {
        Self::Recognition(value)
    }
}

/// A roster student whose record could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMark {
    pub student_id: String,
    pub status: AttendanceStatus,
    pub error: String,
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceReport {
    pub class_id: String,
    pub date: NaiveDate,
    /// One record per roster student: present ones first, then absent ones.
    pub attendance: Vec<AttendanceRecord>,
    /// Raw provider matches, including any outside the roster.
    pub recognized_students: Vec<RecognizedStudent>,
    pub unrecognized_faces: Vec<UnrecognizedFace>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedMark>,
}

impl AttendanceReport {
    pub fn present_count(&self) -> usize {
        self.attendance
            .iter()
            .filter(|record| record.status.is_present())
            .count()
    }
}

/// Attendance record joined with the student's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassReportEntry {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub student_name: String,
}

/// Attendance use-cases over student and attendance repositories.
pub struct AttendanceService<S: StudentRepository, A: AttendanceRepository> {
    students: S,
    attendance: A,
}

impl<S: StudentRepository, A: AttendanceRepository> AttendanceService<S, A> {
    pub fn new(students: S, attendance: A) -> Self {
        Self {
            students,
            attendance,
        }
    }

    /// Reconciles `outcome` against the roster of `class_id` on `date`.
    ///
    /// # Errors
    /// - `Invalid` for a blank `class_id`.
    /// - `Repo` when the roster cannot be read. Per-student write failures
    ///   are not errors; see `AttendanceReport::skipped`.
    pub fn process_attendance(
        &self,
        class_id: &str,
        date: NaiveDate,
        outcome: RecognitionOutcome,
    ) -> Result<AttendanceReport, AttendanceServiceError> {
        let class_id = class_id.trim();
        require_text("attendance", "class_id", class_id).map_err(AttendanceServiceError::Invalid)?;
        info!("event=attendance_process module=service status=start class_id={class_id} date={date}");

        let roster = self.students.find(&StudentQuery::in_class(class_id))?;
        if roster.is_empty() {
            warn!("event=attendance_process module=service status=empty_roster class_id={class_id} date={date}");
        }
        let roster_ids = roster
            .iter()
            .map(|student| student.student_id.as_str())
            .collect::<HashSet<_>>();

        let mut attendance = Vec::with_capacity(roster.len());
        let mut skipped = Vec::new();
        let mut present = BTreeSet::new();

        for matched in &outcome.recognized {
            let student_id = matched.student_id.as_str();
            if !roster_ids.contains(student_id) {
                warn!(
                    "event=attendance_mark module=service status=dropped reason=not_in_roster class_id={class_id} student_id={student_id}"
                );
                continue;
            }
            if !present.insert(student_id) {
                continue;
            }
            self.mark(
                AttendanceKey::new(student_id, class_id, date),
                AttendanceStatus::Present,
                &mut attendance,
                &mut skipped,
            );
        }

        for student in &roster {
            if present.contains(student.student_id.as_str()) {
                continue;
            }
            self.mark(
                AttendanceKey::new(student.student_id.as_str(), class_id, date),
                AttendanceStatus::Absent,
                &mut attendance,
                &mut skipped,
            );
        }

        info!(
            "event=attendance_process module=service status=ok class_id={class_id} date={date} roster={} present={} recorded={} skipped={}",
            roster.len(),
            present.len(),
            attendance.len(),
            skipped.len()
        );

        Ok(AttendanceReport {
            class_id: class_id.to_string(),
            date,
            attendance,
            recognized_students: outcome.recognized,
            unrecognized_faces: outcome.unrecognized,
            skipped,
        })
    }

    /// Runs `provider` on `image` and reconciles the result.
    ///
    /// `date` defaults to today's local date.
    ///
    /// # Errors
    /// - `Recognition` when the provider fails; nothing is written.
    pub fn take_attendance<P: RecognitionProvider + ?Sized>(
        &self,
        provider: &P,
        class_id: &str,
        image: &Path,
        date: Option<NaiveDate>,
    ) -> Result<AttendanceReport, AttendanceServiceError> {
        let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
        let class_id = class_id.trim();
        let roster = self.students.find(&StudentQuery::in_class(class_id))?;

        let outcome = provider.recognize(image, &roster).map_err(|err| {
            error!(
                "event=attendance_recognize module=service status=error provider={} class_id={class_id} error={err}",
                provider.provider_id()
            );
            err
        })?;
        self.process_attendance(class_id, date, outcome)
    }

    /// Sets one student's status directly, overriding any earlier result.
    pub fn manual_mark(
        &self,
        student_id: &str,
        class_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<AttendanceRecord, AttendanceServiceError> {
        let key = AttendanceKey::new(student_id, class_id, date);
        match self.attendance.upsert(&key, status) {
            Ok(record) => {
                info!("event=attendance_manual module=service status=ok key={key} value={status}");
                Ok(record)
            }
            Err(err) => {
                error!("event=attendance_manual module=service status=error key={key} error={err}");
                Err(err.into())
            }
        }
    }

    /// Create-only path; fails with `DuplicateRecord` if `key` already has a record.
    pub fn create_record(
        &self,
        key: &AttendanceKey,
        status: AttendanceStatus,
    ) -> Result<AttendanceRecord, AttendanceServiceError> {
        Ok(self.attendance.insert(key, status)?)
    }

    /// Records of one class on one date, with student names.
    ///
    /// Records whose student no longer exists are left out.
    pub fn class_report(
        &self,
        class_id: &str,
        date: NaiveDate,
    ) -> RepoResult<Vec<ClassReportEntry>> {
        let records = self
            .attendance
            .find(&AttendanceQuery::class_on(class_id.trim(), date))?;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            if let Some(student) = self.students.get(&record.student_id)? {
                entries.push(ClassReportEntry {
                    record,
                    student_name: student.name,
                });
            }
        }
        Ok(entries)
    }

    /// Every record of one student across classes and dates.
    pub fn student_history(&self, student_id: &str) -> RepoResult<Vec<AttendanceRecord>> {
        self.attendance
            .find(&AttendanceQuery::for_student(student_id.trim()))
    }

    pub fn delete_record(&self, id: AttendanceId) -> RepoResult<bool> {
        self.attendance.delete(id)
    }

    fn mark(
        &self,
        key: AttendanceKey,
        status: AttendanceStatus,
        attendance: &mut Vec<AttendanceRecord>,
        skipped: &mut Vec<SkippedMark>,
    ) {
        match self.attendance.upsert(&key, status) {
            Ok(record) => attendance.push(record),
            Err(err) => {
                error!(
                    "event=attendance_mark module=service status=error key={key} value={status} error={err}"
                );
                skipped.push(SkippedMark {
                    student_id: key.student_id,
                    status,
                    error: err.to_string(),
                });
            }
        }
    }
}

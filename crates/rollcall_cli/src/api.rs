//! Use-case API behind the CLI subcommands.
//!
//! # Responsibility
//! - Map each subcommand onto core services over one SQLite connection.
//! - Report every outcome as a `{"success": bool, ...}` envelope.
//!
//! # Invariants
//! - Functions never panic; failures become `success: false` envelopes.
//! - A rejected enrollment leaves no reference photo behind and never
//!   overwrites an existing student's photo.

use crate::cli::PhotoInput;
use chrono::NaiveDate;
use log::{error, warn};
use rollcall_core::{
    AttendanceService, AttendanceStatus, ClassService, NewStudent, PhotoError, PhotoStore,
    RecognitionProvider, SqliteAttendanceRepository, SqliteClassRepository,
    SqliteStudentRepository, StudentService,
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::path::{Path, PathBuf};

/// JSON response envelope printed to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            fields: Map::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            fields: Map::new(),
        }
    }

    /// Adds one payload field; an unencodable value turns this into a failure.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.fields.insert(key.to_string(), value);
                self
            }
            Err(err) => Self::failure(format!("failed to encode `{key}`: {err}")),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!("{{\"success\":false,\"error\":\"failed to encode response: {err}\"}}")
        })
    }
}

fn failed(operation: &str, err: impl std::fmt::Display) -> Envelope {
    error!("event=api_call module=cli status=error op={operation} error={err}");
    Envelope::failure(format!("{operation} failed: {err}"))
}

/// Services and stores shared by all subcommands of one invocation.
pub struct Api<'a> {
    conn: &'a Connection,
    photos: &'a PhotoStore,
    recognizer: &'a dyn RecognitionProvider,
}

impl<'a> Api<'a> {
    pub fn new(
        conn: &'a Connection,
        photos: &'a PhotoStore,
        recognizer: &'a dyn RecognitionProvider,
    ) -> Self {
        Self {
            conn,
            photos,
            recognizer,
        }
    }

    fn students(
        &self,
    ) -> StudentService<SqliteStudentRepository<'a>, SqliteClassRepository<'a>> {
        StudentService::new(
            SqliteStudentRepository::new(self.conn),
            SqliteClassRepository::new(self.conn),
        )
    }

    fn classes(
        &self,
    ) -> ClassService<
        SqliteClassRepository<'a>,
        SqliteStudentRepository<'a>,
        SqliteAttendanceRepository<'a>,
    > {
        ClassService::new(
            SqliteClassRepository::new(self.conn),
            SqliteStudentRepository::new(self.conn),
            SqliteAttendanceRepository::new(self.conn),
        )
    }

    fn attendance(
        &self,
    ) -> AttendanceService<SqliteStudentRepository<'a>, SqliteAttendanceRepository<'a>> {
        AttendanceService::new(
            SqliteStudentRepository::new(self.conn),
            SqliteAttendanceRepository::new(self.conn),
        )
    }

    pub fn list_students(&self, class_id: Option<&str>) -> Envelope {
        let service = self.students();
        let result = match class_id {
            Some(class_id) => service.list_by_class(class_id),
            None => service.list_students(),
        };
        match result {
            Ok(students) => Envelope::ok().with("students", students),
            Err(err) => failed("list_students", err),
        }
    }

    /// Checks the enrollment, stores the reference photo, then enrolls the student.
    pub fn add_student(
        &self,
        student_id: &str,
        name: &str,
        class_id: &str,
        photo: &PhotoInput,
    ) -> Envelope {
        let service = self.students();
        let mut input = NewStudent {
            student_id: student_id.to_string(),
            name: name.to_string(),
            class_id: class_id.to_string(),
            photo_path: String::new(),
        };
        if let Err(err) = service.check_enrollment(&input) {
            return failed("add_student", err);
        }

        let student_id = student_id.trim();
        let saved = match photo {
            PhotoInput::Base64(payload) => self
                .photos
                .save_student_photo(student_id, payload)
                .map_err(PhotoInputError::Store),
            PhotoInput::File(path) => read_photo_file(path).and_then(|bytes| {
                self.photos
                    .save_student_photo_bytes(student_id, &bytes)
                    .map_err(PhotoInputError::Store)
            }),
        };
        let photo_path = match saved {
            Ok(path) => path,
            Err(err) => return failed("add_student", err),
        };

        input.photo_path = photo_path.display().to_string();
        match service.add_student(input) {
            Ok(student) => Envelope::ok().with("student", student),
            Err(err) => {
                discard_photo(&photo_path);
                failed("add_student", err)
            }
        }
    }

    pub fn delete_student(&self, student_id: &str) -> Envelope {
        match self.students().delete_student(student_id) {
            Ok(true) => Envelope::ok(),
            Ok(false) => Envelope::failure("Student not found"),
            Err(err) => failed("delete_student", err),
        }
    }

    pub fn list_classes(&self) -> Envelope {
        match self.classes().list_classes() {
            Ok(classes) => Envelope::ok().with("classes", classes),
            Err(err) => failed("list_classes", err),
        }
    }

    pub fn add_class(&self, name: &str) -> Envelope {
        match self.classes().create_class(name) {
            Ok(class) => Envelope::ok().with("class", class),
            Err(err) => failed("add_class", err),
        }
    }

    pub fn delete_class(&self, class_id: &str) -> Envelope {
        match self.classes().delete_class(class_id) {
            Ok(true) => Envelope::ok(),
            Ok(false) => Envelope::failure("Class not found"),
            Err(err) => failed("delete_class", err),
        }
    }

    /// Saves the classroom photo, recognizes it and records the whole roster.
    pub fn take_attendance(&self, class_id: &str, date: NaiveDate, photo: &PhotoInput) -> Envelope {
        let class_key = class_id.trim();
        let saved = match photo {
            PhotoInput::Base64(payload) => self
                .photos
                .save_classroom_photo(class_key, date, payload)
                .map_err(PhotoInputError::Store),
            PhotoInput::File(path) => read_photo_file(path).and_then(|bytes| {
                self.photos
                    .save_classroom_photo_bytes(class_key, date, &bytes)
                    .map_err(PhotoInputError::Store)
            }),
        };
        let image = match saved {
            Ok(path) => path,
            Err(err) => return failed("take_attendance", err),
        };

        match self
            .attendance()
            .take_attendance(self.recognizer, class_id, &image, Some(date))
        {
            Ok(report) => {
                let envelope = Envelope::ok()
                    .with("attendance", &report.attendance)
                    .with("recognized_students", &report.recognized_students)
                    .with("unrecognized_faces", &report.unrecognized_faces);
                if report.skipped.is_empty() {
                    envelope
                } else {
                    envelope.with("skipped", &report.skipped)
                }
            }
            Err(err) => failed("take_attendance", err),
        }
    }

    pub fn manual_attendance(
        &self,
        student_id: &str,
        class_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Envelope {
        match self
            .attendance()
            .manual_mark(student_id, class_id, date, status)
        {
            Ok(record) => Envelope::ok().with("attendance", record),
            Err(err) => failed("manual_attendance", err),
        }
    }

    pub fn attendance_report(&self, class_id: &str, date: NaiveDate) -> Envelope {
        match self.attendance().class_report(class_id, date) {
            Ok(records) => Envelope::ok().with("attendance_records", records),
            Err(err) => failed("attendance_report", err),
        }
    }

    pub fn student_report(&self, student_id: &str) -> Envelope {
        match self.attendance().student_history(student_id) {
            Ok(records) => Envelope::ok().with("attendance_records", records),
            Err(err) => failed("student_report", err),
        }
    }
}

#[derive(Debug)]
enum PhotoInputError {
    Read { path: PathBuf, source: std::io::Error },
    Store(PhotoError),
}

impl std::fmt::Display for PhotoInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read photo `{}`: {source}", path.display())
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PhotoInputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Store(err) => Some(err),
        }
    }
}

fn read_photo_file(path: &Path) -> Result<Vec<u8>, PhotoInputError> {
    std::fs::read(path).map_err(|source| PhotoInputError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Removes a reference photo whose enrollment lost a race after the checks.
fn discard_photo(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        warn!(
            "event=photo_discard module=cli status=error path={} error={err}",
            path.display()
        );
    }
}

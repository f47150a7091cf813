//! Core domain logic for rollcall, a classroom attendance recorder.
//! This crate is the single source of truth for attendance invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod photo;
pub mod recognition;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError, ConfigOverrides};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attendance::{AttendanceId, AttendanceKey, AttendanceRecord, AttendanceStatus};
pub use model::class::{Class, ClassId, ClassPatch};
pub use model::student::{Student, StudentId, StudentPatch};
pub use model::{parse_date, ModelValidationError};
pub use photo::{decode_base64_image, PhotoError, PhotoStore};
pub use recognition::{
    FaceLocation, RecognitionError, RecognitionOutcome, RecognitionProvider, RecognitionResult,
    RecognizedStudent, SimulatedRecognizer, UnrecognizedFace,
};
pub use repo::attendance_repo::{AttendanceQuery, AttendanceRepository, SqliteAttendanceRepository};
pub use repo::class_repo::{ClassQuery, ClassRepository, SqliteClassRepository};
pub use repo::memory::MemoryStore;
pub use repo::student_repo::{SqliteStudentRepository, StudentQuery, StudentRepository};
pub use repo::{RepoError, RepoResult};
pub use service::attendance_service::{
    AttendanceReport, AttendanceService, AttendanceServiceError, ClassReportEntry, SkippedMark,
};
pub use service::class_service::{ClassService, ClassServiceError};
pub use service::student_service::{NewStudent, StudentService, StudentServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

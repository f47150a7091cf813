//! Student use-case service.
//!
//! # Invariants
//! - A student can only be enrolled in (or moved to) an existing class.
//! - Deleting a student keeps their attendance history.

use crate::model::student::{Student, StudentPatch};
use crate::model::ModelValidationError;
use crate::repo::class_repo::ClassRepository;
use crate::repo::student_repo::{StudentQuery, StudentRepository};
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from student use-cases.
#[derive(Debug)]
pub enum StudentServiceError {
    Invalid(ModelValidationError),
    /// Referenced class does not exist.
    ClassNotFound(String),
    /// `student_id` is already taken.
    DuplicateStudent(String),
    Repo(RepoError),
}

impl Display for StudentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::ClassNotFound(class_id) => write!(f, "class not found: {class_id}"),
            Self::DuplicateStudent(student_id) => {
                write!(f, "student ID {student_id} already exists")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StudentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StudentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateKey {
                entity: "student",
                key,
            } => Self::DuplicateStudent(key),
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

/// Input for enrolling a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub student_id: String,
    pub name: String,
    pub class_id: String,
    /// Location of the already stored reference photo.
    pub photo_path: String,
}

/// Student service facade over repository implementations.
pub struct StudentService<S: StudentRepository, C: ClassRepository> {
    students: S,
    classes: C,
}

impl<S: StudentRepository, C: ClassRepository> StudentService<S, C> {
    pub fn new(students: S, classes: C) -> Self {
        Self { students, classes }
    }

    /// Enrolls a new student.
    ///
    /// # Errors
    /// - `Invalid` for blank required fields.
    /// - `ClassNotFound` when `class_id` does not exist.
    /// - `DuplicateStudent` when `student_id` is taken; the store is unchanged.
    pub fn add_student(&self, input: NewStudent) -> Result<Student, StudentServiceError> {
        let student = Student::new(input.student_id, input.name, input.class_id, input.photo_path);
        self.check_student(&student)?;

        match self.students.insert(&student) {
            Ok(created) => {
                info!(
                    "event=student_add module=service status=ok student_id={} class_id={}",
                    created.student_id, created.class_id
                );
                Ok(created)
            }
            Err(err) => {
                warn!(
                    "event=student_add module=service status=error student_id={} error={err}",
                    student.student_id
                );
                Err(err.into())
            }
        }
    }

    /// Runs every `add_student` check without writing anything.
    ///
    /// Lets callers reject an enrollment before storing its reference photo.
    pub fn check_enrollment(&self, input: &NewStudent) -> Result<(), StudentServiceError> {
        let student = Student::new(
            input.student_id.as_str(),
            input.name.as_str(),
            input.class_id.as_str(),
            input.photo_path.as_str(),
        );
        self.check_student(&student)?;
        if self.students.get(&student.student_id)?.is_some() {
            return Err(StudentServiceError::DuplicateStudent(student.student_id));
        }
        Ok(())
    }

    pub fn get_student(&self, student_id: &str) -> RepoResult<Option<Student>> {
        self.students.get(student_id.trim())
    }

    pub fn list_students(&self) -> RepoResult<Vec<Student>> {
        self.students.list_all()
    }

    /// Returns the roster of one class.
    pub fn list_by_class(&self, class_id: &str) -> RepoResult<Vec<Student>> {
        self.students.find(&StudentQuery::in_class(class_id.trim()))
    }

    /// Merge-patches a student; `Ok(None)` when it does not exist.
    pub fn update_student(
        &self,
        student_id: &str,
        patch: &StudentPatch,
    ) -> Result<Option<Student>, StudentServiceError> {
        if patch.is_empty() {
            return Ok(self.students.get(student_id.trim())?);
        }
        if let Some(class_id) = &patch.class_id {
            self.ensure_class_exists(class_id.trim())?;
        }
        let updated = self.students.update(student_id.trim(), patch)?;
        if updated.is_some() {
            info!("event=student_update module=service status=ok student_id={student_id}");
        }
        Ok(updated)
    }

    /// Removes a student; returns whether one was removed.
    pub fn delete_student(&self, student_id: &str) -> RepoResult<bool> {
        let removed = self.students.delete(student_id.trim())?;
        info!("event=student_delete module=service status=ok student_id={student_id} removed={removed}");
        Ok(removed)
    }

    fn check_student(&self, student: &Student) -> Result<(), StudentServiceError> {
        student.validate().map_err(StudentServiceError::Invalid)?;
        self.ensure_class_exists(&student.class_id)
    }

    fn ensure_class_exists(&self, class_id: &str) -> Result<(), StudentServiceError> {
        match self.classes.get(class_id)? {
            Some(_) => Ok(()),
            None => Err(StudentServiceError::ClassNotFound(class_id.to_string())),
        }
    }
}

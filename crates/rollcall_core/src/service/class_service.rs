//! Class use-case service.
//!
//! # Invariants
//! - A class cannot be deleted while students or attendance records still
//!   reference it.

use crate::model::class::{Class, ClassPatch};
use crate::model::ModelValidationError;
use crate::repo::attendance_repo::{AttendanceQuery, AttendanceRepository};
use crate::repo::class_repo::ClassRepository;
use crate::repo::student_repo::{StudentQuery, StudentRepository};
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ClassServiceError {
    Invalid(ModelValidationError),
    /// Deletion refused because the class is still referenced.
    ClassInUse {
        class_id: String,
        students: usize,
        attendance_records: usize,
    },
    Repo(RepoError),
}

impl Display for ClassServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::ClassInUse {
                class_id,
                students,
                attendance_records,
            } => write!(
                f,
                "class {class_id} is still referenced by {students} student(s) and {attendance_records} attendance record(s)"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ClassServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ClassInUse { .. } => None,
        }
    }
}

impl From<RepoError> for ClassServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

/// Class service facade.
pub struct ClassService<C, S, A>
where
    C: ClassRepository,
    S: StudentRepository,
    A: AttendanceRepository,
{
    classes: C,
    students: S,
    attendance: A,
}

impl<C, S, A> ClassService<C, S, A>
where
    C: ClassRepository,
    S: StudentRepository,
    A: AttendanceRepository,
{
    pub fn new(classes: C, students: S, attendance: A) -> Self {
        Self {
            classes,
            students,
            attendance,
        }
    }

    /// Creates a class with a generated id.
    pub fn create_class(&self, name: &str) -> Result<Class, ClassServiceError> {
        let class = Class::new(name);
        class.validate().map_err(ClassServiceError::Invalid)?;
        let created = self.classes.insert(&class)?;
        info!("event=class_create module=service status=ok class_id={}", created.id);
        Ok(created)
    }

    pub fn get_class(&self, class_id: &str) -> RepoResult<Option<Class>> {
        self.classes.get(class_id.trim())
    }

    pub fn list_classes(&self) -> RepoResult<Vec<Class>> {
        self.classes.list_all()
    }

    pub fn update_class(
        &self,
        class_id: &str,
        patch: &ClassPatch,
    ) -> Result<Option<Class>, ClassServiceError> {
        Ok(self.classes.update(class_id.trim(), patch)?)
    }

    /// Deletes a class that nothing references any more.
    ///
    /// Returns `Ok(false)` when the class does not exist.
    ///
    /// # Errors
    /// - `ClassInUse` while enrolled students or attendance records remain.
    pub fn delete_class(&self, class_id: &str) -> Result<bool, ClassServiceError> {
        let class_id = class_id.trim();
        if self.classes.get(class_id)?.is_none() {
            return Ok(false);
        }

        let students = self.students.find(&StudentQuery::in_class(class_id))?.len();
        let attendance_records = self
            .attendance
            .find(&AttendanceQuery {
                class_id: Some(class_id.to_string()),
                ..AttendanceQuery::default()
            })?
            .len();
        if students > 0 || attendance_records > 0 {
            warn!(
                "event=class_delete module=service status=blocked class_id={class_id} students={students} attendance_records={attendance_records}"
            );
            return Err(ClassServiceError::ClassInUse {
                class_id: class_id.to_string(),
                students,
                attendance_records,
            });
        }

        let removed = self.classes.delete(class_id)?;
        info!("event=class_delete module=service status=ok class_id={class_id} removed={removed}");
        Ok(removed)
    }
}

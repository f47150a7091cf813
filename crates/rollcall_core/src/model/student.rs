//! Student record.

use super::{now_epoch_ms, require_text, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Caller-assigned student identity (e.g. a school roll number).
pub type StudentId = String;

/// Enrolled student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Unique, caller-assigned identity.
    pub student_id: StudentId,
    pub name: String,
    /// Owning class (`Class::id`).
    pub class_id: String,
    /// Opaque reference to the stored reference photo.
    pub photo_path: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds of the last merge-patch, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<i64>,
}

impl Student {
    /// Creates a student stamped with the current time.
    pub fn new(
        student_id: impl Into<String>,
        name: impl Into<String>,
        class_id: impl Into<String>,
        photo_path: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            class_id: class_id.into().trim().to_string(),
            photo_path: photo_path.into(),
            created_at: now_epoch_ms(),
            updated_at: None,
        }
    }

    /// Checks required fields before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("student", "student_id", &self.student_id)?;
        require_text("student", "name", &self.name)?;
        require_text("student", "class_id", &self.class_id)?;
        Ok(())
    }

    /// Applies a merge-patch and stamps `updated_at`.
    ///
    /// `student_id` is identity and never patched.
    pub fn apply(&mut self, patch: &StudentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(class_id) = &patch.class_id {
            self.class_id = class_id.trim().to_string();
        }
        if let Some(photo_path) = &patch.photo_path {
            self.photo_path = photo_path.clone();
        }
        self.updated_at = Some(now_epoch_ms());
    }
}

/// Merge-patch for `Student`; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub class_id: Option<String>,
    pub photo_path: Option<String>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.class_id.is_none() && self.photo_path.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{Student, StudentPatch};
    use crate::model::ModelValidationError;

    #[test]
    fn new_trims_identity_fields() {
        let student = Student::new(" S1 ", " Ada ", " C1 ", "photos/S1.jpg");
        assert_eq!(student.student_id, "S1");
        assert_eq!(student.name, "Ada");
        assert_eq!(student.class_id, "C1");
        assert!(student.updated_at.is_none());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let student = Student::new("S1", "  ", "C1", "");
        assert_eq!(
            student.validate(),
            Err(ModelValidationError::BlankField {
                entity: "student",
                field: "name",
            })
        );
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut student = Student::new("S1", "Ada", "C1", "a.jpg");
        student.apply(&StudentPatch {
            class_id: Some("C2".to_string()),
            ..StudentPatch::default()
        });
        assert_eq!(student.name, "Ada");
        assert_eq!(student.class_id, "C2");
        assert_eq!(student.photo_path, "a.jpg");
        assert!(student.updated_at.is_some());
    }
}

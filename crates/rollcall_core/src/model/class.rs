//! Class record.

use super::{now_epoch_ms, require_text, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// System-generated class identity.
pub type ClassId = String;

/// A class that students are enrolled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<i64>,
}

impl Class {
    /// Creates a class with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into().trim().to_string(),
            created_at: now_epoch_ms(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("class", "id", &self.id)?;
        require_text("class", "name", &self.name)?;
        Ok(())
    }

    /// Applies a merge-patch and stamps `updated_at`.
    pub fn apply(&mut self, patch: &ClassPatch) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        self.updated_at = Some(now_epoch_ms());
    }
}

/// Merge-patch for `Class`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPatch {
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::Class;

    #[test]
    fn new_generates_distinct_ids() {
        let first = Class::new("Physics");
        let second = Class::new("Physics");
        assert_ne!(first.id, second.id);
        assert!(first.validate().is_ok());
    }
}

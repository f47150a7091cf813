//! In-memory record store.
//!
//! # Responsibility
//! - Mirror the SQLite repositories' observable semantics without a database,
//!   for tests and embedders that do not need durability.
//!
//! # Invariants
//! - Collections are indexed by identity (attendance: by logical key).
//! - Listing order is insertion order, matching `ORDER BY rowid`.
//! - Single-threaded: repositories borrow the store and use `RefCell`.

use crate::model::attendance::{AttendanceId, AttendanceKey, AttendanceRecord, AttendanceStatus};
use crate::model::class::{Class, ClassPatch};
use crate::model::now_epoch_ms;
use crate::model::student::{Student, StudentPatch};
use crate::repo::attendance_repo::{AttendanceQuery, AttendanceRepository};
use crate::repo::class_repo::{ClassQuery, ClassRepository};
use crate::repo::student_repo::{StudentQuery, StudentRepository};
use crate::repo::{RepoError, RepoResult};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Keyed table that remembers insertion order.
#[derive(Debug)]
struct Table<K, V> {
    next_seq: u64,
    rows: BTreeMap<K, (u64, V)>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V: Clone> Table<K, V> {
    fn insert_new(&mut self, key: K, value: V) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.rows.insert(key, (seq, value));
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.rows.get(key).map(|(_, value)| value)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.rows.get_mut(key).map(|(_, value)| value)
    }

    fn ordered(&self, mut keep: impl FnMut(&V) -> bool) -> Vec<V> {
        let mut rows = self
            .rows
            .values()
            .filter(|(_, value)| keep(value))
            .collect::<Vec<_>>();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, value)| value.clone()).collect()
    }
}

/// Shared backing state for the memory repositories.
#[derive(Debug, Default)]
pub struct MemoryStore {
    students: RefCell<Table<String, Student>>,
    classes: RefCell<Table<String, Class>>,
    attendance: RefCell<Table<AttendanceKey, AttendanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn students(&self) -> MemoryStudentRepository<'_> {
        MemoryStudentRepository { store: self }
    }

    pub fn classes(&self) -> MemoryClassRepository<'_> {
        MemoryClassRepository { store: self }
    }

    pub fn attendance(&self) -> MemoryAttendanceRepository<'_> {
        MemoryAttendanceRepository { store: self }
    }
}

pub struct MemoryStudentRepository<'store> {
    store: &'store MemoryStore,
}

impl StudentRepository for MemoryStudentRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<Student>> {
        Ok(self.store.students.borrow().ordered(|_| true))
    }

    fn find(&self, query: &StudentQuery) -> RepoResult<Vec<Student>> {
        Ok(self
            .store
            .students
            .borrow()
            .ordered(|student| query.matches(student)))
    }

    fn get(&self, student_id: &str) -> RepoResult<Option<Student>> {
        Ok(self
            .store
            .students
            .borrow()
            .get(&student_id.to_string())
            .cloned())
    }

    fn insert(&self, student: &Student) -> RepoResult<Student> {
        student.validate()?;
        let mut students = self.store.students.borrow_mut();
        if students.get(&student.student_id).is_some() {
            return Err(RepoError::DuplicateKey {
                entity: "student",
                key: student.student_id.clone(),
            });
        }
        students.insert_new(student.student_id.clone(), student.clone());
        Ok(student.clone())
    }

    fn update(&self, student_id: &str, patch: &StudentPatch) -> RepoResult<Option<Student>> {
        let mut students = self.store.students.borrow_mut();
        let Some(current) = students.get_mut(&student_id.to_string()) else {
            return Ok(None);
        };
        let mut patched = current.clone();
        patched.apply(patch);
        patched.validate()?;
        *current = patched.clone();
        Ok(Some(patched))
    }

    fn delete(&self, student_id: &str) -> RepoResult<bool> {
        Ok(self
            .store
            .students
            .borrow_mut()
            .rows
            .remove(student_id)
            .is_some())
    }
}

pub struct MemoryClassRepository<'store> {
    store: &'store MemoryStore,
}

impl ClassRepository for MemoryClassRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<Class>> {
        Ok(self.store.classes.borrow().ordered(|_| true))
    }

    fn find(&self, query: &ClassQuery) -> RepoResult<Vec<Class>> {
        Ok(self
            .store
            .classes
            .borrow()
            .ordered(|class| query.matches(class)))
    }

    fn get(&self, class_id: &str) -> RepoResult<Option<Class>> {
        Ok(self
            .store
            .classes
            .borrow()
            .get(&class_id.to_string())
            .cloned())
    }

    fn insert(&self, class: &Class) -> RepoResult<Class> {
        class.validate()?;
        let mut classes = self.store.classes.borrow_mut();
        if classes.get(&class.id).is_some() {
            return Err(RepoError::DuplicateKey {
                entity: "class",
                key: class.id.clone(),
            });
        }
        classes.insert_new(class.id.clone(), class.clone());
        Ok(class.clone())
    }

    fn update(&self, class_id: &str, patch: &ClassPatch) -> RepoResult<Option<Class>> {
        let mut classes = self.store.classes.borrow_mut();
        let Some(current) = classes.get_mut(&class_id.to_string()) else {
            return Ok(None);
        };
        let mut patched = current.clone();
        patched.apply(patch);
        patched.validate()?;
        *current = patched.clone();
        Ok(Some(patched))
    }

    fn delete(&self, class_id: &str) -> RepoResult<bool> {
        Ok(self
            .store
            .classes
            .borrow_mut()
            .rows
            .remove(class_id)
            .is_some())
    }
}

pub struct MemoryAttendanceRepository<'store> {
    store: &'store MemoryStore,
}

impl AttendanceRepository for MemoryAttendanceRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<AttendanceRecord>> {
        Ok(self.store.attendance.borrow().ordered(|_| true))
    }

    fn find(&self, query: &AttendanceQuery) -> RepoResult<Vec<AttendanceRecord>> {
        Ok(self
            .store
            .attendance
            .borrow()
            .ordered(|record| query.matches(record)))
    }

    fn get(&self, key: &AttendanceKey) -> RepoResult<Option<AttendanceRecord>> {
        Ok(self.store.attendance.borrow().get(key).cloned())
    }

    fn insert(
        &self,
        key: &AttendanceKey,
        status: AttendanceStatus,
    ) -> RepoResult<AttendanceRecord> {
        key.validate()?;
        let mut attendance = self.store.attendance.borrow_mut();
        if attendance.get(key).is_some() {
            return Err(RepoError::DuplicateKey {
                entity: "attendance",
                key: key.to_string(),
            });
        }
        let record = AttendanceRecord::new(key.clone(), status);
        attendance.insert_new(key.clone(), record.clone());
        Ok(record)
    }

    fn upsert(
        &self,
        key: &AttendanceKey,
        status: AttendanceStatus,
    ) -> RepoResult<AttendanceRecord> {
        key.validate()?;
        let mut attendance = self.store.attendance.borrow_mut();
        if let Some(existing) = attendance.get_mut(key) {
            existing.status = status;
            existing.updated_at = Some(now_epoch_ms());
            return Ok(existing.clone());
        }
        let record = AttendanceRecord::new(key.clone(), status);
        attendance.insert_new(key.clone(), record.clone());
        Ok(record)
    }

    fn delete(&self, id: AttendanceId) -> RepoResult<bool> {
        let mut attendance = self.store.attendance.borrow_mut();
        let key = attendance
            .rows
            .values()
            .find(|(_, record)| record.id == id)
            .map(|(_, record)| record.key());
        Ok(match key {
            Some(key) => attendance.rows.remove(&key).is_some(),
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::model::attendance::{AttendanceKey, AttendanceStatus};
    use crate::model::student::Student;
    use crate::repo::attendance_repo::AttendanceRepository;
    use crate::repo::student_repo::StudentRepository;
    use chrono::NaiveDate;

    #[test]
    fn list_all_preserves_insertion_order() {
        let store = MemoryStore::new();
        let students = store.students();
        for id in ["S3", "S1", "S2"] {
            students.insert(&Student::new(id, "n", "C1", "")).unwrap();
        }
        let ids = students
            .list_all()
            .unwrap()
            .into_iter()
            .map(|student| student.student_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, ["S3", "S1", "S2"]);
    }

    #[test]
    fn upsert_keeps_identity_of_existing_record() {
        let store = MemoryStore::new();
        let repo = store.attendance();
        let key = AttendanceKey::new("S1", "C1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let first = repo.upsert(&key, AttendanceStatus::Absent).unwrap();
        let second = repo.upsert(&key, AttendanceStatus::Present).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at.is_some());
        assert_eq!(repo.list_all().unwrap().len(), 1);
    }

    #[test]
    fn delete_by_id_reports_whether_removed() {
        let store = MemoryStore::new();
        let repo = store.attendance();
        let key = AttendanceKey::new("S1", "C1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let record = repo.upsert(&key, AttendanceStatus::Present).unwrap();

        assert!(repo.delete(record.id).unwrap());
        assert!(!repo.delete(record.id).unwrap());
        assert!(repo.get(&key).unwrap().is_none());
    }
}

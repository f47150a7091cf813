//! Student collection contract and SQLite implementation.

use crate::model::student::{Student, StudentPatch};
use crate::repo::{map_insert_error, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const STUDENT_SELECT_SQL: &str = "SELECT
    student_id,
    name,
    class_id,
    photo_path,
    created_at,
    updated_at
FROM students";

/// Field-equality filter for `StudentRepository::find`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentQuery {
    pub class_id: Option<String>,
}

impl StudentQuery {
    /// Roster filter for one class.
    pub fn in_class(class_id: impl Into<String>) -> Self {
        Self {
            class_id: Some(class_id.into()),
        }
    }

    pub fn matches(&self, student: &Student) -> bool {
        self.class_id
            .as_deref()
            .map_or(true, |class_id| student.class_id == class_id)
    }
}

/// Persistence contract for students.
pub trait StudentRepository {
    /// Returns every student in insertion order.
    fn list_all(&self) -> RepoResult<Vec<Student>>;
    /// Returns students matching every set field of `query`, in insertion order.
    fn find(&self, query: &StudentQuery) -> RepoResult<Vec<Student>>;
    fn get(&self, student_id: &str) -> RepoResult<Option<Student>>;
    /// Fails with `DuplicateKey` when `student_id` is already taken.
    fn insert(&self, student: &Student) -> RepoResult<Student>;
    /// Merge-patches one student; `None` when it does not exist.
    fn update(&self, student_id: &str, patch: &StudentPatch) -> RepoResult<Option<Student>>;
    /// Returns whether a student was actually removed.
    fn delete(&self, student_id: &str) -> RepoResult<bool>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<Student>> {
        self.find(&StudentQuery::default())
    }

    fn find(&self, query: &StudentQuery) -> RepoResult<Vec<Student>> {
        let mut sql = format!("{STUDENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(class_id) = &query.class_id {
            sql.push_str(" AND class_id = ?");
            bind_values.push(Value::Text(class_id.clone()));
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn get(&self, student_id: &str) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE student_id = ?1;"))?;
        let mut rows = stmt.query([student_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_student_row(row)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, student: &Student) -> RepoResult<Student> {
        student.validate()?;

        self.conn
            .execute(
                "INSERT INTO students (
                    student_id,
                    name,
                    class_id,
                    photo_path,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    student.student_id.as_str(),
                    student.name.as_str(),
                    student.class_id.as_str(),
                    student.photo_path.as_str(),
                    student.created_at,
                    student.updated_at,
                ],
            )
            .map_err(|err| map_insert_error(err, "student", || student.student_id.clone()))?;

        Ok(student.clone())
    }

    fn update(&self, student_id: &str, patch: &StudentPatch) -> RepoResult<Option<Student>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(mut student) = self.get(student_id)? else {
            return Ok(None);
        };
        student.apply(patch);
        student.validate()?;

        tx.execute(
            "UPDATE students
             SET
                name = ?2,
                class_id = ?3,
                photo_path = ?4,
                updated_at = ?5
             WHERE student_id = ?1;",
            params![
                student.student_id.as_str(),
                student.name.as_str(),
                student.class_id.as_str(),
                student.photo_path.as_str(),
                student.updated_at,
            ],
        )?;
        tx.commit()?;

        Ok(Some(student))
    }

    fn delete(&self, student_id: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE student_id = ?1;", [student_id])?;
        Ok(changed > 0)
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let student = Student {
        student_id: row.get("student_id")?,
        name: row.get("name")?,
        class_id: row.get("class_id")?,
        photo_path: row.get("photo_path")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    student.validate()?;
    Ok(student)
}

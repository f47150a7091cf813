//! Attendance collection contract and SQLite implementation.
//!
//! # Invariants
//! - `UNIQUE(student_id, class_id, date)` backs the logical key; `upsert` is a
//!   single `INSERT .. ON CONFLICT DO UPDATE` so concurrent writers for the
//!   same key can never produce two rows.
//! - `upsert` keeps the original `id` and `created_at` of an existing record.

use crate::model::attendance::{AttendanceId, AttendanceKey, AttendanceRecord, AttendanceStatus};
use crate::model::now_epoch_ms;
use crate::repo::{bool_to_int, date_to_db, map_insert_error, parse_db_date, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const ATTENDANCE_SELECT_SQL: &str = "SELECT
    id,
    student_id,
    class_id,
    date,
    status,
    created_at,
    updated_at
FROM attendance";

/// Field-equality filter for `AttendanceRepository::find`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceQuery {
    pub student_id: Option<String>,
    pub class_id: Option<String>,
    pub date: Option<NaiveDate>,
}

impl AttendanceQuery {
    /// All records of one class on one date.
    pub fn class_on(class_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            class_id: Some(class_id.into()),
            date: Some(date),
            ..Self::default()
        }
    }

    /// Full history of one student.
    pub fn for_student(student_id: impl Into<String>) -> Self {
        Self {
            student_id: Some(student_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.student_id
            .as_deref()
            .map_or(true, |value| record.student_id == value)
            && self
                .class_id
                .as_deref()
                .map_or(true, |value| record.class_id == value)
            && self.date.map_or(true, |value| record.date == value)
    }
}

/// Persistence contract for attendance records.
pub trait AttendanceRepository {
    /// Returns every record in insertion order.
    fn list_all(&self) -> RepoResult<Vec<AttendanceRecord>>;
    fn find(&self, query: &AttendanceQuery) -> RepoResult<Vec<AttendanceRecord>>;
    fn get(&self, key: &AttendanceKey) -> RepoResult<Option<AttendanceRecord>>;
    /// Create-only path; fails with `DuplicateKey` when `key` already has a record.
    fn insert(&self, key: &AttendanceKey, status: AttendanceStatus)
        -> RepoResult<AttendanceRecord>;
    /// Sets `status` on the record for `key`, creating it when missing.
    ///
    /// Existing records keep `id`/`created_at` and get a fresh `updated_at`.
    fn upsert(&self, key: &AttendanceKey, status: AttendanceStatus)
        -> RepoResult<AttendanceRecord>;
    /// Removes one record by physical id.
    fn delete(&self, id: AttendanceId) -> RepoResult<bool>;
}

/// SQLite-backed attendance repository.
pub struct SqliteAttendanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendanceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AttendanceRepository for SqliteAttendanceRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<AttendanceRecord>> {
        self.find(&AttendanceQuery::default())
    }

    fn find(&self, query: &AttendanceQuery) -> RepoResult<Vec<AttendanceRecord>> {
        let mut sql = format!("{ATTENDANCE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(student_id) = &query.student_id {
            sql.push_str(" AND student_id = ?");
            bind_values.push(Value::Text(student_id.clone()));
        }
        if let Some(class_id) = &query.class_id {
            sql.push_str(" AND class_id = ?");
            bind_values.push(Value::Text(class_id.clone()));
        }
        if let Some(date) = query.date {
            sql.push_str(" AND date = ?");
            bind_values.push(Value::Text(date_to_db(date)));
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_attendance_row(row)?);
        }
        Ok(records)
    }

    fn get(&self, key: &AttendanceKey) -> RepoResult<Option<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTENDANCE_SELECT_SQL}
             WHERE student_id = ?1
               AND class_id = ?2
               AND date = ?3;"
        ))?;
        let mut rows = stmt.query(params![
            key.student_id.as_str(),
            key.class_id.as_str(),
            date_to_db(key.date),
        ])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_attendance_row(row)?)),
            None => Ok(None),
        }
    }

    fn insert(
        &self,
        key: &AttendanceKey,
        status: AttendanceStatus,
    ) -> RepoResult<AttendanceRecord> {
        key.validate()?;
        let record = AttendanceRecord::new(key.clone(), status);

        self.conn
            .execute(
                "INSERT INTO attendance (
                    id,
                    student_id,
                    class_id,
                    date,
                    status,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL);",
                params![
                    record.id.to_string(),
                    record.student_id.as_str(),
                    record.class_id.as_str(),
                    date_to_db(record.date),
                    bool_to_int(status.is_present()),
                    record.created_at,
                ],
            )
            .map_err(|err| map_insert_error(err, "attendance", || key.to_string()))?;

        Ok(record)
    }

    fn upsert(
        &self,
        key: &AttendanceKey,
        status: AttendanceStatus,
    ) -> RepoResult<AttendanceRecord> {
        key.validate()?;
        let now = now_epoch_ms();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO attendance (
                id,
                student_id,
                class_id,
                date,
                status,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)
            ON CONFLICT (student_id, class_id, date) DO UPDATE
            SET
                status = excluded.status,
                updated_at = ?6;",
            params![
                Uuid::new_v4().to_string(),
                key.student_id.as_str(),
                key.class_id.as_str(),
                date_to_db(key.date),
                bool_to_int(status.is_present()),
                now,
            ],
        )?;
        let record = self.get(key)?.ok_or_else(|| {
            RepoError::InvalidData(format!("attendance {key} missing after upsert"))
        })?;
        tx.commit()?;

        Ok(record)
    }

    fn delete(&self, id: AttendanceId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM attendance WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }
}

fn parse_attendance_row(row: &Row<'_>) -> RepoResult<AttendanceRecord> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in attendance.id"))
    })?;

    let date_text: String = row.get("date")?;
    let date = parse_db_date(&date_text, "attendance.date")?;

    let status = match row.get::<_, i64>("status")? {
        0 => AttendanceStatus::Absent,
        1 => AttendanceStatus::Present,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid status value `{other}` in attendance.status"
            )));
        }
    };

    Ok(AttendanceRecord {
        id,
        student_id: row.get("student_id")?,
        class_id: row.get("class_id")?,
        date,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

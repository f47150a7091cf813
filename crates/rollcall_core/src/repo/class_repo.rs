//! Class collection contract and SQLite implementation.

use crate::model::class::{Class, ClassPatch};
use crate::repo::{map_insert_error, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const CLASS_SELECT_SQL: &str = "SELECT id, name, created_at, updated_at FROM classes";

/// Field-equality filter for `ClassRepository::find`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassQuery {
    pub name: Option<String>,
}

impl ClassQuery {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, class: &Class) -> bool {
        self.name.as_deref().map_or(true, |name| class.name == name)
    }
}

/// Persistence contract for classes.
pub trait ClassRepository {
    /// Returns every class in insertion order.
    fn list_all(&self) -> RepoResult<Vec<Class>>;
    /// Returns classes matching every set field of `query`, in insertion order.
    fn find(&self, query: &ClassQuery) -> RepoResult<Vec<Class>>;
    fn get(&self, class_id: &str) -> RepoResult<Option<Class>>;
    fn insert(&self, class: &Class) -> RepoResult<Class>;
    fn update(&self, class_id: &str, patch: &ClassPatch) -> RepoResult<Option<Class>>;
    fn delete(&self, class_id: &str) -> RepoResult<bool>;
}

/// SQLite-backed class repository.
pub struct SqliteClassRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteClassRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ClassRepository for SqliteClassRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<Class>> {
        self.find(&ClassQuery::default())
    }

    fn find(&self, query: &ClassQuery) -> RepoResult<Vec<Class>> {
        let mut sql = format!("{CLASS_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = &query.name {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut classes = Vec::new();
        while let Some(row) = rows.next()? {
            classes.push(parse_class_row(row)?);
        }
        Ok(classes)
    }

    fn get(&self, class_id: &str) -> RepoResult<Option<Class>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CLASS_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([class_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_class_row(row)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, class: &Class) -> RepoResult<Class> {
        class.validate()?;

        self.conn
            .execute(
                "INSERT INTO classes (id, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    class.id.as_str(),
                    class.name.as_str(),
                    class.created_at,
                    class.updated_at,
                ],
            )
            .map_err(|err| map_insert_error(err, "class", || class.id.clone()))?;

        Ok(class.clone())
    }

    fn update(&self, class_id: &str, patch: &ClassPatch) -> RepoResult<Option<Class>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(mut class) = self.get(class_id)? else {
            return Ok(None);
        };
        class.apply(patch);
        class.validate()?;

        tx.execute(
            "UPDATE classes SET name = ?2, updated_at = ?3 WHERE id = ?1;",
            params![class.id.as_str(), class.name.as_str(), class.updated_at],
        )?;
        tx.commit()?;

        Ok(Some(class))
    }

    fn delete(&self, class_id: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM classes WHERE id = ?1;", [class_id])?;
        Ok(changed > 0)
    }
}

fn parse_class_row(row: &Row<'_>) -> RepoResult<Class> {
    let class = Class {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    class.validate()?;
    Ok(class)
}

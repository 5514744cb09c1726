// SQLite implementation of the SchoolStore trait

use crate::core::schools::{School, SchoolError, SchoolStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

pub struct SqliteSchoolStore {
    pool: SqlitePool,
}

fn storage(e: sqlx::Error) -> SchoolError {
    SchoolError::StorageError(e.to_string())
}

fn school_from_row(row: &SqliteRow) -> School {
    let created: String = row.get("created");
    School {
        id: row.get("id"),
        name: row.get("name"),
        student_limit: u32::try_from(row.get::<i64, _>("student_limit")).unwrap_or(0),
        created: DateTime::parse_from_rfc3339(&created)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}

impl SqliteSchoolStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), SchoolError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schools (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                student_limit INTEGER NOT NULL DEFAULT 0,
                created TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl SchoolStore for SqliteSchoolStore {
    async fn create_school(&self, name: &str, student_limit: u32) -> Result<School, SchoolError> {
        let created = Utc::now();
        let done = sqlx::query(
            "INSERT INTO schools (name, student_limit, created) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(i64::from(student_limit))
        .bind(created.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(School {
            id: done.last_insert_rowid(),
            name: name.to_string(),
            student_limit,
            created,
        })
    }

    async fn get_school(&self, school_id: i64) -> Result<Option<School>, SchoolError> {
        let row = sqlx::query("SELECT * FROM schools WHERE id = ?")
            .bind(school_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.as_ref().map(school_from_row))
    }

    async fn list_schools(&self) -> Result<Vec<School>, SchoolError> {
        let rows = sqlx::query("SELECT * FROM schools ORDER BY created DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.iter().map(school_from_row).collect())
    }

    async fn delete_school(&self, school_id: i64) -> Result<(), SchoolError> {
        sqlx::query("DELETE FROM schools WHERE id = ?")
            .bind(school_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::database::memory_pool;

    #[tokio::test]
    async fn test_school_lifecycle() {
        let store = SqliteSchoolStore::new(memory_pool().await);
        store.migrate().await.unwrap();

        let first = store.create_school("Liceum nr 1", 30).await.unwrap();
        let second = store.create_school("Technikum", 0).await.unwrap();

        let loaded = store.get_school(first.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Liceum nr 1");
        assert_eq!(loaded.student_limit, 30);

        let ids: Vec<i64> = store
            .list_schools()
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);

        store.delete_school(first.id).await.unwrap();
        assert!(store.get_school(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = SqliteSchoolStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store.create_school("Liceum", 5).await.unwrap();
        store.migrate().await.unwrap();
        assert_eq!(store.list_schools().await.unwrap().len(), 1);
    }
}

// SQLite implementation of the AccountStore trait

use crate::core::accounts::{AccountError, AccountStore, NewUser, Role, User};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

pub struct SqliteAccountStore {
    pool: SqlitePool,
}

fn storage(e: sqlx::Error) -> AccountError {
    AccountError::StorageError(e.to_string())
}

impl SqliteAccountStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run database migrations to create the users table.
    pub async fn migrate(&self) -> Result<(), AccountError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                role TEXT NOT NULL,
                school_id INTEGER,
                created TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_school
                ON users(school_id, role);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    fn user_from_row(row: &SqliteRow) -> Result<User, AccountError> {
        let role: String = row.get("role");
        let created: String = row.get("created");
        Ok(User {
            id: row.get("id"),
            username: row.get("username"),
            password_hash: row.get("password"),
            role: role.parse::<Role>().map_err(AccountError::StorageError)?,
            school_id: row.get("school_id"),
            created: DateTime::parse_from_rfc3339(&created)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AccountError> {
        let created = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password, role, school_id, created)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.school_id)
        .bind(created.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(User {
                id: done.last_insert_rowid(),
                username: user.username,
                password_hash: user.password_hash,
                role: user.role,
                school_id: user.school_id,
                created,
            }),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AccountError::UsernameTaken(user.username))
            }
            Err(e) => Err(storage(e)),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AccountError> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AccountError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn update_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), AccountError> {
        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), AccountError> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn list_students(&self, school_id: i64) -> Result<Vec<User>, AccountError> {
        let rows = sqlx::query(
            "SELECT * FROM users WHERE school_id = ? AND role = 'student' ORDER BY id",
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.iter().map(Self::user_from_row).collect()
    }

    async fn count_students(&self, school_id: i64) -> Result<u64, AccountError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM users WHERE school_id = ? AND role = 'student'",
        )
        .bind(school_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.get::<i64, _>("n") as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::database::memory_pool;

    async fn store() -> SqliteAccountStore {
        let store = SqliteAccountStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    fn new_user(name: &str, role: Role, school_id: Option<i64>) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "sha256$1$AAAA$AAAA".to_string(),
            role,
            school_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = store().await;
        let user = store
            .create_user(new_user("ala", Role::Teacher, Some(4)))
            .await
            .unwrap();

        let by_name = store.find_by_username("ala").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_name.role, Role::Teacher);
        assert_eq!(by_name.school_id, Some(4));
        assert_eq!(by_name.password_hash, "sha256$1$AAAA$AAAA");

        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "ala");
        assert!(store.find_by_username("ola").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_username() {
        let store = store().await;
        store.create_user(new_user("ala", Role::User, None)).await.unwrap();
        assert!(matches!(
            store.create_user(new_user("ala", Role::User, None)).await,
            Err(AccountError::UsernameTaken(name)) if name == "ala"
        ));
    }

    #[tokio::test]
    async fn test_password_update_and_delete() {
        let store = store().await;
        let user = store.create_user(new_user("ala", Role::User, None)).await.unwrap();
        store.update_password(user.id, "new-hash").await.unwrap();
        assert_eq!(
            store.find_by_id(user.id).await.unwrap().unwrap().password_hash,
            "new-hash"
        );

        store.delete_user(user.id).await.unwrap();
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_students_of_school() {
        let store = store().await;
        store.create_user(new_user("pani", Role::Teacher, Some(1))).await.unwrap();
        store.create_user(new_user("jas", Role::Student, Some(1))).await.unwrap();
        store.create_user(new_user("ola", Role::Student, Some(1))).await.unwrap();
        store.create_user(new_user("obcy", Role::Student, Some(2))).await.unwrap();

        let students = store.list_students(1).await.unwrap();
        let names: Vec<&str> = students.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["jas", "ola"]);
        assert_eq!(store.count_students(1).await.unwrap(), 2);
        assert_eq!(store.count_students(3).await.unwrap(), 0);
    }
}

// Shared SQLite pool for all stores.
//
// Every table lives in one database file so thread listings can join
// author names from the users table.

use super::accounts::SqliteAccountStore;
use super::forum::SqliteForumStore;
use super::schools::SqliteSchoolStore;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Open (and create if missing) the database at `database_path`.
///
/// Accepts a plain file path, a `sqlite:` URL or `:memory:`.
pub async fn connect(database_path: &str) -> anyhow::Result<SqlitePool> {
    let conn_str = if database_path.starts_with("sqlite:") {
        database_path.to_string()
    } else if database_path == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        format!("sqlite://{}?mode=rwc", database_path)
    };

    // An in-memory database exists per connection, so keep exactly one.
    let max_connections = if conn_str.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&conn_str)
        .await?;

    tracing::debug!(database = %conn_str, "Connected to SQLite");
    Ok(pool)
}

/// Run every store's migrations against `pool`.
pub async fn migrate_all(pool: &SqlitePool) -> anyhow::Result<()> {
    SqliteAccountStore::new(pool.clone()).migrate().await?;
    SqliteSchoolStore::new(pool.clone()).migrate().await?;
    SqliteForumStore::new(pool.clone()).migrate().await?;
    Ok(())
}

#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory SQLite")
}

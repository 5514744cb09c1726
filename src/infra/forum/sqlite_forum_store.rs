// SQLite implementation of the ForumStore trait
//
// Threads and posts keep a nullable user_id; the author name is joined
// from the users table on every read, so a deleted account shows up as
// anonymous.

use crate::core::forum::{ForumError, ForumStore, NewPost, NewThread, Post, Thread, ThreadScope};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

const THREAD_COLUMNS: &str = r#"
    SELECT th.id, th.title, th.content, th.user_id, th.school_id, th.created,
           u.username AS author
    FROM threads th
    LEFT JOIN users u ON u.id = th.user_id
"#;

const POST_COLUMNS: &str = r#"
    SELECT p.id, p.thread_id, p.content, p.user_id, p.created,
           u.username AS author
    FROM posts p
    LEFT JOIN users u ON u.id = p.user_id
"#;

pub struct SqliteForumStore {
    pool: SqlitePool,
}

fn storage(e: sqlx::Error) -> ForumError {
    ForumError::StorageError(e.to_string())
}

fn timestamp(created: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(created)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn thread_from_row(row: &SqliteRow) -> Thread {
    Thread {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        user_id: row.get("user_id"),
        school_id: row.get("school_id"),
        created: timestamp(&row.get::<String, _>("created")),
        author: row.get("author"),
    }
}

fn post_from_row(row: &SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        thread_id: row.get("thread_id"),
        content: row.get("content"),
        user_id: row.get("user_id"),
        created: timestamp(&row.get::<String, _>("created")),
        author: row.get("author"),
    }
}

/// `%needle%` with LIKE wildcards in the needle matched literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl SqliteForumStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the threads and posts tables.
    pub async fn migrate(&self) -> Result<(), ForumError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS threads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                user_id INTEGER,
                school_id INTEGER,
                created TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_threads_school
                ON threads(school_id, created);
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                user_id INTEGER,
                created TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posts_thread
                ON posts(thread_id, created);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl ForumStore for SqliteForumStore {
    async fn create_thread(&self, thread: NewThread) -> Result<Thread, ForumError> {
        let done = sqlx::query(
            r#"
            INSERT INTO threads (title, content, user_id, school_id, created)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&thread.title)
        .bind(&thread.content)
        .bind(thread.user_id)
        .bind(thread.school_id)
        .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        self.get_thread(done.last_insert_rowid())
            .await?
            .ok_or(ForumError::NotFound)
    }

    async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>, ForumError> {
        let sql = format!("{THREAD_COLUMNS} WHERE th.id = ?");
        let row = sqlx::query(&sql)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.as_ref().map(thread_from_row))
    }

    async fn list_threads(
        &self,
        scope: ThreadScope,
        query: Option<&str>,
    ) -> Result<Vec<Thread>, ForumError> {
        let mut sql = String::from(THREAD_COLUMNS);
        match scope {
            ThreadScope::Public => sql.push_str(" WHERE th.school_id IS NULL"),
            ThreadScope::School(_) => sql.push_str(" WHERE th.school_id = ?"),
        }
        if query.is_some() {
            sql.push_str(
                r" AND (th.title LIKE ? ESCAPE '\' OR th.content LIKE ? ESCAPE '\')",
            );
        }
        sql.push_str(" ORDER BY th.created DESC, th.id DESC");

        let mut q = sqlx::query(&sql);
        if let ThreadScope::School(school_id) = scope {
            q = q.bind(school_id);
        }
        if let Some(needle) = query {
            let pattern = like_pattern(needle);
            q = q.bind(pattern.clone()).bind(pattern);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(storage)?;
        Ok(rows.iter().map(thread_from_row).collect())
    }

    async fn update_thread(
        &self,
        thread_id: i64,
        title: &str,
        content: &str,
    ) -> Result<(), ForumError> {
        sqlx::query("UPDATE threads SET title = ?, content = ? WHERE id = ?")
            .bind(title)
            .bind(content)
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn delete_thread(&self, thread_id: i64) -> Result<(), ForumError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query("DELETE FROM posts WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, ForumError> {
        let done = sqlx::query(
            "INSERT INTO posts (thread_id, content, user_id, created) VALUES (?, ?, ?, ?)",
        )
        .bind(post.thread_id)
        .bind(&post.content)
        .bind(post.user_id)
        .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        self.get_post(done.last_insert_rowid())
            .await?
            .ok_or(ForumError::NotFound)
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<Post>, ForumError> {
        let sql = format!("{POST_COLUMNS} WHERE p.id = ?");
        let row = sqlx::query(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.as_ref().map(post_from_row))
    }

    async fn list_posts(&self, thread_id: i64) -> Result<Vec<Post>, ForumError> {
        let sql = format!("{POST_COLUMNS} WHERE p.thread_id = ? ORDER BY p.created, p.id");
        let rows = sqlx::query(&sql)
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn update_post(&self, post_id: i64, content: &str) -> Result<(), ForumError> {
        sqlx::query("UPDATE posts SET content = ? WHERE id = ?")
            .bind(content)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn delete_post(&self, post_id: i64) -> Result<(), ForumError> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

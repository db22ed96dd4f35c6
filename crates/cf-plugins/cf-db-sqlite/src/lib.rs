//! # cf-db-sqlite Implementation
//!
//! A document store on top of SQLite. Each aggregate is kept as one JSON
//! document; the fields that need uniqueness or lookups are mirrored into
//! indexed columns, and a `version` column backs optimistic concurrency.

use std::str::FromStr;

use async_trait::async_trait;
use cf_core::error::{AppError, Result};
use cf_core::models::{Post, PostId, User, UserId};
use cf_core::traits::{PostRepo, UserRepo};
use chrono::SecondsFormat;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE,
    email        TEXT NOT NULL UNIQUE,
    desired_name TEXT UNIQUE,
    version      INTEGER NOT NULL,
    doc          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    id         TEXT PRIMARY KEY,
    poster_id  TEXT NOT NULL,
    created_at TEXT NOT NULL,
    version    INTEGER NOT NULL,
    doc        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS posts_by_poster ON posts (poster_id, created_at);
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

// Maps driver failures onto the domain taxonomy
fn db_err(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(db.message().to_string()),
        _ => AppError::Internal(err.to_string()),
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let mut user: User = serde_json::from_str(&row.get::<String, _>("doc"))?;
    user.version = row.get::<i64, _>("version") as u64;
    Ok(user)
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let mut post: Post = serde_json::from_str(&row.get::<String, _>("doc"))?;
    post.version = row.get::<i64, _>("version") as u64;
    Ok(post)
}

/// Every in-memory connection is its own database, so a memory URL gets
/// exactly one connection that is never reaped or recycled.
fn pool_options(url: &str) -> SqlitePoolOptions {
    if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    }
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = pool_options(url).connect_with(options).await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        tracing::info!(url, "sqlite document store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc, version FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc, version FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        sqlx::query("SELECT doc, version FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(user_from_row)
            .collect()
    }

    async fn insert_user(&self, mut user: User) -> Result<User> {
        user.version = 1;
        sqlx::query("INSERT INTO users (id, name, email, desired_name, version, doc) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(user.id.to_string())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.desired_name)
            .bind(user.version as i64)
            .bind(serde_json::to_string(&user)?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(user)
    }

    /// All documents are written in one transaction.
    ///
    /// # Developer Note
    /// The `version = ?` guard makes a stale write touch zero rows; the
    /// transaction is dropped (rolled back) on the first failing document so
    /// a pair is never half-saved.
    async fn save_users(&self, docs: Vec<User>) -> Result<Vec<User>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut saved = Vec::with_capacity(docs.len());

        for mut doc in docs {
            let expected = doc.version as i64;
            doc.version += 1;

            let result = sqlx::query(
                "UPDATE users SET name = ?, email = ?, desired_name = ?, version = ?, doc = ? WHERE id = ? AND version = ?",
            )
            .bind(&doc.name)
            .bind(&doc.email)
            .bind(&doc.desired_name)
            .bind(doc.version as i64)
            .bind(serde_json::to_string(&doc)?)
            .bind(doc.id.to_string())
            .bind(expected)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if result.rows_affected() == 0 {
                let exists = sqlx::query("SELECT 1 FROM users WHERE id = ?")
                    .bind(doc.id.to_string())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_err)?
                    .is_some();
                return Err(if exists {
                    AppError::VersionConflict(doc.id.to_string())
                } else {
                    AppError::not_found("User", doc.id)
                });
            }
            saved.push(doc);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(saved)
    }
}

#[async_trait]
impl PostRepo for SqliteStore {
    async fn find_post(&self, id: PostId) -> Result<Option<Post>> {
        let row = sqlx::query("SELECT doc, version FROM posts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(post_from_row).transpose()
    }

    async fn insert_post(&self, mut post: Post) -> Result<Post> {
        post.version = 1;
        sqlx::query("INSERT INTO posts (id, poster_id, created_at, version, doc) VALUES (?, ?, ?, ?, ?)")
            .bind(post.id.to_string())
            .bind(post.poster.id.to_string())
            .bind(post.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
            .bind(post.version as i64)
            .bind(serde_json::to_string(&post)?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(post)
    }

    async fn save_post(&self, mut post: Post) -> Result<Post> {
        let expected = post.version as i64;
        post.version += 1;

        let result = sqlx::query("UPDATE posts SET version = ?, doc = ? WHERE id = ? AND version = ?")
            .bind(post.version as i64)
            .bind(serde_json::to_string(&post)?)
            .bind(post.id.to_string())
            .bind(expected)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(match self.find_post(post.id).await? {
                Some(_) => AppError::VersionConflict(post.id.to_string()),
                None => AppError::not_found("Post", post.id),
            });
        }
        Ok(post)
    }

    async fn posts_by(&self, posters: &[UserId]) -> Result<Vec<Post>> {
        if posters.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT doc, version FROM posts WHERE poster_id IN (");
        let mut ids = query.separated(", ");
        for id in posters {
            ids.push_bind(id.to_string());
        }
        ids.push_unseparated(") ORDER BY created_at DESC");

        query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(post_from_row)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_pool_keeps_its_only_connection() {
        let memory = pool_options("sqlite::memory:");
        assert_eq!(memory.get_max_connections(), 1);
        assert_eq!(memory.get_min_connections(), 1);
        assert!(memory.get_idle_timeout().is_none());
        assert!(memory.get_max_lifetime().is_none());

        let file = pool_options("sqlite://connectify.db");
        assert_eq!(file.get_max_connections(), 8);
        assert!(file.get_idle_timeout().is_some());
    }

    fn user(name: &str) -> User {
        User::new(name.to_string(), format!("{name}@example.com"), "hash".into())
    }

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        let alice = store.insert_user(user("alice")).await.unwrap();

        let found = store.find_user(alice.id).await.unwrap().expect("user exists");
        assert_eq!(found, alice);
        let by_email = store.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(alice.id));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_a_conflict() {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        store.insert_user(user("alice")).await.unwrap();

        let mut twin = user("alice");
        twin.email = "other@example.com".into();
        let err = store.insert_user(twin).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_pair_save_is_atomic() {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        let a = store.insert_user(user("alice")).await.unwrap();
        let b = store.insert_user(user("bobby")).await.unwrap();
        store.save_users(vec![b.clone()]).await.unwrap();

        let mut a_edit = a.clone();
        a_edit.hobbies.push("chess".into());
        let err = store.save_users(vec![a_edit, b]).await.unwrap_err();
        assert!(matches!(err, AppError::VersionConflict(_)));

        let stored = store.find_user(a.id).await.unwrap().unwrap();
        assert!(stored.hobbies.is_empty());
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_posts_by_poster_newest_first() {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        let alice = user("alice").stub();
        let bobby = user("bobby").stub();

        let first = store.insert_post(Post::new(alice.clone(), "first".into(), None)).await.unwrap();
        let second = store.insert_post(Post::new(alice.clone(), "second".into(), None)).await.unwrap();
        store.insert_post(Post::new(bobby, "not mine".into(), None)).await.unwrap();

        let posts = store.posts_by(&[alice.id]).await.unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}

//! Metadata store trait and the SQLite implementation.

use crate::error::MetadataResult;
use crate::repos::{InviteQueueRepo, ResponseCacheRepo, UserProfileRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore:
    ResponseCacheRepo + InviteQueueRepo + UserProfileRepo + Send + Sync
{
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path`.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Several processes may poll the same queue file.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // A single writer connection avoids "database is locked" churn
            // between the dispatcher and request handlers.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        Self::from_pool(pool).await
    }

    /// Open a private in-memory database (tests and throwaway runs).
    pub async fn in_memory() -> MetadataResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            // The database lives only as long as its one connection.
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: Pool<Sqlite>) -> MetadataResult<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::{PendingInviteRow, UserProfileRow};
    use herald_core::{NewInvite, PendingInvite};
    use time::OffsetDateTime;

    #[async_trait]
    impl ResponseCacheRepo for SqliteStore {
        async fn get_cached_response(&self, key: &str) -> MetadataResult<Option<Vec<u8>>> {
            let body = sqlx::query_scalar::<_, Vec<u8>>(
                "SELECT body FROM response_cache WHERE cache_key = ?",
            )
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
            Ok(body)
        }

        async fn put_cached_response(&self, key: &str, body: &[u8]) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO response_cache (cache_key, body, created_at)
                VALUES (?, ?, ?)
                ON CONFLICT(cache_key) DO UPDATE SET
                    body = excluded.body,
                    created_at = excluded.created_at
                "#,
            )
            .bind(key)
            .bind(body)
            .bind(OffsetDateTime::now_utc())
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }

    #[async_trait]
    impl InviteQueueRepo for SqliteStore {
        async fn enqueue_invite(&self, invite: &NewInvite) -> MetadataResult<i64> {
            invite.validate()?;
            let invite_id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO pending_invites (
                    repo_name, repo_url, inviter, invitee, group_id, created_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                RETURNING invite_id
                "#,
            )
            .bind(&invite.repo_name)
            .bind(&invite.repo_url)
            .bind(&invite.inviter)
            .bind(&invite.invitee)
            .bind(&invite.group_id)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&self.pool)
            .await?;
            Ok(invite_id)
        }

        async fn dequeue_invite(&self) -> MetadataResult<Option<PendingInvite>> {
            // One statement: SQLite holds the write lock across the subquery
            // and the delete, so two callers can never claim the same row.
            let row = sqlx::query_as::<_, PendingInviteRow>(
                r#"
                DELETE FROM pending_invites
                WHERE invite_id = (
                    SELECT invite_id FROM pending_invites
                    ORDER BY invite_id ASC
                    LIMIT 1
                )
                RETURNING invite_id, repo_name, repo_url, inviter, invitee, group_id, created_at
                "#,
            )
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.map(PendingInvite::from))
        }

        async fn count_pending_invites(&self) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_invites")
                .fetch_one(&self.pool)
                .await?;
            Ok(u64::try_from(count).unwrap_or(0))
        }
    }

    #[async_trait]
    impl UserProfileRepo for SqliteStore {
        async fn get_user_profile(&self, handle: &str) -> MetadataResult<Option<UserProfileRow>> {
            let row =
                sqlx::query_as::<_, UserProfileRow>("SELECT * FROM user_profiles WHERE handle = ?")
                    .bind(handle)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn put_user_profile(&self, profile: &UserProfileRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO user_profiles (handle, email, display_name, fetched_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(handle) DO UPDATE SET
                    email = excluded.email,
                    display_name = excluded.display_name,
                    fetched_at = excluded.fetched_at
                "#,
            )
            .bind(&profile.handle)
            .bind(&profile.email)
            .bind(&profile.display_name)
            .bind(profile.fetched_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn delete_user_profile(&self, handle: &str) -> MetadataResult<bool> {
            let result = sqlx::query("DELETE FROM user_profiles WHERE handle = ?")
                .bind(handle)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- Memoized upstream responses
CREATE TABLE IF NOT EXISTS response_cache (
    cache_key TEXT PRIMARY KEY,
    body BLOB NOT NULL,
    created_at TEXT NOT NULL
);

-- Invite queue. AUTOINCREMENT keeps identifiers monotonic after deletes.
CREATE TABLE IF NOT EXISTS pending_invites (
    invite_id INTEGER PRIMARY KEY AUTOINCREMENT,
    repo_name TEXT NOT NULL,
    repo_url TEXT NOT NULL,
    inviter TEXT NOT NULL,
    invitee TEXT NOT NULL,
    group_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Contact data cached per handle
CREATE TABLE IF NOT EXISTS user_profiles (
    handle TEXT PRIMARY KEY,
    email TEXT,
    display_name TEXT,
    fetched_at TEXT NOT NULL
);
"#;

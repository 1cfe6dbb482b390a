//! PostgreSQL-based metadata store implementation.

use crate::error::MetadataResult;
use crate::models::{PendingInviteRow, UserProfileRow};
use crate::repos::{InviteQueueRepo, ResponseCacheRepo, UserProfileRepo};
use crate::store::MetadataStore;
use async_trait::async_trait;
use herald_core::config::PgSslMode;
use herald_core::{NewInvite, PendingInvite};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

fn sqlx_ssl_mode(mode: PgSslMode) -> SqlxPgSslMode {
    match mode {
        PgSslMode::Disable => SqlxPgSslMode::Disable,
        PgSslMode::Prefer => SqlxPgSslMode::Prefer,
        PgSslMode::Require => SqlxPgSslMode::Require,
    }
}

/// PostgreSQL-based metadata store.
///
/// Required when dispatchers on more than one host drain the same queue.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(url: &str, max_connections: u32) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections).await
    }

    /// Connect using discrete parameters instead of a URL.
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);
        if let Some(user) = username {
            opts = opts.username(user);
        }
        if let Some(pass) = password {
            opts = opts.password(pass);
        }
        if let Some(mode) = ssl_mode {
            opts = opts.ssl_mode(sqlx_ssl_mode(mode));
        }

        tracing::info!(
            host,
            port,
            database,
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL"
        );
        Self::connect(opts, max_connections).await
    }

    async fn connect(opts: PgConnectOptions, max_connections: u32) -> MetadataResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // Prepared statements cannot hold more than one command.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ResponseCacheRepo for PostgresStore {
    async fn get_cached_response(&self, key: &str) -> MetadataResult<Option<Vec<u8>>> {
        let body =
            sqlx::query_scalar::<_, Vec<u8>>("SELECT body FROM response_cache WHERE cache_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(body)
    }

    async fn put_cached_response(&self, key: &str, body: &[u8]) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO response_cache (cache_key, body, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT(cache_key) DO UPDATE SET
                body = EXCLUDED.body,
                created_at = EXCLUDED.created_at
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
impl InviteQueueRepo for PostgresStore {
    async fn enqueue_invite(&self, invite: &NewInvite) -> MetadataResult<i64> {
        invite.validate()?;
        let invite_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO pending_invites (
                repo_name, repo_url, inviter, invitee, group_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
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
        // SKIP LOCKED lets concurrent dispatchers each claim a different row
        // instead of blocking on the head of the queue.
        let row = sqlx::query_as::<_, PendingInviteRow>(
            r#"
            DELETE FROM pending_invites
            WHERE invite_id = (
                SELECT invite_id FROM pending_invites
                ORDER BY invite_id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
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
impl UserProfileRepo for PostgresStore {
    async fn get_user_profile(&self, handle: &str) -> MetadataResult<Option<UserProfileRow>> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            "SELECT handle, email, display_name, fetched_at FROM user_profiles WHERE handle = $1",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_user_profile(&self, profile: &UserProfileRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (handle, email, display_name, fetched_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(handle) DO UPDATE SET
                email = EXCLUDED.email,
                display_name = EXCLUDED.display_name,
                fetched_at = EXCLUDED.fetched_at
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
        let result = sqlx::query("DELETE FROM user_profiles WHERE handle = $1")
            .bind(handle)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::{POSTGRES_SCHEMA, postgres_schema_statements};

    #[test]
    fn postgres_schema_statements_skips_empty_and_comment_only() {
        let schema = r#"
            -- comment only

            CREATE TABLE foo (id int);
            ;
            -- another comment
            CREATE TABLE bar (id int);
        "#;

        let statements = postgres_schema_statements(schema);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("CREATE TABLE foo"));
        assert!(statements[1].contains("CREATE TABLE bar"));
    }

    #[test]
    fn embedded_schema_creates_every_table() {
        let statements = postgres_schema_statements(POSTGRES_SCHEMA);
        for table in ["response_cache", "pending_invites", "user_profiles"] {
            assert!(
                statements
                    .iter()
                    .any(|s| s.contains(&format!("CREATE TABLE IF NOT EXISTS {table}"))),
                "missing table {table}"
            );
        }
    }
}

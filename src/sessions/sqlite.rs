use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::{generate_token, now_unix, Session, SessionStore};

#[derive(Debug, FromRow)]
struct SessionRow {
    token: String,
    user_id: i64,
    created_at: i64,
    expires_at: i64,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            token: row.token,
            user_id: row.user_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

/// Sessions persisted next to the users table.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, user_id: i64, ttl_seconds: i64) -> anyhow::Result<Session> {
        let now = now_unix();
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (token, user_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            RETURNING token, user_id, created_at, expires_at
            "#,
        )
        .bind(generate_token()?)
        .bind(user_id)
        .bind(now)
        .bind(now.saturating_add(ttl_seconds))
        .fetch_one(&self.db)
        .await?;
        debug!(user_id, "session created");
        Ok(row.into())
    }

    async fn lookup(&self, token: &str) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM sessions
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        match row.map(Session::from) {
            Some(session) if session.is_expired_at(now_unix()) => {
                self.delete(token).await?;
                debug!(user_id = session.user_id, "expired session discarded");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete(&self, token: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_unix())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

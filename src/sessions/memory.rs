use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{generate_token, now_unix, Session, SessionStore};

/// Process-local sessions; lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: i64, ttl_seconds: i64) -> anyhow::Result<Session> {
        let now = now_unix();
        let session = Session {
            token: generate_token()?,
            user_id,
            created_at: now,
            expires_at: now.saturating_add(ttl_seconds),
        };
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        Ok(session)
    }

    async fn lookup(&self, token: &str) -> anyhow::Result<Option<Session>> {
        let found = self.sessions.read().await.get(token).cloned();
        match found {
            Some(session) if session.is_expired_at(now_unix()) => {
                self.sessions.write().await.remove(token);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete(&self, token: &str) -> anyhow::Result<bool> {
        Ok(self.sessions.write().await.remove(token).is_some())
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let now = now_unix();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }
}

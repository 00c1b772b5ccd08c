//! Server-side session records and the cookie that references them.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use time::OffsetDateTime;
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

pub const SESSION_COOKIE_NAME: &str = "session";

/// An active session bound to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: i64,
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a session for `user_id` and return its token.
    async fn create(&self, user_id: i64, ttl_seconds: i64) -> anyhow::Result<Session>;
    /// Resolve a token to an unexpired session.
    async fn lookup(&self, token: &str) -> anyhow::Result<Option<Session>>;
    /// Returns whether a session was removed.
    async fn delete(&self, token: &str) -> anyhow::Result<bool>;
    async fn purge_expired(&self) -> anyhow::Result<u64>;
}

/// Sweep expired sessions from `store` every `every`, starting immediately.
///
/// Runs until the handle is aborted or the runtime shuts down. Failed sweeps are
/// logged and retried on the next tick.
pub fn spawn_purge_task(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => debug!("no expired sessions"),
                Ok(purged) => info!(purged, "expired sessions removed"),
                Err(e) => warn!(error = %e, "session purge failed"),
            }
        }
    })
}

pub(crate) fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// 256 random bits, URL-safe base64 without padding.
pub(crate) fn generate_token() -> anyhow::Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Read a cookie value from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == name && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, SESSION_COOKIE_NAME)
}

pub fn session_cookie(
    token: &str,
    ttl_seconds: i64,
    secure: bool,
) -> anyhow::Result<HeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).context("build session cookie")
}

pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure")
    } else {
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}

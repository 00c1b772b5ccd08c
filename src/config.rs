use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

/// Where session records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Sqlite,
    Memory,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown session backend: {other}"),
        }
    }
}

/// One year. Longer lifetimes are refused so expiry arithmetic stays in range.
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
    pub backend: SessionBackend,
    /// Seconds between sweeps of expired session records.
    pub purge_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://database.db".into());
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_parse("APP_PORT", 8080)?;
        let session = SessionConfig {
            ttl_minutes: env_parse("SESSION_TTL_MINUTES", 60 * 24 * 31)?,
            cookie_secure: env_parse("SESSION_COOKIE_SECURE", false)?,
            backend: env_parse("SESSION_BACKEND", SessionBackend::Sqlite)?,
            purge_interval_seconds: env_parse("SESSION_PURGE_INTERVAL_SECONDS", 300)?,
        };
        if session.ttl_minutes <= 0 {
            anyhow::bail!("SESSION_TTL_MINUTES must be positive");
        }
        match session.ttl_minutes.checked_mul(60) {
            Some(_) if session.ttl_minutes <= MAX_SESSION_TTL_MINUTES => {}
            _ => anyhow::bail!(
                "SESSION_TTL_MINUTES must be at most {MAX_SESSION_TTL_MINUTES}, got {}",
                session.ttl_minutes
            ),
        }
        if session.purge_interval_seconds == 0 {
            anyhow::bail!("SESSION_PURGE_INTERVAL_SECONDS must be positive");
        }
        Ok(Self {
            database_url,
            host,
            port,
            session,
        })
    }

    /// Configuration backed by a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            session: SessionConfig {
                ttl_minutes: 60,
                cookie_secure: false,
                backend: SessionBackend::Sqlite,
                purge_interval_seconds: 300,
            },
        }
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.session.ttl_minutes.saturating_mul(60)
    }
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

use crate::config::{AppConfig, SessionBackend};
use crate::db;
use crate::sessions::{spawn_purge_task, MemorySessionStore, SessionStore, SqliteSessionStore};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        Self::from_config(AppConfig::from_env()?).await
    }

    /// Connect, migrate and pick the session backend.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database_url).await?;
        db::migrate(&db).await?;

        let sessions = match config.session.backend {
            SessionBackend::Sqlite => Arc::new(SqliteSessionStore::new(db.clone())) as Arc<dyn SessionStore>,
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>,
        };

        Ok(Self::from_parts(db, Arc::new(config), sessions))
    }

    /// Start the background sweep of expired sessions for this state's store.
    pub fn spawn_session_purge(&self) -> JoinHandle<()> {
        let every = Duration::from_secs(self.config.session.purge_interval_seconds);
        info!(every_seconds = every.as_secs(), "session purge scheduled");
        spawn_purge_task(self.sessions.clone(), every)
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            db,
            config,
            sessions,
        }
    }

    /// Fresh state on a private in-memory database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::from_config(AppConfig::in_memory()).await
    }
}

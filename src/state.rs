use redis::aio::ConnectionManager;
use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    repositories::{
        follow::{FollowRepository, PgFollowRepository},
        memory::MemoryStore,
        publication::{PgPublicationRepository, PublicationRepository},
        user::{PgUserRepository, UserRepository},
    },
    services::media::MediaStore,
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// User accounts.
    pub users: Arc<dyn UserRepository>,
    /// Follow edges.
    pub follows: Arc<dyn FollowRepository>,
    /// Publications.
    pub publications: Arc<dyn PublicationRepository>,
    /// Uploaded images.
    pub media: MediaStore,
    /// The Redis connection manager, when rate limiting is enabled.
    pub redis: Option<ConnectionManager>,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// `memory://` as database URL selects the in-process store; anything
    /// else is opened as a PostgreSQL pool and the schema is applied.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let redis = match &config.redis_url {
            Some(url) => {
                let redis_client = redis::Client::open(url.as_str())?;
                let manager = ConnectionManager::new(redis_client).await?;
                tracing::info!("✅ Redis Connection Manager initialized");
                Some(manager)
            }
            None => {
                tracing::warn!("⚠️ REDIS_URL not set, register/login rate limiting is disabled");
                None
            }
        };

        if config.uses_memory_store() {
            tracing::warn!("⚠️ Using the in-memory store, data is lost on restart");
            let mut state = Self::in_memory(config.clone());
            state.media.ensure_default_avatar().await?;
            state.redis = redis;
            return Ok(state);
        }

        let db = crate::db::create_pool(&config.database_url, config.db_pool_size)?;
        crate::db::ensure_schema(&db).await?;
        tracing::info!("✅ PostgreSQL Pool initialized ({} connections)", config.db_pool_size);

        let media = MediaStore::from_config(config);
        media.ensure_default_avatar().await?;

        Ok(AppState {
            users: Arc::new(PgUserRepository::new(db.clone())),
            follows: Arc::new(PgFollowRepository::new(db.clone())),
            publications: Arc::new(PgPublicationRepository::new(db)),
            media,
            redis,
            config: config.clone(),
        })
    }

    /// State backed by a fresh in-memory store and no Redis.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        AppState {
            users: store.clone(),
            follows: store.clone(),
            publications: store,
            media: MediaStore::from_config(&config),
            redis: None,
            config,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use zeroize::Zeroizing;

    let config = Config {
        database_url: crate::config::MEMORY_DATABASE_URL.to_string(),
        db_pool_size: 1,
        redis_url: None,
        bind_addr: ([127, 0, 0, 1], 0).into(),
        jwt_secret: Zeroizing::new(b"unit-test-secret-unit-test-secret".to_vec()),
        session_duration_days: 7,
        media_dir: std::env::temp_dir().join(format!("social-api-test-{}", uuid::Uuid::new_v4())),
        media_url_prefix: "/media".to_string(),
        max_upload_bytes: 1024 * 1024,
        cors_origins: vec!["*".to_string()],
    };
    AppState::in_memory(config)
}

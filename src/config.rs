use std::{env, net::SocketAddr, path::PathBuf};
use anyhow::{Context, Result};
use zeroize::{Zeroize, Zeroizing};

/// `DATABASE_URL` value that selects the in-memory backend.
pub const MEMORY_DATABASE_URL: &str = "memory://";

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database, or `memory://`.
    pub database_url: String,
    /// Maximum number of pooled database connections.
    pub db_pool_size: usize,
    /// The URL of the Redis server. Rate limiting is off without it.
    pub redis_url: Option<String>,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// HMAC secret used to sign session tokens.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// Directory uploaded media is written to.
    pub media_dir: PathBuf,
    /// URL prefix the media directory is served under.
    pub media_url_prefix: String,
    /// Largest accepted media upload in bytes.
    pub max_upload_bytes: usize,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let mut jwt_secret = env::var("JWT_SECRET")
            .context("JWT_SECRET must be set (generate with: openssl rand -hex 32)")?;

        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        if jwt_secret.len() < 32 {
            tracing::warn!("⚠️ JWT_SECRET is shorter than 32 bytes");
        }

        let secret_bytes = Zeroizing::new(jwt_secret.as_bytes().to_vec());
        jwt_secret.zeroize();

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set (use memory:// for the in-memory store)")?,
            db_pool_size: env::var("DB_POOL_SIZE")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .context("Invalid DB_POOL_SIZE")?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3900".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            jwt_secret: secret_bytes,
            session_duration_days: env::var("SESSION_DURATION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("Invalid SESSION_DURATION_DAYS")?,
            media_dir: env::var("MEDIA_DIR")
                .unwrap_or_else(|_| "uploads/media".to_string())
                .into(),
            media_url_prefix: env::var("MEDIA_URL_PREFIX")
                .unwrap_or_else(|_| "/media".to_string())
                .trim_end_matches('/')
                .to_string(),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                .parse()
                .context("Invalid MAX_UPLOAD_BYTES")?,
            cors_origins,
        })
    }

    /// Whether the in-memory backend was requested.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }
}

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::{error::SqlState, NoTls};
use crate::error::{AppError, Result};
use std::time::Duration;

/// Schema applied on startup. Every statement is idempotent.
const SCHEMA: &str = include_str!("../migrations/001_init.sql");

/// Creates a new database connection pool.
///
/// # Arguments
///
/// * `database_url` - The URL of the PostgreSQL database.
/// * `max_size` - The maximum number of pooled connections.
///
/// # Returns
///
/// A `Result` containing the `Pool`.
pub fn create_pool(database_url: &str, max_size: usize) -> Result<Pool> {
    let mut cfg = Config::new();
    let pg_config: tokio_postgres::Config = database_url.parse()?;

    if let Some(host) = pg_config.get_hosts().first() {
        match host {
            tokio_postgres::config::Host::Tcp(hostname) => cfg.host = Some(hostname.clone()),
            #[cfg(unix)]
            tokio_postgres::config::Host::Unix(path) => {
                cfg.host = Some(path.to_string_lossy().into_owned())
            }
        }
    }

    if let Some(port) = pg_config.get_ports().first() {
        cfg.port = Some(*port);
    }

    if let Some(dbname) = pg_config.get_dbname() {
        cfg.dbname = Some(dbname.to_string());
    }

    if let Some(user) = pg_config.get_user() {
        cfg.user = Some(user.to_string());
    }

    if let Some(password) = pg_config.get_password() {
        cfg.password = Some(String::from_utf8_lossy(password).to_string());
    }

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let mut pool_config = PoolConfig::new(max_size);
    pool_config.timeouts = deadpool_postgres::Timeouts {
        wait: Some(Duration::from_secs(5)),
        create: Some(Duration::from_secs(2)),
        recycle: Some(Duration::from_secs(1)),
    };
    cfg.pool = Some(pool_config);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(AppError::from)
}

/// Creates the tables and indexes if they are not there yet.
pub async fn ensure_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    tracing::info!("✅ Database schema verified");
    Ok(())
}

/// Turns a unique-index violation into a `Conflict` carrying `message`.
///
/// Any other database error is passed through unchanged.
pub fn conflict_on_unique(err: tokio_postgres::Error, message: &str) -> AppError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        tracing::debug!("Unique violation: {}", err);
        AppError::Conflict(message.to_string())
    } else {
        AppError::Database(err)
    }
}

/// Turns a foreign-key violation into a `NotFound` carrying `message`.
pub fn not_found_on_foreign_key(err: AppError, message: &str) -> AppError {
    match err {
        AppError::Database(e) if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) => {
            AppError::NotFound(message.to_string())
        }
        other => other,
    }
}

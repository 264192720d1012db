use std::env::VarError;

use data_model_lens::db::{ConnectionPoolError, DEFAULT_POOL_SIZE, DbPool, connect_pool};

#[derive(Debug, thiserror::Error)]
pub enum DbEnvError {
    #[error("DATABASE_URL must be set in .env file or present as an env var: {0}")]
    MissingDatabaseUrl(#[from] VarError),

    #[error("DATABASE_POOL_SIZE must be a positive integer, got '{0}'")]
    InvalidPoolSize(String),

    #[error("Couldn't connect to the database: {0}")]
    Connection(#[from] ConnectionPoolError),
}

/// Connects to DATABASE_URL with a pool of DATABASE_POOL_SIZE connections.
pub async fn get_db_pool() -> Result<DbPool, DbEnvError> {
    let database_url = get_database_url()?;
    let pool = connect_pool(&database_url, get_pool_size()?).await?;
    tracing::info!("Connected to the database");
    Ok(pool)
}

/// Retrieves the value for the env var DATABASE_URL.
pub fn get_database_url() -> Result<String, VarError> {
    std::env::var("DATABASE_URL")
}

/// DATABASE_POOL_SIZE, or the default when unset or blank.
pub fn get_pool_size() -> Result<usize, DbEnvError> {
    match std::env::var("DATABASE_POOL_SIZE") {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<usize>() {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(DbEnvError::InvalidPoolSize(raw)),
        },
        _ => Ok(DEFAULT_POOL_SIZE),
    }
}

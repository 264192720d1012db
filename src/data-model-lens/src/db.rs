use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::deadpool::Pool;

pub type DbPool = Pool<AsyncPgConnection>;

/// Connections kept by the pool when no size is configured.
pub const DEFAULT_POOL_SIZE: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionPoolError {
    #[error("Pool size must be at least 1")]
    ZeroSize,
    #[error("Failed to build connection pool: {0}")]
    Build(#[from] deadpool::managed::BuildError),
    #[error("Database is unreachable: {0}")]
    Unreachable(#[from] deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>),
}

/// Builds a pool of at most `max_size` connections to `database_url`.
/// One connection is opened up front so a bad URL or a down server fails at startup.
pub async fn connect_pool(database_url: &str, max_size: usize) -> Result<DbPool, ConnectionPoolError> {
    if max_size == 0 {
        return Err(ConnectionPoolError::ZeroSize);
    }

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager).max_size(max_size).build()?;
    drop(pool.get().await?);

    tracing::debug!("Database pool ready (max_size={})", max_size);
    Ok(pool)
}

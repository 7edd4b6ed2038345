//! MySQL connection pool and the read-only user repository.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

/// Fixed number of pooled connections.
pub const POOL_SIZE: u32 = 5;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

// `mobile` is cast so numeric column types decode as text too.
const FIND_USER_SQL: &str =
    "SELECT name, email, CAST(mobile AS CHAR) AS mobile, image AS photo FROM users WHERE id = ?";

/// MySQL connection settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DbConfig {
    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Profile fields of one row of the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct UserRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    /// Stored photo reference, a file name or a path ending in one.
    pub photo: Option<String>,
}

/// Read access to user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user by id; `Ok(None)` when no row matches.
    async fn find_by_id(&self, id: u64) -> Result<Option<UserRecord>, DbError>;
}

/// Connect a pool of [`POOL_SIZE`] connections.
///
/// Fails at startup when the database is unreachable.
pub async fn create_pool(config: &DbConfig) -> Result<MySqlPool, DbError> {
    let pool = MySqlPoolOptions::new()
        .max_connections(POOL_SIZE)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(config.connect_options())
        .await?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.name,
        size = POOL_SIZE,
        "MySQL pool ready"
    );
    Ok(pool)
}

/// [`UserRepository`] backed by the `users` table.
pub struct MySqlUserRepository {
    pool: MySqlPool,
}

impl MySqlUserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn find_by_id(&self, id: u64) -> Result<Option<UserRecord>, DbError> {
        // The connection goes back to the pool when `conn` drops, on every path.
        let mut conn = self.pool.acquire().await?;
        let user = sqlx::query_as::<_, UserRecord>(FIND_USER_SQL)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(user)
    }
}

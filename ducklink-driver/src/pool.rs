//! Connection pool over one shared database.
//!
//! Every pooled connection is a separate engine session on the same
//! [`Database`], so writes from one are visible to the others. Calls run on
//! Tokio's blocking thread pool and take a [`CancellationToken`] that
//! interrupts the running statement.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::DuckDbConfig;
use crate::connection::Connection;
use crate::database::Database;
use crate::error::{DuckDbError, DuckDbResult};
use crate::row::{FromRow, ResultSet};
use crate::rows::Row;
use crate::statement::ExecResult;
use crate::value::NamedValue;

type SharedConnection = Arc<Mutex<Connection>>;

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections.
    pub max_connections: usize,
    /// Minimum number of connections to keep open.
    pub min_connections: usize,
    /// How long [`DuckDbPool::get`] waits for a free slot, in milliseconds.
    pub connection_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connection_timeout_ms: 30_000,
        }
    }
}

/// A DuckDB connection pool.
#[derive(Clone)]
pub struct DuckDbPool {
    database: Database,
    pool_config: Arc<PoolConfig>,
    /// Idle connections.
    connections: Arc<Mutex<Vec<SharedConnection>>>,
    semaphore: Arc<Semaphore>,
}

impl DuckDbPool {
    /// Open the database and create a pool with default settings.
    pub async fn new(config: DuckDbConfig) -> DuckDbResult<Self> {
        Self::with_pool_config(config, PoolConfig::default()).await
    }

    /// Open the database and create a pool.
    pub async fn with_pool_config(
        config: DuckDbConfig,
        pool_config: PoolConfig,
    ) -> DuckDbResult<Self> {
        if pool_config.max_connections == 0 {
            return Err(DuckDbError::pool("max_connections must be at least 1"));
        }
        if pool_config.min_connections > pool_config.max_connections {
            return Err(DuckDbError::pool(format!(
                "min_connections ({}) exceeds max_connections ({})",
                pool_config.min_connections, pool_config.max_connections
            )));
        }

        info!(
            max_connections = pool_config.max_connections,
            min_connections = pool_config.min_connections,
            "Creating DuckDB connection pool"
        );

        let database = tokio::task::spawn_blocking(move || Database::open(&config))
            .await
            .map_err(|e| DuckDbError::internal(format!("Task join error: {}", e)))??;

        let pool = Self {
            database,
            semaphore: Arc::new(Semaphore::new(pool_config.max_connections)),
            pool_config: Arc::new(pool_config),
            connections: Arc::new(Mutex::new(Vec::new())),
        };

        for _ in 0..pool.pool_config.min_connections {
            let conn = pool.create_connection()?;
            pool.connections.lock().push(conn);
        }

        Ok(pool)
    }

    /// Create a builder for the pool.
    pub fn builder() -> DuckDbPoolBuilder {
        DuckDbPoolBuilder::default()
    }

    /// Get a connection from the pool.
    ///
    /// Waits up to the configured timeout when every connection is in use.
    pub async fn get(&self) -> DuckDbResult<PooledConnection> {
        debug!("Acquiring connection from pool");

        let timeout = Duration::from_millis(self.pool_config.connection_timeout_ms);
        let permit = tokio::time::timeout(timeout, self.semaphore.clone().acquire_owned())
            .await
            .map_err(|_| {
                DuckDbError::pool(format!(
                    "timed out after {}ms waiting for a connection",
                    self.pool_config.connection_timeout_ms
                ))
            })?
            .map_err(|e| DuckDbError::pool(format!("Failed to acquire semaphore: {}", e)))?;

        let idle = self.connections.lock().pop();
        let conn = match idle {
            Some(c) => c,
            None => self.create_connection()?,
        };

        Ok(PooledConnection {
            conn,
            pool: self.clone(),
            _permit: permit,
        })
    }

    fn create_connection(&self) -> DuckDbResult<SharedConnection> {
        debug!("Creating new DuckDB connection");
        Ok(Arc::new(Mutex::new(self.database.connect()?)))
    }

    fn return_connection(&self, conn: SharedConnection) {
        let mut connections = self.connections.lock();
        if connections.len() < self.pool_config.max_connections {
            connections.push(conn);
        }
    }

    /// Get pool status.
    pub fn status(&self) -> PoolStatus {
        let available = self.connections.lock().len();
        let permits = self.semaphore.available_permits();

        PoolStatus {
            max_connections: self.pool_config.max_connections,
            available_connections: available,
            available_permits: permits,
            in_use: self.pool_config.max_connections - permits,
        }
    }

    /// The shared database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get a reference to the database configuration.
    pub fn config(&self) -> &DuckDbConfig {
        self.database.config()
    }

    /// Get a reference to the pool configuration.
    pub fn pool_config(&self) -> &PoolConfig {
        &self.pool_config
    }
}

impl std::fmt::Debug for DuckDbPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbPool")
            .field("status", &self.status())
            .finish()
    }
}

/// Pool status information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    /// Maximum connections in the pool.
    pub max_connections: usize,
    /// Idle connections in the pool.
    pub available_connections: usize,
    /// Available permits.
    pub available_permits: usize,
    /// Connections currently in use.
    pub in_use: usize,
}

/// A connection borrowed from the pool.
///
/// When dropped, the connection is returned to the pool.
pub struct PooledConnection {
    conn: SharedConnection,
    pool: DuckDbPool,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Run `f` against the connection on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> DuckDbResult<T>
    where
        F: FnOnce(&Connection) -> DuckDbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&*conn.lock()))
            .await
            .map_err(|e| DuckDbError::internal(format!("Task join error: {}", e)))?
    }

    /// Query and materialize every row.
    pub async fn query(
        &self,
        token: &CancellationToken,
        sql: &str,
        args: &[NamedValue],
    ) -> DuckDbResult<ResultSet> {
        let token = token.clone();
        let sql = sql.to_string();
        let args = args.to_vec();

        self.run(move |conn| ResultSet::from_rows(conn.query(&token, &sql, &args)?))
            .await
    }

    /// Query and deserialize every row.
    pub async fn query_as<T: FromRow>(
        &self,
        token: &CancellationToken,
        sql: &str,
        args: &[NamedValue],
    ) -> DuckDbResult<Vec<T>> {
        self.query(token, sql, args).await?.deserialize()
    }

    /// Query and return the first row or None.
    pub async fn query_optional(
        &self,
        token: &CancellationToken,
        sql: &str,
        args: &[NamedValue],
    ) -> DuckDbResult<Option<Row>> {
        let token = token.clone();
        let sql = sql.to_string();
        let args = args.to_vec();

        self.run(move |conn| conn.query(&token, &sql, &args)?.next().transpose())
            .await
    }

    /// Execute a statement.
    pub async fn exec(
        &self,
        token: &CancellationToken,
        sql: &str,
        args: &[NamedValue],
    ) -> DuckDbResult<ExecResult> {
        let token = token.clone();
        let sql = sql.to_string();
        let args = args.to_vec();

        self.run(move |conn| conn.exec(&token, &sql, &args)).await
    }

    /// Execute a batch of SQL statements.
    pub async fn execute_batch(&self, token: &CancellationToken, sql: &str) -> DuckDbResult<()> {
        let token = token.clone();
        let sql = sql.to_string();

        self.run(move |conn| conn.execute_batch(&token, &sql)).await
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.pool.return_connection(Arc::clone(&self.conn));
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection").finish_non_exhaustive()
    }
}

/// Builder for DuckDB connection pool.
#[derive(Debug, Default)]
pub struct DuckDbPoolBuilder {
    config: Option<DuckDbResult<DuckDbConfig>>,
    pool_config: PoolConfig,
}

impl DuckDbPoolBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database configuration.
    pub fn config(mut self, config: DuckDbConfig) -> Self {
        self.config = Some(Ok(config));
        self
    }

    /// Set the database path.
    ///
    /// Errors creating the parent directory surface from [`build`](Self::build).
    pub fn path(mut self, path: &str) -> Self {
        self.config = Some(DuckDbConfig::from_path(path));
        self
    }

    /// Use an in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.config = Some(Ok(DuckDbConfig::in_memory()));
        self
    }

    /// Set the database URL.
    ///
    /// A malformed URL surfaces from [`build`](Self::build).
    pub fn url(mut self, url: &str) -> Self {
        self.config = Some(DuckDbConfig::from_url(url));
        self
    }

    /// Set maximum connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.pool_config.max_connections = max;
        self
    }

    /// Set minimum connections.
    pub fn min_connections(mut self, min: usize) -> Self {
        self.pool_config.min_connections = min;
        self
    }

    /// Set connection timeout in milliseconds.
    pub fn connection_timeout_ms(mut self, timeout: u64) -> Self {
        self.pool_config.connection_timeout_ms = timeout;
        self
    }

    /// Build the pool.
    pub async fn build(self) -> DuckDbResult<DuckDbPool> {
        let config = self
            .config
            .ok_or_else(|| DuckDbError::config("Database configuration required"))??;

        DuckDbPool::with_pool_config(config, self.pool_config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;
    use crate::value::Value;
    use serde::Deserialize;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn test_pool_creation() {
        let pool = DuckDbPool::new(DuckDbConfig::in_memory()).await.unwrap();
        let status = pool.status();
        assert_eq!(status.max_connections, 10);
        assert_eq!(status.available_connections, 1);
        assert_eq!(status.in_use, 0);
    }

    #[tokio::test]
    async fn test_pool_get_connection() {
        let pool = DuckDbPool::new(DuckDbConfig::in_memory()).await.unwrap();
        let conn = pool.get().await.unwrap();
        let result = conn.query(&token(), "SELECT 1 AS value", &[]).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.value(0, 0), Some(&Value::Integer(1)));
        assert_eq!(pool.status().in_use, 1);

        drop(conn);
        let status = pool.status();
        assert_eq!(status.in_use, 0);
        assert_eq!(status.available_connections, 1);
    }

    #[tokio::test]
    async fn test_pool_connections_share_database() {
        let pool = DuckDbPool::builder()
            .in_memory()
            .max_connections(4)
            .build()
            .await
            .unwrap();

        let a = pool.get().await.unwrap();
        let b = pool.get().await.unwrap();
        a.execute_batch(&token(), "CREATE TABLE t (id INTEGER, name VARCHAR)")
            .await
            .unwrap();
        let result = a
            .exec(&token(), "INSERT INTO t VALUES ($1, $2)", &params![1, "Alice"])
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);

        #[derive(Debug, Deserialize, PartialEq)]
        struct Item {
            id: i32,
            name: String,
        }
        let items: Vec<Item> = b.query_as(&token(), "SELECT * FROM t", &[]).await.unwrap();
        assert_eq!(items, vec![Item { id: 1, name: "Alice".into() }]);

        let row = b
            .query_optional(&token(), "SELECT name FROM t WHERE id = $1", &params![2])
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_pool_appender_via_run() {
        let pool = DuckDbPool::new(DuckDbConfig::in_memory()).await.unwrap();
        let conn = pool.get().await.unwrap();
        conn.execute_batch(&token(), "CREATE TABLE t (i INTEGER)")
            .await
            .unwrap();
        conn.run(|conn| {
            let mut appender = conn.appender(None, None, "t")?;
            for i in 0..100 {
                appender.append_row(&[Value::Integer(i)])?;
            }
            appender.close()
        })
        .await
        .unwrap();

        let row = conn
            .query_optional(&token(), "SELECT count(*) FROM t", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 100);
    }

    #[tokio::test]
    async fn test_pool_cancellation() {
        let pool = DuckDbPool::new(DuckDbConfig::in_memory()).await.unwrap();
        let conn = pool.get().await.unwrap();
        let token = token();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                token.cancel();
            })
        };

        let err = conn
            .exec(&token, "SELECT SUM(i) FROM range(1000000000000) t(i)", &[])
            .await
            .unwrap_err();
        assert!(err.is_cancelled(), "unexpected error: {}", err);
        canceller.await.unwrap();

        let row = conn
            .query_optional(&self::token(), "SELECT 42", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 42);
    }

    #[tokio::test]
    async fn test_pool_acquire_timeout() {
        let pool = DuckDbPool::builder()
            .in_memory()
            .max_connections(1)
            .connection_timeout_ms(50)
            .build()
            .await
            .unwrap();

        let held = pool.get().await.unwrap();
        let err = pool.get().await.unwrap_err();
        assert!(matches!(err, DuckDbError::Pool(_)));
        drop(held);
        assert!(pool.get().await.is_ok());
    }

    #[tokio::test]
    async fn test_pool_builder_errors() {
        let err = DuckDbPool::builder().build().await.unwrap_err();
        assert!(matches!(err, DuckDbError::Config(_)));

        let err = DuckDbPool::builder()
            .url("postgres://localhost/db")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, DuckDbError::Config(_)));

        let err = DuckDbPool::builder()
            .in_memory()
            .max_connections(2)
            .min_connections(3)
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, DuckDbError::Pool(_)));
    }

    #[tokio::test]
    async fn test_pool_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.duckdb");
        let pool = DuckDbPool::builder()
            .path(path.to_str().unwrap())
            .build()
            .await
            .unwrap();
        assert!(!pool.config().is_in_memory());
        pool.get()
            .await
            .unwrap()
            .execute_batch(&token(), "CREATE TABLE t AS SELECT 1 AS v")
            .await
            .unwrap();
        assert!(path.exists());
    }
}

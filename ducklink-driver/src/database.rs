//! Database instances.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::DuckDbConfig;
use crate::connection::Connection;
use crate::error::DuckDbResult;
use crate::handle::{ConnectionHandle, DatabaseHandle};

/// An open database.
///
/// Cloning is cheap; the native database is closed after the last clone and
/// the last connection opened from it are dropped.
#[derive(Clone)]
pub struct Database {
    handle: Arc<DatabaseHandle>,
    config: Arc<DuckDbConfig>,
}

impl Database {
    /// Open a database from configuration.
    #[instrument(skip(config), fields(path = ?config.path))]
    pub fn open(config: &DuckDbConfig) -> DuckDbResult<Self> {
        let path = config.path.to_engine_path()?;
        let engine_config = config.to_engine_config()?;
        let handle = DatabaseHandle::open(&path, &engine_config)?;
        debug!("database opened");
        Ok(Self {
            handle: Arc::new(handle),
            config: Arc::new(config.clone()),
        })
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> DuckDbResult<Self> {
        Self::open(&DuckDbConfig::in_memory())
    }

    /// Open a database from a `duckdb://` URL.
    pub fn open_url(url: &str) -> DuckDbResult<Self> {
        Self::open(&DuckDbConfig::from_url(url)?)
    }

    /// Open a new connection.
    pub fn connect(&self) -> DuckDbResult<Connection> {
        let handle = ConnectionHandle::connect(&self.handle)?;
        Ok(Connection::new(handle, Arc::clone(&self.handle)))
    }

    /// The configuration the database was opened with.
    pub fn config(&self) -> &DuckDbConfig {
        &self.config
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.config.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DuckDbError;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_connections_share_database() {
        let db = Database::open_in_memory().unwrap();
        let a = db.connect().unwrap();
        let b = db.connect().unwrap();
        let token = CancellationToken::new();
        a.execute_batch(&token, "CREATE TABLE t AS SELECT 42 AS v").unwrap();
        let rows = b.query(&token, "SELECT v FROM t", &[]).unwrap().collect_rows().unwrap();
        assert_eq!(rows[0].get::<i32>(0).unwrap(), 42);
    }

    #[test]
    fn test_connection_outlives_database_value() {
        let conn = Database::open_in_memory().unwrap().connect().unwrap();
        let rows = conn
            .query(&CancellationToken::new(), "SELECT 1", &[])
            .unwrap()
            .collect_rows()
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = DuckDbConfig::from_path(dir.path().join("data.duckdb")).unwrap();
        let token = CancellationToken::new();
        {
            let db = Database::open(&config).unwrap();
            db.connect()
                .unwrap()
                .execute_batch(&token, "CREATE TABLE t AS SELECT 7 AS v")
                .unwrap();
        }
        let db = Database::open(&config).unwrap();
        let rows = db
            .connect()
            .unwrap()
            .query(&token, "SELECT v FROM t", &[])
            .unwrap()
            .collect_rows()
            .unwrap();
        assert_eq!(rows[0].get::<i32>(0).unwrap(), 7);
    }

    #[test]
    fn test_invalid_option_fails_open() {
        let config = DuckDbConfig::builder().option("no_such_setting", "1").build();
        let err = Database::open(&config).unwrap_err();
        // Depending on the engine version the option is rejected when set or
        // when the database opens.
        assert!(matches!(err, DuckDbError::Config(_) | DuckDbError::Engine(_)));
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.duckdb");
        let token = CancellationToken::new();
        Database::open(&DuckDbConfig::from_path(&path).unwrap())
            .unwrap()
            .connect()
            .unwrap()
            .execute_batch(&token, "CREATE TABLE t (i INTEGER)")
            .unwrap();

        let config = DuckDbConfig::builder().path(&path).read_only().build();
        let conn = Database::open(&config).unwrap().connect().unwrap();
        let err = conn.execute_batch(&token, "INSERT INTO t VALUES (1)").unwrap_err();
        assert!(err.engine_message().is_some());
    }
}

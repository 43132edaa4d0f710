//! Connections: one engine session each.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::appender::Appender;
use crate::config::DuckDbConfig;
use crate::database::Database;
use crate::error::{DuckDbError, DuckDbResult};
use crate::execute;
use crate::handle::{ConnectionHandle, DatabaseHandle, ExtractedStatements, PreparedHandle};
use crate::profiling::ProfilingInfo;
use crate::rows::Rows;
use crate::statement::{ExecResult, Statement};
use crate::value::NamedValue;

/// A connection to a database.
///
/// A connection is `Send` but not `Sync`: the engine does not allow
/// overlapping executions on one session, so sharing one across threads
/// needs a lock (see [`DuckDbPool`](crate::DuckDbPool)).
pub struct Connection {
    handle: Option<ConnectionHandle>,
    _database: Arc<DatabaseHandle>,
}

impl Connection {
    pub(crate) fn new(handle: ConnectionHandle, database: Arc<DatabaseHandle>) -> Self {
        Self {
            handle: Some(handle),
            _database: database,
        }
    }

    /// Open a private in-memory database and connect to it.
    pub fn open_in_memory() -> DuckDbResult<Self> {
        Database::open_in_memory()?.connect()
    }

    /// Open a private database from configuration and connect to it.
    pub fn open(config: &DuckDbConfig) -> DuckDbResult<Self> {
        Database::open(config)?.connect()
    }

    pub(crate) fn handle(&self) -> DuckDbResult<&ConnectionHandle> {
        self.handle.as_ref().ok_or(DuckDbError::ClosedConnection)
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Prepare a single SQL statement.
    #[instrument(skip(self), fields(sql = %sql))]
    pub fn prepare(&self, sql: &str) -> DuckDbResult<Statement<'_>> {
        let prepared = PreparedHandle::prepare(self.handle()?, sql)?;
        debug!(params = prepared.param_count(), "statement prepared");
        Ok(Statement::new(self, prepared))
    }

    /// Prepare, bind and execute a statement for its side effects.
    #[instrument(skip(self, token, args), fields(sql = %sql))]
    pub fn exec(
        &self,
        token: &CancellationToken,
        sql: &str,
        args: &[NamedValue],
    ) -> DuckDbResult<ExecResult> {
        let mut stmt = self.prepare(sql)?;
        stmt.exec(token, args)
    }

    /// Prepare, bind and execute a query.
    ///
    /// The returned cursor owns the statement.
    #[instrument(skip(self, token, args), fields(sql = %sql))]
    pub fn query(
        &self,
        token: &CancellationToken,
        sql: &str,
        args: &[NamedValue],
    ) -> DuckDbResult<Rows<'_>> {
        self.prepare(sql)?.into_rows(token, args)
    }

    /// Execute every statement of a multi-statement SQL text in order.
    ///
    /// Stops at the first failing statement.
    #[instrument(skip(self, token), fields(sql_len = %sql.len()))]
    pub fn execute_batch(&self, token: &CancellationToken, sql: &str) -> DuckDbResult<()> {
        let handle = self.handle()?;
        let statements = ExtractedStatements::extract(handle, sql)?;
        debug!(count = statements.len(), "executing batch");
        for index in 0..statements.len() {
            let prepared = statements.prepare(handle, index)?;
            execute::execute(&prepared, handle.interrupt_handle(), token)?;
        }
        Ok(())
    }

    /// Begin a transaction.
    pub fn begin_transaction(&self) -> DuckDbResult<()> {
        self.execute_batch(&CancellationToken::new(), "BEGIN TRANSACTION")
    }

    /// Commit a transaction.
    pub fn commit(&self) -> DuckDbResult<()> {
        self.execute_batch(&CancellationToken::new(), "COMMIT")
    }

    /// Rollback a transaction.
    pub fn rollback(&self) -> DuckDbResult<()> {
        self.execute_batch(&CancellationToken::new(), "ROLLBACK")
    }

    /// Create an appender for `table`.
    ///
    /// `catalog` and `schema` default to the connection's current ones.
    pub fn appender(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> DuckDbResult<Appender<'_>> {
        Appender::new(self.handle()?, catalog, schema, table)
    }

    /// Profiling tree of the last query run on this connection.
    pub fn profiling_info(&self) -> DuckDbResult<ProfilingInfo> {
        ProfilingInfo::collect(self.handle()?)
    }

    /// Disconnect.
    ///
    /// Requires that no statement, cursor or appender of this connection is
    /// alive. Closing twice fails with [`DuckDbError::ClosedConnection`].
    pub fn close(&mut self) -> DuckDbResult<()> {
        match self.handle.take() {
            Some(_) => {
                debug!("connection closed");
                Ok(())
            }
            None => Err(DuckDbError::ClosedConnection),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

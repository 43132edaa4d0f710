//! Prepared statements: introspection, binding and execution.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::chunk::DataChunk;
use crate::codec;
use crate::connection::Connection;
use crate::error::{DuckDbError, DuckDbResult};
use crate::execute;
use crate::handle::{PreparedHandle, ResultHandle};
use crate::rows::Rows;
use crate::types::{StatementType, TypeId};
use crate::value::NamedValue;

/// Outcome of a statement executed for its side effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, updated or deleted.
    pub rows_affected: i64,
}

/// A prepared statement bound to the connection that prepared it.
///
/// Execution takes `&mut self` and a result cursor borrows the statement, so
/// a statement cannot be re-executed or closed while its rows are open.
pub struct Statement<'conn> {
    conn: &'conn Connection,
    prepared: Option<PreparedHandle>,
    bound: bool,
}

impl<'conn> Statement<'conn> {
    pub(crate) fn new(conn: &'conn Connection, prepared: PreparedHandle) -> Self {
        Self {
            conn,
            prepared: Some(prepared),
            bound: false,
        }
    }

    fn prepared(&self) -> DuckDbResult<&PreparedHandle> {
        self.prepared.as_ref().ok_or(DuckDbError::ClosedStatement)
    }

    fn check_index(&self, index: usize) -> DuckDbResult<&PreparedHandle> {
        let prepared = self.prepared()?;
        let count = prepared.param_count();
        if index == 0 || index > count {
            return Err(DuckDbError::ParamIndex { index, count });
        }
        Ok(prepared)
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.prepared.is_none()
    }

    /// Number of parameters.
    pub fn param_count(&self) -> DuckDbResult<usize> {
        Ok(self.prepared()?.param_count())
    }

    /// Name of the 1-based parameter `index`.
    ///
    /// Positional parameters (`$1`, `?`) are named by their position.
    pub fn param_name(&self, index: usize) -> DuckDbResult<String> {
        Ok(self.check_index(index)?.param_name(index))
    }

    /// Declared type of the 1-based parameter `index`.
    pub fn param_type(&self, index: usize) -> DuckDbResult<TypeId> {
        Ok(self.check_index(index)?.param_type(index))
    }

    /// Category of the statement.
    pub fn statement_type(&self) -> DuckDbResult<StatementType> {
        Ok(self.prepared()?.statement_type())
    }

    /// Bind arguments to every parameter.
    ///
    /// Each parameter takes the argument at its position, unless an argument
    /// names its ordinal, unless an argument names the parameter.
    pub fn bind(&mut self, args: &[NamedValue]) -> DuckDbResult<()> {
        self.bound = false;
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| DuckDbError::CouldNotBind(Box::new(DuckDbError::ClosedStatement)))?;
        bind_args(prepared, args).map_err(|e| DuckDbError::CouldNotBind(Box::new(e)))?;
        self.bound = true;
        Ok(())
    }

    /// Bind `args` and execute, returning the affected row count.
    pub fn exec(&mut self, token: &CancellationToken, args: &[NamedValue]) -> DuckDbResult<ExecResult> {
        self.bind(args)?;
        self.exec_bound(token)
    }

    /// Bind `args` and execute, returning a cursor over the result.
    pub fn query(&mut self, token: &CancellationToken, args: &[NamedValue]) -> DuckDbResult<Rows<'_>> {
        self.bind(args)?;
        self.query_bound(token)
    }

    /// Execute with the arguments of the last successful [`bind`](Self::bind).
    #[instrument(skip_all)]
    pub fn exec_bound(&mut self, token: &CancellationToken) -> DuckDbResult<ExecResult> {
        let mut result = self.run(token)?;
        let rows_affected = match result.fetch_chunk() {
            Some(raw) => {
                let chunk = DataChunk::from_result(raw);
                if chunk.size() > 0 && chunk.column_count() > 0 {
                    chunk
                        .value(0, 0)?
                        .as_i128()
                        .and_then(|n| i64::try_from(n).ok())
                        .unwrap_or(0)
                } else {
                    0
                }
            }
            None => 0,
        };
        debug!(rows_affected, "statement executed");
        Ok(ExecResult { rows_affected })
    }

    /// Execute with the arguments of the last successful [`bind`](Self::bind)
    /// and return a cursor over the result.
    #[instrument(skip_all)]
    pub fn query_bound(&mut self, token: &CancellationToken) -> DuckDbResult<Rows<'_>> {
        let result = self.run(token)?;
        Ok(Rows::new(result, None))
    }

    /// Bind, execute and hand the statement to the returned cursor.
    pub(crate) fn into_rows(
        mut self,
        token: &CancellationToken,
        args: &[NamedValue],
    ) -> DuckDbResult<Rows<'conn>> {
        self.bind(args)?;
        let result = self.run(token)?;
        Ok(Rows::new(result, Some(self)))
    }

    fn run(&mut self, token: &CancellationToken) -> DuckDbResult<ResultHandle> {
        let prepared = self.prepared()?;
        if !self.bound {
            return Err(DuckDbError::NotBound);
        }
        let interrupt = self.conn.handle()?.interrupt_handle();
        execute::execute(prepared, interrupt, token)
    }

    /// Release the prepared statement.
    ///
    /// Closing twice is reported as [`DuckDbError::DoubleClose`].
    pub fn close(&mut self) -> DuckDbResult<()> {
        match self.prepared.take() {
            Some(_) => {
                self.bound = false;
                Ok(())
            }
            None => Err(DuckDbError::DoubleClose),
        }
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("closed", &self.is_closed())
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

/// Resolve the argument for each parameter and bind it.
fn bind_args(prepared: &PreparedHandle, args: &[NamedValue]) -> DuckDbResult<()> {
    let count = prepared.param_count();
    if args.len() < count {
        return Err(DuckDbError::ArgumentCount {
            have: args.len(),
            want: count,
        });
    }
    if !prepared.clear_bindings() {
        return Err(DuckDbError::Engine(
            prepared
                .error()
                .unwrap_or_else(|| "could not clear bindings".to_string()),
        ));
    }

    for index in 1..=count {
        let name = prepared.param_name(index);
        let arg = resolve(args, index, &name);
        codec::bind_value(prepared, index, &arg.value)?;
    }
    Ok(())
}

/// Pick the argument for the 1-based parameter `index` named `name`.
fn resolve<'a>(args: &'a [NamedValue], index: usize, name: &str) -> &'a NamedValue {
    let mut chosen = &args[index - 1];
    if let Some(arg) = args.iter().rev().find(|a| a.ordinal == Some(index)) {
        chosen = arg;
    }
    if !name.is_empty() {
        let wanted = name.trim_start_matches('$');
        if let Some(arg) = args.iter().rev().find(|a| {
            a.name
                .as_deref()
                .is_some_and(|n| n.trim_start_matches('$') == wanted)
        }) {
            chosen = arg;
        }
    }
    chosen
}

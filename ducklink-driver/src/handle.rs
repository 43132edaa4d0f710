//! Owning wrappers around the engine's opaque handles.
//!
//! Every native handle kind gets exactly one wrapper with exactly one destroy
//! path (its `Drop`). Raw pointers are only reachable through `pub(crate)`
//! accessors so that no handle escapes the driver.
//!
//! The engine reports failures as a two-valued state. The diagnostic text of an
//! errored handle is only readable while the handle is alive, so every
//! constructor here copies that text out before destroying the handle.

use std::ffi::{CStr, CString, c_char, c_void};
use std::ptr;

use duckdb::ffi;

use crate::error::{DuckDbError, DuckDbResult};
use crate::types::{LogicalType, StatementType, TypeId};

pub(crate) fn succeeded(state: ffi::duckdb_state) -> bool {
    state == ffi::DuckDBSuccess
}

/// Copy a string owned by the engine (not freed here).
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn copy_text(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Copy and free a string allocated by the engine for the caller.
///
/// # Safety
///
/// `ptr` must be null or a NUL-terminated string allocated by the engine.
pub(crate) unsafe fn take_text(ptr: *mut c_char) -> Option<String> {
    let text = unsafe { copy_text(ptr) };
    if !ptr.is_null() {
        unsafe { ffi::duckdb_free(ptr as *mut c_void) };
    }
    text
}

/// Build an engine error from a diagnostic pointer, falling back to `context`.
pub(crate) fn engine_error(ptr: *const c_char, context: &str) -> DuckDbError {
    let text = unsafe { copy_text(ptr) }.filter(|t| !t.is_empty());
    DuckDbError::engine(text.unwrap_or_else(|| context.to_string()))
}

pub(crate) fn c_string(text: &str) -> DuckDbResult<CString> {
    CString::new(text)
        .map_err(|_| DuckDbError::config(format!("string contains a NUL byte: {:?}", text)))
}

fn optional_c_string(text: Option<&str>) -> DuckDbResult<Option<CString>> {
    text.filter(|t| !t.is_empty()).map(c_string).transpose()
}

fn c_ptr(text: &Option<CString>) -> *const c_char {
    text.as_ref().map_or(ptr::null(), |t| t.as_ptr())
}

// =============================================================================
// Database and configuration
// =============================================================================

/// Engine configuration handed to `duckdb_open_ext`.
pub(crate) struct ConfigHandle {
    raw: ffi::duckdb_config,
}

impl ConfigHandle {
    pub(crate) fn new() -> DuckDbResult<Self> {
        let mut raw: ffi::duckdb_config = ptr::null_mut();
        if !succeeded(unsafe { ffi::duckdb_create_config(&mut raw) }) {
            unsafe { ffi::duckdb_destroy_config(&mut raw) };
            return Err(DuckDbError::config("could not allocate engine configuration"));
        }
        Ok(Self { raw })
    }

    pub(crate) fn set(&mut self, name: &str, value: &str) -> DuckDbResult<()> {
        let c_name = c_string(name)?;
        let c_value = c_string(value)?;
        let state = unsafe { ffi::duckdb_set_config(self.raw, c_name.as_ptr(), c_value.as_ptr()) };
        if !succeeded(state) {
            return Err(DuckDbError::config(format!(
                "could not set option {} = {}",
                name, value
            )));
        }
        Ok(())
    }
}

impl Drop for ConfigHandle {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_destroy_config(&mut self.raw) };
    }
}

/// An open native database.
pub(crate) struct DatabaseHandle {
    raw: ffi::duckdb_database,
}

// SAFETY: the engine synchronizes access to a database instance internally.
unsafe impl Send for DatabaseHandle {}
unsafe impl Sync for DatabaseHandle {}

impl DatabaseHandle {
    pub(crate) fn open(path: &str, config: &ConfigHandle) -> DuckDbResult<Self> {
        let c_path = c_string(path)?;
        let mut raw: ffi::duckdb_database = ptr::null_mut();
        let mut err: *mut c_char = ptr::null_mut();
        let state =
            unsafe { ffi::duckdb_open_ext(c_path.as_ptr(), &mut raw, config.raw, &mut err) };
        if !succeeded(state) {
            let msg = unsafe { take_text(err) }
                .unwrap_or_else(|| format!("could not open database {}", path));
            unsafe { ffi::duckdb_close(&mut raw) };
            return Err(DuckDbError::Engine(msg));
        }
        Ok(Self { raw })
    }
}

impl Drop for DatabaseHandle {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_close(&mut self.raw) };
    }
}

// =============================================================================
// Connection
// =============================================================================

/// A native connection (one engine session).
pub(crate) struct ConnectionHandle {
    raw: ffi::duckdb_connection,
}

// SAFETY: a connection may move between threads; overlapping use is prevented
// by `Connection` not being `Sync`.
unsafe impl Send for ConnectionHandle {}

impl ConnectionHandle {
    pub(crate) fn connect(database: &DatabaseHandle) -> DuckDbResult<Self> {
        let mut raw: ffi::duckdb_connection = ptr::null_mut();
        if !succeeded(unsafe { ffi::duckdb_connect(database.raw, &mut raw) }) {
            unsafe { ffi::duckdb_disconnect(&mut raw) };
            return Err(DuckDbError::engine("could not connect to database"));
        }
        Ok(Self { raw })
    }

    pub(crate) fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle { raw: self.raw }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_disconnect(&mut self.raw) };
    }
}

/// Capability to interrupt whatever is running on one connection.
///
/// Only valid while the owning connection is open; the borrow structure of
/// `Statement` guarantees that for every execution it is used in.
#[derive(Clone, Copy)]
pub(crate) struct InterruptHandle {
    raw: ffi::duckdb_connection,
}

// SAFETY: `duckdb_interrupt` is designed to be called from another thread
// while the connection is executing.
unsafe impl Send for InterruptHandle {}
unsafe impl Sync for InterruptHandle {}

impl InterruptHandle {
    pub(crate) fn interrupt(&self) {
        unsafe { ffi::duckdb_interrupt(self.raw) };
    }
}

// =============================================================================
// Prepared statements
// =============================================================================

/// A prepared statement.
pub(crate) struct PreparedHandle {
    raw: ffi::duckdb_prepared_statement,
}

impl PreparedHandle {
    pub(crate) fn prepare(conn: &ConnectionHandle, sql: &str) -> DuckDbResult<Self> {
        let c_sql = c_string(sql)?;
        let mut raw: ffi::duckdb_prepared_statement = ptr::null_mut();
        let state = unsafe { ffi::duckdb_prepare(conn.raw, c_sql.as_ptr(), &mut raw) };
        Self::checked(raw, state)
    }

    fn checked(
        mut raw: ffi::duckdb_prepared_statement,
        state: ffi::duckdb_state,
    ) -> DuckDbResult<Self> {
        if !succeeded(state) {
            let err = engine_error(
                unsafe { ffi::duckdb_prepare_error(raw) },
                "could not prepare statement",
            );
            unsafe { ffi::duckdb_destroy_prepare(&mut raw) };
            return Err(err);
        }
        Ok(Self { raw })
    }

    pub(crate) fn raw(&self) -> ffi::duckdb_prepared_statement {
        self.raw
    }

    /// Diagnostic text of the last failed call on this statement.
    pub(crate) fn error(&self) -> Option<String> {
        unsafe { copy_text(ffi::duckdb_prepare_error(self.raw)) }.filter(|t| !t.is_empty())
    }

    pub(crate) fn param_count(&self) -> usize {
        unsafe { ffi::duckdb_nparams(self.raw) as usize }
    }

    /// Name of the 1-based parameter `index`.
    pub(crate) fn param_name(&self, index: usize) -> String {
        let ptr = unsafe { ffi::duckdb_parameter_name(self.raw, index as ffi::idx_t) };
        unsafe { take_text(ptr as *mut c_char) }.unwrap_or_default()
    }

    /// Declared type of the 1-based parameter `index`.
    pub(crate) fn param_type(&self, index: usize) -> TypeId {
        TypeId::from_raw(unsafe { ffi::duckdb_param_type(self.raw, index as ffi::idx_t) } as u32)
    }

    pub(crate) fn statement_type(&self) -> StatementType {
        StatementType::from_raw(unsafe { ffi::duckdb_prepared_statement_type(self.raw) } as u32)
    }

    pub(crate) fn clear_bindings(&self) -> bool {
        succeeded(unsafe { ffi::duckdb_clear_bindings(self.raw) })
    }
}

impl Drop for PreparedHandle {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_destroy_prepare(&mut self.raw) };
    }
}

/// The statements extracted from a multi-statement SQL text.
pub(crate) struct ExtractedStatements {
    raw: ffi::duckdb_extracted_statements,
    count: usize,
}

impl ExtractedStatements {
    pub(crate) fn extract(conn: &ConnectionHandle, sql: &str) -> DuckDbResult<Self> {
        let c_sql = c_string(sql)?;
        let mut raw: ffi::duckdb_extracted_statements = ptr::null_mut();
        let count =
            unsafe { ffi::duckdb_extract_statements(conn.raw, c_sql.as_ptr(), &mut raw) } as usize;
        if count == 0 {
            let text = unsafe { copy_text(ffi::duckdb_extract_statements_error(raw)) }
                .filter(|t| !t.is_empty());
            if let Some(text) = text {
                unsafe { ffi::duckdb_destroy_extracted(&mut raw) };
                return Err(DuckDbError::Engine(text));
            }
        }
        Ok(Self { raw, count })
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn prepare(&self, conn: &ConnectionHandle, index: usize) -> DuckDbResult<PreparedHandle> {
        let mut raw: ffi::duckdb_prepared_statement = ptr::null_mut();
        let state = unsafe {
            ffi::duckdb_prepare_extracted_statement(conn.raw, self.raw, index as ffi::idx_t, &mut raw)
        };
        PreparedHandle::checked(raw, state)
    }
}

impl Drop for ExtractedStatements {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_destroy_extracted(&mut self.raw) };
    }
}

// =============================================================================
// Execution
// =============================================================================

/// A submitted but not yet executed query.
pub(crate) struct PendingHandle {
    raw: ffi::duckdb_pending_result,
}

impl PendingHandle {
    pub(crate) fn from_prepared(prepared: &PreparedHandle) -> DuckDbResult<Self> {
        let mut raw: ffi::duckdb_pending_result = ptr::null_mut();
        let state = unsafe { ffi::duckdb_pending_prepared(prepared.raw, &mut raw) };
        if !succeeded(state) {
            let err = engine_error(
                unsafe { ffi::duckdb_pending_error(raw) },
                "could not create pending result",
            );
            unsafe { ffi::duckdb_destroy_pending(&mut raw) };
            return Err(err);
        }
        Ok(Self { raw })
    }

    /// Run the pending query to completion, blocking the calling thread.
    ///
    /// On failure the engine's text is returned and the errored result has
    /// already been destroyed.
    pub(crate) fn execute(&self) -> Result<ResultHandle, String> {
        let mut result = ResultHandle::empty();
        let state = unsafe { ffi::duckdb_execute_pending(self.raw, &mut result.raw) };
        if !succeeded(state) {
            return Err(result
                .error()
                .unwrap_or_else(|| "query execution failed".to_string()));
        }
        Ok(result)
    }
}

impl Drop for PendingHandle {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_destroy_pending(&mut self.raw) };
    }
}

/// A materialized query result.
pub(crate) struct ResultHandle {
    raw: ffi::duckdb_result,
}

impl ResultHandle {
    fn empty() -> Self {
        // SAFETY: `duckdb_result` is a plain C struct; all-zero is its
        // documented "no result" state and destroying it is a no-op.
        Self {
            raw: unsafe { std::mem::zeroed() },
        }
    }

    fn error(&mut self) -> Option<String> {
        unsafe { copy_text(ffi::duckdb_result_error(&mut self.raw)) }.filter(|t| !t.is_empty())
    }

    pub(crate) fn column_count(&mut self) -> usize {
        unsafe { ffi::duckdb_column_count(&mut self.raw) as usize }
    }

    pub(crate) fn column_name(&mut self, column: usize) -> String {
        unsafe { copy_text(ffi::duckdb_column_name(&mut self.raw, column as ffi::idx_t)) }
            .unwrap_or_default()
    }

    pub(crate) fn column_type(&mut self, column: usize) -> LogicalType {
        let raw = unsafe { ffi::duckdb_column_logical_type(&mut self.raw, column as ffi::idx_t) };
        LogicalType::from_raw(raw)
    }

    /// Fetch the next chunk; `None` once the result is exhausted.
    pub(crate) fn fetch_chunk(&mut self) -> Option<ffi::duckdb_data_chunk> {
        let chunk = unsafe { ffi::duckdb_fetch_chunk(self.raw) };
        (!chunk.is_null()).then_some(chunk)
    }
}

impl Drop for ResultHandle {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_destroy_result(&mut self.raw) };
    }
}

// =============================================================================
// Appender and table description
// =============================================================================

/// A native appender bound to one table.
pub(crate) struct AppenderHandle {
    raw: ffi::duckdb_appender,
    destroyed: bool,
}

impl AppenderHandle {
    pub(crate) fn create(
        conn: &ConnectionHandle,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> DuckDbResult<Self> {
        let c_catalog = optional_c_string(catalog)?;
        let c_schema = optional_c_string(schema)?;
        let c_table = c_string(table)?;
        let mut raw: ffi::duckdb_appender = ptr::null_mut();
        let state = unsafe {
            ffi::duckdb_appender_create_ext(
                conn.raw,
                c_ptr(&c_catalog),
                c_ptr(&c_schema),
                c_table.as_ptr(),
                &mut raw,
            )
        };
        if !succeeded(state) {
            let err = engine_error(
                unsafe { ffi::duckdb_appender_error(raw) },
                "could not create appender",
            );
            unsafe { ffi::duckdb_appender_destroy(&mut raw) };
            return Err(err);
        }
        Ok(Self {
            raw,
            destroyed: false,
        })
    }

    fn error(&self) -> DuckDbError {
        engine_error(unsafe { ffi::duckdb_appender_error(self.raw) }, "appender failure")
    }

    fn check(&self, state: ffi::duckdb_state) -> DuckDbResult<()> {
        if succeeded(state) { Ok(()) } else { Err(self.error()) }
    }

    pub(crate) fn column_count(&self) -> usize {
        unsafe { ffi::duckdb_appender_column_count(self.raw) as usize }
    }

    pub(crate) fn column_type(&self, column: usize) -> LogicalType {
        let raw = unsafe { ffi::duckdb_appender_column_type(self.raw, column as ffi::idx_t) };
        LogicalType::from_raw(raw)
    }

    pub(crate) fn append_chunk(&self, chunk: ffi::duckdb_data_chunk) -> DuckDbResult<()> {
        self.check(unsafe { ffi::duckdb_append_data_chunk(self.raw, chunk) })
    }

    pub(crate) fn flush(&self) -> DuckDbResult<()> {
        self.check(unsafe { ffi::duckdb_appender_flush(self.raw) })
    }

    pub(crate) fn clear_columns(&self) -> DuckDbResult<()> {
        self.check(unsafe { ffi::duckdb_appender_clear_columns(self.raw) })
    }

    pub(crate) fn add_column(&self, name: &str) -> DuckDbResult<()> {
        let c_name = c_string(name)?;
        self.check(unsafe { ffi::duckdb_appender_add_column(self.raw, c_name.as_ptr()) })
    }

    /// Destroy the native appender, reporting whether the engine succeeded.
    pub(crate) fn destroy(&mut self) -> bool {
        if self.destroyed {
            return true;
        }
        self.destroyed = true;
        succeeded(unsafe { ffi::duckdb_appender_destroy(&mut self.raw) })
    }
}

impl Drop for AppenderHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Catalog description of a table.
pub(crate) struct TableDescription {
    raw: ffi::duckdb_table_description,
}

impl TableDescription {
    pub(crate) fn create(
        conn: &ConnectionHandle,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> DuckDbResult<Self> {
        let c_catalog = optional_c_string(catalog)?;
        let c_schema = optional_c_string(schema)?;
        let c_table = c_string(table)?;
        let mut raw: ffi::duckdb_table_description = ptr::null_mut();
        let state = unsafe {
            ffi::duckdb_table_description_create_ext(
                conn.raw,
                c_ptr(&c_catalog),
                c_ptr(&c_schema),
                c_table.as_ptr(),
                &mut raw,
            )
        };
        if !succeeded(state) {
            let err = engine_error(
                unsafe { ffi::duckdb_table_description_error(raw) },
                "could not describe table",
            );
            unsafe { ffi::duckdb_table_description_destroy(&mut raw) };
            return Err(err);
        }
        Ok(Self { raw })
    }

    pub(crate) fn column_name(&self, column: usize) -> String {
        let ptr = unsafe {
            ffi::duckdb_table_description_get_column_name(self.raw, column as ffi::idx_t)
        };
        unsafe { take_text(ptr) }.unwrap_or_default()
    }
}

impl Drop for TableDescription {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_table_description_destroy(&mut self.raw) };
    }
}

// =============================================================================
// Profiling
// =============================================================================

/// A node of the engine's profiling tree for the last query on a connection.
///
/// Borrowed from the connection; valid until the next query runs there.
pub(crate) struct ProfilingNode {
    raw: ffi::duckdb_profiling_info,
}

impl ProfilingNode {
    pub(crate) fn root(conn: &ConnectionHandle) -> Option<Self> {
        let raw = unsafe { ffi::duckdb_get_profiling_info(conn.raw) };
        (!raw.is_null()).then_some(Self { raw })
    }

    pub(crate) fn metrics(&self) -> Vec<(String, String)> {
        ValueHandle::from_raw(unsafe { ffi::duckdb_profiling_info_get_metrics(self.raw) })
            .map(|map| map.map_entries())
            .unwrap_or_default()
    }

    pub(crate) fn children(&self) -> Vec<ProfilingNode> {
        let count = unsafe { ffi::duckdb_profiling_info_get_child_count(self.raw) };
        (0..count)
            .map(|i| unsafe { ffi::duckdb_profiling_info_get_child(self.raw, i) })
            .filter(|raw| !raw.is_null())
            .map(|raw| ProfilingNode { raw })
            .collect()
    }
}

// =============================================================================
// Values
// =============================================================================

/// A standalone engine value.
pub(crate) struct ValueHandle {
    raw: ffi::duckdb_value,
}

impl ValueHandle {
    pub(crate) fn from_raw(raw: ffi::duckdb_value) -> Option<Self> {
        (!raw.is_null()).then_some(Self { raw })
    }

    pub(crate) fn raw(&self) -> ffi::duckdb_value {
        self.raw
    }

    /// Time of day with a UTC offset of zero.
    pub(crate) fn time_tz(micros: i64) -> Self {
        let time = unsafe { ffi::duckdb_create_time_tz(micros, 0) };
        Self {
            raw: unsafe { ffi::duckdb_create_time_tz_value(time) },
        }
    }

    /// Text rendering of the value.
    pub(crate) fn to_text(&self) -> String {
        unsafe { take_text(ffi::duckdb_get_varchar(self.raw)) }.unwrap_or_default()
    }

    /// Entries of a MAP value, rendered as text.
    pub(crate) fn map_entries(&self) -> Vec<(String, String)> {
        let size = unsafe { ffi::duckdb_get_map_size(self.raw) };
        (0..size)
            .filter_map(|i| {
                let key = ValueHandle::from_raw(unsafe { ffi::duckdb_get_map_key(self.raw, i) })?;
                let value =
                    ValueHandle::from_raw(unsafe { ffi::duckdb_get_map_value(self.raw, i) })?;
                Some((key.to_text(), value.to_text()))
            })
            .collect()
    }
}

impl Drop for ValueHandle {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_destroy_value(&mut self.raw) };
    }
}

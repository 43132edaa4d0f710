//! Bulk loading through the engine's appender.
//!
//! Rows are buffered into data chunks and handed to the engine a chunk at a
//! time. The engine's column selection is a property of the appender rather
//! than of a row, so a row that populates a different set of columns than the
//! previous one first flushes everything buffered and re-selects columns.

use std::collections::HashMap;
use std::marker::PhantomData;

use tracing::{debug, instrument, warn};

use crate::chunk::{DataChunk, data_chunk_capacity};
use crate::connection::Connection;
use crate::error::{DuckDbError, DuckDbResult};
use crate::handle::{AppenderHandle, ConnectionHandle, TableDescription};
use crate::value::Value;

/// A bulk loader for one table.
///
/// Dropping an appender that was not closed closes it and logs any failure;
/// call [`close`](Self::close) to observe errors.
pub struct Appender<'conn> {
    handle: AppenderHandle,
    table: String,
    columns: Vec<String>,
    active: Vec<bool>,
    chunks: Vec<DataChunk>,
    row_count: usize,
    closed: bool,
    flush_count: usize,
    _conn: PhantomData<&'conn Connection>,
}

impl<'conn> Appender<'conn> {
    #[instrument(skip(conn))]
    pub(crate) fn new(
        conn: &ConnectionHandle,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
    ) -> DuckDbResult<Self> {
        let creation = |e: DuckDbError| DuckDbError::AppenderCreation(Box::new(e));
        let handle = AppenderHandle::create(conn, catalog, schema, table).map_err(creation)?;

        let count = handle.column_count();
        for col in 0..count {
            handle
                .column_type(col)
                .check_supported(true, col + 1)
                .map_err(creation)?;
        }
        let description = TableDescription::create(conn, catalog, schema, table).map_err(creation)?;
        let columns = (0..count).map(|col| description.column_name(col)).collect();

        debug!(columns = count, "appender created");
        Ok(Self {
            handle,
            table: table.to_string(),
            columns,
            active: vec![true; count],
            chunks: Vec::new(),
            row_count: 0,
            closed: false,
            flush_count: 0,
            _conn: PhantomData,
        })
    }

    /// Column names of the target table.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Append a row of values in column order.
    ///
    /// Columns past the end of `values` are left to their defaults.
    pub fn append_row(&mut self, values: &[Value]) -> DuckDbResult<()> {
        let wrap = |e: DuckDbError| DuckDbError::AppenderAppendRow(Box::new(e));
        if self.closed {
            return Err(DuckDbError::AppenderClosed);
        }
        if values.is_empty() || values.len() > self.columns.len() {
            return Err(wrap(DuckDbError::ArgumentCount {
                have: values.len(),
                want: self.columns.len(),
            }));
        }
        let active = (0..self.columns.len()).map(|i| i < values.len()).collect();
        self.append_active(active, values.iter().collect()).map_err(wrap)
    }

    /// Append a row given as column name to value.
    ///
    /// Exactly the named columns are populated.
    pub fn append_row_map(&mut self, row: &HashMap<String, Value>) -> DuckDbResult<()> {
        let wrap = |e: DuckDbError| DuckDbError::AppenderAppendRow(Box::new(e));
        if self.closed {
            return Err(DuckDbError::AppenderClosed);
        }
        if let Some(unknown) = row.keys().find(|name| !self.columns.contains(name)) {
            return Err(wrap(DuckDbError::ColumnNotFound(unknown.clone())));
        }
        if row.is_empty() {
            return Err(wrap(DuckDbError::ArgumentCount {
                have: 0,
                want: self.columns.len(),
            }));
        }
        let active = self.columns.iter().map(|c| row.contains_key(c)).collect();
        let values = self.columns.iter().filter_map(|c| row.get(c)).collect();
        self.append_active(active, values).map_err(wrap)
    }

    /// Buffer one row; `values` holds the active columns in table order.
    fn append_active(&mut self, active: Vec<bool>, values: Vec<&Value>) -> DuckDbResult<()> {
        if active != self.active {
            self.change_active_columns(active)?;
        }

        let capacity = data_chunk_capacity();
        if self.chunks.is_empty() || self.row_count == capacity {
            let types = (0..self.handle.column_count())
                .map(|col| self.handle.column_type(col))
                .collect();
            self.chunks.push(DataChunk::from_types(types, true)?);
            self.row_count = 0;
            debug!(chunks = self.chunks.len(), "allocated data chunk");
        }

        let row = self.row_count;
        let chunk = self
            .chunks
            .last_mut()
            .ok_or_else(|| DuckDbError::internal("appender has no data chunk"))?;
        for (col, value) in values.into_iter().enumerate() {
            chunk.set_value(col, row, value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    fn change_active_columns(&mut self, active: Vec<bool>) -> DuckDbResult<()> {
        debug!(
            active = active.iter().filter(|a| **a).count(),
            "active columns changed"
        );
        self.append_chunks()
            .map_err(|e| DuckDbError::AppenderFlush(Box::new(DuckDbError::Invalidated(Box::new(e)))))?;
        self.handle.clear_columns()?;
        for (name, _) in self.columns.iter().zip(&active).filter(|(_, a)| **a) {
            self.handle.add_column(name)?;
        }
        self.active = active;
        Ok(())
    }

    /// Hand every buffered chunk to the engine, then release them all.
    fn append_chunks(&mut self) -> DuckDbResult<()> {
        if self.chunks.is_empty() {
            return Ok(());
        }
        let capacity = data_chunk_capacity();
        let last = self.chunks.len() - 1;
        let mut result = Ok(());
        for (i, chunk) in self.chunks.iter_mut().enumerate() {
            let size = if i == last { self.row_count } else { capacity };
            let appended = chunk
                .set_size(size)
                .and_then(|()| self.handle.append_chunk(chunk.raw()));
            if let Err(e) = appended {
                result = Err(e);
                break;
            }
        }
        debug!(chunks = self.chunks.len(), "appended data chunks");
        self.chunks.clear();
        self.row_count = 0;
        self.flush_count += 1;
        result
    }

    /// Push all buffered rows to the engine without closing.
    #[instrument(skip(self), fields(table = %self.table))]
    pub fn flush(&mut self) -> DuckDbResult<()> {
        if self.closed {
            return Err(DuckDbError::AppenderClosed);
        }
        self.append_chunks()
            .map_err(|e| DuckDbError::AppenderFlush(Box::new(DuckDbError::Invalidated(Box::new(e)))))?;
        self.handle
            .flush()
            .map_err(|e| DuckDbError::AppenderFlush(Box::new(e)))
    }

    /// Flush remaining rows and release the native appender.
    ///
    /// Every step runs even if an earlier one fails; all failures are
    /// reported together.
    #[instrument(skip(self), fields(table = %self.table))]
    pub fn close(&mut self) -> DuckDbResult<()> {
        if self.closed {
            return Err(DuckDbError::AppenderDoubleClose);
        }
        self.closed = true;

        let chunks = self.append_chunks().err();
        let flush = self.handle.flush().err();
        let destroy = (!self.handle.destroy())
            .then(|| DuckDbError::engine("could not destroy appender"));

        match DuckDbError::join([chunks, flush, destroy]) {
            Some(e) => Err(DuckDbError::AppenderClose(Box::new(e))),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn flush_count(&self) -> usize {
        self.flush_count
    }
}

impl Drop for Appender<'_> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!(table = %self.table, error = %e, "closing appender on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for Appender<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Appender")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("buffered_chunks", &self.chunks.len())
            .field("closed", &self.closed)
            .finish()
    }
}

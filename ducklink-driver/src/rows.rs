//! Result cursors and rows.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::chunk::DataChunk;
use crate::error::{DuckDbError, DuckDbResult};
use crate::handle::ResultHandle;
use crate::statement::Statement;
use crate::types::TypeId;
use crate::value::{FromValue, Value};

/// A cursor over a query result.
///
/// Chunks are fetched from the engine as the cursor advances. The cursor
/// mutably borrows the statement that produced it, or owns it when created
/// through [`Connection::query`](crate::Connection::query).
pub struct Rows<'a> {
    result: ResultHandle,
    columns: Arc<[String]>,
    types: Vec<TypeId>,
    chunk: Option<DataChunk>,
    cursor: usize,
    exhausted: bool,
    _statement: Option<Statement<'a>>,
    _borrow: PhantomData<&'a mut ()>,
}

impl<'a> Rows<'a> {
    pub(crate) fn new(mut result: ResultHandle, statement: Option<Statement<'a>>) -> Self {
        let count = result.column_count();
        let columns: Arc<[String]> = (0..count).map(|i| result.column_name(i)).collect();
        let types = (0..count).map(|i| result.column_type(i).id()).collect();
        Self {
            result,
            columns,
            types,
            chunk: None,
            cursor: 0,
            exhausted: false,
            _statement: statement,
            _borrow: PhantomData,
        }
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Column types.
    pub fn column_types(&self) -> &[TypeId] {
        &self.types
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn decode(chunk: &DataChunk, row: usize, columns: &Arc<[String]>) -> DuckDbResult<Row> {
        let values = (0..chunk.column_count())
            .map(|col| chunk.value(col, row))
            .collect::<DuckDbResult<_>>()?;
        Ok(Row {
            columns: Arc::clone(columns),
            values,
        })
    }

    /// Collect the remaining rows.
    pub fn collect_rows(self) -> DuckDbResult<Vec<Row>> {
        self.collect()
    }
}

impl Iterator for Rows<'_> {
    type Item = DuckDbResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = &self.chunk {
                if self.cursor < chunk.size() {
                    let row = self.cursor;
                    self.cursor += 1;
                    return Some(Self::decode(chunk, row, &self.columns));
                }
            }
            if self.exhausted {
                return None;
            }
            // Release the drained chunk before pulling the next one.
            self.chunk = None;
            match self.result.fetch_chunk() {
                Some(raw) => {
                    self.chunk = Some(DataChunk::from_result(raw));
                    self.cursor = 0;
                }
                None => self.exhausted = true,
            }
        }
    }
}

impl std::fmt::Debug for Rows<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("columns", &self.columns)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

/// One decoded result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row into its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value of column `idx`, if it exists.
    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Typed value of column `idx`.
    pub fn get<T: FromValue>(&self, idx: usize) -> DuckDbResult<T> {
        let value = self.values.get(idx).ok_or(DuckDbError::ColumnIndex {
            index: idx,
            count: self.values.len(),
        })?;
        T::from_value(value.clone()).map_err(|e| e.at_index(idx + 1))
    }

    /// Typed value of the column called `name`.
    pub fn get_by_name<T: FromValue>(&self, name: &str) -> DuckDbResult<T> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DuckDbError::ColumnNotFound(name.to_string()))?;
        self.get(idx)
    }

    /// The row as a JSON object keyed by column name.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.columns
                .iter()
                .zip(&self.values)
                .map(|(c, v)| (c.clone(), v.to_json()))
                .collect(),
        )
    }
}

//! DuckDB driver built directly on the engine's C API.
//!
//! DuckDB is an in-process analytical database. This crate talks to it
//! through the native interface and adds the pieces an application needs
//! around it:
//!
//! - **Typed values**: a [`Value`] enum covering the engine's scalar, temporal
//!   and nested types, with checked conversions to Rust types
//! - **Data chunks**: columnar batches marshalled cell by cell, with
//!   validity masks for NULLs
//! - **Cancellable execution**: every statement takes a
//!   [`CancellationToken`]; cancelling it interrupts the running query
//! - **Parameter binding**: positional, ordinal and named arguments
//! - **Bulk appends**: an [`Appender`] that buffers rows into chunks and
//!   supports writing a subset of columns
//! - **Async pool**: [`DuckDbPool`] runs calls on Tokio's blocking pool
//!
//! # Example
//!
//! ```rust,no_run
//! use ducklink_driver::{params, CancellationToken, Connection};
//!
//! fn main() -> Result<(), ducklink_driver::DuckDbError> {
//!     let conn = Connection::open_in_memory()?;
//!     let token = CancellationToken::new();
//!
//!     conn.execute_batch(&token, "CREATE TABLE sales (region VARCHAR, amount DOUBLE)")?;
//!     conn.exec(&token, "INSERT INTO sales VALUES ($1, $2)", &params!["north", 12.5])?;
//!
//!     for row in conn.query(&token, "SELECT region, SUM(amount) FROM sales GROUP BY 1", &[])? {
//!         let row = row?;
//!         println!("{}: {}", row.get::<String>(0)?, row.get::<f64>(1)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Bulk loading
//!
//! ```rust,no_run
//! use ducklink_driver::{CancellationToken, Connection, Value};
//!
//! # fn main() -> Result<(), ducklink_driver::DuckDbError> {
//! let conn = Connection::open_in_memory()?;
//! conn.execute_batch(&CancellationToken::new(), "CREATE TABLE t (id INTEGER, name VARCHAR)")?;
//!
//! let mut appender = conn.appender(None, None, "t")?;
//! for id in 0..10_000 {
//!     appender.append_row(&[Value::Integer(id), Value::Text(format!("row {id}"))])?;
//! }
//! appender.close()?;
//! # Ok(())
//! # }
//! ```

pub mod appender;
pub mod chunk;
mod codec;
pub mod config;
pub mod connection;
pub mod database;
pub mod error;
mod execute;
mod handle;
pub mod logging;
pub mod pool;
pub mod profiling;
pub mod row;
pub mod rows;
pub mod statement;
pub mod types;
pub mod value;

pub use appender::Appender;
pub use chunk::{DataChunk, data_chunk_capacity};
pub use config::{AccessMode, DatabasePath, DuckDbConfig, DuckDbConfigBuilder};
pub use connection::Connection;
pub use database::Database;
pub use error::{DuckDbError, DuckDbResult};
pub use pool::{DuckDbPool, DuckDbPoolBuilder, PoolConfig, PoolStatus, PooledConnection};
pub use profiling::ProfilingInfo;
pub use row::{FromRow, JsonRowExt, ResultSet};
pub use rows::{Row, Rows};
pub use statement::{ExecResult, Statement};
pub use tokio_util::sync::CancellationToken;
pub use types::{Interval, LogicalType, StatementType, TypeId};
pub use value::{FromValue, NamedValue, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::appender::Appender;
    pub use crate::config::{AccessMode, DuckDbConfig, DuckDbConfigBuilder};
    pub use crate::connection::Connection;
    pub use crate::database::Database;
    pub use crate::error::{DuckDbError, DuckDbResult};
    pub use crate::params;
    pub use crate::pool::{DuckDbPool, DuckDbPoolBuilder};
    pub use crate::row::{FromRow, ResultSet};
    pub use crate::rows::Row;
    pub use crate::value::{FromValue, NamedValue, Value};
    pub use tokio_util::sync::CancellationToken;
}

//! # ducklink
//!
//! Embedded DuckDB access for Rust.
//!
//! ducklink provides:
//! - Typed values for every DuckDB scalar, temporal and nested type
//! - Parameter binding by position, ordinal or `$name`
//! - Query cancellation through [`CancellationToken`]
//! - Bulk loading through chunked appenders
//! - An async connection pool on top of Tokio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ducklink::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DuckDbError> {
//!     let pool = DuckDbPool::new(DuckDbConfig::from_url("duckdb:///tmp/analytics.duckdb")?).await?;
//!     let conn = pool.get().await?;
//!     let token = CancellationToken::new();
//!
//!     let result = conn
//!         .query(&token, "SELECT 42 AS answer WHERE 1 = $1", &params![1])
//!         .await?;
//!     println!("{:?}", result.to_json());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The driver crate.
pub mod driver {
    pub use ducklink_driver::*;
}

pub use ducklink_driver::{
    Appender, CancellationToken, Connection, Database, DuckDbConfig, DuckDbError, DuckDbPool,
    DuckDbResult, NamedValue, Row, Rows, Value, logging, params,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use ducklink_driver::prelude::*;
}

//! Error types for DuckDB operations.
//!
//! Errors fall into four families:
//!
//! - **Usage errors**: lifecycle mistakes such as operating on a closed
//!   statement or executing before binding.
//! - **Binding/type errors**: unsupported types, bad parameter indexes,
//!   argument count mismatches and numeric overflow. These carry the 1-based
//!   parameter (or column) index and the type name.
//! - **Engine errors**: diagnostic text copied verbatim from the engine.
//! - **Cancellation**: kept apart from engine failures because the caller
//!   usually wants to retry rather than fix the query.

use thiserror::Error;

/// Result type for DuckDB operations.
pub type DuckDbResult<T> = Result<T, DuckDbError>;

/// Error type for DuckDB operations.
#[derive(Debug, Error)]
pub enum DuckDbError {
    /// The connection (or database) was already closed.
    #[error("connection is closed")]
    ClosedConnection,
    /// The statement was already closed.
    #[error("statement is closed")]
    ClosedStatement,
    /// A low-level execute was attempted before `bind`.
    #[error("statement parameters are not bound, call bind first")]
    NotBound,
    /// `close` was called on an already closed statement.
    #[error("statement was already closed")]
    DoubleClose,
    /// A row was appended after the appender was closed.
    #[error("could not append row: appender is closed")]
    AppenderClosed,
    /// `close` was called twice on the same appender.
    #[error("appender was already closed")]
    AppenderDoubleClose,

    /// The value or column type is not supported by the driver.
    #[error("unsupported data type {type_name} at index {index}")]
    UnsupportedType {
        /// Engine type name.
        type_name: String,
        /// 1-based parameter or column index.
        index: usize,
    },
    /// A parameter index outside `1..=count`.
    #[error("parameter index {index} out of range, expected 1..={count}")]
    ParamIndex {
        /// Requested index.
        index: usize,
        /// Number of parameters.
        count: usize,
    },
    /// Fewer arguments than parameters, or more values than columns.
    #[error("incorrect argument count: have {have}, want {want}")]
    ArgumentCount {
        /// Supplied count.
        have: usize,
        /// Expected count.
        want: usize,
    },
    /// A numeric value does not fit its target representation.
    #[error("numeric overflow converting {value} to {target}")]
    Overflow {
        /// Rendering of the offending value.
        value: String,
        /// Target type name.
        target: String,
    },
    /// A column index outside the row or chunk.
    #[error("column index {index} out of range for {count} columns")]
    ColumnIndex {
        /// Requested 0-based index.
        index: usize,
        /// Number of columns.
        count: usize,
    },
    /// No column with this name.
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    /// A value cannot be converted to the requested type.
    #[error("type mismatch: cannot convert {actual} to {expected}")]
    TypeMismatch {
        /// Requested type.
        expected: String,
        /// Type of the value.
        actual: String,
    },
    /// Attaches a 1-based parameter/column index to a codec error.
    #[error("{source} (index {index})")]
    AtIndex {
        /// 1-based index.
        index: usize,
        /// Underlying error.
        #[source]
        source: Box<DuckDbError>,
    },

    /// Diagnostic text reported by the engine.
    #[error("duckdb error: {0}")]
    Engine(String),
    /// The execution was interrupted by its cancellation token.
    #[error("query was cancelled")]
    Cancelled,

    /// Binding parameters failed.
    #[error("could not bind parameters: {0}")]
    CouldNotBind(#[source] Box<DuckDbError>),
    /// Creating an appender failed.
    #[error("could not create appender: {0}")]
    AppenderCreation(#[source] Box<DuckDbError>),
    /// Appending a row failed.
    #[error("could not append row: {0}")]
    AppenderAppendRow(#[source] Box<DuckDbError>),
    /// Flushing buffered chunks failed.
    #[error("could not flush appender: {0}")]
    AppenderFlush(#[source] Box<DuckDbError>),
    /// Closing an appender failed.
    #[error("could not close appender: {0}")]
    AppenderClose(#[source] Box<DuckDbError>),
    /// The appender is unusable after this error and must be closed.
    #[error("appender invalidated: {0}")]
    Invalidated(#[source] Box<DuckDbError>),
    /// Several failures from one compound operation.
    #[error("{}", join_messages(.0))]
    Joined(Vec<DuckDbError>),

    /// The engine returned no profiling information.
    #[error("no profiling information available, enable profiling first")]
    ProfilingInfoEmpty,

    /// Pool error.
    #[error("pool error: {0}")]
    Pool(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
    /// File I/O error.
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_messages(errors: &[DuckDbError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DuckDbError {
    /// Create an engine error from diagnostic text.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create a pool error.
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a deserialization error.
    pub fn deserialization(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an unsupported type error.
    pub fn unsupported(type_name: impl Into<String>, index: usize) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
            index,
        }
    }

    /// Create an overflow error.
    pub fn overflow(value: impl ToString, target: impl Into<String>) -> Self {
        Self::Overflow {
            value: value.to_string(),
            target: target.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Attach a 1-based index to this error.
    ///
    /// Errors that already name their index are returned unchanged.
    pub fn at_index(self, index: usize) -> Self {
        match self {
            Self::UnsupportedType { type_name, .. } => Self::UnsupportedType { type_name, index },
            e @ (Self::AtIndex { .. } | Self::ParamIndex { .. } | Self::ColumnIndex { .. }) => e,
            e => Self::AtIndex {
                index,
                source: Box::new(e),
            },
        }
    }

    /// Join the errors of a compound operation.
    ///
    /// Returns `None` when nothing failed and the error itself when only one
    /// step failed.
    pub fn join(errors: impl IntoIterator<Item = Option<DuckDbError>>) -> Option<Self> {
        let mut errors: Vec<_> = errors.into_iter().flatten().collect();
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Joined(errors)),
        }
    }

    /// Iterate over this error and every error it wraps or joins.
    pub fn chain(&self) -> Vec<&DuckDbError> {
        let mut out = vec![self];
        match self {
            Self::AtIndex { source, .. }
            | Self::CouldNotBind(source)
            | Self::AppenderCreation(source)
            | Self::AppenderAppendRow(source)
            | Self::AppenderFlush(source)
            | Self::AppenderClose(source)
            | Self::Invalidated(source) => out.extend(source.chain()),
            Self::Joined(errors) => {
                for e in errors {
                    out.extend(e.chain());
                }
            }
            _ => {}
        }
        out
    }

    /// The innermost errors: those that wrap nothing else.
    pub fn root_causes(&self) -> Vec<&DuckDbError> {
        self.chain()
            .into_iter()
            .filter(|e| {
                !matches!(
                    e,
                    Self::AtIndex { .. }
                        | Self::CouldNotBind(_)
                        | Self::AppenderCreation(_)
                        | Self::AppenderAppendRow(_)
                        | Self::AppenderFlush(_)
                        | Self::AppenderClose(_)
                        | Self::Invalidated(_)
                        | Self::Joined(_)
                )
            })
            .collect()
    }

    /// Check whether any error in the chain satisfies `pred`.
    pub fn contains(&self, pred: impl Fn(&DuckDbError) -> bool) -> bool {
        self.chain().into_iter().any(pred)
    }

    /// Whether the failure was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.contains(|e| matches!(e, Self::Cancelled))
    }

    /// Whether this is a lifecycle misuse rather than a data or engine failure.
    pub fn is_usage(&self) -> bool {
        self.contains(|e| {
            matches!(
                e,
                Self::ClosedConnection
                    | Self::ClosedStatement
                    | Self::NotBound
                    | Self::DoubleClose
                    | Self::AppenderClosed
                    | Self::AppenderDoubleClose
            )
        })
    }

    /// The engine's diagnostic text, if an engine error is in the chain.
    pub fn engine_message(&self) -> Option<&str> {
        self.chain().into_iter().find_map(|e| match e {
            Self::Engine(msg) => Some(msg.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DuckDbError::config("invalid path");
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("invalid path"));

        let err = DuckDbError::unsupported("DECIMAL", 2);
        assert_eq!(err.to_string(), "unsupported data type DECIMAL at index 2");
    }

    #[test]
    fn test_at_index_rewrites_unsupported() {
        let err = DuckDbError::unsupported("LIST", 0).at_index(3);
        assert!(matches!(
            err,
            DuckDbError::UnsupportedType { index: 3, .. }
        ));

        let err = DuckDbError::overflow(300, "TINYINT").at_index(1);
        assert!(matches!(err, DuckDbError::AtIndex { index: 1, .. }));
        assert!(err.to_string().contains("TINYINT"));
    }

    #[test]
    fn test_join() {
        assert!(DuckDbError::join([None, None]).is_none());

        let single = DuckDbError::join([None, Some(DuckDbError::Cancelled)]).unwrap();
        assert!(matches!(single, DuckDbError::Cancelled));

        let joined = DuckDbError::join([
            Some(DuckDbError::engine("flush failed")),
            None,
            Some(DuckDbError::engine("destroy failed")),
        ])
        .unwrap();
        assert!(matches!(joined, DuckDbError::Joined(ref v) if v.len() == 2));
        assert!(joined.to_string().contains("flush failed"));
        assert!(joined.to_string().contains("destroy failed"));
    }

    #[test]
    fn test_chain_predicates() {
        let err = DuckDbError::CouldNotBind(Box::new(DuckDbError::ClosedStatement));
        assert!(err.is_usage());
        assert!(!err.is_cancelled());
        assert!(err.contains(|e| matches!(e, DuckDbError::ClosedStatement)));

        let err = DuckDbError::AppenderFlush(Box::new(DuckDbError::engine("constraint")));
        assert_eq!(err.engine_message(), Some("constraint"));
        assert!(!err.is_usage());
    }

    #[test]
    fn test_root_causes() {
        let err = DuckDbError::AppenderClose(Box::new(DuckDbError::Joined(vec![
            DuckDbError::AppenderFlush(Box::new(DuckDbError::engine("a"))),
            DuckDbError::engine("b"),
        ])));
        let roots: Vec<_> = err.root_causes().iter().map(|e| e.to_string()).collect();
        assert_eq!(roots, vec!["duckdb error: a", "duckdb error: b"]);
    }
}

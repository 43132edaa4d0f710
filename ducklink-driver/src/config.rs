//! Database configuration.
//!
//! Every setting ends up as a `name = value` pair handed to the engine when
//! the database is opened, so a setting that the engine rejects fails the
//! open instead of surfacing later as a `SET` error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{DuckDbError, DuckDbResult};
use crate::handle::ConfigHandle;

/// Where the database lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// In-memory database.
    #[default]
    InMemory,
    /// File-based database.
    File(PathBuf),
}

impl DatabasePath {
    /// Path as passed to the engine.
    pub fn to_engine_path(&self) -> DuckDbResult<String> {
        match self {
            Self::InMemory => Ok(":memory:".to_string()),
            Self::File(path) => path.to_str().map(str::to_string).ok_or_else(|| {
                DuckDbError::config(format!("database path is not valid UTF-8: {:?}", path))
            }),
        }
    }
}

/// Database access mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessMode {
    /// Let the engine decide.
    #[default]
    Automatic,
    /// Read-write access.
    ReadWrite,
    /// Read-only access.
    ReadOnly,
}

impl AccessMode {
    /// Engine option value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::ReadWrite => "read_write",
            Self::ReadOnly => "read_only",
        }
    }

    fn parse(value: &str) -> DuckDbResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(Self::Automatic),
            "read_write" | "readwrite" | "rw" => Ok(Self::ReadWrite),
            "read_only" | "readonly" | "ro" => Ok(Self::ReadOnly),
            other => Err(DuckDbError::config(format!("unknown access mode: {}", other))),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DuckDbConfig {
    /// Database path.
    pub path: DatabasePath,
    /// Access mode.
    pub access_mode: AccessMode,
    /// Number of threads for parallel execution.
    pub threads: Option<usize>,
    /// Memory limit (e.g., "4GB").
    pub memory_limit: Option<String>,
    /// Temporary directory for spilling.
    pub temp_directory: Option<PathBuf>,
    /// Allow file system and network access from SQL.
    pub enable_external_access: bool,
    /// Cache metadata of remote and parquet files.
    pub enable_object_cache: bool,
    /// Default null order (e.g. "nulls_last").
    pub default_null_order: Option<String>,
    /// Default sort order ("asc" or "desc").
    pub default_order: Option<String>,
    /// Any other engine option, passed through verbatim.
    pub options: BTreeMap<String, String>,
}

impl Default for DuckDbConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::InMemory,
            access_mode: AccessMode::Automatic,
            threads: None,
            memory_limit: None,
            temp_directory: None,
            enable_external_access: true,
            enable_object_cache: false,
            default_null_order: None,
            default_order: None,
            options: BTreeMap::new(),
        }
    }
}

impl DuckDbConfig {
    /// Create a new in-memory configuration.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Create a configuration for a database file.
    ///
    /// Missing parent directories are created.
    pub fn from_path(path: impl AsRef<Path>) -> DuckDbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            path: DatabasePath::File(path.to_path_buf()),
            ..Self::default()
        })
    }

    /// Parse a connection URL.
    ///
    /// Supported formats:
    /// - `duckdb://` or `duckdb://:memory:` - In-memory database
    /// - `duckdb:///path/to/file.duckdb` - File-based database
    /// - `duckdb:///path/to/file.duckdb?threads=4&access_mode=read_only`
    ///
    /// Query keys the driver does not model are kept in `options` and handed
    /// to the engine unchanged.
    pub fn from_url(url: &str) -> DuckDbResult<Self> {
        let url = url.trim();
        let rest = url.strip_prefix("duckdb://").ok_or_else(|| {
            DuckDbError::config(format!(
                "invalid URL scheme, expected 'duckdb://', got: {}",
                url
            ))
        })?;

        let (path_str, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let path = if path_str.is_empty() || path_str == ":memory:" {
            DatabasePath::InMemory
        } else {
            DatabasePath::File(PathBuf::from(path_str))
        };

        let mut config = Self {
            path,
            ..Self::default()
        };

        for param in query.into_iter().flat_map(|q| q.split('&')) {
            if param.is_empty() {
                continue;
            }
            let (key, value) = param.split_once('=').ok_or_else(|| {
                DuckDbError::config(format!("URL parameter without a value: {}", param))
            })?;
            config.apply_option(key, value)?;
        }

        Ok(config)
    }

    fn apply_option(&mut self, key: &str, value: &str) -> DuckDbResult<()> {
        let flag = |v: &str| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "on");
        match key {
            "threads" => {
                let threads = value.parse().map_err(|_| {
                    DuckDbError::config(format!("threads must be a positive integer: {}", value))
                })?;
                self.threads = Some(threads);
            }
            "memory_limit" | "max_memory" => self.memory_limit = Some(value.to_string()),
            "access_mode" | "mode" => self.access_mode = AccessMode::parse(value)?,
            "temp_directory" => self.temp_directory = Some(PathBuf::from(value)),
            "external_access" | "enable_external_access" => {
                self.enable_external_access = flag(value)
            }
            "object_cache" | "enable_object_cache" => self.enable_object_cache = flag(value),
            "default_null_order" => self.default_null_order = Some(value.to_string()),
            "default_order" => self.default_order = Some(value.to_string()),
            other => {
                self.options.insert(other.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Create a builder for more complex configurations.
    pub fn builder() -> DuckDbConfigBuilder {
        DuckDbConfigBuilder::default()
    }

    /// Check if this is an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.path, DatabasePath::InMemory)
    }

    /// Check if this is a read-only configuration.
    pub fn is_read_only(&self) -> bool {
        matches!(self.access_mode, AccessMode::ReadOnly)
    }

    /// All settings as engine option pairs, in a stable order.
    pub fn engine_options(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if self.access_mode != AccessMode::Automatic {
            out.push(("access_mode".into(), self.access_mode.as_str().into()));
        }
        if let Some(threads) = self.threads {
            out.push(("threads".into(), threads.to_string()));
        }
        if let Some(ref limit) = self.memory_limit {
            out.push(("memory_limit".into(), limit.clone()));
        }
        if let Some(ref dir) = self.temp_directory {
            out.push(("temp_directory".into(), dir.to_string_lossy().into_owned()));
        }
        if !self.enable_external_access {
            out.push(("enable_external_access".into(), "false".into()));
        }
        if self.enable_object_cache {
            out.push(("enable_object_cache".into(), "true".into()));
        }
        if let Some(ref order) = self.default_null_order {
            out.push(("default_null_order".into(), order.clone()));
        }
        if let Some(ref order) = self.default_order {
            out.push(("default_order".into(), order.clone()));
        }
        out.extend(self.options.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    pub(crate) fn to_engine_config(&self) -> DuckDbResult<ConfigHandle> {
        let mut handle = ConfigHandle::new()?;
        for (name, value) in self.engine_options() {
            handle.set(&name, &value)?;
        }
        Ok(handle)
    }
}

/// Builder for database configuration.
#[derive(Debug, Clone, Default)]
pub struct DuckDbConfigBuilder {
    config: DuckDbConfig,
}

impl DuckDbConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database path.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.path = DatabasePath::File(path.as_ref().to_path_buf());
        self
    }

    /// Use an in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.config.path = DatabasePath::InMemory;
        self
    }

    /// Set the access mode.
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.config.access_mode = mode;
        self
    }

    /// Set read-only mode.
    pub fn read_only(mut self) -> Self {
        self.config.access_mode = AccessMode::ReadOnly;
        self
    }

    /// Set the number of threads.
    pub fn threads(mut self, threads: usize) -> Self {
        self.config.threads = Some(threads);
        self
    }

    /// Set the memory limit.
    pub fn memory_limit(mut self, limit: impl Into<String>) -> Self {
        self.config.memory_limit = Some(limit.into());
        self
    }

    /// Set the temporary directory.
    pub fn temp_directory(mut self, path: impl AsRef<Path>) -> Self {
        self.config.temp_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable external access.
    pub fn external_access(mut self, enable: bool) -> Self {
        self.config.enable_external_access = enable;
        self
    }

    /// Enable or disable the object cache.
    pub fn object_cache(mut self, enable: bool) -> Self {
        self.config.enable_object_cache = enable;
        self
    }

    /// Set the default null order.
    pub fn default_null_order(mut self, order: impl Into<String>) -> Self {
        self.config.default_null_order = Some(order.into());
        self
    }

    /// Set the default order.
    pub fn default_order(mut self, order: impl Into<String>) -> Self {
        self.config.default_order = Some(order.into());
        self
    }

    /// Set an arbitrary engine option.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.options.insert(name.into(), value.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> DuckDbConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_config() {
        let config = DuckDbConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.path.to_engine_path().unwrap(), ":memory:");
        assert!(config.engine_options().is_empty());
    }

    #[test]
    fn test_url_parsing_memory() {
        let config = DuckDbConfig::from_url("duckdb://").unwrap();
        assert!(config.is_in_memory());

        let config = DuckDbConfig::from_url("duckdb://:memory:").unwrap();
        assert!(config.is_in_memory());
    }

    #[test]
    fn test_url_parsing_file() {
        let config = DuckDbConfig::from_url("duckdb:///tmp/test.duckdb").unwrap();
        assert!(!config.is_in_memory());
        assert!(config.path.to_engine_path().unwrap().ends_with("test.duckdb"));
    }

    #[test]
    fn test_url_parsing_params() {
        let config = DuckDbConfig::from_url(
            "duckdb://:memory:?threads=4&memory_limit=4GB&access_mode=READ_ONLY&preserve_insertion_order=false",
        )
        .unwrap();
        assert!(config.is_in_memory());
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.memory_limit, Some("4GB".to_string()));
        assert!(config.is_read_only());
        assert_eq!(
            config.options.get("preserve_insertion_order").map(String::as_str),
            Some("false")
        );
    }

    #[test]
    fn test_url_parsing_errors() {
        assert!(DuckDbConfig::from_url("postgres://localhost").is_err());
        assert!(DuckDbConfig::from_url("duckdb://?threads=many").is_err());
        assert!(DuckDbConfig::from_url("duckdb://?access_mode=sideways").is_err());
        assert!(DuckDbConfig::from_url("duckdb://?threads").is_err());
    }

    #[test]
    fn test_builder() {
        let config = DuckDbConfig::builder()
            .in_memory()
            .threads(8)
            .memory_limit("8GB")
            .read_only()
            .option("checkpoint_threshold", "1GB")
            .build();

        assert!(config.is_in_memory());
        assert_eq!(config.threads, Some(8));
        assert_eq!(config.memory_limit, Some("8GB".to_string()));
        assert!(config.is_read_only());
    }

    #[test]
    fn test_engine_options() {
        let config = DuckDbConfig::builder()
            .threads(2)
            .external_access(false)
            .option("checkpoint_threshold", "1GB")
            .build();

        assert_eq!(
            config.engine_options(),
            vec![
                ("threads".to_string(), "2".to_string()),
                ("enable_external_access".to_string(), "false".to_string()),
                ("checkpoint_threshold".to_string(), "1GB".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_path_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.duckdb");
        let config = DuckDbConfig::from_path(&path).unwrap();
        assert!(path.parent().unwrap().exists());
        assert_eq!(config.path, DatabasePath::File(path));
    }
}

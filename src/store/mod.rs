use crate::ScheduleRow;
use async_trait::async_trait;
use std::env;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    InvalidData(String),
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            StoreError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            StoreError::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Table storage for schedule rows. Dates are canonical `YYYY-MM-DD`
/// strings, so lexical order is calendar order.
#[async_trait]
pub trait ScheduleBackend: Send + Sync {
    /// Deletes rows with `min <= date <= max`, returning the number removed.
    async fn delete_range(&self, min: &str, max: &str) -> StoreResult<usize>;

    /// Inserts all rows or none, returning the number inserted.
    async fn insert_rows(&self, rows: &[ScheduleRow]) -> StoreResult<usize>;

    /// Every row ordered by date, then period.
    async fn fetch_all(&self) -> StoreResult<Vec<ScheduleRow>>;

    /// Distinct dates in ascending order.
    async fn available_dates(&self) -> StoreResult<Vec<String>>;
}

pub const DB_PATH_VAR: &str = "CURRICULUM_DB_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    MissingVariable(&'static str),
    InvalidValue { variable: &'static str, message: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::MissingVariable(name) => {
                write!(f, "storage is not configured: set {name}")
            }
            ConfigurationError::InvalidValue { variable, message } => {
                write!(f, "invalid value for {variable}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Where the schedule table lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(database_path.into()),
        }
    }

    pub fn from_env() -> Self {
        let database_path = env::var_os(DB_PATH_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self { database_path }
    }

    #[cfg(feature = "sqlite")]
    pub fn connect(&self) -> Result<sqlite::SqliteScheduleStore, ConfigurationError> {
        let path = self
            .database_path
            .as_ref()
            .ok_or(ConfigurationError::MissingVariable(DB_PATH_VAR))?;
        sqlite::SqliteScheduleStore::new(path).map_err(|err| ConfigurationError::InvalidValue {
            variable: DB_PATH_VAR,
            message: err.to_string(),
        })
    }
}

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryScheduleStore;

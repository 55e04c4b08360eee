//! Error types for the roster engine.

use thiserror::Error;

/// Main error type for roster operations.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error category surfaced to callers at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidRequest,
    Unknown,
}

impl RosterError {
    /// Classify this error into one of the four boundary categories.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RosterError::NotFound(_) => ErrorKind::NotFound,
            RosterError::Conflict(_) => ErrorKind::Conflict,
            RosterError::Validation(_) => ErrorKind::InvalidRequest,
            RosterError::Storage(StorageError::NotFound(_)) => ErrorKind::NotFound,
            RosterError::Storage(StorageError::Conflict(_)) => ErrorKind::Conflict,
            _ => ErrorKind::Unknown,
        }
    }

    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        RosterError::NotFound(what.to_string())
    }
}

/// Input validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid weekday '{0}', expected one of MON, TUE, WED, THU, FRI, SAT, SUN")]
    InvalidWeekday(String),

    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid time range: start {start} equals end {end}")]
    EmptyTimeRange { start: String, end: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid identifier '{0}': must be non-empty and must not contain '/'")]
    InvalidId(String),

    #[error("Person {person} is not eligible for workday {workday}: {reason}")]
    NotEligible {
        person: String,
        workday: String,
        reason: String,
    },
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Graph storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for roster operations.
pub type Result<T> = std::result::Result<T, RosterError>;

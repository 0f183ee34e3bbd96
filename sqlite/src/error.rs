//! Error types for the SQLite backend.
//!
//! Provides a unified error type covering database access, value
//! conversion, project configuration and the ORM operations run on top.

use recordkit_core::OrmError;
use thiserror::Error;

/// Errors that can occur while storing records in SQLite.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A record operation failed before or after reaching the database.
    #[error(transparent)]
    Orm(#[from] OrmError),

    /// A value cannot be bound to or read from a SQLite column.
    #[error("conversion error: {0}")]
    ConversionError(String),

    /// Migration lifecycle operation failure.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// The project configuration is unusable.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// File system access failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;

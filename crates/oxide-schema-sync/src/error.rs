//! Error types for schema synchronisation.

/// Errors that can occur while reading, planning or applying schemas.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A statement failed to execute.
    #[error("Statement failed: {sql}: {source}")]
    Statement {
        /// The statement that failed.
        sql: String,
        /// The underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// The declared or live schema is invalid, or planning failed.
    #[error("Schema error: {0}")]
    Schema(#[from] oxide_schema::Error),

    /// IO error (reading schema or DDL files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The plan rebuilds tables and destructive changes were not allowed.
    #[error("Plan recreates {}; rerun with destructive changes allowed", .0.join(", "))]
    DestructiveChange(Vec<String>),

    /// No dialect goes by this name.
    #[error("Unknown dialect '{0}'; expected sqlite, mysql or postgres")]
    UnknownDialect(String),

    /// The live database uses a dialect this crate cannot apply plans to.
    #[error("Cannot apply plans for dialect '{0}'; only sqlite databases are supported")]
    UnsupportedDialect(String),
}

/// Result type for synchronisation operations.
pub type Result<T> = std::result::Result<T, SyncError>;

//! Error types for the schema pipeline.

use crate::ddl::ParseError;

/// Errors raised while validating, parsing, planning or compiling.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// DDL text did not match the shapes this crate emits.
    #[error("Unsupported schema shape: {0}")]
    UnsupportedSchema(#[from] ParseError),

    /// A table declares more than one primary key.
    #[error("Table '{0}' declares more than one primary key")]
    DuplicatePrimaryKey(String),

    /// A table declares the same property twice.
    #[error("Table '{table}' declares property '{property}' more than once")]
    DuplicateProperty {
        /// Table name.
        table: String,
        /// Repeated property name.
        property: String,
    },

    /// An index, unique or primary key lists no properties.
    #[error("Index '{index}' on table '{table}' has no properties")]
    EmptyIndex {
        /// Table name.
        table: String,
        /// Index name (or its derived name).
        index: String,
    },

    /// A constraint refers to a property the table does not have.
    #[error("'{constraint}' on table '{table}' refers to unknown property '{property}'")]
    UnknownProperty {
        /// Table name.
        table: String,
        /// Constraint name (or its derived name).
        constraint: String,
        /// The missing property.
        property: String,
    },

    /// A foreign key has to be dropped but has no name to address it by.
    #[error("Foreign key on table '{table}' ({columns}) has no name and cannot be altered")]
    UnnamedForeignKey {
        /// Table name.
        table: String,
        /// Comma-separated local columns.
        columns: String,
    },

    /// The dialect cannot express the auto-increment column.
    #[error("Auto-increment column '{property}' on table '{table}' must be the sole INTEGER primary key in {dialect}")]
    UnsupportedAutoIncrement {
        /// Table name.
        table: String,
        /// The auto-increment property.
        property: String,
        /// Dialect preset name.
        dialect: &'static str,
    },

    /// The query could not be compiled.
    #[error("Query error: {0}")]
    Query(String),
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, Error>;

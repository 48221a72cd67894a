//! Applies `oxide-schema` migration plans to live SQLite databases.
//!
//! The core crate is pure: it plans but never touches a database. This
//! crate adds the I/O around it:
//!
//! - **Reader** - loads the stored DDL from `sqlite_master` and parses it
//! - **Executor** - runs migration scripts statement by statement
//! - **Synchronizer** - reads, plans and applies, refusing table rebuilds
//!   unless they are allowed
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_schema::model::{integer, text, Table};
//! use oxide_schema_sync::prelude::*;
//!
//! let users = Table::builder("users")
//!     .property(integer("id").auto_increment())
//!     .property(text("bio"))
//!     .primary_key(&["id"])
//!     .build()?;
//!
//! let sync = Synchronizer::new(pool, SyncOptions::new().allow_destructive(true));
//! let report = sync.sync(&[users]).await?;
//! println!("{} statements", report.executed);
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the migration script for a declared schema
//! oxide-schema plan --schema schema.json
//!
//! # Apply it, allowing table rebuilds
//! oxide-schema apply --schema schema.json --allow-destructive
//!
//! # Print the live schema
//! oxide-schema inspect users posts
//! ```

pub mod error;
pub mod executor;
pub mod reader;
pub mod sync;

use oxide_schema::Dialect;

use crate::error::{Result, SyncError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SyncError};
    pub use crate::executor::{split_script, ScriptExecutor};
    pub use crate::reader::SqliteSchemaReader;
    pub use crate::sync::{load_schema, SyncOptions, SyncReport, Synchronizer};
}

/// Looks up a dialect by name (`sqlite`, `mysql`, `postgres`, ...).
///
/// # Errors
///
/// Returns [`SyncError::UnknownDialect`] for any other name.
pub fn dialect_by_name(name: &str) -> Result<Dialect> {
    Dialect::by_name(name).ok_or_else(|| SyncError::UnknownDialect(name.to_string()))
}

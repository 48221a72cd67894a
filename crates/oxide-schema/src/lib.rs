//! # oxide-schema
//!
//! Declarative table definitions and the pipeline that keeps a database
//! in line with them.
//!
//! This crate provides:
//! - A schema model (tables, columns, primary keys, indices, uniques,
//!   foreign keys) with a fluent builder
//! - A DDL emitter and a DDL parser that read back what the emitter writes
//! - A differ and migration planner with a table-recreate strategy for
//!   databases that cannot alter columns
//! - A parameterised SELECT builder whose compiler folds NULL comparisons
//!
//! The crate performs no I/O. `oxide-schema-sync` applies plans to a live
//! database.
//!
//! ## Planning a migration
//!
//! ```rust
//! use oxide_schema::model::{integer, text, Table};
//! use oxide_schema::{Dialect, Planner};
//!
//! let current = Table::builder("users")
//!     .property(integer("id").auto_increment())
//!     .primary_key(&["id"])
//!     .build()
//!     .unwrap();
//! let desired = Table::builder("users")
//!     .property(integer("id").auto_increment())
//!     .property(text("bio"))
//!     .primary_key(&["id"])
//!     .build()
//!     .unwrap();
//!
//! let plan = Planner::new(Dialect::postgres())
//!     .plan(&[desired], &[current])
//!     .unwrap();
//! assert_eq!(plan.sql(), vec!["ALTER TABLE \"users\" ADD COLUMN \"bio\" TEXT"]);
//! ```
//!
//! ## Round trip
//!
//! ```rust
//! use oxide_schema::model::{integer, varchar, Table};
//! use oxide_schema::{emit, parse, Dialect};
//!
//! let table = Table::builder("tags")
//!     .property(integer("id").auto_increment())
//!     .property(varchar("label", 64).not_null())
//!     .primary_key(&["id"])
//!     .unique(&["label"])
//!     .build()
//!     .unwrap();
//!
//! let parsed = parse(&emit(&table, &Dialect::sqlite())).unwrap();
//! assert_eq!(parsed, vec![table.with_derived_names()]);
//! ```

pub mod catalog;
pub mod ddl;
pub mod dialect;
pub mod diff;
mod error;
pub mod model;
pub mod plan;
pub mod query;

pub use ddl::{emit, parse, ParseError};
pub use dialect::Dialect;
pub use diff::Change;
pub use error::{Error, Result};
pub use model::{SchemaCache, Table};
pub use plan::{MigrationPlan, Planner, Statement};

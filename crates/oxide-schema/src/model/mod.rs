//! Schema model: tables, columns, indices and foreign keys.
//!
//! The model is the single source of truth shared by the emitter, the
//! parser, the planner and the query compiler.

mod cache;
mod constraint;
pub mod naming;
mod property;
mod table;

pub use cache::SchemaCache;
pub use constraint::{ForeignKey, ForeignKeyAction, Index, Reference};
pub use property::{
    bigint, blob, boolean, decimal, integer, quote_literal, real, text, timestamp, varchar,
    DefaultValue, Property,
};
pub use table::{Table, TableBuilder};

//! Parameterised query builder and compiler.
//!
//! Queries are built declaratively and compiled against a [`Dialect`]
//! and a [`SchemaCache`]; the compiler binds placeholders, folds NULL
//! comparisons into `IS [NOT] NULL` and resolves record references
//! through the primary key of their table.
//!
//! [`Dialect`]: crate::Dialect
//! [`SchemaCache`]: crate::SchemaCache

mod condition;
mod select;
mod value;

pub use condition::{col, placeholder, value, ColumnRef, Condition, Operand, Operator, Predicate};
pub use select::{CompiledQuery, Direction, Join, JoinKind, Ordering, Select, SelectItem};
pub use value::{Record, SqlValue, ToSqlValue};

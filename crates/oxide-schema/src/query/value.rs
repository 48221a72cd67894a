//! SQL values and record references.

use serde::{Deserialize, Serialize};

use crate::dialect::{BooleanLiteral, Dialect};
use crate::model::quote_literal;

/// A SQL value that can be bound as a parameter or inlined as a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns the value as an inline SQL literal for `dialect`.
    ///
    /// Strings are quoted with embedded quotes doubled; booleans follow
    /// the dialect encoding.
    #[must_use]
    pub fn to_sql_inline(&self, dialect: &Dialect) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => match (dialect.boolean_literal, *b) {
                (BooleanLiteral::Keyword, true) => String::from("TRUE"),
                (BooleanLiteral::Keyword, false) => String::from("FALSE"),
                (BooleanLiteral::Integer, true) => String::from("1"),
                (BooleanLiteral::Integer, false) => String::from("0"),
            },
            Self::Int(n) => n.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::Text(s) => quote_literal(s),
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }

    /// Returns true for `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Types that convert into a [`SqlValue`].
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        self.map_or(SqlValue::Null, ToSqlValue::to_sql_value)
    }
}

/// A reference to a stored record, compared through its primary key.
///
/// Only the identifier is used when the record appears in a condition:
/// the compiler looks up the table's single-column primary key and
/// inlines that column's value.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Table the record belongs to.
    pub table: String,
    /// Known column values.
    pub values: Vec<(String, SqlValue)>,
}

impl Record {
    /// Creates a record reference with no values.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
        }
    }

    /// Sets a column value.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.values.push((column.into(), value.to_sql_value()));
        self
    }

    /// Returns the value of `column`, if set.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_literals() {
        let pg = Dialect::postgres();
        assert_eq!(SqlValue::Null.to_sql_inline(&pg), "NULL");
        assert_eq!(SqlValue::Int(-100).to_sql_inline(&pg), "-100");
        assert_eq!(SqlValue::Float(2.5).to_sql_inline(&pg), "2.5");
        assert_eq!(SqlValue::Text("O'Brien".into()).to_sql_inline(&pg), "'O''Brien'");
        assert_eq!(
            SqlValue::Blob(vec![0x48, 0x49]).to_sql_inline(&pg),
            "X'4849'"
        );
    }

    #[test]
    fn test_booleans_follow_dialect() {
        assert_eq!(SqlValue::Bool(true).to_sql_inline(&Dialect::postgres()), "TRUE");
        assert_eq!(SqlValue::Bool(true).to_sql_inline(&Dialect::sqlite()), "1");
        assert_eq!(SqlValue::Bool(false).to_sql_inline(&Dialect::mysql()), "0");
    }

    #[test]
    fn test_injection_is_quoted() {
        let value = SqlValue::Text("'; DROP TABLE users; --".into());
        assert_eq!(
            value.to_sql_inline(&Dialect::sqlite()),
            "'''; DROP TABLE users; --'"
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(42_i32.to_sql_value(), SqlValue::Int(42));
        assert_eq!("hi".to_sql_value(), SqlValue::Text("hi".into()));
        assert_eq!(None::<i64>.to_sql_value(), SqlValue::Null);
        assert_eq!(Some(true).to_sql_value(), SqlValue::Bool(true));
    }

    #[test]
    fn test_record_values() {
        let record = Record::new("users").with("id", 7_i64).with("handle", "ann");
        assert_eq!(record.value("id"), Some(&SqlValue::Int(7)));
        assert_eq!(record.value("missing"), None);
    }
}

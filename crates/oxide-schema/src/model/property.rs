//! Column (property) definitions.
//!
//! Provides the value type the planner compares plus a fluent API for
//! declaring columns, in place of discovering them from record fields.

use serde::{Deserialize, Serialize};

use crate::dialect::{BooleanLiteral, Dialect, EnumLiteral};

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default, encoded per dialect.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    Text(String),
    /// Enum default, stored as its ordinal or its name depending on the dialect.
    Enum {
        /// Variant name.
        name: String,
        /// Variant position.
        ordinal: i64,
    },
    /// Raw SQL expression (e.g., CURRENT_TIMESTAMP).
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL literal for this default in the given dialect.
    #[must_use]
    pub fn to_sql(&self, dialect: &Dialect) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => match (dialect.boolean_literal, *b) {
                (BooleanLiteral::Keyword, true) => String::from("TRUE"),
                (BooleanLiteral::Keyword, false) => String::from("FALSE"),
                (BooleanLiteral::Integer, true) => String::from("1"),
                (BooleanLiteral::Integer, false) => String::from("0"),
            },
            Self::Integer(i) => i.to_string(),
            // Debug keeps the fractional part so the literal reads back as a float.
            Self::Float(f) => format!("{f:?}"),
            Self::Text(s) => quote_literal(s),
            Self::Enum { name, ordinal } => match dialect.enum_literal {
                EnumLiteral::Ordinal => ordinal.to_string(),
                EnumLiteral::Name => quote_literal(name),
            },
            Self::Expression(expr) => expr.clone(),
        }
    }
}

/// Quotes a string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Column name.
    pub name: String,
    /// Dialect-neutral base type name, upper case (INTEGER, TEXT, ...).
    pub sql_type: String,
    /// Type parameters such as length or precision.
    #[serde(default)]
    pub type_params: Vec<String>,
    /// Whether the column accepts NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Default value, if any.
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Whether the database assigns values automatically.
    #[serde(default)]
    pub auto_increment: bool,
}

const fn default_nullable() -> bool {
    true
}

impl Property {
    /// Creates a nullable column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into().to_ascii_uppercase(),
            type_params: Vec::new(),
            nullable: true,
            default: None,
            auto_increment: false,
        }
    }

    /// Appends a type parameter.
    #[must_use]
    pub fn param(mut self, param: impl ToString) -> Self {
        self.type_params.push(param.to_string());
        self
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as nullable (default).
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column as auto-incrementing. Implies NOT NULL.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets a boolean default value.
    #[must_use]
    pub fn default_bool(self, value: bool) -> Self {
        self.default_value(DefaultValue::Bool(value))
    }

    /// Sets an integer default value.
    #[must_use]
    pub fn default_int(self, value: i64) -> Self {
        self.default_value(DefaultValue::Integer(value))
    }

    /// Sets a float default value.
    #[must_use]
    pub fn default_float(self, value: f64) -> Self {
        self.default_value(DefaultValue::Float(value))
    }

    /// Sets a string default value.
    #[must_use]
    pub fn default_str(self, value: impl Into<String>) -> Self {
        self.default_value(DefaultValue::Text(value.into()))
    }

    /// Sets an enum default value.
    #[must_use]
    pub fn default_enum(self, name: impl Into<String>, ordinal: i64) -> Self {
        self.default_value(DefaultValue::Enum {
            name: name.into(),
            ordinal,
        })
    }

    /// Sets a raw SQL expression as default (e.g., CURRENT_TIMESTAMP).
    #[must_use]
    pub fn default_expr(self, expr: impl Into<String>) -> Self {
        self.default_value(DefaultValue::Expression(expr.into()))
    }

    /// Returns the type with its parameters, e.g. `VARCHAR(255)`.
    #[must_use]
    pub fn type_sql(&self) -> String {
        if self.type_params.is_empty() {
            self.sql_type.clone()
        } else {
            format!("{}({})", self.sql_type, self.type_params.join(", "))
        }
    }

    /// Returns whether the column holds booleans.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        matches!(self.sql_type.as_str(), "BOOLEAN" | "BOOL")
    }

    /// Compares two columns the way a database would see them: defaults
    /// are compared by their rendered literal in `dialect`.
    #[must_use]
    pub fn matches(&self, other: &Self, dialect: &Dialect) -> bool {
        self.name == other.name
            && self.sql_type == other.sql_type
            && self.type_params == other.type_params
            && self.nullable == other.nullable
            && self.auto_increment == other.auto_increment
            && self.default.as_ref().map(|d| d.to_sql(dialect))
                == other.default.as_ref().map(|d| d.to_sql(dialect))
    }
}

// =============================================================================
// Shorthand Functions for Common Types
// =============================================================================

/// Creates an INTEGER column.
#[must_use]
pub fn integer(name: impl Into<String>) -> Property {
    Property::new(name, "INTEGER")
}

/// Creates a BIGINT column.
#[must_use]
pub fn bigint(name: impl Into<String>) -> Property {
    Property::new(name, "BIGINT")
}

/// Creates a REAL column.
#[must_use]
pub fn real(name: impl Into<String>) -> Property {
    Property::new(name, "REAL")
}

/// Creates a DECIMAL column.
#[must_use]
pub fn decimal(name: impl Into<String>, precision: u16, scale: u16) -> Property {
    Property::new(name, "DECIMAL").param(precision).param(scale)
}

/// Creates a VARCHAR column.
#[must_use]
pub fn varchar(name: impl Into<String>, len: u32) -> Property {
    Property::new(name, "VARCHAR").param(len)
}

/// Creates a TEXT column.
#[must_use]
pub fn text(name: impl Into<String>) -> Property {
    Property::new(name, "TEXT")
}

/// Creates a BOOLEAN column.
#[must_use]
pub fn boolean(name: impl Into<String>) -> Property {
    Property::new(name, "BOOLEAN")
}

/// Creates a TIMESTAMP column.
#[must_use]
pub fn timestamp(name: impl Into<String>) -> Property {
    Property::new(name, "TIMESTAMP")
}

/// Creates a BLOB column.
#[must_use]
pub fn blob(name: impl Into<String>) -> Property {
    Property::new(name, "BLOB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_property() {
        let prop = integer("id");
        assert_eq!(prop.name, "id");
        assert_eq!(prop.sql_type, "INTEGER");
        assert!(prop.nullable);
        assert!(!prop.auto_increment);
    }

    #[test]
    fn test_type_is_upper_cased() {
        let prop = Property::new("name", "varchar").param(64);
        assert_eq!(prop.sql_type, "VARCHAR");
        assert_eq!(prop.type_sql(), "VARCHAR(64)");
    }

    #[test]
    fn test_auto_increment_implies_not_null() {
        let prop = bigint("id").auto_increment();
        assert!(prop.auto_increment);
        assert!(!prop.nullable);
    }

    #[test]
    fn test_default_value_to_sql() {
        let sqlite = Dialect::sqlite();
        let pg = Dialect::postgres();
        assert_eq!(DefaultValue::Null.to_sql(&pg), "NULL");
        assert_eq!(DefaultValue::Bool(true).to_sql(&pg), "TRUE");
        assert_eq!(DefaultValue::Bool(true).to_sql(&sqlite), "1");
        assert_eq!(DefaultValue::Bool(false).to_sql(&sqlite), "0");
        assert_eq!(DefaultValue::Integer(-3).to_sql(&pg), "-3");
        assert_eq!(DefaultValue::Float(1.0).to_sql(&pg), "1.0");
        assert_eq!(DefaultValue::Text("it's".into()).to_sql(&pg), "'it''s'");
        assert_eq!(
            DefaultValue::Expression("CURRENT_TIMESTAMP".into()).to_sql(&pg),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_enum_default_follows_dialect() {
        let value = DefaultValue::Enum {
            name: "DRAFT".into(),
            ordinal: 2,
        };
        assert_eq!(value.to_sql(&Dialect::sqlite()), "2");
        assert_eq!(value.to_sql(&Dialect::postgres()), "'DRAFT'");
    }

    #[test]
    fn test_matches_compares_rendered_defaults() {
        let sqlite = Dialect::sqlite();
        let declared = integer("status").default_enum("ACTIVE", 1);
        let stored = integer("status").default_int(1);
        assert_ne!(declared, stored);
        assert!(declared.matches(&stored, &sqlite));
        assert!(!declared.matches(&stored, &Dialect::postgres()));
    }
}

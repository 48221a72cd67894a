//! Condition trees for WHERE and JOIN ... ON clauses.

use super::value::{Record, SqlValue, ToSqlValue};

/// A column reference with an optional table qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table name or alias.
    pub qualifier: Option<String>,
    /// Column name.
    pub name: String,
}

impl ColumnRef {
    /// Creates a column reference. `"u.handle"` is split into qualifier
    /// `u` and column `handle`.
    #[must_use]
    pub fn new(column: &str) -> Self {
        match column.split_once('.') {
            Some((qualifier, name)) => Self {
                qualifier: Some(qualifier.to_string()),
                name: name.to_string(),
            },
            None => Self {
                qualifier: None,
                name: column.to_string(),
            },
        }
    }

    /// Renders `qualifier.name` or `name`.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{q}.{}", self.name),
            None => self.name.clone(),
        }
    }

    fn compare(self, operator: Operator, rhs: impl Into<Operand>) -> Condition {
        Condition::Leaf(Predicate {
            column: self,
            operator,
            operand: Some(rhs.into()),
        })
    }

    /// `column = rhs`
    #[must_use]
    pub fn eq(self, rhs: impl Into<Operand>) -> Condition {
        self.compare(Operator::Eq, rhs)
    }

    /// `column <> rhs`
    #[must_use]
    pub fn ne(self, rhs: impl Into<Operand>) -> Condition {
        self.compare(Operator::NotEq, rhs)
    }

    /// `column < rhs`
    #[must_use]
    pub fn lt(self, rhs: impl Into<Operand>) -> Condition {
        self.compare(Operator::Lt, rhs)
    }

    /// `column <= rhs`
    #[must_use]
    pub fn le(self, rhs: impl Into<Operand>) -> Condition {
        self.compare(Operator::LtEq, rhs)
    }

    /// `column > rhs`
    #[must_use]
    pub fn gt(self, rhs: impl Into<Operand>) -> Condition {
        self.compare(Operator::Gt, rhs)
    }

    /// `column >= rhs`
    #[must_use]
    pub fn ge(self, rhs: impl Into<Operand>) -> Condition {
        self.compare(Operator::GtEq, rhs)
    }

    /// `column LIKE rhs`
    #[must_use]
    pub fn like(self, rhs: impl Into<Operand>) -> Condition {
        self.compare(Operator::Like, rhs)
    }

    /// `column IS NULL`
    #[must_use]
    pub fn is_null(self) -> Condition {
        Condition::Leaf(Predicate {
            column: self,
            operator: Operator::IsNull,
            operand: None,
        })
    }

    /// `column IS NOT NULL`
    #[must_use]
    pub fn is_not_null(self) -> Condition {
        Condition::Leaf(Predicate {
            column: self,
            operator: Operator::IsNotNull,
            operand: None,
        })
    }
}

/// Shorthand for [`ColumnRef::new`].
#[must_use]
pub fn col(column: &str) -> ColumnRef {
    ColumnRef::new(column)
}

/// A runtime parameter, bound at compile time from the parameter list.
#[must_use]
pub const fn placeholder() -> Operand {
    Operand::Placeholder
}

/// A literal value, inlined into the SQL text.
#[must_use]
pub fn value(value: impl ToSqlValue) -> Operand {
    Operand::Value(value.to_sql_value())
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `LIKE`
    Like,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

impl Operator {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    /// The null test an `=` / `<>` comparison against NULL folds into.
    #[must_use]
    pub const fn null_form(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::IsNull),
            Self::NotEq => Some(Self::IsNotNull),
            _ => None,
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `?`, bound from the parameter list.
    Placeholder,
    /// Literal value.
    Value(SqlValue),
    /// Another column.
    Column(ColumnRef),
    /// A record, compared through its primary key value.
    Record(Record),
}

impl From<SqlValue> for Operand {
    fn from(value: SqlValue) -> Self {
        Self::Value(value)
    }
}

impl From<ColumnRef> for Operand {
    fn from(column: ColumnRef) -> Self {
        Self::Column(column)
    }
}

impl From<Record> for Operand {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

/// A single comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Left-hand column.
    pub column: ColumnRef,
    /// Operator.
    pub operator: Operator,
    /// Right-hand side; `None` for `IS [NOT] NULL`.
    pub operand: Option<Operand>,
}

/// A boolean expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single comparison.
    Leaf(Predicate),
    /// Both sides hold.
    And(Box<Condition>, Box<Condition>),
    /// Either side holds.
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// `self AND other`
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self OR other`
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Number of placeholders, in textual order.
    #[must_use]
    pub fn placeholders(&self) -> usize {
        match self {
            Self::Leaf(p) => usize::from(matches!(p.operand, Some(Operand::Placeholder))),
            Self::And(l, r) | Self::Or(l, r) => l.placeholders() + r.placeholders(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref_split() {
        assert_eq!(col("u.handle").to_sql(), "u.handle");
        assert_eq!(col("u.handle").qualifier.as_deref(), Some("u"));
        assert_eq!(col("handle").qualifier, None);
    }

    #[test]
    fn test_tree_building() {
        let cond = col("a")
            .eq(placeholder())
            .and(col("b").gt(value(3)))
            .or(col("c").is_null());
        assert!(matches!(cond, Condition::Or(..)));
        assert_eq!(cond.placeholders(), 1);
    }

    #[test]
    fn test_null_form() {
        assert_eq!(Operator::Eq.null_form(), Some(Operator::IsNull));
        assert_eq!(Operator::NotEq.null_form(), Some(Operator::IsNotNull));
        assert_eq!(Operator::Like.null_form(), None);
    }
}

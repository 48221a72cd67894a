//! SELECT builder and compiler.

use tracing::debug;

use super::condition::{ColumnRef, Condition, Operand, Predicate};
use super::value::{Record, SqlValue};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::model::SchemaCache;

/// A select-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    /// A column with an optional alias.
    Column {
        /// Column reference.
        column: ColumnRef,
        /// Output alias.
        alias: Option<String>,
    },
    /// A raw expression; it always carries an alias.
    Expression {
        /// Expression SQL, rendered verbatim.
        sql: String,
        /// Output alias.
        alias: String,
    },
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
}

impl JoinKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// A join against another table.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join type.
    pub kind: JoinKind,
    /// Joined table.
    pub table: String,
    /// Table alias.
    pub alias: Option<String>,
    /// ON condition.
    pub on: Condition,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// An ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    /// Sorted column.
    pub column: ColumnRef,
    /// Direction.
    pub direction: Direction,
}

/// A compiled query: SQL text plus the parameters still bound to `?`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text.
    pub sql: String,
    /// Parameters, one per remaining placeholder, in textual order.
    pub params: Vec<SqlValue>,
}

/// A SELECT statement builder.
///
/// ```
/// use oxide_schema::query::{col, placeholder, Select};
/// use oxide_schema::{Dialect, SchemaCache};
///
/// let query = Select::new()
///     .column("u.id")
///     .from_as("users", "u")
///     .filter(col("u.handle").eq(placeholder()))
///     .compile(&Dialect::sqlite(), &SchemaCache::new(), &[None])
///     .unwrap();
/// assert_eq!(query.sql, "SELECT u.id FROM users u WHERE u.handle IS NULL");
/// assert!(query.params.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    items: Vec<SelectItem>,
    from: Option<(String, Option<String>)>,
    joins: Vec<Join>,
    condition: Option<Condition>,
    groupings: Vec<ColumnRef>,
    orderings: Vec<Ordering>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    /// Creates an empty SELECT.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, optionally qualified (`"u.handle"`).
    #[must_use]
    pub fn column(mut self, column: &str) -> Self {
        self.items.push(SelectItem::Column {
            column: ColumnRef::new(column),
            alias: None,
        });
        self
    }

    /// Adds an aliased column.
    #[must_use]
    pub fn column_as(mut self, column: &str, alias: &str) -> Self {
        self.items.push(SelectItem::Column {
            column: ColumnRef::new(column),
            alias: Some(String::from(alias)),
        });
        self
    }

    /// Adds a raw expression such as `COUNT(*)`.
    #[must_use]
    pub fn expression(mut self, sql: &str, alias: &str) -> Self {
        self.items.push(SelectItem::Expression {
            sql: String::from(sql),
            alias: String::from(alias),
        });
        self
    }

    /// Sets the FROM table.
    #[must_use]
    pub fn from(mut self, table: &str) -> Self {
        self.from = Some((String::from(table), None));
        self
    }

    /// Sets the FROM table with an alias.
    #[must_use]
    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        self.from = Some((String::from(table), Some(String::from(alias))));
        self
    }

    fn join(mut self, kind: JoinKind, table: &str, alias: Option<&str>, on: Condition) -> Self {
        self.joins.push(Join {
            kind,
            table: String::from(table),
            alias: alias.map(String::from),
            on,
        });
        self
    }

    /// Adds an INNER JOIN.
    #[must_use]
    pub fn inner_join(self, table: &str, alias: &str, on: Condition) -> Self {
        self.join(JoinKind::Inner, table, Some(alias), on)
    }

    /// Adds a LEFT JOIN.
    #[must_use]
    pub fn left_join(self, table: &str, alias: &str, on: Condition) -> Self {
        self.join(JoinKind::Left, table, Some(alias), on)
    }

    /// Sets the WHERE condition, replacing any previous one.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// ANDs `condition` onto the WHERE clause.
    #[must_use]
    pub fn and_where(mut self, condition: Condition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// ORs `condition` onto the WHERE clause.
    #[must_use]
    pub fn or_where(mut self, condition: Condition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.or(condition),
            None => condition,
        });
        self
    }

    /// Adds a GROUP BY column.
    #[must_use]
    pub fn group_by(mut self, column: &str) -> Self {
        self.groupings.push(ColumnRef::new(column));
        self
    }

    /// Adds an ORDER BY column.
    #[must_use]
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.orderings.push(Ordering {
            column: ColumnRef::new(column),
            direction,
        });
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Number of `?` placeholders in textual order (joins, then WHERE).
    #[must_use]
    pub fn placeholders(&self) -> usize {
        self.joins.iter().map(|j| j.on.placeholders()).sum::<usize>()
            + self.condition.as_ref().map_or(0, Condition::placeholders)
    }

    /// Compiles the query, binding `params` to the placeholders in order.
    ///
    /// A `None` or `NULL` parameter compared with `=` or `<>` becomes
    /// `IS NULL` / `IS NOT NULL` and is dropped from the bound list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] when the parameter count does not match
    /// the placeholders, when there is no FROM table, or when a record
    /// reference cannot be resolved through `cache`.
    pub fn compile(
        &self,
        dialect: &Dialect,
        cache: &SchemaCache,
        params: &[Option<SqlValue>],
    ) -> Result<CompiledQuery> {
        let expected = self.placeholders();
        if expected != params.len() {
            return Err(Error::Query(format!(
                "expected {expected} parameters, got {}",
                params.len()
            )));
        }

        let mut compiler = Compiler {
            dialect,
            cache,
            params: Some(params),
            position: 0,
            folded: Vec::new(),
        };
        let sql = compiler.select(self)?;

        let mut bound: Vec<SqlValue> = params
            .iter()
            .map(|p| p.clone().unwrap_or(SqlValue::Null))
            .collect();
        let mut folded = compiler.folded;
        folded.sort_unstable_by(|a, b| b.cmp(a));
        for index in folded {
            bound.remove(index);
        }

        debug!(sql = %sql, params = bound.len(), "Compiled query");
        Ok(CompiledQuery { sql, params: bound })
    }

    /// Renders the query without binding; every placeholder stays `?`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] when there is no FROM table or the query
    /// contains record references (they need a schema to resolve).
    pub fn to_sql(&self, dialect: &Dialect) -> Result<String> {
        let cache = SchemaCache::new();
        let mut compiler = Compiler {
            dialect,
            cache: &cache,
            params: None,
            position: 0,
            folded: Vec::new(),
        };
        compiler.select(self)
    }
}

struct Compiler<'a> {
    dialect: &'a Dialect,
    cache: &'a SchemaCache,
    params: Option<&'a [Option<SqlValue>]>,
    position: usize,
    folded: Vec<usize>,
}

impl Compiler<'_> {
    fn select(&mut self, query: &Select) -> Result<String> {
        let Some((table, alias)) = &query.from else {
            return Err(Error::Query(String::from("SELECT without FROM table")));
        };

        let mut sql = String::from("SELECT ");
        if query.items.is_empty() {
            sql.push('*');
        } else {
            let items: Vec<String> = query.items.iter().map(render_item).collect();
            sql.push_str(&items.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(table);
        if let Some(alias) = alias {
            sql.push(' ');
            sql.push_str(alias);
        }

        for join in &query.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_str());
            sql.push(' ');
            sql.push_str(&join.table);
            if let Some(alias) = &join.alias {
                sql.push(' ');
                sql.push_str(alias);
            }
            sql.push_str(" ON ");
            let on = self.condition(&join.on)?;
            sql.push_str(&on);
        }

        if let Some(condition) = &query.condition {
            sql.push_str(" WHERE ");
            let rendered = self.condition(condition)?;
            sql.push_str(&rendered);
        }

        if !query.groupings.is_empty() {
            let groups: Vec<String> = query.groupings.iter().map(ColumnRef::to_sql).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&groups.join(", "));
        }

        if !query.orderings.is_empty() {
            let orders: Vec<String> = query
                .orderings
                .iter()
                .map(|o| match o.direction {
                    Direction::Asc => format!("{} ASC", o.column.to_sql()),
                    Direction::Desc => format!("{} DESC", o.column.to_sql()),
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(sql)
    }

    fn condition(&mut self, condition: &Condition) -> Result<String> {
        match condition {
            Condition::Leaf(predicate) => self.predicate(predicate),
            Condition::And(left, right) => {
                let l = self.and_operand(left)?;
                let r = self.and_operand(right)?;
                Ok(format!("{l} AND {r}"))
            }
            Condition::Or(left, right) => {
                let l = self.condition(left)?;
                let r = self.condition(right)?;
                Ok(format!("{l} OR {r}"))
            }
        }
    }

    // OR binds looser than AND, so an OR under an AND needs parentheses.
    fn and_operand(&mut self, condition: &Condition) -> Result<String> {
        let rendered = self.condition(condition)?;
        if matches!(condition, Condition::Or(..)) {
            Ok(format!("({rendered})"))
        } else {
            Ok(rendered)
        }
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<String> {
        let column = predicate.column.to_sql();
        let Some(operand) = &predicate.operand else {
            return Ok(format!("{column} {}", predicate.operator.as_str()));
        };

        let rhs = match operand {
            Operand::Placeholder => {
                let position = self.position;
                self.position += 1;
                let is_null = self.params.is_some_and(|params| {
                    matches!(params.get(position), Some(None | Some(SqlValue::Null)))
                });
                if is_null {
                    if let Some(null_form) = predicate.operator.null_form() {
                        self.folded.push(position);
                        return Ok(format!("{column} {}", null_form.as_str()));
                    }
                }
                String::from("?")
            }
            Operand::Value(value) => {
                if let (true, Some(null_form)) = (value.is_null(), predicate.operator.null_form()) {
                    return Ok(format!("{column} {}", null_form.as_str()));
                }
                value.to_sql_inline(self.dialect)
            }
            Operand::Column(other) => other.to_sql(),
            Operand::Record(record) => {
                let value = self.resolve(record)?;
                if let (true, Some(null_form)) = (value.is_null(), predicate.operator.null_form()) {
                    return Ok(format!("{column} {}", null_form.as_str()));
                }
                value.to_sql_inline(self.dialect)
            }
        };
        Ok(format!("{column} {} {rhs}", predicate.operator.as_str()))
    }

    fn resolve(&self, record: &Record) -> Result<SqlValue> {
        let table = self
            .cache
            .get(&record.table)
            .ok_or_else(|| Error::Query(format!("unknown record table '{}'", record.table)))?;
        let primary_key = table.single_primary_key().ok_or_else(|| {
            Error::Query(format!(
                "table '{}' has no single-column primary key",
                record.table
            ))
        })?;
        record.value(&primary_key.name).cloned().ok_or_else(|| {
            Error::Query(format!(
                "record of '{}' has no value for '{}'",
                record.table, primary_key.name
            ))
        })
    }
}

fn render_item(item: &SelectItem) -> String {
    match item {
        SelectItem::Column {
            column,
            alias: Some(alias),
        } => format!("{} AS {alias}", column.to_sql()),
        SelectItem::Column { column, alias: None } => column.to_sql(),
        SelectItem::Expression { sql, alias } => format!("{sql} AS {alias}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{integer, text, Table};
    use crate::query::{col, placeholder, value};

    fn cache() -> SchemaCache {
        SchemaCache::with_tables([Table::builder("users")
            .property(integer("id").not_null())
            .property(text("handle"))
            .primary_key(&["id"])
            .build()
            .unwrap()])
    }

    #[test]
    fn test_clause_order() {
        let sql = Select::new()
            .column("u.handle")
            .expression("COUNT(p.id)", "posts")
            .from_as("users", "u")
            .left_join("posts", "p", col("p.user_id").eq(col("u.id")))
            .filter(col("u.active").eq(value(true)))
            .group_by("u.handle")
            .order_by("posts", Direction::Desc)
            .limit(10)
            .offset(20)
            .to_sql(&Dialect::postgres())
            .unwrap();
        assert_eq!(
            sql,
            "SELECT u.handle, COUNT(p.id) AS posts FROM users u \
             LEFT JOIN posts p ON p.user_id = u.id WHERE u.active = TRUE \
             GROUP BY u.handle ORDER BY posts DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_select_star_and_alias() {
        let sql = Select::new()
            .column_as("id", "user_id")
            .from("users")
            .to_sql(&Dialect::sqlite())
            .unwrap();
        assert_eq!(sql, "SELECT id AS user_id FROM users");
        let sql = Select::new().from("users").to_sql(&Dialect::sqlite()).unwrap();
        assert_eq!(sql, "SELECT * FROM users");
    }

    #[test]
    fn test_null_placeholder_folds_to_is_null() {
        let query = Select::new()
            .from("users")
            .filter(col("handle").eq(placeholder()))
            .compile(&Dialect::sqlite(), &cache(), &[None])
            .unwrap();
        assert_eq!(query.sql, "SELECT * FROM users WHERE handle IS NULL");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_folding_removes_only_null_positions() {
        let query = Select::new()
            .from("users")
            .filter(
                col("a")
                    .eq(placeholder())
                    .and(col("b").ne(placeholder()))
                    .and(col("c").eq(placeholder()))
                    .and(col("d").gt(placeholder())),
            )
            .compile(
                &Dialect::sqlite(),
                &cache(),
                &[
                    Some(SqlValue::Int(1)),
                    Some(SqlValue::Null),
                    None,
                    Some(SqlValue::Int(4)),
                ],
            )
            .unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM users WHERE a = ? AND b IS NOT NULL AND c IS NULL AND d > ?"
        );
        assert_eq!(query.params, vec![SqlValue::Int(1), SqlValue::Int(4)]);
    }

    #[test]
    fn test_null_with_ordering_operator_stays_bound() {
        let query = Select::new()
            .from("users")
            .filter(col("id").lt(placeholder()))
            .compile(&Dialect::sqlite(), &cache(), &[None])
            .unwrap();
        assert_eq!(query.sql, "SELECT * FROM users WHERE id < ?");
        assert_eq!(query.params, vec![SqlValue::Null]);
    }

    #[test]
    fn test_or_under_and_is_parenthesized() {
        let sql = Select::new()
            .from("users")
            .filter(col("a").eq(value(1)).and(col("b").eq(value(2)).or(col("c").is_null())))
            .to_sql(&Dialect::sqlite())
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE a = 1 AND (b = 2 OR c IS NULL)");
    }

    #[test]
    fn test_and_where_or_where() {
        let sql = Select::new()
            .from("users")
            .and_where(col("a").eq(value("x")))
            .or_where(col("b").like(value("%y%")))
            .to_sql(&Dialect::sqlite())
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE a = 'x' OR b LIKE '%y%'");
    }

    #[test]
    fn test_record_reference_resolves_primary_key() {
        let author = Record::new("users").with("id", 7_i64).with("handle", "ann");
        let query = Select::new()
            .from("posts")
            .filter(col("author_id").eq(author))
            .compile(&Dialect::sqlite(), &cache(), &[])
            .unwrap();
        assert_eq!(query.sql, "SELECT * FROM posts WHERE author_id = 7");
    }

    #[test]
    fn test_record_reference_errors() {
        let unknown = Select::new()
            .from("posts")
            .filter(col("tag_id").eq(Record::new("tags").with("id", 1_i64)));
        assert!(matches!(
            unknown.compile(&Dialect::sqlite(), &cache(), &[]),
            Err(Error::Query(_))
        ));

        let cache = SchemaCache::with_tables([Table::builder("pairs")
            .property(integer("a"))
            .property(integer("b"))
            .primary_key(&["a", "b"])
            .build()
            .unwrap()]);
        let composite = Select::new()
            .from("x")
            .filter(col("pair").eq(Record::new("pairs").with("a", 1_i64)));
        let err = composite.compile(&Dialect::sqlite(), &cache, &[]).unwrap_err();
        assert!(matches!(err, Error::Query(msg) if msg.contains("single-column primary key")));
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let query = Select::new()
            .from("users")
            .filter(col("id").eq(placeholder()));
        let err = query.compile(&Dialect::sqlite(), &cache(), &[]).unwrap_err();
        assert_eq!(err, Error::Query(String::from("expected 1 parameters, got 0")));
    }

    #[test]
    fn test_missing_from() {
        assert!(Select::new().column("x").to_sql(&Dialect::sqlite()).is_err());
    }

    #[test]
    fn test_join_placeholders_come_first() {
        let query = Select::new()
            .from_as("users", "u")
            .inner_join(
                "posts",
                "p",
                col("p.user_id").eq(col("u.id")).and(col("p.kind").eq(placeholder())),
            )
            .filter(col("u.id").eq(placeholder()))
            .compile(
                &Dialect::sqlite(),
                &cache(),
                &[Some(SqlValue::Text("note".into())), Some(SqlValue::Int(3))],
            )
            .unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM users u INNER JOIN posts p ON p.user_id = u.id AND p.kind = ? WHERE u.id = ?"
        );
        assert_eq!(
            query.params,
            vec![SqlValue::Text("note".into()), SqlValue::Int(3)]
        );
    }
}

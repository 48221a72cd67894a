//! Renders schema model tables into dialect-specific DDL.

use crate::dialect::{AutoIncrement, Dialect, PrimaryKeyStyle};
use crate::model::naming::LINK_TABLE_MARKER;
use crate::model::{ForeignKey, ForeignKeyAction, Index, Property, Table};

/// Renders `table` as DDL text: the `CREATE TABLE` statement followed by
/// separate index statements when the dialect wants them. Every statement
/// ends with `;`; link tables carry the link marker after the first one.
#[must_use]
pub fn emit(table: &Table, dialect: &Dialect) -> String {
    let mut out = String::new();
    for (i, statement) in emit_statements(table, dialect, false).iter().enumerate() {
        out.push_str(statement);
        out.push(';');
        if i == 0 && table.link {
            out.push(' ');
            out.push_str(LINK_TABLE_MARKER);
        }
        out.push('\n');
    }
    out
}

/// Renders `table` as a list of statements without terminators.
#[must_use]
pub fn emit_statements(table: &Table, dialect: &Dialect, if_not_exists: bool) -> Vec<String> {
    let mut statements = vec![create_table(table, &table.name, dialect, if_not_exists)];
    statements.extend(index_statements(table, &table.name, dialect, if_not_exists));
    statements
}

/// `CREATE TABLE` for `table`, written under `name`.
///
/// `name` differs from `table.name` when rebuilding a table under a
/// temporary name.
#[must_use]
pub fn create_table(table: &Table, name: &str, dialect: &Dialect, if_not_exists: bool) -> String {
    let inline_pk = inline_primary_key(table, dialect);

    let mut clauses: Vec<String> = table
        .properties
        .iter()
        .map(|p| column_definition(p, dialect, inline_pk == Some(p.name.as_str())))
        .collect();

    if let (Some(pk), None) = (&table.primary_key, inline_pk) {
        clauses.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            dialect.quote_identifier(&table.primary_key_name()),
            dialect.quote_list(&pk.properties)
        ));
    }

    if !dialect.separate_indices() {
        for unique in &table.uniques {
            clauses.push(format!(
                "UNIQUE INDEX {} ({})",
                dialect.quote_identifier(&table.unique_name(unique)),
                dialect.quote_list(&unique.properties)
            ));
        }
        for index in &table.indices {
            clauses.push(format!(
                "INDEX {} ({})",
                dialect.quote_identifier(&table.index_name(index)),
                dialect.quote_list(&index.properties)
            ));
        }
    }

    for fk in &table.foreign_keys {
        clauses.push(format!(
            "CONSTRAINT {} {}",
            dialect.quote_identifier(&table.foreign_key_name(fk)),
            foreign_key_clause(fk, dialect)
        ));
    }

    let mut sql = String::from("CREATE TABLE ");
    if if_not_exists {
        sql.push_str("IF NOT EXISTS ");
    }
    sql.push_str(&dialect.quote_identifier(name));
    sql.push_str(" (\n");
    let body: Vec<String> = clauses.iter().map(|c| format!("    {c}")).collect();
    sql.push_str(&body.join(",\n"));
    sql.push_str("\n)");
    sql
}

/// Separate `CREATE [UNIQUE] INDEX` statements for `table` (empty for
/// inline-index dialects). `name` is the table the indices are created on.
#[must_use]
pub fn index_statements(
    table: &Table,
    name: &str,
    dialect: &Dialect,
    if_not_exists: bool,
) -> Vec<String> {
    if !dialect.separate_indices() {
        return Vec::new();
    }
    let uniques = table
        .uniques
        .iter()
        .map(|u| create_index(name, &table.unique_name(u), u, true, dialect, if_not_exists));
    let indices = table
        .indices
        .iter()
        .map(|i| create_index(name, &table.index_name(i), i, false, dialect, if_not_exists));
    uniques.chain(indices).collect()
}

/// `CREATE [UNIQUE] INDEX [IF NOT EXISTS] name ON table (cols)`.
#[must_use]
pub fn create_index(
    table: &str,
    name: &str,
    index: &Index,
    unique: bool,
    dialect: &Dialect,
    if_not_exists: bool,
) -> String {
    let mut sql = String::from("CREATE ");
    if unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str("INDEX ");
    if if_not_exists && dialect.index_if_not_exists {
        sql.push_str("IF NOT EXISTS ");
    }
    sql.push_str(&format!(
        "{} ON {} ({})",
        dialect.quote_identifier(name),
        dialect.quote_identifier(table),
        dialect.quote_list(&index.properties)
    ));
    sql
}

/// Renders one column: `name TYPE(params) [NOT NULL] [DEFAULT value]`
/// followed by the inline primary key and auto-increment syntax.
#[must_use]
pub fn column_definition(property: &Property, dialect: &Dialect, inline_pk: bool) -> String {
    let mut sql = format!(
        "{} {}",
        dialect.quote_identifier(&property.name),
        property.type_sql()
    );
    if !property.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &property.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default.to_sql(dialect));
    }
    if inline_pk {
        sql.push_str(" PRIMARY KEY");
    }
    if property.auto_increment {
        match dialect.auto_increment {
            AutoIncrement::Keyword(keyword) => {
                sql.push(' ');
                sql.push_str(keyword);
            }
            AutoIncrement::Identity => sql.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
        }
    }
    sql
}

/// `FOREIGN KEY (cols) REFERENCES target (cols) [ON DELETE ..] [ON UPDATE ..]`.
#[must_use]
pub fn foreign_key_clause(fk: &ForeignKey, dialect: &Dialect) -> String {
    let mut sql = format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        dialect.quote_list(&fk.properties),
        dialect.quote_identifier(&fk.reference.table),
        dialect.quote_list(&fk.reference.properties)
    );
    if fk.delete_action != ForeignKeyAction::NoAction {
        sql.push_str(" ON DELETE ");
        sql.push_str(fk.delete_action.as_sql());
    }
    if fk.change_action != ForeignKeyAction::NoAction {
        sql.push_str(" ON UPDATE ");
        sql.push_str(fk.change_action.as_sql());
    }
    sql
}

/// The column carrying an inline `PRIMARY KEY`, if the dialect and the
/// key shape allow one.
fn inline_primary_key<'t>(table: &'t Table, dialect: &Dialect) -> Option<&'t str> {
    if dialect.primary_key_style != PrimaryKeyStyle::Inline {
        return None;
    }
    match table.primary_key.as_ref()?.properties.as_slice() {
        [only] => Some(only.as_str()),
        _ => None,
    }
}

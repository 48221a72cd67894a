//! Catalog normalisation.
//!
//! Databases without stored DDL (MySQL, PostgreSQL) describe their schema
//! through `information_schema` style rows. This module folds those rows
//! into [`Table`]s so that a driver only has to run the catalog queries.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model::{DefaultValue, ForeignKey, ForeignKeyAction, Index, Property, Reference, Table};

/// One column of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRow {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Column type as reported, e.g. `varchar(255)`.
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Raw default expression, `None` when the column has no default.
    #[serde(default)]
    pub default: Option<String>,
    /// Extra flags, e.g. `auto_increment`.
    #[serde(default)]
    pub extra: String,
}

/// One column of one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    /// Table name.
    pub table: String,
    /// Index name.
    pub name: String,
    /// Indexed column.
    pub column: String,
    /// Position of the column within the index, starting at 1.
    pub position: u32,
    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
    /// Whether the index backs the primary key.
    #[serde(default)]
    pub primary: bool,
}

/// One column pair of one foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRow {
    /// Referencing table.
    pub table: String,
    /// Constraint name.
    pub name: String,
    /// Referencing column.
    pub column: String,
    /// Position of the column within the key, starting at 1.
    pub position: u32,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced column.
    pub referenced_column: String,
    /// `DELETE_RULE`.
    #[serde(default)]
    pub on_delete: Option<String>,
    /// `UPDATE_RULE`.
    #[serde(default)]
    pub on_update: Option<String>,
}

/// Folds catalog rows into tables.
///
/// Tables appear in the order of their first column row and columns keep
/// row order. Index and foreign key rows are grouped by name and sorted by
/// position. Rows for tables without columns are ignored.
///
/// # Errors
///
/// Returns a validation error when the folded table is inconsistent, for
/// example an index naming a column that has no row.
pub fn normalize(
    columns: &[ColumnRow],
    indexes: &[IndexRow],
    foreign_keys: &[ForeignKeyRow],
) -> Result<Vec<Table>> {
    let mut tables: Vec<Table> = Vec::new();
    for row in columns {
        let position = match tables.iter().position(|t| t.name == row.table) {
            Some(i) => i,
            None => {
                tables.push(Table::new(row.table.as_str()));
                tables.len() - 1
            }
        };
        tables[position].properties.push(column_property(row));
    }

    for group in group_by_name(indexes, |r| (&r.table, &r.name), |r| r.position) {
        let first = group[0];
        let Some(table) = tables.iter_mut().find(|t| t.name == first.table) else {
            debug!(table = %first.table, index = %first.name, "Skipping index of unknown table");
            continue;
        };
        let properties: Vec<&str> = group.iter().map(|r| r.column.as_str()).collect();
        let index = Index::new(&properties).named(first.name.as_str());
        if first.primary {
            table.primary_key = Some(index);
        } else if first.unique {
            table.uniques.push(index);
        } else {
            table.indices.push(index);
        }
    }

    for group in group_by_name(foreign_keys, |r| (&r.table, &r.name), |r| r.position) {
        let first = group[0];
        let Some(table) = tables.iter_mut().find(|t| t.name == first.table) else {
            debug!(table = %first.table, foreign_key = %first.name, "Skipping foreign key of unknown table");
            continue;
        };
        table.foreign_keys.push(ForeignKey {
            name: Some(first.name.clone()),
            properties: group.iter().map(|r| r.column.clone()).collect(),
            reference: Reference {
                table: first.referenced_table.clone(),
                properties: group.iter().map(|r| r.referenced_column.clone()).collect(),
            },
            delete_action: parse_action(first.on_delete.as_deref()),
            change_action: parse_action(first.on_update.as_deref()),
        });
    }

    for table in &tables {
        table.validate()?;
    }
    Ok(tables)
}

/// Groups rows sharing `(table, name)`, in order of first appearance,
/// each group sorted by position.
fn group_by_name<'r, R>(
    rows: &'r [R],
    key: impl Fn(&R) -> (&String, &String),
    position: impl Fn(&R) -> u32,
) -> Vec<Vec<&'r R>> {
    let mut groups: Vec<Vec<&R>> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|g| key(g[0]) == key(row)) {
            Some(group) => group.push(row),
            None => groups.push(vec![row]),
        }
    }
    for group in &mut groups {
        group.sort_by_key(|r| position(r));
    }
    groups
}

fn column_property(row: &ColumnRow) -> Property {
    let (sql_type, params) = split_type(&row.data_type);
    let mut property = Property::new(row.column.as_str(), sql_type);
    property.type_params = params;
    property.nullable = row.nullable;

    let extra = row.extra.to_ascii_lowercase();
    if extra.contains("auto_increment") {
        property.auto_increment = true;
    }
    if let Some(raw) = &row.default {
        if raw.to_ascii_lowercase().starts_with("nextval(") {
            property.auto_increment = true;
        } else {
            property.default = Some(parse_default(raw, &property, extra.contains("default_generated")));
        }
    }
    property
}

/// Splits `varchar(255)` into `("varchar", ["255"])`.
fn split_type(data_type: &str) -> (&str, Vec<String>) {
    let data_type = data_type.trim();
    match (data_type.find('('), data_type.rfind(')')) {
        (Some(open), Some(close)) if open < close => {
            let params = data_type[open + 1..close]
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            (data_type[..open].trim_end(), params)
        }
        _ => (data_type, Vec::new()),
    }
}

fn parse_default(raw: &str, property: &Property, generated: bool) -> DefaultValue {
    // PostgreSQL appends a cast: 'draft'::character varying
    let value = raw.split_once("::").map_or(raw, |(value, _)| value).trim();

    if generated {
        return DefaultValue::Expression(value.to_string());
    }
    if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        return DefaultValue::Text(inner.replace("''", "'"));
    }
    if let Ok(i) = value.parse::<i64>() {
        if property.is_boolean() && (i == 0 || i == 1) {
            return DefaultValue::Bool(i == 1);
        }
        return DefaultValue::Integer(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return DefaultValue::Float(f);
    }
    match value.to_ascii_uppercase().as_str() {
        "NULL" => DefaultValue::Null,
        "TRUE" => DefaultValue::Bool(true),
        "FALSE" => DefaultValue::Bool(false),
        // MySQL reports string defaults without quotes.
        _ if is_textual(property) => DefaultValue::Text(value.to_string()),
        _ => DefaultValue::Expression(value.to_string()),
    }
}

fn is_textual(property: &Property) -> bool {
    matches!(
        property.sql_type.as_str(),
        "CHAR" | "VARCHAR" | "TEXT" | "CHARACTER VARYING" | "CHARACTER" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT"
    )
}

fn parse_action(rule: Option<&str>) -> ForeignKeyAction {
    match rule.map(str::to_ascii_uppercase).as_deref() {
        Some("CASCADE") => ForeignKeyAction::Cascade,
        Some("SET NULL") => ForeignKeyAction::SetNull,
        Some("SET DEFAULT") => ForeignKeyAction::SetDefault,
        _ => ForeignKeyAction::NoAction,
    }
}

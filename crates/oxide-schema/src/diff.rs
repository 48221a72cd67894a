//! Per-table schema diff.
//!
//! Compares a desired table with the table that currently exists and
//! produces the [`Change`]s that reconcile them. Each change renders
//! itself for a [`Dialect`]; ordering across changes and tables is the
//! planner's job.

use crate::ddl::emit::{
    column_definition, create_index, create_table, emit_statements, foreign_key_clause,
    index_statements,
};
use crate::dialect::{AutoIncrement, Dialect, DropConstraint, DropIndex, ModifyColumn};
use crate::error::{Error, Result};
use crate::model::naming;
use crate::model::{ForeignKey, Index, Property, Table};

/// Emission phase of a statement inside one table's buffer.
///
/// Statements are stable-sorted by phase so constraints are dropped
/// before the columns they cover and added after those columns exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Table creation or rebuild.
    Structure,
    /// Constraint and index drops.
    DropConstraint,
    /// Column drops.
    DropColumn,
    /// Column modifications.
    AlterColumn,
    /// Column additions.
    AddColumn,
    /// Primary key (re)creation.
    PrimaryKey,
    /// Index and unique index creation.
    AddIndex,
    /// Foreign key creation.
    AddForeignKey,
}

/// One migration operation on a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// The table does not exist yet.
    CreateTable(Table),
    /// Drop a column.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// Add a column.
    AddColumn {
        /// Table name.
        table: String,
        /// The new column.
        property: Property,
    },
    /// Modify a column in place.
    AlterColumn {
        /// Table name.
        table: String,
        /// The column as it exists.
        from: Property,
        /// The column as declared.
        to: Property,
    },
    /// Create a plain index.
    AddIndex {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
        /// Covered columns.
        index: Index,
    },
    /// Drop a plain index.
    DropIndex {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
    },
    /// Create a unique index.
    AddUnique {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
        /// Covered columns.
        index: Index,
    },
    /// Drop a unique index.
    DropUnique {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
    },
    /// Replace, add or remove the primary key.
    AlterPrimaryKey {
        /// Table name.
        table: String,
        /// Existing key and its constraint name.
        from: Option<(String, Index)>,
        /// Declared key and its constraint name.
        to: Option<(String, Index)>,
    },
    /// Add a foreign key under `name`.
    AddForeignKey {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
        /// The key.
        foreign_key: ForeignKey,
    },
    /// Drop the foreign key called `name`.
    DropForeignKey {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },
    /// Rebuild the table: copy the common columns into a new table with
    /// the desired shape and swap it in. Columns that only exist in
    /// `current` are lost.
    RecreateTable {
        /// Desired shape.
        desired: Table,
        /// Existing shape.
        current: Table,
    },
}

impl Change {
    /// Name of the table the change applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable(table) | Self::RecreateTable { desired: table, .. } => &table.name,
            Self::DropColumn { table, .. }
            | Self::AddColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::AddIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddUnique { table, .. }
            | Self::DropUnique { table, .. }
            | Self::AlterPrimaryKey { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. } => table,
        }
    }

    /// Returns true for changes that may lose data without an explicit
    /// column drop having been declared.
    #[must_use]
    pub const fn is_destructive(&self) -> bool {
        matches!(self, Self::RecreateTable { .. })
    }

    /// Renders the change as statements without terminators.
    #[must_use]
    pub fn statements(&self, dialect: &Dialect) -> Vec<String> {
        self.render(dialect).into_iter().map(|(_, sql)| sql).collect()
    }

    /// Renders the change as `(phase, statement)` pairs.
    #[must_use]
    pub fn render(&self, dialect: &Dialect) -> Vec<(Phase, String)> {
        let q = |name: &str| dialect.quote_identifier(name);
        match self {
            Self::CreateTable(table) => emit_statements(table, dialect, true)
                .into_iter()
                .map(|sql| (Phase::Structure, sql))
                .collect(),
            Self::DropColumn { table, column } => vec![(
                Phase::DropColumn,
                format!("ALTER TABLE {} DROP COLUMN {}", q(table), q(column)),
            )],
            Self::AddColumn { table, property } => vec![(
                Phase::AddColumn,
                format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    q(table),
                    column_definition(property, dialect, false)
                ),
            )],
            Self::AlterColumn { table, from, to } => {
                vec![(Phase::AlterColumn, alter_column(table, from, to, dialect))]
            }
            Self::AddIndex { table, name, index } => vec![(
                Phase::AddIndex,
                create_index(table, name, index, false, dialect, true),
            )],
            Self::AddUnique { table, name, index } => vec![(
                Phase::AddIndex,
                create_index(table, name, index, true, dialect, true),
            )],
            Self::DropIndex { table, name } | Self::DropUnique { table, name } => {
                vec![(Phase::DropConstraint, drop_index(table, name, dialect))]
            }
            Self::AlterPrimaryKey { table, from, to } => {
                let mut out = Vec::new();
                if let Some((name, _)) = from {
                    let sql = match dialect.drop_constraint {
                        DropConstraint::ForeignKey => {
                            format!("ALTER TABLE {} DROP PRIMARY KEY", q(table))
                        }
                        DropConstraint::Constraint => {
                            format!("ALTER TABLE {} DROP CONSTRAINT {}", q(table), q(name))
                        }
                    };
                    out.push((Phase::DropConstraint, sql));
                }
                if let Some((name, index)) = to {
                    out.push((
                        Phase::PrimaryKey,
                        format!(
                            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                            q(table),
                            q(name),
                            dialect.quote_list(&index.properties)
                        ),
                    ));
                }
                out
            }
            Self::AddForeignKey {
                table,
                name,
                foreign_key,
            } => vec![(
                Phase::AddForeignKey,
                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} {}",
                    q(table),
                    q(name),
                    foreign_key_clause(foreign_key, dialect)
                ),
            )],
            Self::DropForeignKey { table, name } => {
                let keyword = match dialect.drop_constraint {
                    DropConstraint::ForeignKey => "FOREIGN KEY",
                    DropConstraint::Constraint => "CONSTRAINT",
                };
                vec![(
                    Phase::DropConstraint,
                    format!("ALTER TABLE {} DROP {keyword} {}", q(table), q(name)),
                )]
            }
            Self::RecreateTable { desired, current } => recreate(desired, current, dialect)
                .into_iter()
                .map(|sql| (Phase::Structure, sql))
                .collect(),
        }
    }
}

fn drop_index(table: &str, name: &str, dialect: &Dialect) -> String {
    match dialect.drop_index {
        DropIndex::Standalone => format!("DROP INDEX IF EXISTS {}", dialect.quote_identifier(name)),
        DropIndex::OnTable => format!(
            "DROP INDEX {} ON {}",
            dialect.quote_identifier(name),
            dialect.quote_identifier(table)
        ),
    }
}

fn alter_column(table: &str, from: &Property, to: &Property, dialect: &Dialect) -> String {
    let table = dialect.quote_identifier(table);
    match dialect.modify_column {
        ModifyColumn::Modify => format!(
            "ALTER TABLE {table} MODIFY COLUMN {}",
            column_definition(to, dialect, false)
        ),
        ModifyColumn::AlterColumn => {
            let column = dialect.quote_identifier(&to.name);
            let mut actions = Vec::new();
            if from.type_sql() != to.type_sql() {
                actions.push(format!("ALTER COLUMN {column} TYPE {}", to.type_sql()));
            }
            if from.nullable != to.nullable {
                let verb = if to.nullable { "DROP" } else { "SET" };
                actions.push(format!("ALTER COLUMN {column} {verb} NOT NULL"));
            }
            let from_default = from.default.as_ref().map(|d| d.to_sql(dialect));
            let to_default = to.default.as_ref().map(|d| d.to_sql(dialect));
            if from_default != to_default {
                actions.push(match to_default {
                    Some(value) => format!("ALTER COLUMN {column} SET DEFAULT {value}"),
                    None => format!("ALTER COLUMN {column} DROP DEFAULT"),
                });
            }
            if from.auto_increment != to.auto_increment {
                actions.push(match (to.auto_increment, dialect.auto_increment) {
                    (true, AutoIncrement::Identity) => {
                        format!("ALTER COLUMN {column} ADD GENERATED BY DEFAULT AS IDENTITY")
                    }
                    (false, AutoIncrement::Identity) => {
                        format!("ALTER COLUMN {column} DROP IDENTITY IF EXISTS")
                    }
                    (_, AutoIncrement::Keyword(_)) => {
                        format!("ALTER COLUMN {column} TYPE {}", to.type_sql())
                    }
                });
            }
            format!("ALTER TABLE {table} {}", actions.join(", "))
        }
    }
}

/// Statements that rebuild `current` into `desired`.
///
/// The row copy selects the columns both shapes share, in the order they
/// appear in `current`. The temporary table is cleared first so an
/// interrupted run can be retried.
#[must_use]
pub fn recreate(desired: &Table, current: &Table, dialect: &Dialect) -> Vec<String> {
    let temp = naming::recreate_name(&desired.name);
    let common: Vec<&str> = current
        .properties
        .iter()
        .filter(|p| desired.has_property(&p.name))
        .map(|p| p.name.as_str())
        .collect();

    let mut statements = vec![
        format!("DROP TABLE IF EXISTS {}", dialect.quote_identifier(&temp)),
        create_table(desired, &temp, dialect, false),
    ];
    if !common.is_empty() {
        let columns = dialect.quote_list(&common);
        statements.push(format!(
            "INSERT INTO {} ({columns}) SELECT {columns} FROM {}",
            dialect.quote_identifier(&temp),
            dialect.quote_identifier(&current.name)
        ));
    }
    statements.push(format!(
        "DROP TABLE {}",
        dialect.quote_identifier(&current.name)
    ));
    statements.push(format!(
        "ALTER TABLE {} RENAME TO {}",
        dialect.quote_identifier(&temp),
        dialect.quote_identifier(&desired.name)
    ));
    statements.extend(index_statements(desired, &desired.name, dialect, true));
    statements
}

// =============================================================================
// Table-level diff
// =============================================================================

/// Computes the changes that turn `current` into `desired`.
///
/// Steps run in a fixed order: dropped columns, changed columns, added
/// columns, primary key, foreign keys, then indices and unique indices.
/// On a recreate-only dialect the first structural change replaces the
/// whole result with a single [`Change::RecreateTable`].
///
/// # Errors
///
/// Returns [`Error::UnnamedForeignKey`] when an existing foreign key with
/// no name has to be dropped.
pub fn diff_table(desired: &Table, current: Option<&Table>, dialect: &Dialect) -> Result<Vec<Change>> {
    let Some(current) = current else {
        return Ok(vec![Change::CreateTable(desired.clone())]);
    };
    let mut changes = Vec::new();
    match diff_structure(desired, current, dialect, &mut changes)? {
        Flow::Continue => {}
        Flow::Recreate => {
            return Ok(vec![Change::RecreateTable {
                desired: desired.clone(),
                current: current.clone(),
            }]);
        }
    }
    Ok(changes)
}

enum Flow {
    Continue,
    Recreate,
}

fn diff_structure(
    desired: &Table,
    current: &Table,
    dialect: &Dialect,
    changes: &mut Vec<Change>,
) -> Result<Flow> {
    let recreate_only = dialect.recreate_only();
    let table = &desired.name;

    // a. dropped columns
    for existing in &current.properties {
        if !desired.has_property(&existing.name) {
            if recreate_only {
                return Ok(Flow::Recreate);
            }
            changes.push(Change::DropColumn {
                table: table.clone(),
                column: existing.name.clone(),
            });
        }
    }

    // b. changed columns
    for declared in &desired.properties {
        if let Some(existing) = current.property(&declared.name) {
            if !declared.matches(existing, dialect) {
                if recreate_only {
                    return Ok(Flow::Recreate);
                }
                changes.push(Change::AlterColumn {
                    table: table.clone(),
                    from: existing.clone(),
                    to: declared.clone(),
                });
            }
        }
    }

    // c. added columns
    for declared in &desired.properties {
        if !current.has_property(&declared.name) {
            if recreate_only {
                return Ok(Flow::Recreate);
            }
            changes.push(Change::AddColumn {
                table: table.clone(),
                property: declared.clone(),
            });
        }
    }

    // d. primary key, compared by column list
    let desired_pk = desired.primary_key.as_ref().map(|pk| &pk.properties);
    let current_pk = current.primary_key.as_ref().map(|pk| &pk.properties);
    if desired_pk != current_pk {
        if recreate_only {
            return Ok(Flow::Recreate);
        }
        changes.push(Change::AlterPrimaryKey {
            table: table.clone(),
            from: current
                .primary_key
                .clone()
                .map(|pk| (current.primary_key_name(), pk)),
            to: desired
                .primary_key
                .clone()
                .map(|pk| (desired.primary_key_name(), pk)),
        });
    }

    // e. foreign keys; a key survives when an equal key exists, whatever its name
    for existing in &current.foreign_keys {
        if desired.foreign_keys.iter().any(|d| d.same_target(existing)) {
            continue;
        }
        if recreate_only {
            return Ok(Flow::Recreate);
        }
        let Some(name) = existing.name.clone() else {
            return Err(Error::UnnamedForeignKey {
                table: table.clone(),
                columns: existing.properties.join(", "),
            });
        };
        changes.push(Change::DropForeignKey {
            table: table.clone(),
            name,
        });
    }
    for declared in &desired.foreign_keys {
        if current.foreign_keys.iter().any(|e| e.same_target(declared)) {
            continue;
        }
        if recreate_only {
            return Ok(Flow::Recreate);
        }
        changes.push(Change::AddForeignKey {
            table: table.clone(),
            name: desired.foreign_key_name(declared),
            foreign_key: declared.clone(),
        });
    }

    // f. indices and unique indices
    let inline_recreate = recreate_only && !dialect.separate_indices();
    let index_changes = diff_indices(
        &desired.indices,
        &current.indices,
        |i| desired.index_name(i),
        |i| current.index_name(i),
    );
    let unique_changes = diff_indices(
        &desired.uniques,
        &current.uniques,
        |i| desired.unique_name(i),
        |i| current.unique_name(i),
    );
    if inline_recreate && !(index_changes.is_empty() && unique_changes.is_empty()) {
        return Ok(Flow::Recreate);
    }
    for change in index_changes {
        changes.push(match change {
            IndexChange::Drop(name) => Change::DropIndex {
                table: table.clone(),
                name,
            },
            IndexChange::Add(name, index) => Change::AddIndex {
                table: table.clone(),
                name,
                index,
            },
        });
    }
    for change in unique_changes {
        changes.push(match change {
            IndexChange::Drop(name) => Change::DropUnique {
                table: table.clone(),
                name,
            },
            IndexChange::Add(name, index) => Change::AddUnique {
                table: table.clone(),
                name,
                index,
            },
        });
    }

    Ok(Flow::Continue)
}

enum IndexChange {
    Drop(String),
    Add(String, Index),
}

/// Set difference on column lists.
///
/// An existing index whose column list is still declared under another
/// name is renamed: dropped under the old name and created under the new
/// one. This matches on columns only, so two unrelated indices over the
/// same columns are treated as one renamed index.
fn diff_indices(
    desired: &[Index],
    current: &[Index],
    desired_name: impl Fn(&Index) -> String,
    current_name: impl Fn(&Index) -> String,
) -> Vec<IndexChange> {
    let mut changes = Vec::new();
    let mut renamed = Vec::new();

    for existing in current {
        let old_name = current_name(existing);
        match desired.iter().find(|d| *d == existing) {
            Some(declared) => {
                let new_name = desired_name(declared);
                if new_name != old_name {
                    changes.push(IndexChange::Drop(old_name));
                    renamed.push((new_name, declared.clone()));
                }
            }
            None => changes.push(IndexChange::Drop(old_name)),
        }
    }

    for declared in desired {
        if !current.iter().any(|e| e == declared) {
            changes.push(IndexChange::Add(desired_name(declared), declared.clone()));
        }
    }
    changes.extend(
        renamed
            .into_iter()
            .map(|(name, index)| IndexChange::Add(name, index)),
    );
    changes
}

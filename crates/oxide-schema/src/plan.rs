//! Migration planner.
//!
//! Turns desired tables plus the tables that currently exist into an
//! ordered list of independently executable statements.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::dialect::Dialect;
use crate::diff::{diff_table, Change, Phase};
use crate::error::Result;
use crate::model::naming::{DESTRUCTIVE_TAG, LINK_TABLE_MARKER, SEPARATOR};
use crate::model::{ForeignKey, Table};

/// One planned statement, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// The SQL text.
    pub sql: String,
    /// Table the statement belongs to.
    pub table: String,
    /// Whether the table is a link (junction) table.
    pub link: bool,
    /// Whether the statement is part of a table rebuild.
    pub destructive: bool,
}

impl Statement {
    /// Renders the statement as a script entry: optional destructive tag
    /// line, the SQL with its `;`, then the link marker if any.
    #[must_use]
    pub fn to_script(&self) -> String {
        let mut out = String::new();
        if self.destructive {
            out.push_str(DESTRUCTIVE_TAG);
            out.push(' ');
            out.push_str(&self.table);
            out.push('\n');
        }
        out.push_str(&self.sql);
        out.push(';');
        if self.link {
            out.push(' ');
            out.push_str(LINK_TABLE_MARKER);
        }
        out
    }
}

/// Ordered statements reconciling the live schema with the declared one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    statements: Vec<Statement>,
}

impl MigrationPlan {
    /// Planned statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// SQL text of every statement, in execution order.
    #[must_use]
    pub fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(|s| s.sql.as_str()).collect()
    }

    /// Returns true when nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns true when any table has to be rebuilt.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        self.statements.iter().any(|s| s.destructive)
    }

    /// Tables that will be rebuilt, in plan order.
    #[must_use]
    pub fn destructive_tables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.statements
            .iter()
            .filter(|s| s.destructive && seen.insert(s.table.as_str()))
            .map(|s| s.table.as_str())
            .collect()
    }

    /// Renders the plan as a migration script: statements terminated by
    /// `;` and separated by separator lines.
    #[must_use]
    pub fn script(&self) -> String {
        if self.statements.is_empty() {
            return String::new();
        }
        let entries: Vec<String> = self.statements.iter().map(Statement::to_script).collect();
        let mut script = entries.join(&format!("\n{SEPARATOR}\n"));
        script.push('\n');
        script
    }
}

impl IntoIterator for MigrationPlan {
    type Item = Statement;
    type IntoIter = std::vec::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

/// Plans migrations for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct Planner {
    dialect: Dialect,
}

impl Planner {
    /// Creates a planner for `dialect`.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// The dialect statements are rendered for.
    #[must_use]
    pub const fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Changes for a single table, `current` being `None` when the table
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns validation errors for `desired` and
    /// [`Error::UnnamedForeignKey`](crate::Error::UnnamedForeignKey).
    pub fn diff(&self, desired: &Table, current: Option<&Table>) -> Result<Vec<Change>> {
        desired.validate_for(&self.dialect)?;
        diff_table(desired, current, &self.dialect)
    }

    /// Plans the statements that turn `current` into `desired`.
    ///
    /// Tables in `current` that are not declared are left alone. Every
    /// desired table is validated before anything is rendered. When a
    /// foreign key cycle forces a table to be created before a table it
    /// references, and the dialect can add foreign keys afterwards, those
    /// keys are left out of its `CREATE TABLE` and added once every table
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns the first validation error among `desired`, or
    /// [`Error::UnnamedForeignKey`](crate::Error::UnnamedForeignKey) when
    /// an unnamed foreign key has to be dropped.
    pub fn plan(&self, desired: &[Table], current: &[Table]) -> Result<MigrationPlan> {
        for table in desired {
            table.validate_for(&self.dialect)?;
        }

        let declared: HashSet<&str> = desired.iter().map(|t| t.name.as_str()).collect();
        let mut placed: HashSet<&str> = current.iter().map(|t| t.name.as_str()).collect();
        let mut statements = Vec::new();
        let mut deferred = Vec::new();
        for table in dependency_order(desired) {
            let existing = current.iter().find(|t| t.name == table.name);
            let forward = if self.dialect.recreate_only() {
                Vec::new()
            } else {
                forward_references(table, existing, &declared, &placed)
            };
            placed.insert(table.name.as_str());

            let staged;
            let target = if forward.is_empty() {
                table
            } else {
                let mut stripped = table.clone();
                stripped.foreign_keys.retain(|fk| !forward.contains(&fk));
                staged = stripped;
                &staged
            };
            let changes = diff_table(target, existing, &self.dialect)?;
            debug!(
                table = %table.name,
                exists = existing.is_some(),
                changes = changes.len(),
                deferred = forward.len(),
                "Diffed table"
            );

            let mut buffer: Vec<(Phase, Statement)> = Vec::new();
            for change in &changes {
                if change.is_destructive() {
                    warn!(table = %table.name, "Table will be recreated; columns not declared are dropped");
                }
                buffer.extend(self.render(table, change));
            }
            buffer.sort_by_key(|(phase, _)| *phase);
            statements.extend(buffer.into_iter().map(|(_, s)| s));

            for fk in forward {
                debug!(
                    table = %table.name,
                    target = %fk.reference.table,
                    "Deferring foreign key of a reference cycle"
                );
                let change = Change::AddForeignKey {
                    table: table.name.clone(),
                    name: table.foreign_key_name(fk),
                    foreign_key: fk.clone(),
                };
                deferred.extend(self.render(table, &change).into_iter().map(|(_, s)| s));
            }
        }
        statements.extend(deferred);

        let plan = MigrationPlan {
            statements: finalize(statements),
        };
        info!(
            dialect = self.dialect.name,
            statements = plan.len(),
            destructive = plan.is_destructive(),
            "Planned migration"
        );
        Ok(plan)
    }

    fn render(&self, table: &Table, change: &Change) -> Vec<(Phase, Statement)> {
        change
            .render(&self.dialect)
            .into_iter()
            .map(|(phase, sql)| {
                (
                    phase,
                    Statement {
                        sql,
                        table: table.name.clone(),
                        link: table.link,
                        destructive: change.is_destructive(),
                    },
                )
            })
            .collect()
    }
}

/// Foreign keys of `table` whose target is declared but neither exists
/// nor has been planned yet. Keys the existing table already carries
/// are not included.
fn forward_references<'t>(
    table: &'t Table,
    existing: Option<&Table>,
    declared: &HashSet<&str>,
    placed: &HashSet<&str>,
) -> Vec<&'t ForeignKey> {
    table
        .foreign_keys
        .iter()
        .filter(|fk| {
            let target = fk.reference.table.as_str();
            target != table.name && declared.contains(target) && !placed.contains(target)
        })
        .filter(|fk| !existing.is_some_and(|t| t.foreign_keys.iter().any(|e| e.same_target(fk))))
        .collect()
}

/// Dedupes by SQL text, moves link tables last and drops blank entries.
fn finalize(statements: Vec<Statement>) -> Vec<Statement> {
    let mut seen = HashSet::new();
    let mut out: Vec<Statement> = statements
        .into_iter()
        .filter(|s| !s.sql.trim().is_empty())
        .filter(|s| seen.insert(s.sql.clone()))
        .collect();
    out.sort_by_key(|s| s.link);
    out
}

/// Orders tables so foreign key targets come before the tables that
/// reference them.
///
/// Stable: among tables that are ready, declaration order wins.
/// Self references are ignored, and when a cycle leaves no table ready
/// the first remaining table in declaration order is taken.
#[must_use]
pub fn dependency_order(tables: &[Table]) -> Vec<&Table> {
    let names: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    let dependencies: Vec<Vec<&str>> = tables
        .iter()
        .map(|t| {
            t.foreign_keys
                .iter()
                .map(|fk| fk.reference.table.as_str())
                .filter(|target| *target != t.name && names.contains(target))
                .collect()
        })
        .collect();

    let mut placed: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<usize> = (0..tables.len()).collect();
    let mut order = Vec::with_capacity(tables.len());

    while !remaining.is_empty() {
        let ready = remaining
            .iter()
            .position(|&i| dependencies[i].iter().all(|d| placed.contains(d)));
        let pick = ready.unwrap_or_else(|| {
            debug!(table = %tables[remaining[0]].name, "Foreign key cycle; keeping declaration order");
            0
        });
        let index = remaining.remove(pick);
        placed.insert(tables[index].name.as_str());
        order.push(&tables[index]);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{integer, text, ForeignKey};

    fn table(name: &str, references: &[&str]) -> Table {
        let mut builder = Table::builder(name).property(integer("id")).primary_key(&["id"]);
        for target in references {
            let column = format!("{target}_id");
            builder = builder
                .property(integer(column.as_str()))
                .foreign_key(ForeignKey::new(&[column.as_str()], *target, &["id"]));
        }
        builder.build().unwrap()
    }

    fn names(tables: &[&Table]) -> Vec<String> {
        tables.iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn dependency_order_puts_targets_first() {
        let tables = vec![table("comments", &["posts"]), table("posts", &["users"]), table("users", &[])];
        assert_eq!(names(&dependency_order(&tables)), vec!["users", "posts", "comments"]);
    }

    #[test]
    fn dependency_order_is_stable_and_ignores_self_references() {
        let tables = vec![table("b", &["b"]), table("a", &[]), table("c", &[])];
        assert_eq!(names(&dependency_order(&tables)), vec!["b", "a", "c"]);
    }

    #[test]
    fn dependency_order_survives_cycles() {
        let tables = vec![table("x", &["y"]), table("y", &["x"]), table("z", &[])];
        assert_eq!(names(&dependency_order(&tables)), vec!["z", "x", "y"]);
    }

    #[test]
    fn plan_for_identical_schema_is_empty() {
        let tables = vec![table("users", &[]), table("posts", &["users"])];
        for dialect in [Dialect::sqlite(), Dialect::postgres(), Dialect::mysql()] {
            let plan = Planner::new(dialect).plan(&tables, &tables).unwrap();
            assert!(plan.is_empty());
            assert_eq!(plan.script(), "");
        }
    }

    #[test]
    fn validation_runs_before_planning() {
        let mut broken = table("users", &[]);
        broken.indices.push(crate::model::Index::new(&["missing"]));
        let err = Planner::new(Dialect::sqlite()).plan(&[broken], &[]).unwrap_err();
        assert!(matches!(err, crate::Error::UnknownProperty { .. }));
    }

    #[test]
    fn buffer_orders_drops_before_adds() {
        let mut current = table("users", &[]);
        current.properties.push(text("old"));
        current.indices.push(crate::model::Index::new(&["old"]));
        let mut desired = table("users", &[]);
        desired.properties.push(text("new"));
        desired.indices.push(crate::model::Index::new(&["new"]));

        let plan = Planner::new(Dialect::postgres())
            .plan(&[desired], &[current])
            .unwrap();
        assert_eq!(
            plan.sql(),
            vec![
                "DROP INDEX IF EXISTS \"users_ix_old\"",
                "ALTER TABLE \"users\" DROP COLUMN \"old\"",
                "ALTER TABLE \"users\" ADD COLUMN \"new\" TEXT",
                "CREATE INDEX IF NOT EXISTS \"users_ix_new\" ON \"users\" (\"new\")",
            ]
        );
    }

    #[test]
    fn script_tags_destructive_statements() {
        let current = table("users", &[]);
        let mut desired = table("users", &[]);
        desired.properties.push(text("bio"));
        let plan = Planner::new(Dialect::sqlite())
            .plan(&[desired], &[current])
            .unwrap();
        assert!(plan.is_destructive());
        assert_eq!(plan.destructive_tables(), vec!["users"]);
        let script = plan.script();
        assert!(script.starts_with("-- destructive: recreate table users\nDROP TABLE IF EXISTS \"__new_users\";"));
        assert_eq!(script.matches("\n-- separator\n").count(), plan.len() - 1);
    }

    #[test]
    fn link_statements_carry_marker() {
        let mut link = table("post_tags", &[]);
        link.link = true;
        let plan = Planner::new(Dialect::sqlite()).plan(&[link], &[]).unwrap();
        assert!(plan.statements()[0].link);
        assert!(plan.script().contains("); -- Link table"));
    }

    #[test]
    fn cycle_foreign_keys_are_added_after_both_tables_exist() {
        let tables = vec![table("x", &["y"]), table("y", &["x"])];
        let plan = Planner::new(Dialect::postgres()).plan(&tables, &[]).unwrap();
        let sql = plan.sql();
        assert_eq!(sql.len(), 3);
        assert!(sql[0].starts_with("CREATE TABLE IF NOT EXISTS \"x\""));
        assert!(!sql[0].contains("REFERENCES"));
        assert!(sql[1].starts_with("CREATE TABLE IF NOT EXISTS \"y\""));
        assert!(sql[1].contains("REFERENCES \"x\" (\"id\")"));
        assert_eq!(
            sql[2],
            "ALTER TABLE \"x\" ADD CONSTRAINT \"x_fk_y_id\" FOREIGN KEY (\"y_id\") REFERENCES \"y\" (\"id\")"
        );
    }

    #[test]
    fn cycle_foreign_keys_stay_inline_when_target_exists() {
        let tables = vec![table("x", &["y"]), table("y", &["x"])];
        let current = vec![table("y", &["x"])];
        let plan = Planner::new(Dialect::mysql()).plan(&tables, &current).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.sql()[0].contains("REFERENCES `y` (`id`)"));
    }

    #[test]
    fn sqlite_keeps_cycle_foreign_keys_inline() {
        let tables = vec![table("x", &["y"]), table("y", &["x"])];
        let plan = Planner::new(Dialect::sqlite()).plan(&tables, &[]).unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan.sql()[0].contains("REFERENCES \"y\" (\"id\")"));
    }

    #[test]
    fn sqlite_rejects_wide_auto_increment_key() {
        let events = Table::builder("events")
            .property(crate::model::bigint("id").auto_increment())
            .primary_key(&["id"])
            .build()
            .unwrap();
        let err = Planner::new(Dialect::sqlite()).plan(&[events.clone()], &[]).unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedAutoIncrement { .. }));
        assert_eq!(Planner::new(Dialect::postgres()).plan(&[events], &[]).unwrap().len(), 1);
    }
}

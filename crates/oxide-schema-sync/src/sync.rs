//! Synchronizer: brings a live SQLite database in line with declared tables.

use std::path::Path;

use oxide_schema::{Dialect, MigrationPlan, Planner, SchemaCache, Statement, Table};
use sqlx::sqlite::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::executor::ScriptExecutor;
use crate::reader::SqliteSchemaReader;

/// Options for a synchronisation run.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Dialect plans are rendered for.
    pub dialect: Dialect,
    /// Whether plans that rebuild tables may run.
    pub allow_destructive: bool,
    /// Print statements instead of executing them.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::sqlite(),
            allow_destructive: false,
            dry_run: false,
        }
    }
}

impl SyncOptions {
    /// Default options: sqlite, no destructive changes, statements executed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dialect plans are rendered for.
    #[must_use]
    pub const fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Allows plans that rebuild tables (and drop undeclared columns).
    #[must_use]
    pub const fn allow_destructive(mut self, allow: bool) -> Self {
        self.allow_destructive = allow;
        self
    }

    /// Prints statements instead of executing them.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// Outcome of a synchronisation run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The plan that was applied (or printed).
    pub plan: MigrationPlan,
    /// Number of statements executed.
    pub executed: usize,
    /// Tables that were rebuilt.
    pub recreated: Vec<String>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl SyncReport {
    /// Returns true when the database already matched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.plan.is_empty()
    }
}

/// Reads the live schema, plans and applies the migration.
#[derive(Debug)]
pub struct Synchronizer {
    reader: SqliteSchemaReader,
    executor: ScriptExecutor,
    options: SyncOptions,
    cache: SchemaCache,
}

impl Synchronizer {
    /// Creates a synchronizer for `pool`.
    #[must_use]
    pub fn new(pool: SqlitePool, options: SyncOptions) -> Self {
        Self {
            reader: SqliteSchemaReader::new(pool.clone()),
            executor: ScriptExecutor::new(pool).dry_run(options.dry_run),
            options,
            cache: SchemaCache::new(),
        }
    }

    /// The options of this run.
    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Parsed live tables, kept until a sync changes them.
    #[must_use]
    pub const fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// The live definitions of the tables named in `desired`.
    ///
    /// Tables already in the cache are not read again.
    ///
    /// # Errors
    ///
    /// Returns database errors and parse errors for stored DDL.
    pub async fn current(&self, desired: &[Table]) -> Result<Vec<Table>> {
        let missing: Vec<&str> = desired
            .iter()
            .map(|t| t.name.as_str())
            .filter(|name| self.cache.get(name).is_none())
            .collect();
        if !missing.is_empty() {
            for table in self.reader.read(&missing).await? {
                self.cache.insert(table);
            }
        }
        Ok(desired
            .iter()
            .filter_map(|t| self.cache.get(&t.name))
            .map(|t| (*t).clone())
            .collect())
    }

    /// Plans the migration from the live schema to `desired`.
    ///
    /// # Errors
    ///
    /// Returns database, parse and planning errors.
    pub async fn plan(&self, desired: &[Table]) -> Result<MigrationPlan> {
        let current = self.current(desired).await?;
        debug!(declared = desired.len(), existing = current.len(), "Loaded live schema");
        Ok(Planner::new(self.options.dialect).plan(desired, &current)?)
    }

    /// Plans and applies the migration.
    ///
    /// Table rebuilds run with foreign key enforcement switched off, each
    /// in its own transaction. Every other statement runs once, in plan
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DestructiveChange`] when the plan rebuilds
    /// tables and destructive changes are not allowed, and the first
    /// failing statement's error otherwise.
    pub async fn sync(&self, desired: &[Table]) -> Result<SyncReport> {
        if self.options.dialect.name != Dialect::sqlite().name {
            return Err(SyncError::UnsupportedDialect(
                self.options.dialect.name.to_string(),
            ));
        }

        let plan = self.plan(desired).await?;
        let recreated: Vec<String> = plan
            .destructive_tables()
            .into_iter()
            .map(String::from)
            .collect();
        if !recreated.is_empty() && !self.options.allow_destructive {
            return Err(SyncError::DestructiveChange(recreated));
        }

        let mut executed = 0;
        for group in group_statements(plan.statements()) {
            let sql: Vec<String> = group.statements.iter().map(|s| s.sql.clone()).collect();
            if group.destructive {
                warn!(table = %group.table, "Recreating table");
                executed += self.executor.run_without_foreign_keys(&sql).await?;
            } else {
                executed += self.executor.run(&sql).await?;
            }
        }

        if !self.options.dry_run {
            for table in desired {
                self.cache.invalidate(&table.name);
            }
        }

        info!(
            statements = executed,
            recreated = recreated.len(),
            dry_run = self.options.dry_run,
            "Schema synchronised"
        );
        Ok(SyncReport {
            plan,
            executed,
            recreated,
            dry_run: self.options.dry_run,
        })
    }
}

struct Group<'p> {
    table: &'p str,
    destructive: bool,
    statements: Vec<&'p Statement>,
}

/// Consecutive statements of one table with the same destructive flag
/// form one group.
fn group_statements(statements: &[Statement]) -> Vec<Group<'_>> {
    let mut groups: Vec<Group<'_>> = Vec::new();
    for statement in statements {
        match groups.last_mut() {
            Some(group)
                if group.table == statement.table && group.destructive == statement.destructive =>
            {
                group.statements.push(statement);
            }
            _ => groups.push(Group {
                table: &statement.table,
                destructive: statement.destructive,
                statements: vec![statement],
            }),
        }
    }
    groups
}

/// Loads declared tables from a JSON file holding an array of tables.
///
/// # Errors
///
/// Returns IO and deserialization errors, and validation errors for the
/// loaded tables.
pub fn load_schema(path: &Path) -> Result<Vec<Table>> {
    let content = std::fs::read_to_string(path)?;
    let tables: Vec<Table> = serde_json::from_str(&content)?;
    for table in &tables {
        table.validate()?;
    }
    debug!(path = %path.display(), tables = tables.len(), "Loaded declared schema");
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(table: &str, destructive: bool) -> Statement {
        Statement {
            sql: format!("-- {table}"),
            table: table.to_string(),
            link: false,
            destructive,
        }
    }

    #[test]
    fn test_grouping() {
        let statements = vec![
            statement("a", true),
            statement("a", true),
            statement("b", false),
            statement("b", false),
            statement("c", true),
        ];
        let groups = group_statements(&statements);
        let shape: Vec<(&str, bool, usize)> = groups
            .iter()
            .map(|g| (g.table, g.destructive, g.statements.len()))
            .collect();
        assert_eq!(shape, vec![("a", true, 2), ("b", false, 2), ("c", true, 1)]);
    }

    #[test]
    fn test_options_builder() {
        let options = SyncOptions::new().allow_destructive(true).dry_run(true);
        assert!(options.allow_destructive);
        assert!(options.dry_run);
        assert_eq!(options.dialect.name, "sqlite");
    }
}

//! Live schema reader for SQLite.
//!
//! SQLite keeps the DDL of every table and index in `sqlite_master`, so
//! reading the live schema is parsing that text back into tables.

use oxide_schema::model::naming::RECREATE_PREFIX;
use oxide_schema::{parse, Table};
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::error::Result;

const SCHEMA_SQL: &str = "SELECT type, tbl_name, sql FROM sqlite_master \
     WHERE type IN ('table', 'index') AND sql IS NOT NULL \
     ORDER BY CASE type WHEN 'table' THEN 0 ELSE 1 END, rowid";

/// Reads table definitions from a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteSchemaReader {
    pool: SqlitePool,
}

impl SqliteSchemaReader {
    /// Creates a reader over `pool`.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Names of the user tables, in creation order.
    ///
    /// Internal `sqlite_` tables and leftovers of interrupted rebuilds are
    /// not listed.
    ///
    /// # Errors
    ///
    /// Returns database errors.
    pub async fn table_names(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(name,)| name)
            .filter(|name| !name.starts_with("sqlite_") && !name.starts_with(RECREATE_PREFIX))
            .collect())
    }

    /// The stored DDL of the requested tables and their indices, one
    /// statement per line. An empty `names` selects every table.
    ///
    /// # Errors
    ///
    /// Returns database errors.
    pub async fn read_sql<S: AsRef<str>>(&self, names: &[S]) -> Result<String> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as(SCHEMA_SQL).fetch_all(&self.pool).await?;

        let mut sql = String::new();
        for (kind, table, statement) in rows {
            let wanted = if names.is_empty() {
                !table.starts_with("sqlite_") && !table.starts_with(RECREATE_PREFIX)
            } else {
                names.iter().any(|n| n.as_ref() == table)
            };
            if wanted {
                debug!(kind = %kind, table = %table, "Read stored DDL");
                sql.push_str(&statement);
                sql.push_str(";\n");
            }
        }
        Ok(sql)
    }

    /// Parses the requested tables. Tables that do not exist are absent
    /// from the result.
    ///
    /// # Errors
    ///
    /// Returns database errors, and schema errors when the stored DDL is
    /// outside the grammar the parser accepts.
    pub async fn read<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Table>> {
        let sql = self.read_sql(names).await?;
        let tables = parse(&sql)?;
        debug!(tables = tables.len(), "Parsed live schema");
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool")
    }

    async fn exec(pool: &SqlitePool, sql: &str) {
        sqlx::query(sql).execute(pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_reads_tables_and_indices() {
        let pool = create_test_pool().await;
        exec(&pool, "CREATE TABLE \"users\" (\"id\" INTEGER NOT NULL PRIMARY KEY, \"email\" TEXT)").await;
        exec(&pool, "CREATE UNIQUE INDEX \"users_ux_email\" ON \"users\" (\"email\")").await;
        exec(&pool, "CREATE TABLE \"other\" (\"x\" INTEGER)").await;

        let reader = SqliteSchemaReader::new(pool);
        let tables = reader.read(&["users"]).await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "users");
        assert_eq!(tables[0].uniques[0].name.as_deref(), Some("users_ux_email"));
        assert_eq!(tables[0].primary_key.as_ref().unwrap().properties, vec!["id"]);
    }

    #[tokio::test]
    async fn test_missing_tables_are_absent() {
        let reader = SqliteSchemaReader::new(create_test_pool().await);
        assert!(reader.read(&["nope"]).await.unwrap().is_empty());
        assert!(reader.table_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_table_names_skip_internal_tables() {
        let pool = create_test_pool().await;
        exec(&pool, "CREATE TABLE a (id INTEGER PRIMARY KEY AUTOINCREMENT)").await;
        exec(&pool, "CREATE TABLE \"__new_a\" (id INTEGER)").await;
        let reader = SqliteSchemaReader::new(pool);
        assert_eq!(reader.table_names().await.unwrap(), vec!["a"]);
    }
}

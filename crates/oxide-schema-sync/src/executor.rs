//! Migration script executor.
//!
//! Runs the statements of a migration script against a SQLite pool, one
//! statement at a time and without retries.

use oxide_schema::model::naming::{LINK_TABLE_MARKER, SEPARATOR};
use sqlx::sqlite::SqlitePool;
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};

/// Splits a migration script into executable statements.
///
/// Chunks are delimited by separator lines. Comment lines (including the
/// destructive tag) are removed, as are the trailing `;` and link marker.
/// Lines that fall inside a quoted literal or identifier belong to the
/// statement whatever they look like. Chunks left empty are skipped.
#[must_use]
pub fn split_script(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut chunk = Chunk::default();
    let mut quote = None;
    for line in script.lines() {
        if quote.is_none() {
            let trimmed = line.trim();
            if trimmed == SEPARATOR {
                statements.extend(chunk.take());
                continue;
            }
            if trimmed.starts_with("--") {
                chunk.comments.push(line);
                continue;
            }
        }
        chunk.body.push(line);
        quote = scan_quotes(line, quote);
    }
    statements.extend(chunk.take());
    statements
}

/// Quote state at the end of `line`, given the state at its start.
///
/// A doubled quote inside a literal closes and reopens it, which leaves
/// the state unchanged. `--` outside quotes ends the line.
fn scan_quotes(line: &str, mut quote: Option<char>) -> Option<char> {
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '-' if chars.peek() == Some(&'-') => break,
                _ => {}
            },
        }
    }
    quote
}

#[derive(Default)]
struct Chunk<'s> {
    body: Vec<&'s str>,
    comments: Vec<&'s str>,
}

impl Chunk<'_> {
    fn take(&mut self) -> Option<String> {
        let text = self.body.join("\n");
        let text = text.trim();
        let text = text.strip_suffix(LINK_TABLE_MARKER).unwrap_or(text).trim_end();
        let text = text.strip_suffix(';').unwrap_or(text).trim_end();
        let statement = if text.is_empty() {
            if !self.comments.is_empty() {
                warn!(chunk = %self.comments.join("\n"), "Skipping comment-only chunk");
            }
            None
        } else {
            Some(text.to_string())
        };
        self.body.clear();
        self.comments.clear();
        statement
    }
}

/// Executes statements against a database.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    pool: SqlitePool,
    dry_run: bool,
}

impl ScriptExecutor {
    /// Creates a new executor.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            dry_run: false,
        }
    }

    /// Enables dry-run mode (SQL is printed but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Returns whether dry-run mode is on.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The pool statements run against.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Executes a single statement.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Statement`] when the database rejects it.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "Executing SQL");
        if self.dry_run {
            println!("{sql};");
            return Ok(());
        }
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|source| statement_error(sql, source))?;
        Ok(())
    }

    /// Executes statements in order, stopping at the first failure.
    /// Returns the number of statements run.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing statement.
    pub async fn run(&self, statements: &[String]) -> Result<usize> {
        for sql in statements {
            self.execute(sql).await?;
        }
        Ok(statements.len())
    }

    /// Splits `script` and executes its statements.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing statement.
    pub async fn run_script(&self, script: &str) -> Result<usize> {
        let statements = split_script(script);
        info!(statements = statements.len(), "Running migration script");
        self.run(&statements).await
    }

    /// Executes statements inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing statement; the transaction
    /// is rolled back.
    pub async fn run_in_transaction(&self, statements: &[String]) -> Result<usize> {
        if self.dry_run {
            return self.run(statements).await;
        }
        let mut tx = self.pool.begin().await?;
        for sql in statements {
            debug!(sql = %sql, "Executing SQL in transaction");
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|source| statement_error(sql, source))?;
        }
        tx.commit().await?;
        Ok(statements.len())
    }

    /// Executes a table rebuild: foreign key enforcement is switched off
    /// on one connection, the statements run in a transaction on it, and
    /// enforcement is switched back on whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing statement; the transaction
    /// is rolled back.
    pub async fn run_without_foreign_keys(&self, statements: &[String]) -> Result<usize> {
        if self.dry_run {
            println!("PRAGMA foreign_keys = OFF;");
            let count = self.run(statements).await?;
            println!("PRAGMA foreign_keys = ON;");
            return Ok(count);
        }

        let mut conn = self.pool.acquire().await?;
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let outcome = async {
            let mut tx = conn.begin().await?;
            for sql in statements {
                debug!(sql = %sql, "Executing rebuild SQL");
                sqlx::query(sql)
                    .execute(&mut *tx)
                    .await
                    .map_err(|source| statement_error(sql, source))?;
            }
            tx.commit().await?;
            Ok::<usize, SyncError>(statements.len())
        }
        .await;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await?;
        outcome
    }
}

fn statement_error(sql: &str, source: sqlx::Error) -> SyncError {
    SyncError::Statement {
        sql: sql.to_string(),
        source,
    }
}

//! Dialect capability flags.
//!
//! A dialect is plain data: the emitter, the planner and the query
//! compiler branch on these flags instead of dispatching through a trait
//! per database. Adding a database means adding a preset.

/// How indices are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStyle {
    /// Inside the `CREATE TABLE` body (`INDEX name (cols)`).
    Inline,
    /// As separate `CREATE [UNIQUE] INDEX` statements.
    Separate,
}

/// How much of `ALTER TABLE` the database supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterSupport {
    /// Column and constraint changes can be expressed one by one.
    Targeted,
    /// Structural changes require rebuilding the table.
    RecreateOnly,
}

/// Auto-increment syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoIncrement {
    /// A keyword placed after the column definition.
    Keyword(&'static str),
    /// `GENERATED BY DEFAULT AS IDENTITY`.
    Identity,
}

/// How the primary key is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyStyle {
    /// Explicit `CONSTRAINT name PRIMARY KEY (cols)` clause.
    Constraint,
    /// `PRIMARY KEY` on the column itself for single-column keys.
    Inline,
}

/// Boolean literal encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanLiteral {
    /// `TRUE` / `FALSE`.
    Keyword,
    /// `1` / `0`.
    Integer,
}

/// Enum literal encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumLiteral {
    /// Stored as the variant position.
    Ordinal,
    /// Stored as the quoted variant name.
    Name,
}

/// Column modification syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyColumn {
    /// `ALTER TABLE t MODIFY COLUMN <definition>`.
    Modify,
    /// `ALTER TABLE t ALTER COLUMN c TYPE .., ALTER COLUMN c SET ..`.
    AlterColumn,
}

/// Syntax for dropping primary and foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropConstraint {
    /// `DROP FOREIGN KEY name` / `DROP PRIMARY KEY`.
    ForeignKey,
    /// `DROP CONSTRAINT name`.
    Constraint,
}

/// Syntax for dropping an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropIndex {
    /// `DROP INDEX IF EXISTS name`.
    Standalone,
    /// `DROP INDEX name ON table`.
    OnTable,
}

/// Capability flags for one database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Preset name.
    pub name: &'static str,
    /// Identifier quote character.
    pub quote: char,
    /// Inline or separate indices.
    pub index_style: IndexStyle,
    /// Targeted or recreate-only ALTER support.
    pub alter_support: AlterSupport,
    /// Auto-increment syntax.
    pub auto_increment: AutoIncrement,
    /// Primary key rendering.
    pub primary_key_style: PrimaryKeyStyle,
    /// Boolean literal encoding.
    pub boolean_literal: BooleanLiteral,
    /// Enum literal encoding.
    pub enum_literal: EnumLiteral,
    /// Column modification syntax.
    pub modify_column: ModifyColumn,
    /// Constraint drop syntax.
    pub drop_constraint: DropConstraint,
    /// Index drop syntax.
    pub drop_index: DropIndex,
    /// Whether `CREATE INDEX IF NOT EXISTS` is accepted.
    pub index_if_not_exists: bool,
    /// Whether auto-increment is only accepted on a single-column
    /// `INTEGER` primary key.
    pub auto_increment_integer_key: bool,
}

impl Dialect {
    /// SQLite: narrow ALTER support, so structural changes rebuild the table.
    #[must_use]
    pub const fn sqlite() -> Self {
        Self {
            name: "sqlite",
            quote: '"',
            index_style: IndexStyle::Separate,
            alter_support: AlterSupport::RecreateOnly,
            auto_increment: AutoIncrement::Keyword("AUTOINCREMENT"),
            primary_key_style: PrimaryKeyStyle::Inline,
            boolean_literal: BooleanLiteral::Integer,
            enum_literal: EnumLiteral::Ordinal,
            modify_column: ModifyColumn::AlterColumn,
            drop_constraint: DropConstraint::Constraint,
            drop_index: DropIndex::Standalone,
            index_if_not_exists: true,
            auto_increment_integer_key: true,
        }
    }

    /// MySQL / MariaDB.
    #[must_use]
    pub const fn mysql() -> Self {
        Self {
            name: "mysql",
            quote: '`',
            index_style: IndexStyle::Inline,
            alter_support: AlterSupport::Targeted,
            auto_increment: AutoIncrement::Keyword("AUTO_INCREMENT"),
            primary_key_style: PrimaryKeyStyle::Constraint,
            boolean_literal: BooleanLiteral::Integer,
            enum_literal: EnumLiteral::Name,
            modify_column: ModifyColumn::Modify,
            drop_constraint: DropConstraint::ForeignKey,
            drop_index: DropIndex::OnTable,
            index_if_not_exists: false,
            auto_increment_integer_key: false,
        }
    }

    /// PostgreSQL.
    #[must_use]
    pub const fn postgres() -> Self {
        Self {
            name: "postgres",
            quote: '"',
            index_style: IndexStyle::Separate,
            alter_support: AlterSupport::Targeted,
            auto_increment: AutoIncrement::Identity,
            primary_key_style: PrimaryKeyStyle::Constraint,
            boolean_literal: BooleanLiteral::Keyword,
            enum_literal: EnumLiteral::Name,
            modify_column: ModifyColumn::AlterColumn,
            drop_constraint: DropConstraint::Constraint,
            drop_index: DropIndex::Standalone,
            index_if_not_exists: true,
            auto_increment_integer_key: false,
        }
    }

    /// Resolves a preset by name (case-insensitive).
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::sqlite()),
            "mysql" | "mariadb" => Some(Self::mysql()),
            "postgres" | "postgresql" | "pg" => Some(Self::postgres()),
            _ => None,
        }
    }

    /// Quotes an identifier, doubling embedded quote characters.
    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote;
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quotes and comma-joins a column list.
    #[must_use]
    pub fn quote_list<S: AsRef<str>>(&self, names: &[S]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns true when structural changes require a table rebuild.
    #[must_use]
    pub fn recreate_only(&self) -> bool {
        self.alter_support == AlterSupport::RecreateOnly
    }

    /// Returns true when indices are separate statements.
    #[must_use]
    pub fn separate_indices(&self) -> bool {
        self.index_style == IndexStyle::Separate
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::sqlite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name() {
        assert_eq!(Dialect::by_name("SQLite"), Some(Dialect::sqlite()));
        assert_eq!(Dialect::by_name("postgresql"), Some(Dialect::postgres()));
        assert_eq!(Dialect::by_name("mariadb"), Some(Dialect::mysql()));
        assert_eq!(Dialect::by_name("oracle"), None);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::sqlite().quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::mysql().quote_identifier("users"), "`users`");
        assert_eq!(Dialect::postgres().quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(Dialect::mysql().quote_list(&["a", "b"]), "`a`, `b`");
    }

    #[test]
    fn test_capabilities() {
        assert!(Dialect::sqlite().recreate_only());
        assert!(!Dialect::postgres().recreate_only());
        assert!(Dialect::sqlite().separate_indices());
        assert!(!Dialect::mysql().separate_indices());
        assert!(Dialect::sqlite().auto_increment_integer_key);
        assert!(!Dialect::postgres().auto_increment_integer_key);
    }
}

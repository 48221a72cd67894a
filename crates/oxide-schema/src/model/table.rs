//! Table definitions and the declarative table builder.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::constraint::{ForeignKey, Index};
use super::naming;
use super::property::Property;
use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Structural description of a table.
///
/// Built once per run from declarations (see [`TableBuilder`]) or from the
/// live database, and treated as immutable once handed to the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub properties: Vec<Property>,
    /// Primary key, if any.
    #[serde(default)]
    pub primary_key: Option<Index>,
    /// Plain indices.
    #[serde(default)]
    pub indices: Vec<Index>,
    /// Unique indices.
    #[serde(default)]
    pub uniques: Vec<Index>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// Whether this is a link (junction) table.
    #[serde(default)]
    pub link: bool,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            primary_key: None,
            indices: Vec::new(),
            uniques: Vec::new(),
            foreign_keys: Vec::new(),
            link: false,
        }
    }

    /// Starts a declarative builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(name)
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns whether the table has a column named `name`.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// Name of the primary key constraint.
    #[must_use]
    pub fn primary_key_name(&self) -> String {
        self.primary_key
            .as_ref()
            .and_then(|pk| pk.name.clone())
            .unwrap_or_else(|| naming::primary_key_name(&self.name))
    }

    /// Name of a plain index, derived when unset.
    #[must_use]
    pub fn index_name(&self, index: &Index) -> String {
        index
            .name
            .clone()
            .unwrap_or_else(|| naming::index_name(&self.name, &index.properties))
    }

    /// Name of a unique index, derived when unset.
    #[must_use]
    pub fn unique_name(&self, index: &Index) -> String {
        index
            .name
            .clone()
            .unwrap_or_else(|| naming::unique_name(&self.name, &index.properties))
    }

    /// Name of a foreign key, derived when unset.
    #[must_use]
    pub fn foreign_key_name(&self, fk: &ForeignKey) -> String {
        fk.name
            .clone()
            .unwrap_or_else(|| naming::foreign_key_name(&self.name, &fk.properties))
    }

    /// Returns the single primary key column, if the key has exactly one.
    #[must_use]
    pub fn single_primary_key(&self) -> Option<&Property> {
        match self.primary_key.as_ref()?.properties.as_slice() {
            [only] => self.property(only),
            _ => None,
        }
    }

    /// Returns a copy with every unset constraint name filled in.
    #[must_use]
    pub fn with_derived_names(&self) -> Self {
        let mut table = self.clone();
        if let Some(pk) = table.primary_key.as_mut() {
            pk.name.get_or_insert_with(|| naming::primary_key_name(&self.name));
        }
        for index in &mut table.indices {
            index
                .name
                .get_or_insert_with(|| naming::index_name(&self.name, &index.properties));
        }
        for unique in &mut table.uniques {
            unique
                .name
                .get_or_insert_with(|| naming::unique_name(&self.name, &unique.properties));
        }
        for fk in &mut table.foreign_keys {
            fk.name
                .get_or_insert_with(|| naming::foreign_key_name(&self.name, &fk.properties));
        }
        table
    }

    /// Checks the structural invariants of the table.
    ///
    /// # Errors
    ///
    /// Returns an error for repeated column names, empty indices and
    /// constraints that mention columns the table does not have.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(Error::DuplicateProperty {
                    table: self.name.clone(),
                    property: property.name.clone(),
                });
            }
        }

        if let Some(pk) = &self.primary_key {
            self.check_columns(&self.primary_key_name(), &pk.properties)?;
        }
        for index in &self.indices {
            self.check_columns(&self.index_name(index), &index.properties)?;
        }
        for unique in &self.uniques {
            self.check_columns(&self.unique_name(unique), &unique.properties)?;
        }
        for fk in &self.foreign_keys {
            self.check_columns(&self.foreign_key_name(fk), &fk.properties)?;
        }
        Ok(())
    }

    /// Checks the table against what `dialect` can express, after
    /// [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns the structural errors of `validate`, and
    /// [`Error::UnsupportedAutoIncrement`] when the dialect only accepts
    /// auto-increment on a single-column `INTEGER` primary key and a
    /// column does not fit that shape.
    pub fn validate_for(&self, dialect: &Dialect) -> Result<()> {
        self.validate()?;
        if !dialect.auto_increment_integer_key {
            return Ok(());
        }
        let key = self.single_primary_key().map(|p| p.name.as_str());
        let unsupported = self.properties.iter().find(|p| {
            p.auto_increment
                && (key != Some(p.name.as_str())
                    || p.sql_type != "INTEGER"
                    || !p.type_params.is_empty())
        });
        match unsupported {
            Some(property) => Err(Error::UnsupportedAutoIncrement {
                table: self.name.clone(),
                property: property.name.clone(),
                dialect: dialect.name,
            }),
            None => Ok(()),
        }
    }

    fn check_columns(&self, constraint: &str, columns: &[String]) -> Result<()> {
        if columns.is_empty() {
            return Err(Error::EmptyIndex {
                table: self.name.clone(),
                index: constraint.to_string(),
            });
        }
        if let Some(missing) = columns.iter().find(|c| !self.has_property(c)) {
            return Err(Error::UnknownProperty {
                table: self.name.clone(),
                constraint: constraint.to_string(),
                property: missing.clone(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// TableBuilder
// =============================================================================

/// Declarative table builder.
///
/// # Example
///
/// ```rust
/// use oxide_schema::model::{integer, varchar, Table};
///
/// let users = Table::builder("users")
///     .property(integer("id").auto_increment())
///     .property(varchar("email", 255).not_null())
///     .primary_key(&["id"])
///     .unique(&["email"])
///     .build()
///     .unwrap();
///
/// assert_eq!(users.properties.len(), 2);
/// assert_eq!(users.unique_name(&users.uniques[0]), "users_ux_email");
/// ```
#[derive(Debug, Clone)]
pub struct TableBuilder {
    table: Table,
    extra_primary_keys: usize,
}

impl TableBuilder {
    /// Creates a builder for a table named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: Table::new(name),
            extra_primary_keys: 0,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn property(mut self, property: Property) -> Self {
        self.table.properties.push(property);
        self
    }

    /// Sets the primary key. A second call is reported by [`build`](Self::build).
    #[must_use]
    pub fn primary_key<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        if self.table.primary_key.is_some() {
            self.extra_primary_keys += 1;
        } else {
            self.table.primary_key = Some(Index::new(columns));
        }
        self
    }

    /// Adds a plain index named after its columns.
    #[must_use]
    pub fn index<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.table.indices.push(Index::new(columns));
        self
    }

    /// Adds a plain index named after a group: `{table}_ix_{group}`.
    #[must_use]
    pub fn index_group<S: AsRef<str>>(mut self, group: &str, columns: &[S]) -> Self {
        let name = naming::index_name(&self.table.name, &[group]);
        self.table.indices.push(Index::new(columns).named(name));
        self
    }

    /// Adds a unique index named after its columns.
    #[must_use]
    pub fn unique<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.table.uniques.push(Index::new(columns));
        self
    }

    /// Adds a unique index named after a group: `{table}_ux_{group}`.
    #[must_use]
    pub fn unique_group<S: AsRef<str>>(mut self, group: &str, columns: &[S]) -> Self {
        let name = naming::unique_name(&self.table.name, &[group]);
        self.table.uniques.push(Index::new(columns).named(name));
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.table.foreign_keys.push(fk);
        self
    }

    /// Marks the table as a link (junction) table.
    #[must_use]
    pub const fn link(mut self) -> Self {
        self.table.link = true;
        self
    }

    /// Finishes the table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePrimaryKey`] when more than one primary key
    /// was declared, or any error from [`Table::validate`].
    pub fn build(self) -> Result<Table> {
        if self.extra_primary_keys > 0 {
            return Err(Error::DuplicatePrimaryKey(self.table.name));
        }
        self.table.validate()?;
        Ok(self.table)
    }
}

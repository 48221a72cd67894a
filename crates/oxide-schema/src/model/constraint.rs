//! Indices, unique indices and foreign keys.

use serde::{Deserialize, Serialize};

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    /// Set the referencing column to NULL.
    SetNull,
    /// Set the referencing column to its default.
    SetDefault,
    /// Cascade the operation.
    Cascade,
    /// No action.
    #[default]
    NoAction,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Cascade => "CASCADE",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// An ordered list of columns, optionally named.
///
/// Used for plain indices, unique indices and the primary key. Two
/// indices are equal when they cover the same columns in the same
/// order; names are ignored because they may be synthesised.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name; `None` derives one from the table and columns.
    #[serde(default)]
    pub name: Option<String>,
    /// Covered columns, in order.
    pub properties: Vec<String>,
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
    }
}

impl Index {
    /// Creates an unnamed index over `properties`.
    #[must_use]
    pub fn new<S: AsRef<str>>(properties: &[S]) -> Self {
        Self {
            name: None,
            properties: properties.iter().map(|p| p.as_ref().to_string()).collect(),
        }
    }

    /// Sets an explicit name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// The target side of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Referenced table.
    pub table: String,
    /// Referenced columns.
    pub properties: Vec<String>,
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name; `None` derives `{table}_fk_{columns}`.
    #[serde(default)]
    pub name: Option<String>,
    /// Local columns.
    pub properties: Vec<String>,
    /// Referenced table and columns.
    pub reference: Reference,
    /// ON DELETE action.
    #[serde(default)]
    pub delete_action: ForeignKeyAction,
    /// ON UPDATE action.
    #[serde(default)]
    pub change_action: ForeignKeyAction,
}

impl ForeignKey {
    /// Creates an unnamed foreign key with `NO ACTION` for both events.
    #[must_use]
    pub fn new<S: AsRef<str>, R: AsRef<str>>(
        properties: &[S],
        table: impl Into<String>,
        references: &[R],
    ) -> Self {
        Self {
            name: None,
            properties: properties.iter().map(|p| p.as_ref().to_string()).collect(),
            reference: Reference {
                table: table.into(),
                properties: references.iter().map(|p| p.as_ref().to_string()).collect(),
            },
            delete_action: ForeignKeyAction::NoAction,
            change_action: ForeignKeyAction::NoAction,
        }
    }

    /// Sets an explicit constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.delete_action = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn on_change(mut self, action: ForeignKeyAction) -> Self {
        self.change_action = action;
        self
    }

    /// Same constraint: name, columns, target and actions all match.
    #[must_use]
    pub fn same_constraint(&self, other: &Self) -> bool {
        self == other
    }

    /// Same target: everything but the name matches.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.properties == other.properties
            && self.reference == other.reference
            && self.delete_action == other.delete_action
            && self.change_action == other.change_action
    }

    /// Returns whether the key points back at its own table.
    #[must_use]
    pub fn is_self_reference(&self, table: &str) -> bool {
        self.reference.table == table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_equality_ignores_name() {
        let a = Index::new(&["email"]).named("users_ix_email");
        let b = Index::new(&["email"]).named("idx_email");
        assert_eq!(a, b);
        assert_ne!(a, Index::new(&["email", "handle"]));
    }

    #[test]
    fn index_equality_respects_order() {
        assert_ne!(Index::new(&["a", "b"]), Index::new(&["b", "a"]));
    }

    #[test]
    fn foreign_key_target_ignores_name() {
        let a = ForeignKey::new(&["author_id"], "users", &["id"])
            .on_delete(ForeignKeyAction::Cascade)
            .named("posts_fk_author_id");
        let b = ForeignKey::new(&["author_id"], "users", &["id"])
            .on_delete(ForeignKeyAction::Cascade)
            .named("fk_author");
        assert!(a.same_target(&b));
        assert!(!a.same_constraint(&b));
        assert!(!a.same_target(&b.clone().on_change(ForeignKeyAction::SetNull)));
    }

    #[test]
    fn action_sql() {
        assert_eq!(ForeignKeyAction::default(), ForeignKeyAction::NoAction);
        assert_eq!(ForeignKeyAction::SetNull.as_sql(), "SET NULL");
        assert_eq!(ForeignKeyAction::Cascade.as_sql(), "CASCADE");
    }
}

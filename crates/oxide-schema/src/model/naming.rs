//! Deterministic constraint names and script markers.
//!
//! Derived names let a re-run of the planner address constraints it
//! created earlier without storing any extra metadata.

/// Trailing marker on statements that belong to a link (junction) table.
pub const LINK_TABLE_MARKER: &str = "-- Link table";

/// Separator line between independently executable statements.
pub const SEPARATOR: &str = "-- separator";

/// Tag line placed before a destructive statement in a script.
pub const DESTRUCTIVE_TAG: &str = "-- destructive: recreate table";

/// Prefix of the temporary table used while recreating a table.
pub const RECREATE_PREFIX: &str = "__new_";

/// Primary key constraint name: `{table}_pk`.
#[must_use]
pub fn primary_key_name(table: &str) -> String {
    format!("{table}_pk")
}

/// Foreign key constraint name: `{table}_fk_{columns}`.
#[must_use]
pub fn foreign_key_name<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    format!("{table}_fk_{}", join(columns))
}

/// Plain index name: `{table}_ix_{columns}` or `{table}_ix_{group}`.
#[must_use]
pub fn index_name<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    format!("{table}_ix_{}", join(columns))
}

/// Unique index name: `{table}_ux_{columns}` or `{table}_ux_{group}`.
#[must_use]
pub fn unique_name<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    format!("{table}_ux_{}", join(columns))
}

/// Name of the temporary table a recreate copies into.
#[must_use]
pub fn recreate_name(table: &str) -> String {
    format!("{RECREATE_PREFIX}{table}")
}

fn join<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        assert_eq!(primary_key_name("users"), "users_pk");
        assert_eq!(foreign_key_name("posts", &["author_id"]), "posts_fk_author_id");
        assert_eq!(index_name("users", &["last", "first"]), "users_ix_last_first");
        assert_eq!(unique_name("users", &["email"]), "users_ux_email");
        assert_eq!(index_name("users", &["by_name"]), "users_ix_by_name");
        assert_eq!(recreate_name("users"), "__new_users");
    }
}

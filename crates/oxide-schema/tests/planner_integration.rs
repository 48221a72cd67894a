//! Planner behaviour across dialects.

mod common;
use common::*;

use oxide_schema::model::{integer, text, varchar, ForeignKey, Table};
use oxide_schema::{emit, parse, Dialect, Error, Planner};

fn live(dialect: &Dialect, tables: &[Table]) -> Vec<Table> {
    let sql: String = tables.iter().map(|t| emit(t, dialect)).collect();
    parse(&sql).unwrap()
}

fn created_tables(sql: &[&str]) -> Vec<String> {
    sql.iter()
        .filter_map(|s| s.strip_prefix("CREATE TABLE IF NOT EXISTS "))
        .map(|rest| rest.split(' ').next().unwrap_or_default().trim_matches(['"', '`']).to_string())
        .collect()
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn schema_against_itself_plans_nothing() {
    for dialect in dialects() {
        assert!(plan(dialect, &schema(), &schema()).is_empty(), "{}", dialect.name);
    }
}

#[test]
fn schema_against_its_parsed_ddl_plans_nothing() {
    for dialect in dialects() {
        let current = live(&dialect, &schema());
        let plan = plan(dialect, &schema(), &current);
        assert!(plan.is_empty(), "{}: {:?}", dialect.name, plan.sql());
    }
}

// =============================================================================
// Fresh database
// =============================================================================

#[test]
fn fresh_database_creates_targets_first_and_link_tables_last() {
    let desired = vec![post_tags(), posts(), users(), tags()];
    for dialect in dialects() {
        let plan = plan(dialect, &desired, &[]);
        assert_eq!(
            created_tables(&plan.sql()),
            vec!["users", "posts", "tags", "post_tags"],
            "{}",
            dialect.name
        );
        let last = plan.statements().last().unwrap();
        assert!(last.link);
        assert!(!plan.is_destructive());
    }
}

#[test]
fn fresh_sqlite_plan_is_idempotent_sql() {
    let plan = plan(Dialect::sqlite(), &schema(), &[]);
    for sql in plan.sql() {
        assert!(
            sql.starts_with("CREATE TABLE IF NOT EXISTS ")
                || sql.starts_with("CREATE INDEX IF NOT EXISTS ")
                || sql.starts_with("CREATE UNIQUE INDEX IF NOT EXISTS "),
            "{sql}"
        );
    }
}

#[test]
fn applying_a_fresh_plan_then_replanning_is_empty() {
    for dialect in dialects() {
        let first = plan(dialect, &schema(), &[]);
        let script: String = first.sql().iter().map(|s| format!("{s};\n")).collect();
        let mut current = parse(&script).unwrap();
        for table in &mut current {
            table.link = table.name == "post_tags";
        }
        assert!(plan(dialect, &schema(), &current).is_empty(), "{}", dialect.name);
    }
}

// =============================================================================
// Column changes
// =============================================================================

fn accounts(extra: bool) -> Table {
    let mut builder = Table::builder("accounts")
        .property(integer("id").auto_increment())
        .property(varchar("handle", 64).not_null())
        .primary_key(&["id"]);
    if extra {
        builder = builder.property(text("bio"));
    }
    builder.build().unwrap()
}

#[test]
fn added_column_on_targeted_dialect() {
    let plan = plan(Dialect::postgres(), &[accounts(true)], &[accounts(false)]);
    assert_eq!(
        plan.sql(),
        vec!["ALTER TABLE \"accounts\" ADD COLUMN \"bio\" TEXT"]
    );
    assert!(!plan.is_destructive());
}

#[test]
fn added_column_on_recreate_only_dialect() {
    let plan = plan(Dialect::sqlite(), &[accounts(true)], &[accounts(false)]);
    assert_eq!(
        plan.sql(),
        vec![
            "DROP TABLE IF EXISTS \"__new_accounts\"",
            "CREATE TABLE \"__new_accounts\" (\n    \"id\" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,\n    \"handle\" VARCHAR(64) NOT NULL,\n    \"bio\" TEXT\n)",
            "INSERT INTO \"__new_accounts\" (\"id\", \"handle\") SELECT \"id\", \"handle\" FROM \"accounts\"",
            "DROP TABLE \"accounts\"",
            "ALTER TABLE \"__new_accounts\" RENAME TO \"accounts\"",
        ]
    );
    assert_eq!(plan.destructive_tables(), vec!["accounts"]);
}

#[test]
fn recreate_copies_only_shared_columns_in_existing_order() {
    let current = Table::builder("notes")
        .property(integer("id"))
        .property(text("legacy"))
        .property(text("body"))
        .primary_key(&["id"])
        .build()
        .unwrap();
    let desired = Table::builder("notes")
        .property(text("body"))
        .property(integer("id"))
        .property(text("title"))
        .primary_key(&["id"])
        .index(&["title"])
        .build()
        .unwrap();

    let plan = plan(Dialect::sqlite(), &[desired], &[current]);
    let sql = plan.sql();
    assert_eq!(
        sql[2],
        "INSERT INTO \"__new_notes\" (\"id\", \"body\") SELECT \"id\", \"body\" FROM \"notes\""
    );
    assert_eq!(
        sql.last().copied(),
        Some("CREATE INDEX IF NOT EXISTS \"notes_ix_title\" ON \"notes\" (\"title\")")
    );
    assert!(plan.statements().iter().all(|s| s.destructive));
}

#[test]
fn dropped_column_on_mysql_is_incremental() {
    let plan = plan(Dialect::mysql(), &[accounts(false)], &[accounts(true)]);
    assert_eq!(plan.sql(), vec!["ALTER TABLE `accounts` DROP COLUMN `bio`"]);
}

#[test]
fn changed_column_on_mysql_modifies() {
    let current = accounts(false);
    let mut desired = accounts(false);
    desired.properties[1].type_params = vec!["128".into()];
    let plan = plan(Dialect::mysql(), &[desired], &[current]);
    assert_eq!(
        plan.sql(),
        vec!["ALTER TABLE `accounts` MODIFY COLUMN `handle` VARCHAR(128) NOT NULL"]
    );
}

// =============================================================================
// Foreign keys
// =============================================================================

#[test]
fn foreign_key_namesake_is_stable() {
    let mut current = posts();
    current.foreign_keys[0].name = Some("legacy_posts_author".into());
    for dialect in dialects() {
        assert!(
            plan(dialect, &[posts()], &[current.clone()]).is_empty(),
            "{}",
            dialect.name
        );
    }
}

#[test]
fn new_foreign_key_gets_derived_name() {
    let current = Table::builder("comments")
        .property(integer("id"))
        .property(integer("post_id"))
        .primary_key(&["id"])
        .build()
        .unwrap();
    let desired = Table::builder("comments")
        .property(integer("id"))
        .property(integer("post_id"))
        .primary_key(&["id"])
        .foreign_key(ForeignKey::new(&["post_id"], "posts", &["id"]))
        .build()
        .unwrap();
    let plan = plan(Dialect::postgres(), &[desired], &[current]);
    assert_eq!(
        plan.sql(),
        vec![
            "ALTER TABLE \"comments\" ADD CONSTRAINT \"comments_fk_post_id\" FOREIGN KEY (\"post_id\") REFERENCES \"posts\" (\"id\")"
        ]
    );
}

#[test]
fn dropping_unnamed_foreign_key_is_an_error() {
    let mut current = posts();
    current.foreign_keys[0].name = None;
    let mut desired = posts();
    desired.foreign_keys.clear();
    let err = Planner::new(Dialect::postgres())
        .plan(&[desired], &[current])
        .unwrap_err();
    assert!(matches!(err, Error::UnnamedForeignKey { ref table, .. } if table == "posts"));
}

// =============================================================================
// Script format
// =============================================================================

#[test]
fn script_separates_and_terminates_statements() {
    let plan = plan(Dialect::postgres(), &[users(), tags(), post_tags(), posts()], &[]);
    let script = plan.script();
    let entries: Vec<&str> = script.trim_end().split("\n-- separator\n").collect();
    assert_eq!(entries.len(), plan.len());
    assert!(entries.iter().all(|e| e.contains(';')));
    assert!(entries.last().unwrap().ends_with("; -- Link table"));
}

#[test]
fn tables_not_declared_are_left_alone() {
    let plan = plan(Dialect::postgres(), &[users()], &[users(), tags()]);
    assert!(plan.is_empty());
}

#![allow(dead_code)]

use oxide_schema::model::{
    boolean, integer, real, text, timestamp, varchar, ForeignKey, ForeignKeyAction, Table,
};
use oxide_schema::{Dialect, MigrationPlan, Planner};

pub fn dialects() -> [Dialect; 3] {
    [Dialect::sqlite(), Dialect::postgres(), Dialect::mysql()]
}

pub fn users() -> Table {
    Table::builder("users")
        .property(integer("id").auto_increment())
        .property(varchar("handle", 64).not_null())
        .property(text("bio"))
        .property(boolean("active").not_null().default_bool(true))
        .property(real("score").default_float(1.5))
        .primary_key(&["id"])
        .unique(&["handle"])
        .build()
        .unwrap_or_else(|e| panic!("invalid users table: {e}"))
}

pub fn posts() -> Table {
    Table::builder("posts")
        .property(integer("id").auto_increment())
        .property(integer("user_id").not_null())
        .property(text("title").not_null().default_str("untitled"))
        .property(timestamp("created").default_expr("CURRENT_TIMESTAMP"))
        .primary_key(&["id"])
        .index(&["user_id"])
        .foreign_key(
            ForeignKey::new(&["user_id"], "users", &["id"]).on_delete(ForeignKeyAction::Cascade),
        )
        .build()
        .unwrap_or_else(|e| panic!("invalid posts table: {e}"))
}

pub fn tags() -> Table {
    Table::builder("tags")
        .property(integer("id").auto_increment())
        .property(varchar("label", 32).not_null())
        .primary_key(&["id"])
        .build()
        .unwrap_or_else(|e| panic!("invalid tags table: {e}"))
}

pub fn post_tags() -> Table {
    Table::builder("post_tags")
        .property(integer("post_id").not_null())
        .property(integer("tag_id").not_null())
        .primary_key(&["post_id", "tag_id"])
        .foreign_key(ForeignKey::new(&["post_id"], "posts", &["id"]))
        .foreign_key(ForeignKey::new(&["tag_id"], "tags", &["id"]))
        .link()
        .build()
        .unwrap_or_else(|e| panic!("invalid post_tags table: {e}"))
}

pub fn schema() -> Vec<Table> {
    vec![users(), posts(), tags(), post_tags()]
}

pub fn plan(dialect: Dialect, desired: &[Table], current: &[Table]) -> MigrationPlan {
    Planner::new(dialect)
        .plan(desired, current)
        .unwrap_or_else(|e| panic!("planning failed on {}: {e}", dialect.name))
}

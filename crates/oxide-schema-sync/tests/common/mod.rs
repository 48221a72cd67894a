#![allow(dead_code)]

use oxide_schema::model::{integer, text, varchar, ForeignKey, ForeignKeyAction, Table};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

pub fn users(with_bio: bool) -> Table {
    let mut builder = Table::builder("users")
        .property(integer("id").auto_increment())
        .property(varchar("handle", 64).not_null())
        .primary_key(&["id"])
        .unique(&["handle"]);
    if with_bio {
        builder = builder.property(text("bio"));
    }
    builder.build().expect("valid users table")
}

pub fn posts() -> Table {
    Table::builder("posts")
        .property(integer("id").auto_increment())
        .property(integer("user_id").not_null())
        .property(text("title").not_null().default_str("untitled"))
        .primary_key(&["id"])
        .index(&["user_id"])
        .foreign_key(
            ForeignKey::new(&["user_id"], "users", &["id"]).on_delete(ForeignKeyAction::Cascade),
        )
        .build()
        .expect("valid posts table")
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM \"{table}\""))
        .fetch_one(pool)
        .await
        .expect("count query");
    n
}

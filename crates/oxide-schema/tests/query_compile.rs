//! Query compilation against a schema read from DDL.

mod common;
use common::*;

use oxide_schema::query::{col, placeholder, value, Direction, Record, Select, SqlValue};
use oxide_schema::{emit, parse, Dialect, Error, SchemaCache};

fn cache() -> SchemaCache {
    let dialect = Dialect::sqlite();
    let sql: String = schema().iter().map(|t| emit(t, &dialect)).collect();
    SchemaCache::with_tables(parse(&sql).unwrap())
}

#[test]
fn null_parameter_folds_into_is_null() {
    let query = Select::new()
        .column("id")
        .from("users")
        .filter(col("handle").eq(placeholder()))
        .compile(&Dialect::sqlite(), &cache(), &[None])
        .unwrap();
    assert_eq!(query.sql, "SELECT id FROM users WHERE handle IS NULL");
    assert_eq!(query.params.len(), 0);
}

#[test]
fn bound_parameters_keep_their_order() {
    let query = Select::new()
        .column("p.title")
        .from_as("posts", "p")
        .inner_join("users", "u", col("u.id").eq(col("p.user_id")))
        .filter(
            col("u.handle")
                .eq(placeholder())
                .and(col("p.created").gt(placeholder()))
                .and(col("u.bio").ne(placeholder())),
        )
        .order_by("p.created", Direction::Desc)
        .limit(5)
        .compile(
            &Dialect::postgres(),
            &cache(),
            &[
                Some(SqlValue::Text("ann".into())),
                Some(SqlValue::Text("2024-01-01".into())),
                None,
            ],
        )
        .unwrap();
    assert_eq!(
        query.sql,
        "SELECT p.title FROM posts p INNER JOIN users u ON u.id = p.user_id \
         WHERE u.handle = ? AND p.created > ? AND u.bio IS NOT NULL \
         ORDER BY p.created DESC LIMIT 5"
    );
    assert_eq!(
        query.params,
        vec![
            SqlValue::Text("ann".into()),
            SqlValue::Text("2024-01-01".into())
        ]
    );
}

#[test]
fn record_reference_uses_primary_key_from_cache() {
    let author = Record::new("users").with("id", 42_i64).with("handle", "ann");
    let query = Select::new()
        .from("posts")
        .filter(col("user_id").eq(author).and(col("title").like(value("%rust%"))))
        .compile(&Dialect::sqlite(), &cache(), &[])
        .unwrap();
    assert_eq!(
        query.sql,
        "SELECT * FROM posts WHERE user_id = 42 AND title LIKE '%rust%'"
    );
}

#[test]
fn link_table_has_no_single_primary_key() {
    let link = Record::new("post_tags").with("post_id", 1_i64);
    let err = Select::new()
        .from("posts")
        .filter(col("id").eq(link))
        .compile(&Dialect::sqlite(), &cache(), &[])
        .unwrap_err();
    assert!(matches!(err, Error::Query(_)));
}

#[test]
fn too_many_parameters_is_an_error() {
    let err = Select::new()
        .from("users")
        .compile(&Dialect::sqlite(), &cache(), &[Some(SqlValue::Int(1))])
        .unwrap_err();
    assert_eq!(err, Error::Query("expected 0 parameters, got 1".into()));
}

#[test]
fn invalidated_table_no_longer_resolves() {
    let cache = cache();
    cache.invalidate("users");
    let author = Record::new("users").with("id", 1_i64);
    let result = Select::new()
        .from("posts")
        .filter(col("user_id").eq(author))
        .compile(&Dialect::sqlite(), &cache, &[]);
    assert!(result.is_err());
}

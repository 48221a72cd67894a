//! DDL the parser refuses.

use oxide_schema::{parse, Error, ParseError};

fn parse_err(sql: &str) -> ParseError {
    match parse(sql) {
        Err(Error::UnsupportedSchema(e)) => e,
        other => panic!("Expected parse error for: {sql}\nGot: {other:?}"),
    }
}

#[test]
fn error_unsupported_statement() {
    let _ = parse_err("ALTER TABLE users ADD COLUMN bio TEXT");
}

#[test]
fn error_table_without_body() {
    let _ = parse_err("CREATE TABLE users");
}

#[test]
fn error_missing_column_type() {
    let _ = parse_err("CREATE TABLE users (id)");
}

#[test]
fn error_empty_clause() {
    let _ = parse_err("CREATE TABLE users (id INTEGER,, name TEXT)");
}

#[test]
fn error_check_constraint() {
    let err = parse_err("CREATE TABLE users (id INTEGER, CHECK (id))");
    assert!(err.to_string().contains("at position"));
}

#[test]
fn error_restrict_action() {
    let _ = parse_err(
        "CREATE TABLE posts (user_id INTEGER, \
         FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE RESTRICT)",
    );
}

#[test]
fn error_trailing_tokens_after_statement() {
    let _ = parse_err("CREATE TABLE t (a INTEGER) WITHOUT ROWID");
}

#[test]
fn error_operator_outside_grammar() {
    let _ = parse_err("CREATE TABLE t (a INTEGER CHECK (a > 0))");
}

#[test]
fn validation_errors_are_not_parse_errors() {
    let err = parse("CREATE TABLE t (a INTEGER, a TEXT)").unwrap_err();
    assert!(matches!(err, Error::DuplicateProperty { .. }));

    let err = parse("CREATE TABLE t (a INTEGER, UNIQUE (b))").unwrap_err();
    assert!(matches!(err, Error::UnknownProperty { .. }));
}

#[test]
fn empty_input_has_no_tables() {
    assert_eq!(parse("").unwrap(), vec![]);
    assert_eq!(parse("-- nothing here\n;").unwrap(), vec![]);
}

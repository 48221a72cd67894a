//! Parser for the DDL this crate emits.
//!
//! Only `CREATE TABLE` and `CREATE [UNIQUE] INDEX` are recognised. The
//! body of a table is split into top-level clauses on commas outside
//! parentheses; a clause whose first bare word is `CONSTRAINT`, `PRIMARY`,
//! `UNIQUE`, `FOREIGN`, `INDEX` or `KEY` is a table constraint, anything
//! else is a column named by its first token. Anything outside that
//! grammar is rejected rather than guessed at.

use std::ops::Range;

use super::error::{ParseError, StatementKind};
use super::lexer::{Lexer, Span, Token, TokenKind};
use crate::error::{Error, Result};
use crate::model::naming::{self, LINK_TABLE_MARKER};
use crate::model::{DefaultValue, ForeignKey, ForeignKeyAction, Index, Property, Reference, Table};

type PResult<T> = std::result::Result<T, ParseError>;

const CONSTRAINT_KEYWORDS: [&str; 6] = ["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN", "INDEX", "KEY"];

/// Words that end a column type and start its constraints.
const COLUMN_KEYWORDS: [&str; 13] = [
    "NOT",
    "NULL",
    "DEFAULT",
    "PRIMARY",
    "UNIQUE",
    "REFERENCES",
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "IDENTITY",
    "GENERATED",
    "CONSTRAINT",
    "COLLATE",
    "CHECK",
];

/// Parses DDL text into tables.
///
/// `CREATE INDEX` statements are attached to the table they name, which
/// must be defined in the same text.
///
/// # Errors
///
/// Returns [`Error::UnsupportedSchema`] for any statement shape outside the
/// recognised grammar, and validation errors (such as
/// [`Error::DuplicatePrimaryKey`]) for structurally invalid tables.
pub fn parse(sql: &str) -> Result<Vec<Table>> {
    let tokens = tokenize(sql)?;
    let mut cursor = Cursor::new(sql, &tokens);
    let mut tables: Vec<Table> = Vec::new();
    let mut pending: Vec<PendingIndex> = Vec::new();

    loop {
        while cursor.eat(&TokenKind::Semicolon) {}
        if cursor.at_end() {
            break;
        }

        cursor.expect_word("CREATE")?;
        let unique = cursor.eat_word("UNIQUE");
        if cursor.eat_word("INDEX") {
            pending.push(parse_index(&mut cursor, unique)?);
        } else if !unique && cursor.eat_word("TABLE") {
            let mut table = parse_table(&mut cursor)?;
            table.link = has_link_marker(sql, cursor.previous_end());
            tables.push(table);
            continue;
        } else {
            return Err(cursor.unexpected("TABLE or INDEX").into());
        }
        cursor.end_statement()?;
    }

    for index in pending {
        let Some(table) = tables.iter_mut().find(|t| t.name == index.table) else {
            return Err(ParseError::new(
                format!("Index refers to unknown table '{}'", index.table),
                index.span,
            )
            .within(StatementKind::CreateIndex, index.index.name.as_deref())
            .into());
        };
        if index.unique {
            table.uniques.push(index.index);
        } else {
            table.indices.push(index.index);
        }
    }

    for table in &tables {
        table.validate()?;
    }
    Ok(tables)
}

fn tokenize(sql: &str) -> PResult<Vec<Token>> {
    let tokens = Lexer::new(sql).tokenize();
    if let Some((message, span)) = tokens.iter().find_map(|t| match &t.kind {
        TokenKind::Error(message) => Some((message.clone(), t.span)),
        _ => None,
    }) {
        return Err(ParseError::new(message, span));
    }
    Ok(tokens)
}

/// Whether the rest of the line after `offset` starts with the link marker.
fn has_link_marker(sql: &str, offset: usize) -> bool {
    sql.get(offset..)
        .and_then(|rest| rest.lines().next())
        .is_some_and(|line| line.trim_start().starts_with(LINK_TABLE_MARKER))
}

struct PendingIndex {
    table: String,
    index: Index,
    unique: bool,
    span: Span,
}

// =============================================================================
// Statements
// =============================================================================

fn parse_index(cursor: &mut Cursor<'_, '_>, unique: bool) -> PResult<PendingIndex> {
    let start = cursor.peek().span;
    let name = statement_name(cursor, "index name")
        .map_err(|e| e.within(StatementKind::CreateIndex, None))?;
    let (table, properties) = index_target(cursor)
        .map_err(|e| e.within(StatementKind::CreateIndex, Some(&name)))?;
    Ok(PendingIndex {
        table,
        index: Index {
            name: Some(name),
            properties,
        },
        unique,
        span: start.merge(cursor.previous_span()),
    })
}

fn index_target(cursor: &mut Cursor<'_, '_>) -> PResult<(String, Vec<String>)> {
    cursor.expect_word("ON")?;
    let table = cursor.identifier("table name")?;
    let properties = cursor.identifier_list()?;
    Ok((table, properties))
}

/// `[IF NOT EXISTS] name` after `CREATE TABLE` or `CREATE INDEX`.
fn statement_name(cursor: &mut Cursor<'_, '_>, what: &str) -> PResult<String> {
    cursor.eat_if_not_exists()?;
    cursor.identifier(what)
}

fn parse_table(cursor: &mut Cursor<'_, '_>) -> Result<Table> {
    let name = statement_name(cursor, "table name")
        .map_err(|e| e.within(StatementKind::CreateTable, None))?;
    table_body(cursor, name.clone()).map_err(|err| match err {
        Error::UnsupportedSchema(e) => {
            Error::UnsupportedSchema(e.within(StatementKind::CreateTable, Some(&name)))
        }
        other => other,
    })
}

fn table_body(cursor: &mut Cursor<'_, '_>, name: String) -> Result<Table> {
    cursor.expect(&TokenKind::LeftParen, "(")?;
    let clauses = cursor.split_clauses()?;

    let mut table = Table::new(name);
    for (range, end) in clauses {
        let mut clause = cursor.sub(range, end);
        parse_clause(&mut clause, &mut table)?;
        clause.finish("',' or ')'")?;
    }

    cursor.end_statement()?;
    Ok(table)
}

fn parse_clause(cursor: &mut Cursor<'_, '_>, table: &mut Table) -> Result<()> {
    let is_constraint = match &cursor.peek().kind {
        TokenKind::Word(w) => CONSTRAINT_KEYWORDS
            .iter()
            .any(|kw| w.eq_ignore_ascii_case(kw)),
        TokenKind::QuotedIdentifier(_) => false,
        _ => return Err(cursor.unexpected("column or constraint").into()),
    };
    if is_constraint {
        parse_constraint(cursor, table)
    } else {
        parse_column(cursor, table)
    }
}

fn set_primary_key(table: &mut Table, index: Index) -> Result<()> {
    if table.primary_key.is_some() {
        return Err(Error::DuplicatePrimaryKey(table.name.clone()));
    }
    table.primary_key = Some(index);
    Ok(())
}

// =============================================================================
// Table Constraints
// =============================================================================

fn parse_constraint(cursor: &mut Cursor<'_, '_>, table: &mut Table) -> Result<()> {
    let mut name = None;
    if cursor.eat_word("CONSTRAINT") {
        name = Some(cursor.identifier("constraint name")?);
    }

    if cursor.eat_word("PRIMARY") {
        cursor.expect_word("KEY")?;
        let properties = cursor.identifier_list()?;
        return set_primary_key(table, Index { name, properties });
    }

    if cursor.eat_word("UNIQUE") {
        let _ = cursor.eat_word("INDEX") || cursor.eat_word("KEY");
        let name = cursor.optional_name(name)?;
        let properties = cursor.identifier_list()?;
        table.uniques.push(Index { name, properties });
        return Ok(());
    }

    if cursor.eat_word("INDEX") || cursor.eat_word("KEY") {
        let name = cursor.optional_name(name)?;
        let properties = cursor.identifier_list()?;
        table.indices.push(Index { name, properties });
        return Ok(());
    }

    if cursor.eat_word("FOREIGN") {
        cursor.expect_word("KEY")?;
        let properties = cursor.identifier_list()?;
        cursor.expect_word("REFERENCES")?;
        let mut fk = parse_reference(cursor, properties)?;
        fk.name = name;
        table.foreign_keys.push(fk);
        return Ok(());
    }

    Err(cursor
        .unexpected("PRIMARY, UNIQUE, FOREIGN, INDEX or KEY")
        .into())
}

/// Parses `target [(cols)] [ON DELETE action] [ON UPDATE action]` after
/// `REFERENCES`. `ON CHANGE` is accepted as a synonym for `ON UPDATE`.
fn parse_reference(cursor: &mut Cursor<'_, '_>, properties: Vec<String>) -> PResult<ForeignKey> {
    let target = cursor.identifier("referenced table")?;
    let references = if cursor.check(&TokenKind::LeftParen) {
        cursor.identifier_list()?
    } else {
        Vec::new()
    };

    let mut fk = ForeignKey {
        name: None,
        properties,
        reference: Reference {
            table: target,
            properties: references,
        },
        delete_action: ForeignKeyAction::NoAction,
        change_action: ForeignKeyAction::NoAction,
    };

    while cursor.eat_word("ON") {
        if cursor.eat_word("DELETE") {
            fk.delete_action = parse_action(cursor)?;
        } else if cursor.eat_word("UPDATE") || cursor.eat_word("CHANGE") {
            fk.change_action = parse_action(cursor)?;
        } else {
            return Err(cursor.unexpected("DELETE or UPDATE"));
        }
    }
    Ok(fk)
}

fn parse_action(cursor: &mut Cursor<'_, '_>) -> PResult<ForeignKeyAction> {
    if cursor.eat_word("CASCADE") {
        return Ok(ForeignKeyAction::Cascade);
    }
    if cursor.eat_word("SET") {
        if cursor.eat_word("NULL") {
            return Ok(ForeignKeyAction::SetNull);
        }
        cursor.expect_word("DEFAULT")?;
        return Ok(ForeignKeyAction::SetDefault);
    }
    if cursor.eat_word("NO") {
        cursor.expect_word("ACTION")?;
        return Ok(ForeignKeyAction::NoAction);
    }
    Err(cursor.unexpected("CASCADE, SET NULL, SET DEFAULT or NO ACTION"))
}

// =============================================================================
// Columns
// =============================================================================

fn parse_column(cursor: &mut Cursor<'_, '_>, table: &mut Table) -> Result<()> {
    let name = cursor.identifier("column name")?;
    let type_token = cursor.advance();
    let TokenKind::Word(first) = &type_token.kind else {
        return Err(unexpected_token("column type", &type_token).into());
    };
    // Multi-word types such as DOUBLE PRECISION or CHARACTER VARYING.
    let mut sql_type = first.clone();
    while let TokenKind::Word(word) = &cursor.peek().kind {
        if COLUMN_KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k)) {
            break;
        }
        sql_type.push(' ');
        sql_type.push_str(word);
        cursor.pos += 1;
    }
    let mut property = Property::new(name.clone(), sql_type);
    if cursor.eat(&TokenKind::LeftParen) {
        property.type_params = parse_type_params(cursor)?;
    }

    let mut inline_pk = false;
    while !cursor.at_end() {
        let token = cursor.advance();
        let TokenKind::Word(word) = &token.kind else {
            return Err(unexpected_token("column constraint", &token).into());
        };
        match word.to_ascii_uppercase().as_str() {
            "NOT" => {
                cursor.expect_word("NULL")?;
                property.nullable = false;
            }
            "NULL" => property.nullable = true,
            "DEFAULT" => parse_default(cursor, &mut property)?,
            "PRIMARY" => {
                cursor.expect_word("KEY")?;
                let _ = cursor.eat_word("ASC") || cursor.eat_word("DESC");
                inline_pk = true;
            }
            "UNIQUE" => table.uniques.push(
                Index::new(&[name.as_str()]).named(naming::unique_name(&table.name, &[&name])),
            ),
            "REFERENCES" => {
                let mut fk = parse_reference(cursor, vec![name.clone()])?;
                fk.name = Some(naming::foreign_key_name(&table.name, &[&name]));
                table.foreign_keys.push(fk);
            }
            "AUTO_INCREMENT" | "AUTOINCREMENT" | "IDENTITY" => property.auto_increment = true,
            "GENERATED" => {
                if !cursor.eat_word("ALWAYS") {
                    cursor.expect_word("BY")?;
                    cursor.expect_word("DEFAULT")?;
                }
                cursor.expect_word("AS")?;
                cursor.expect_word("IDENTITY")?;
                property.auto_increment = true;
            }
            "CONSTRAINT" => {
                cursor.identifier("constraint name")?;
            }
            _ => return Err(unexpected_token("column constraint", &token).into()),
        }
    }

    table.properties.push(property);
    if inline_pk {
        set_primary_key(
            table,
            Index::new(&[name.as_str()]).named(naming::primary_key_name(&table.name)),
        )?;
    }
    Ok(())
}

/// Type parameters after the opening parenthesis: `255`, `10, 2`, ...
fn parse_type_params(cursor: &mut Cursor<'_, '_>) -> PResult<Vec<String>> {
    let mut params = Vec::new();
    loop {
        let token = cursor.advance();
        let param = match &token.kind {
            TokenKind::Integer(i) => i.to_string(),
            TokenKind::Float(f) => f.to_string(),
            TokenKind::Word(w) => w.clone(),
            TokenKind::String(s) => s.clone(),
            _ => return Err(unexpected_token("type parameter", &token)),
        };
        params.push(param);
        if !cursor.eat(&TokenKind::Comma) {
            cursor.expect(&TokenKind::RightParen, ")")?;
            return Ok(params);
        }
    }
}

/// Parses the value after `DEFAULT`.
///
/// A default of `rowid` (any case) marks the column as auto-incrementing
/// and leaves it without a default. `0` and `1` on boolean columns read
/// back as booleans.
fn parse_default(cursor: &mut Cursor<'_, '_>, property: &mut Property) -> PResult<()> {
    let token = cursor.advance();
    let value = match &token.kind {
        TokenKind::String(s) => DefaultValue::Text(s.clone()),
        TokenKind::Integer(i) => integer_default(property, *i),
        TokenKind::Float(f) => DefaultValue::Float(*f),
        TokenKind::Minus => {
            let number = cursor.advance();
            match number.kind {
                TokenKind::Integer(i) => DefaultValue::Integer(-i),
                TokenKind::Float(f) => DefaultValue::Float(-f),
                _ => return Err(unexpected_token("number", &number)),
            }
        }
        TokenKind::LeftParen => {
            cursor.skip_group(1)?;
            DefaultValue::Expression(cursor.source(token.span.start..cursor.previous_end()))
        }
        TokenKind::Word(w) => match w.to_ascii_uppercase().as_str() {
            "NULL" => DefaultValue::Null,
            "TRUE" => DefaultValue::Bool(true),
            "FALSE" => DefaultValue::Bool(false),
            "ROWID" => {
                property.auto_increment = true;
                property.default = None;
                return Ok(());
            }
            _ if cursor.eat(&TokenKind::LeftParen) => {
                cursor.skip_group(1)?;
                DefaultValue::Expression(cursor.source(token.span.start..cursor.previous_end()))
            }
            _ => DefaultValue::Expression(w.clone()),
        },
        _ => return Err(unexpected_token("default value", &token)),
    };
    property.default = Some(value);
    Ok(())
}

fn integer_default(property: &Property, value: i64) -> DefaultValue {
    if property.is_boolean() && (value == 0 || value == 1) {
        DefaultValue::Bool(value == 1)
    } else {
        DefaultValue::Integer(value)
    }
}

fn unexpected_token(expected: &str, token: &Token) -> ParseError {
    if token.is_eof() {
        ParseError::unexpected_eof(expected, token.span)
    } else {
        ParseError::unexpected(expected, token.kind.clone(), token.span)
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// A position in a token slice. Reading past the slice yields `end`.
struct Cursor<'a, 't> {
    input: &'a str,
    tokens: &'t [Token],
    pos: usize,
    end: Token,
}

impl<'a, 't> Cursor<'a, 't> {
    fn new(input: &'a str, tokens: &'t [Token]) -> Self {
        let eof = Span::new(input.len(), input.len());
        let end = tokens
            .last()
            .filter(|t| t.is_eof())
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, eof));
        Self {
            input,
            tokens,
            pos: 0,
            end,
        }
    }

    /// A cursor over one clause; `end` is the delimiter that closed it.
    fn sub(&self, range: Range<usize>, end: Span) -> Self {
        let tokens = self.tokens;
        Self {
            input: self.input,
            tokens: &tokens[range],
            pos: 0,
            end: Token::new(TokenKind::Eof, end),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .filter(|t| !t.is_eof())
            .unwrap_or(&self.end)
    }

    fn at_end(&self) -> bool {
        self.peek().is_eof()
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(self.end.span, |t| t.span)
    }

    fn previous_end(&self) -> usize {
        self.previous_span().end
    }

    fn source(&self, range: Range<usize>) -> String {
        self.input.get(range).unwrap_or_default().to_string()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, keyword: &str) -> bool {
        if self.peek().kind.is_word(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> PResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_word(&mut self, keyword: &str) -> PResult<()> {
        if self.eat_word(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        unexpected_token(expected, self.peek())
    }

    fn identifier(&mut self, expected: &str) -> PResult<String> {
        match self.peek().kind.identifier() {
            Some(name) => {
                let name = name.to_string();
                self.pos += 1;
                Ok(name)
            }
            None => Err(self.unexpected(expected)),
        }
    }

    /// An identifier if one follows, otherwise `current`.
    fn optional_name(&mut self, current: Option<String>) -> PResult<Option<String>> {
        if current.is_none() && self.peek().kind.identifier().is_some() {
            return self.identifier("index name").map(Some);
        }
        Ok(current)
    }

    fn eat_if_not_exists(&mut self) -> PResult<()> {
        if self.eat_word("IF") {
            self.expect_word("NOT")?;
            self.expect_word("EXISTS")?;
        }
        Ok(())
    }

    /// `(a [ASC|DESC], b, ...)`
    fn identifier_list(&mut self) -> PResult<Vec<String>> {
        self.expect(&TokenKind::LeftParen, "(")?;
        let mut names = Vec::new();
        loop {
            names.push(self.identifier("column name")?);
            let _ = self.eat_word("ASC") || self.eat_word("DESC");
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RightParen, "')' or ','")?;
                return Ok(names);
            }
        }
    }

    /// Consumes tokens until `depth` open parentheses are closed.
    fn skip_group(&mut self, mut depth: usize) -> PResult<()> {
        while depth > 0 {
            let token = self.advance();
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth -= 1,
                TokenKind::Eof => return Err(ParseError::unexpected_eof(")", token.span)),
                _ => {}
            }
        }
        Ok(())
    }

    /// Splits a table body into top-level clauses, consuming the closing
    /// parenthesis. Commas nested inside parentheses do not split.
    fn split_clauses(&mut self) -> PResult<Vec<(Range<usize>, Span)>> {
        let mut clauses = Vec::new();
        let mut depth = 0usize;
        let mut start = self.pos;
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen if depth > 0 => depth -= 1,
                TokenKind::RightParen | TokenKind::Comma if depth == 0 => {
                    if start == self.pos {
                        return Err(ParseError::new("Empty table clause", token.span));
                    }
                    clauses.push((start..self.pos, token.span));
                    self.pos += 1;
                    if token.kind == TokenKind::RightParen {
                        return Ok(clauses);
                    }
                    start = self.pos;
                    continue;
                }
                TokenKind::Eof => return Err(ParseError::unexpected_eof(")", token.span)),
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Requires every token of a clause to have been consumed.
    fn finish(&self, expected: &str) -> PResult<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// A statement ends at `;` or at the end of input.
    fn end_statement(&mut self) -> PResult<()> {
        if self.eat(&TokenKind::Semicolon) || self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected(";"))
        }
    }
}

//! Errors raised while reading DDL back.

use std::fmt;

use super::lexer::{Span, TokenKind};

/// The kind of statement a DDL error was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `CREATE TABLE`.
    CreateTable,
    /// `CREATE [UNIQUE] INDEX`.
    CreateIndex,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateTable => "CREATE TABLE",
            Self::CreateIndex => "CREATE INDEX",
        })
    }
}

/// DDL that does not match the shapes the emitter writes.
///
/// Carries the byte span of the offending input and, once known, the
/// statement and the table or index it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Byte range of the offending input.
    pub span: Span,
    /// What the parser was looking for.
    pub expected: Option<String>,
    /// What it found instead.
    pub found: Option<TokenKind>,
    /// Statement being read when the error occurred.
    pub statement: Option<StatementKind>,
    /// Table or index named by that statement, if already read.
    pub object: Option<String>,
}

impl ParseError {
    /// An error with a free-form message.
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: None,
            found: None,
            statement: None,
            object: None,
        }
    }

    /// `expected` was wanted, `found` was read.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        let expected = expected.into();
        let mut err = Self::new(format!("expected {expected}, found {found}"), span);
        err.expected = Some(expected);
        err.found = Some(found);
        err
    }

    /// Input ended where `expected` was wanted.
    #[must_use]
    pub fn unexpected_eof(expected: impl Into<String>, span: Span) -> Self {
        let expected = expected.into();
        let mut err = Self::new(format!("expected {expected}, found end of input"), span);
        err.expected = Some(expected);
        err.found = Some(TokenKind::Eof);
        err
    }

    /// Records the statement the error was found in. The innermost
    /// context wins: an error that already names a statement keeps it.
    #[must_use]
    pub fn within(mut self, statement: StatementKind, object: Option<&str>) -> Self {
        if self.statement.is_none() {
            self.statement = Some(statement);
            self.object = object.map(str::to_string);
        }
        self
    }

    /// One-based line and column of the error start in `source`.
    #[must_use]
    pub fn line_column(&self, source: &str) -> (usize, usize) {
        let before = source.get(..self.span.start).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        (line, column)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match (&self.statement, &self.object) {
            (Some(statement), Some(object)) => write!(f, " in {statement} '{object}'")?,
            (Some(statement), None) => write!(f, " in {statement}")?,
            _ => {}
        }
        write!(f, " at position {}..{}", self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}

//! DDL emission and parsing.
//!
//! The emitter and the parser are inverses over the DDL subset this crate
//! writes: `parse(&emit(t, d))` yields `t` back with derived constraint
//! names filled in.

pub mod emit;
mod error;
pub mod lexer;
mod parser;

pub use emit::{emit, emit_statements};
pub use error::{ParseError, StatementKind};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::parse;

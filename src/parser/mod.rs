//! KimchiLang parser implementation.
//!
//! This module converts source text into an abstract syntax tree in two
//! steps: the [`scanner`] produces a token buffer, and the statement and
//! expression parsers consume it with single-token dispatch plus bounded
//! lookahead (pattern guards, arrow parameter lists).
//!
//! # Architecture
//!
//! - [`token`] - Token definitions and the token-to-JS-source table
//! - [`scanner`] - Context-sensitive lexical analysis
//! - [`ast`] - Abstract syntax tree definitions
//! - [`state`] - Parser state: cursor, scopes, secret set, lookahead
//! - [`expr`] - Expression parsing (precedence climbing)
//! - [`stmt`] - Statement and declaration parsing
//!
//! # Example
//!
//! ```rust
//! use kimchi_compiler::parser::{parse, tokenize};
//!
//! let tokens = tokenize("dec x = 1 + 2").unwrap();
//! let program = parse(tokens).unwrap();
//! assert_eq!(program.statements.len(), 1);
//! ```

pub mod ast;
pub mod expr;
pub mod scanner;
pub mod state;
pub mod stmt;
pub mod token;

pub use ast::*;
pub use scanner::tokenize;
pub use state::Parser;
pub use token::{Token, TokenKind};

use crate::diagnostics::Diagnostic;

/// Parse a token buffer into a program.
///
/// Fails fast: the first syntax error aborts the parse.
pub fn parse(tokens: Vec<Token>) -> Result<Program, Diagnostic> {
    stmt::parse_program_tokens(tokens)
}

/// Tokenize and parse source text in one step.
pub fn parse_source(source: &str) -> Result<Program, Diagnostic> {
    parse(tokenize(source)?)
}

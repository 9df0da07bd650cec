//! Parser state management.
//!
//! The parser walks a token buffer produced by the scanner. Besides the
//! cursor itself it tracks two pieces of flow-sensitive state built during
//! AST construction:
//!
//! - the scope stack of `dec`-bound (deep-immutable) names, consulted by the
//!   assignment guard;
//! - the active set of secret-tainted names, consulted when a `js` block
//!   lists secret inputs.
//!
//! Pattern-guard disambiguation needs bounded lookahead over tokens (never
//! characters), so the buffer form keeps that scan trivial.

use std::collections::HashSet;

use crate::diagnostics::Diagnostic;
use crate::location::Position;

use super::token::{Token, TokenKind};

/// Parser state for KimchiLang.
pub struct Parser {
    /// The token buffer, terminated by `Eof`.
    tokens: Vec<Token>,
    /// Index of the current token.
    index: usize,
    /// Scope stack of `dec`-bound names.
    immutable_scopes: Vec<HashSet<String>>,
    /// Names bound with the `secret` modifier.
    secrets: HashSet<String>,
    /// Depth of pattern-guard parsing; while positive, `|` is never
    /// consumed as bitwise-or.
    pub guard_depth: usize,
}

impl Parser {
    /// Create a parser over a token buffer. An `Eof` sentinel is appended
    /// when the buffer does not already end with one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let pos = tokens.last().map(|t| t.pos).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, pos));
        }
        Self {
            tokens,
            index: 0,
            immutable_scopes: vec![HashSet::new()],
            secrets: HashSet::new(),
            guard_depth: 0,
        }
    }

    /// The current token.
    pub fn current(&self) -> &Token {
        // The buffer always ends with Eof and the cursor never passes it.
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    /// The current token kind.
    pub fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    /// The current token position.
    pub fn pos(&self) -> Position {
        self.current().pos
    }

    /// The kind of the token `n` positions ahead of the current one.
    pub fn peek_kind(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.index + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// Check whether the current token is `kind`.
    pub fn at(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    /// Check whether we reached the end of input.
    pub fn at_eof(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    /// Consume and return the current token.
    pub fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if self.index < self.tokens.len().saturating_sub(1) {
            self.index += 1;
        }
        token
    }

    /// Consume the current token if it matches, returning whether it did.
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Expect and consume a specific token, failing the parse otherwise.
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token, Diagnostic> {
        if self.kind() == &kind {
            Ok(self.bump())
        } else {
            Err(self.error(format!("Expected `{}`, found `{}`", kind, self.kind())))
        }
    }

    /// Expect and consume an identifier, returning its name.
    pub fn expect_ident(&mut self) -> Result<String, Diagnostic> {
        match self.kind().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Ok(name)
            }
            other => Err(self.error(format!("Expected an identifier, found `{}`", other))),
        }
    }

    /// Skip any run of newline and semicolon separators.
    pub fn skip_separators(&mut self) {
        while matches!(self.kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.bump();
        }
    }

    /// Skip newline tokens only.
    pub fn skip_newlines(&mut self) {
        while matches!(self.kind(), TokenKind::Newline) {
            self.bump();
        }
    }

    /// Build a parse error at the current token.
    pub fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::parse(self.pos(), message)
    }

    /// Build a parse error at a specific position.
    pub fn error_at(&self, pos: Position, message: impl Into<String>) -> Diagnostic {
        Diagnostic::parse(pos, message)
    }

    // ========== Immutability and secret tracking ==========

    /// Enter a new lexical scope.
    pub fn push_scope(&mut self) {
        self.immutable_scopes.push(HashSet::new());
    }

    /// Leave the innermost lexical scope.
    pub fn pop_scope(&mut self) {
        if self.immutable_scopes.len() > 1 {
            self.immutable_scopes.pop();
        }
    }

    /// Record a `dec`-bound name in the innermost scope.
    pub fn declare_immutable(&mut self, name: &str) {
        if let Some(scope) = self.immutable_scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    /// Check whether a name is `dec`-bound in any visible scope.
    pub fn is_immutable(&self, name: &str) -> bool {
        self.immutable_scopes
            .iter()
            .rev()
            .any(|scope| scope.contains(name))
    }

    /// Record a secret-tainted name.
    pub fn declare_secret(&mut self, name: &str) {
        self.secrets.insert(name.to_string());
    }

    /// Check whether a name is secret-tainted.
    pub fn is_secret(&self, name: &str) -> bool {
        self.secrets.contains(name)
    }

    // ========== Lookahead ==========

    /// Decide whether a `|` at the current position opens a pattern guard.
    ///
    /// Scans forward over the token buffer for a second `|` followed (after
    /// any newlines) by `=>`. The scan is bounded by the current statement:
    /// it stops at a newline, semicolon, opening brace, or end of input.
    pub fn guard_ahead(&self) -> bool {
        debug_assert!(matches!(self.kind(), TokenKind::Bar));
        let mut i = self.index + 1;
        loop {
            match self.tokens.get(i).map(|t| &t.kind) {
                Some(TokenKind::Bar) => {
                    let mut j = i + 1;
                    while matches!(
                        self.tokens.get(j).map(|t| &t.kind),
                        Some(TokenKind::Newline)
                    ) {
                        j += 1;
                    }
                    return matches!(
                        self.tokens.get(j).map(|t| &t.kind),
                        Some(TokenKind::FatArrow)
                    );
                }
                Some(TokenKind::Newline)
                | Some(TokenKind::Semicolon)
                | Some(TokenKind::Lbrace)
                | Some(TokenKind::Eof)
                | None => return false,
                _ => i += 1,
            }
        }
    }

    /// Decide whether a `(` at the current position opens an arrow-function
    /// parameter list: scans to the matching `)` and checks for `=>`.
    pub fn arrow_params_ahead(&self) -> bool {
        debug_assert!(matches!(self.kind(), TokenKind::Lparen));
        let mut depth = 0usize;
        let mut i = self.index;
        loop {
            match self.tokens.get(i).map(|t| &t.kind) {
                Some(TokenKind::Lparen) => depth += 1,
                Some(TokenKind::Rparen) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::FatArrow)
                        );
                    }
                }
                Some(TokenKind::Eof) | None => return false,
                _ => {}
            }
            i += 1;
        }
    }
}

//! Diagnostics for compilation errors and warnings.
//!
//! Every pass reports problems through the same record: a kind (which pass
//! produced it), a severity, a position, and a message. The scanner and
//! parser fail fast and produce a single diagnostic; the type checker and
//! linter accumulate a batch. The orchestrator in [`crate::compiler`] merges
//! everything into one ordered list.
//!
//! The user-visible format is one diagnostic per line:
//! `Kind at L:C: message`.
//!
//! # Example
//!
//! ```rust
//! use kimchi_compiler::diagnostics::Diagnostic;
//! use kimchi_compiler::location::Position;
//!
//! let diag = Diagnostic::parse(Position::new(3, 7), "Unexpected token `)`");
//! assert_eq!(format!("{}", diag), "ParseError at 3:7: Unexpected token `)`");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::location::{Location, Position};

/// The pass that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Lexical error: unterminated string/comment/regex/interpolation,
    /// disallowed character, disallowed bitwise operator.
    Scan,
    /// Syntax error: unexpected or missing token, misplaced modifier,
    /// secret identifier inside a `console.*` call, assignment to a
    /// `dec`-bound root.
    Parse,
    /// Structural type error: undefined identifier, missing property,
    /// call of a non-callable, enum member absence, dep-override mismatch.
    Type,
    /// Lint finding promoted to the diagnostic stream.
    Lint,
    /// Cross-module error found by the orchestrator, such as a missing
    /// required arg at a `dep` callsite.
    Compile,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::Scan => "ScanError",
            DiagnosticKind::Parse => "ParseError",
            DiagnosticKind::Type => "TypeError",
            DiagnosticKind::Lint => "LintError",
            DiagnosticKind::Compile => "CompileError",
        };
        write!(f, "{}", name)
    }
}

/// Severity of a diagnostic.
///
/// Only `Error` halts code generation. Warnings and infos are surfaced for
/// display but never fail a compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Informational finding.
    Info,
    /// Suspicious but not fatal.
    Warning,
    /// Fatal; halts code generation.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Which pass produced this diagnostic.
    pub kind: DiagnosticKind,
    /// Severity of the finding.
    pub severity: Severity,
    /// Position the diagnostic points at.
    pub pos: Position,
    /// Optional wider source span.
    pub span: Option<Location>,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        kind: DiagnosticKind,
        severity: Severity,
        pos: Position,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            pos,
            span: None,
            message: message.into(),
        }
    }

    /// Create a scan error.
    pub fn scan(pos: Position, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Scan, Severity::Error, pos, message)
    }

    /// Create a parse error.
    pub fn parse(pos: Position, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Parse, Severity::Error, pos, message)
    }

    /// Create a type error.
    pub fn type_error(pos: Position, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Type, Severity::Error, pos, message)
    }

    /// Create a lint diagnostic with the given severity.
    pub fn lint(severity: Severity, pos: Position, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Lint, severity, pos, message)
    }

    /// Create a cross-module compile error.
    pub fn compile(pos: Position, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Compile, Severity::Error, pos, message)
    }

    /// Attach a source span to this diagnostic.
    pub fn with_span(mut self, span: Location) -> Self {
        self.span = Some(span);
        self
    }

    /// Whether this diagnostic halts code generation.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.pos, self.message)
    }
}

/// Render a batch of diagnostics, one per line, in order.
pub fn render_all(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let diag = Diagnostic::scan(Position::new(2, 9), "Unterminated string");
        assert_eq!(format!("{}", diag), "ScanError at 2:9: Unterminated string");

        let diag = Diagnostic::type_error(Position::new(10, 1), "Undefined identifier 'foo'");
        assert_eq!(
            format!("{}", diag),
            "TypeError at 10:1: Undefined identifier 'foo'"
        );
    }

    #[test]
    fn test_fatality() {
        assert!(Diagnostic::parse(Position::default(), "x").is_fatal());
        assert!(!Diagnostic::lint(Severity::Warning, Position::default(), "x").is_fatal());
        assert!(Diagnostic::lint(Severity::Error, Position::default(), "x").is_fatal());
    }

    #[test]
    fn test_render_all() {
        let diags = vec![
            Diagnostic::parse(Position::new(1, 1), "first"),
            Diagnostic::compile(Position::new(2, 2), "second"),
        ];
        let rendered = render_all(&diags);
        assert_eq!(
            rendered,
            "ParseError at 1:1: first\nCompileError at 2:2: second"
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_diagnostic_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Diagnostic>();
    }
}

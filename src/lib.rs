//! KimchiLang Compiler
//!
//! A source-to-source translator: KimchiLang in, JavaScript (ES-module
//! text) out. KimchiLang is a small expression-oriented language with a
//! functional bias — immutable bindings, pattern-match blocks, pipe and
//! flow composition, dependency-injected modules, secret-tainted values,
//! and embedded JavaScript and shell blocks.
//!
//! # Architecture
//!
//! The pipeline runs in dependency order, each stage usable in isolation:
//!
//! - [`parser::scanner`] - source text → token buffer, with
//!   context-sensitive modes (regex-vs-division, raw shell capture, string
//!   interpolation)
//! - [`parser`] - tokens → AST via precedence climbing, tracking immutable
//!   and secret-tainted names during construction
//! - [`statics`] - the data-only `.static` grammar and its codegen side
//!   channel
//! - [`checker`] - structural shape checking with lexical scopes and the
//!   cross-module export registry
//! - [`linter`] - AST-driven rules (unused/shadowed bindings, unreachable
//!   code, constant conditions, duplicate keys)
//! - [`emitter`] - AST → JavaScript text, runtime preamble and
//!   module-factory wrapper included
//! - [`compiler`] - the orchestrator gluing the passes together
//!
//! # Concurrency model
//!
//! A compile is single-threaded and synchronous. Compiles may run in
//! parallel as long as they share the [`registry::ExportRegistry`], which
//! provides single-writer-many-reader publish semantics over its entries.
//!
//! # Example
//!
//! ```rust
//! use kimchi_compiler::{compile, CompileOptions, ExportRegistry};
//!
//! let registry = ExportRegistry::new();
//! let js = compile(
//!     "expose fn add(a, b) { return a + b }",
//!     &CompileOptions::default(),
//!     &registry,
//! )
//! .expect("clean compile");
//! assert!(js.contains("return (a + b);"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod checker;
pub mod compiler;
pub mod diagnostics;
pub mod emitter;
pub mod linter;
pub mod location;
pub mod parser;
pub mod registry;
pub mod statics;

// Re-exports for convenience
pub use checker::{check, Shape};
pub use compiler::{compile, compile_source, generate, parse, tokenize, CompileOptions};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use linter::{lint, LintMessage, LintOptions};
pub use location::{Location, Position};
pub use parser::{Program, Token, TokenKind};
pub use registry::{ExportRegistry, ModuleExports};
pub use statics::{generate_static_code, parse_static_file, StaticData};

//! Compiler orchestrator.
//!
//! Wires the pipeline together: scan → parse → cross-module dep validation
//! → type check → lint → emit. Each step short-circuits on failure and
//! returns every diagnostic gathered so far; the scanner and parser fail
//! fast, the checker and linter accumulate batches, and the linter's
//! error-severity findings are promoted into the fatal list.

use anyhow::{anyhow, Result};

use crate::checker;
use crate::diagnostics::{render_all, Diagnostic};
use crate::emitter;
use crate::linter::{self, LintOptions};
use crate::parser::ast::{Expression, ObjectEntry, Program, Statement};
use crate::parser::{self, Token};
use crate::registry::ExportRegistry;

/// Options accepted by [`compile`].
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Emit extra progress information (reserved for the CLI front end).
    pub debug: bool,
    /// Skip the type-checking pass.
    pub skip_type_check: bool,
    /// Skip the lint pass.
    pub skip_lint: bool,
    /// Lint configuration.
    pub lint_options: LintOptions,
    /// Module path to publish exports under on a clean check.
    pub module_path: Option<String>,
}

/// Tokenize source text.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Diagnostic> {
    parser::tokenize(source)
}

/// Parse a token buffer into a program.
pub fn parse(tokens: Vec<Token>) -> Result<Program, Diagnostic> {
    parser::parse(tokens)
}

/// Generate JavaScript text for a program.
pub fn generate(program: &Program) -> String {
    emitter::generate(program)
}

/// Compile KimchiLang source to JavaScript.
///
/// Returns the generated text, or the ordered list of diagnostics when any
/// fatal diagnostic was produced.
pub fn compile(
    source: &str,
    options: &CompileOptions,
    registry: &ExportRegistry,
) -> Result<String, Vec<Diagnostic>> {
    let tokens = tokenize(source).map_err(|d| vec![d])?;
    let program = parse(tokens).map_err(|d| vec![d])?;

    let mut diagnostics = validate_dep_arity(&program, registry);

    if !options.skip_type_check {
        diagnostics.extend(checker::check(
            &program,
            options.module_path.as_deref(),
            registry,
        ));
    }

    if !options.skip_lint {
        for message in linter::lint(&program, &options.lint_options) {
            diagnostics.push(Diagnostic::lint(
                message.severity,
                message.pos,
                message.message,
            ));
        }
    }

    if diagnostics.iter().any(|d| d.is_fatal()) {
        return Err(diagnostics);
    }

    Ok(generate(&program))
}

/// Compile with default options, flattening diagnostics into one error.
pub fn compile_source(source: &str, registry: &ExportRegistry) -> Result<String> {
    compile(source, &CompileOptions::default(), registry)
        .map_err(|diags| anyhow!("Compilation failed:\n{}", render_all(&diags)))
}

/// Validate that each `dep` override object covers every required arg of
/// the target module found in the registry.
fn validate_dep_arity(program: &Program, registry: &ExportRegistry) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for stmt in &program.statements {
        let Statement::Dep(dep) = stmt else {
            continue;
        };
        let Some(entry) = registry.lookup(&dep.path) else {
            continue;
        };
        if entry.required_args.is_empty() {
            continue;
        }

        let override_keys: Vec<&str> = match &dep.overrides {
            Some(Expression::Object { properties, .. }) => properties
                .iter()
                .filter_map(|entry| match entry {
                    ObjectEntry::Property { key, .. } => Some(key.as_str()),
                    ObjectEntry::Spread { .. } => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        for required in &entry.required_args {
            if !override_keys.contains(&required.as_str()) {
                diagnostics.push(Diagnostic::compile(
                    dep.pos,
                    format!(
                        "Missing required arg '{}' for module '{}'",
                        required, dep.path
                    ),
                ));
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    fn compile_clean(source: &str) -> String {
        let registry = ExportRegistry::new();
        match compile(source, &CompileOptions::default(), &registry) {
            Ok(js) => js,
            Err(diags) => panic!("compile failed:\n{}", render_all(&diags)),
        }
    }

    fn compile_err(source: &str) -> Vec<Diagnostic> {
        let registry = ExportRegistry::new();
        compile(source, &CompileOptions::default(), &registry).unwrap_err()
    }

    #[test]
    fn test_scenario_numeric_fidelity() {
        let js = compile_clean("expose dec x = 0xFF");
        assert!(js.contains("const x = _deepFreeze(0xFF);"), "got:\n{}", js);
    }

    #[test]
    fn test_scenario_function() {
        let js = compile_clean("expose fn add(a, b) { return a + b }");
        assert!(js.contains("function add(a, b) {"), "got:\n{}", js);
        assert!(js.contains("return (a + b);"), "got:\n{}", js);
    }

    #[test]
    fn test_scenario_range() {
        let js = compile_clean("expose dec sum = 0..5");
        assert!(
            js.contains("Array.from({ length: 5 - 0 }, (_, i) => 0 + i)"),
            "got:\n{}",
            js
        );
    }

    #[test]
    fn test_scenario_pipe() {
        let js = compile_clean(
            "fn double(x) { return x * 2 }\nfn addOne(x) { return x + 1 }\nexpose dec r = 5 ~> double ~> addOne",
        );
        assert!(js.contains("addOne(double(5))"), "got:\n{}", js);
    }

    #[test]
    fn test_scenario_flow() {
        let js = compile_clean(
            "fn addOne(x) { return x + 1 }\nfn double(x) { return x * 2 }\ntransform >> addOne double\nprint(transform(1))",
        );
        assert!(
            js.contains("const transform = (..._args) => double(addOne(..._args));"),
            "got:\n{}",
            js
        );
    }

    #[test]
    fn test_scenario_secret_console_taint() {
        let diags = compile_err("secret dec k = \"s\"\njs(k) { console.log(k); }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Parse);
        assert!(diags[0].message.contains("'k'"));
    }

    #[test]
    fn test_scenario_secret_without_console_compiles() {
        let js = compile_clean("secret dec k = \"s\"\njs(k) { send(k); }");
        assert!(js.contains("const k = _deepFreeze(_secret(\"s\"));"), "got:\n{}", js);
    }

    #[test]
    fn test_scenario_immutability() {
        let diags =
            compile_err("dec obj = { foo: { bar: \"b\" } }\nobj.foo.bar = \"x\"");
        assert_eq!(diags.len(), 1);
        assert!(diags[0]
            .message
            .contains("Cannot reassign 'obj.foo.bar'"));
    }

    #[test]
    fn test_scenario_enum_values() {
        let js = compile_clean("enum C { A, B = 10, C }\nexpose dec v = C.A");
        assert!(
            js.contains("const C = Object.freeze({ A: 0, B: 10, C: 11 });"),
            "got:\n{}",
            js
        );
    }

    #[test]
    fn test_null_safe_chain_and_no_stray_optional() {
        let js = compile_clean("dec a = { b: { c: 1 } }\nexpose dec v = a.b.c");
        assert!(js.contains("a?.b?.c"), "got:\n{}", js);
        // `?.` never lands adjacent to a non-member operator.
        assert!(!js.contains("?. "), "got:\n{}", js);
        assert!(!js.contains(" ?."), "got:\n{}", js);
    }

    #[test]
    fn test_memoization_fragments() {
        let js = compile_clean("expose memo fn fib(n) { return n }");
        assert!(js.contains("JSON.stringify(arguments)"), "got:\n{}", js);
        assert!(js.contains("_fn.apply(this, arguments)"), "got:\n{}", js);
    }

    #[test]
    fn test_export_registry_round_trip() {
        let registry = ExportRegistry::new();
        let options = CompileOptions {
            module_path: Some("lib.config".to_string()),
            ..Default::default()
        };
        compile("expose dec foo = \"hello\"\narg bar", &options, &registry)
            .expect("provider compiles");

        let entry = registry.lookup("lib.config").unwrap();
        assert!(entry.members.contains_key("foo"));
        assert!(entry.members.contains_key("bar"));

        // A later module overriding both members type-checks clean.
        let js = compile(
            "as cfg dep lib.config({ bar: 42, foo: \"x\" })\nexpose dec f = cfg.foo",
            &CompileOptions::default(),
            &registry,
        )
        .expect("consumer compiles");
        assert!(js.contains("_dep_cfg({ bar: 42, foo: \"x\" })"), "got:\n{}", js);
    }

    #[test]
    fn test_missing_required_arg_at_dep_callsite() {
        let registry = ExportRegistry::new();
        let options = CompileOptions {
            module_path: Some("svc.db".to_string()),
            ..Default::default()
        };
        compile("arg !url\nexpose fn query(q) { return q }", &options, &registry)
            .expect("provider compiles");

        let diags = compile(
            "as db dep svc.db\nexpose dec q = db.query",
            &CompileOptions::default(),
            &registry,
        )
        .unwrap_err();
        assert!(diags
            .iter()
            .any(|d| d.kind == DiagnosticKind::Compile
                && d.message.contains("Missing required arg 'url'")));

        // Supplying the arg fixes it.
        compile(
            "as db dep svc.db({ url: \"postgres://x\" })\nexpose dec q = db.query",
            &CompileOptions::default(),
            &registry,
        )
        .expect("consumer with override compiles");
    }

    #[test]
    fn test_duplicate_key_is_fatal() {
        let diags = compile_err("expose dec o = { a: 1, a: 2 }");
        assert!(diags
            .iter()
            .any(|d| d.kind == DiagnosticKind::Lint && d.is_fatal()));
    }

    #[test]
    fn test_lint_warnings_do_not_fail() {
        // An unused variable warns but still compiles.
        let js = compile_clean("dec unused = 1\nexpose dec x = 2");
        assert!(js.contains("const unused"), "got:\n{}", js);
    }

    #[test]
    fn test_skip_flags() {
        let registry = ExportRegistry::new();
        let options = CompileOptions {
            skip_type_check: true,
            skip_lint: true,
            ..Default::default()
        };
        // Undefined identifiers pass when the checker is skipped.
        let js = compile("expose dec x = someUnknownName", &options, &registry)
            .expect("compiles with checks skipped");
        assert!(js.contains("someUnknownName"), "got:\n{}", js);
    }

    #[test]
    fn test_scan_error_short_circuits() {
        let diags = compile_err("dec x = 1 & 2");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Scan);
    }

    #[test]
    fn test_diagnostic_display_format() {
        let diags = compile_err("dec x = missing");
        let rendered = render_all(&diags);
        assert!(
            rendered.starts_with("TypeError at "),
            "got: {}",
            rendered
        );
    }

    #[test]
    fn test_compile_source_anyhow() {
        let registry = ExportRegistry::new();
        assert!(compile_source("expose dec x = 1", &registry).is_ok());
        let err = compile_source("dec x = missing", &registry).unwrap_err();
        assert!(err.to_string().contains("Compilation failed"));
    }

    #[test]
    fn test_module_wrapper_layout() {
        let js = compile_clean("as util dep lib.util\nexpose dec x = 1");
        let preamble_at = js.find("--- KimchiLang runtime ---").unwrap();
        let import_at = js.find("import _dep_util from './lib/util.km';").unwrap();
        let factory_at = js.find("export default function(_opts = {}) {").unwrap();
        assert!(preamble_at < import_at && import_at < factory_at);
    }

    #[test]
    fn test_tokenization_round_trip() {
        // Regenerating source from (kind, lexeme) pairs retokenizes to the
        // same sequence, modulo newline collapsing.
        let source = "dec xs = [1, 0xFF, 2.5]\nfn f(a) { return a ~> g }";
        let tokens = tokenize(source).unwrap();
        let regenerated: String = tokens
            .iter()
            .filter(|t| t.kind != crate::parser::TokenKind::Eof)
            .map(|t| {
                let text = t.kind.js_source();
                if text == "\n" {
                    text
                } else {
                    format!("{} ", text)
                }
            })
            .collect();
        let again = tokenize(&regenerated).unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| &t.kind).collect();
        let kinds_again: Vec<_> = again.iter().map(|t| &t.kind).collect();
        assert_eq!(kinds, kinds_again);
    }
}

//! AST-driven lint rules.
//!
//! The linter runs three passes: it collects top-level declarations into a
//! scope, walks the program tracking uses and nested scopes, then reports
//! rule violations. Only `duplicate-key` is error-severity; the compiler
//! promotes error-severity results into its fatal list, everything else is
//! surfaced for display.
//!
//! | Rule | Severity |
//! |---|---|
//! | `unused-variable` / `unused-function` | warning |
//! | `shadow-variable` | warning |
//! | `unreachable-code` | warning |
//! | `empty-block` | info |
//! | `constant-condition` | warning |
//! | `duplicate-key` | error |

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::diagnostics::Severity;
use crate::location::Position;
use crate::parser::ast::*;

/// Options controlling which lint rules run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintOptions {
    /// Rule keys to suppress entirely.
    pub disabled_rules: HashSet<String>,
}

impl LintOptions {
    /// Disable a rule by key.
    pub fn disable(mut self, rule: &str) -> Self {
        self.disabled_rules.insert(rule.to_string());
        self
    }
}

/// One lint finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LintMessage {
    /// Stable rule key.
    pub rule: &'static str,
    /// Severity of the finding.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Position of the finding.
    pub pos: Position,
}

/// Lint a program, returning findings in source order.
pub fn lint(program: &Program, options: &LintOptions) -> Vec<LintMessage> {
    let mut linter = Linter {
        options,
        scopes: Vec::new(),
        messages: Vec::new(),
    };
    linter.run(program);
    linter
        .messages
        .sort_by_key(|m| (m.pos.line, m.pos.column));
    linter.messages
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Variable,
    Function,
}

#[derive(Debug)]
struct DeclInfo {
    name: String,
    kind: DeclKind,
    pos: Position,
    exposed: bool,
    used: bool,
}

struct Linter<'a> {
    options: &'a LintOptions,
    scopes: Vec<Vec<DeclInfo>>,
    messages: Vec<LintMessage>,
}

impl<'a> Linter<'a> {
    fn run(&mut self, program: &Program) {
        self.enter_scope();
        self.collect(&program.statements, true);
        for stmt in &program.statements {
            self.walk_statement(stmt);
        }
        self.leave_scope();
    }

    fn report(
        &mut self,
        rule: &'static str,
        severity: Severity,
        pos: Position,
        message: String,
    ) {
        if self.options.disabled_rules.contains(rule) {
            return;
        }
        self.messages.push(LintMessage {
            rule,
            severity,
            message,
            pos,
        });
    }

    fn enter_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn leave_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        for decl in scope {
            if decl.used || decl.exposed || decl.name.starts_with('_') {
                continue;
            }
            let (rule, what) = match decl.kind {
                DeclKind::Variable => ("unused-variable", "variable"),
                DeclKind::Function => ("unused-function", "function"),
            };
            self.report(
                rule,
                Severity::Warning,
                decl.pos,
                format!("Unused {} '{}'", what, decl.name),
            );
        }
    }

    fn declare(&mut self, name: &str, kind: DeclKind, pos: Position, exposed: bool) {
        let shadows = self
            .scopes
            .iter()
            .rev()
            .skip(1)
            .any(|scope| scope.iter().any(|d| d.name == name));
        if shadows {
            self.report(
                "shadow-variable",
                Severity::Warning,
                pos,
                format!("'{}' shadows an outer binding", name),
            );
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(DeclInfo {
                name: name.to_string(),
                kind,
                pos,
                exposed,
                used: false,
            });
        }
    }

    fn mark_used(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(decl) = scope.iter_mut().rev().find(|d| d.name == name) {
                decl.used = true;
                return;
            }
        }
    }

    /// Collect declarations of one scope before walking it, so uses that
    /// precede the declaration (hoisted functions) still count.
    fn collect(&mut self, statements: &[Statement], top_level: bool) {
        for stmt in statements {
            match stmt {
                Statement::Dec(dec) => {
                    for name in dec.bound_names() {
                        let name = name.to_string();
                        self.declare(&name, DeclKind::Variable, dec.pos, dec.exposed);
                    }
                }
                Statement::Function(f) => {
                    self.declare(&f.name, DeclKind::Function, f.pos, f.exposed);
                }
                Statement::Enum(e) => {
                    self.declare(&e.name, DeclKind::Variable, e.pos, top_level);
                }
                Statement::Arg(a) => {
                    self.declare(&a.name, DeclKind::Variable, a.pos, true);
                }
                Statement::Env(e) => {
                    self.declare(&e.name, DeclKind::Variable, e.pos, true);
                }
                Statement::Dep(d) => {
                    self.declare(&d.alias, DeclKind::Variable, d.pos, false);
                }
                Statement::Expr(Expression::Flow { name, pos, .. }) => {
                    let name = name.clone();
                    self.declare(&name, DeclKind::Function, *pos, false);
                }
                _ => {}
            }
        }
    }

    fn walk_block(&mut self, statements: &[Statement], context: &str, pos: Position) {
        if statements.is_empty() {
            self.report(
                "empty-block",
                Severity::Info,
                pos,
                format!("Empty {} block", context),
            );
        }
        self.enter_scope();
        self.collect(statements, false);
        let mut unreachable_reported = false;
        for (i, stmt) in statements.iter().enumerate() {
            if !unreachable_reported && i > 0 && Self::terminates(&statements[i - 1]) {
                self.report(
                    "unreachable-code",
                    Severity::Warning,
                    Self::statement_pos(stmt),
                    "Unreachable code".to_string(),
                );
                unreachable_reported = true;
            }
            self.walk_statement(stmt);
        }
        self.leave_scope();
    }

    /// Whether a statement unconditionally leaves the enclosing block.
    fn terminates(stmt: &Statement) -> bool {
        matches!(
            stmt,
            Statement::Return { .. } | Statement::Throw { .. } | Statement::Break { .. }
        )
    }

    fn statement_pos(stmt: &Statement) -> Position {
        match stmt {
            Statement::Dec(d) => d.pos,
            Statement::Function(f) => f.pos,
            Statement::Enum(e) => e.pos,
            Statement::Arg(a) => a.pos,
            Statement::Env(e) => e.pos,
            Statement::Dep(d) => d.pos,
            Statement::Block { pos, .. }
            | Statement::While { pos, .. }
            | Statement::ForIn { pos, .. }
            | Statement::Return { pos, .. }
            | Statement::Break { pos }
            | Statement::Continue { pos }
            | Statement::Throw { pos, .. }
            | Statement::Print { pos, .. } => *pos,
            Statement::If(s) => s.pos,
            Statement::Try(s) => s.pos,
            Statement::Match(s) => s.pos,
            Statement::Expr(e) => e.pos(),
            Statement::Js(b) => b.pos,
            Statement::Shell(b) => b.pos,
            Statement::Test(t) => t.pos,
            Statement::Describe(d) => d.pos,
            Statement::Expect(e) => e.pos,
            Statement::Assert(a) => a.pos,
        }
    }

    fn constant_condition(&mut self, test: &Expression, context: &str) {
        if let Expression::Literal {
            value: LiteralValue::Bool(b),
            pos,
        } = test
        {
            self.report(
                "constant-condition",
                Severity::Warning,
                *pos,
                format!("Condition of this {} is always {}", context, b),
            );
        }
    }

    fn walk_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Dec(dec) => self.walk_expression(&dec.init),
            Statement::Function(f) => {
                self.enter_scope();
                for param in &f.params {
                    let pos = f.pos;
                    self.declare(param, DeclKind::Variable, pos, true);
                }
                self.walk_block(&f.body, "function", f.pos);
                self.leave_scope();
            }
            Statement::Enum(_) => {}
            Statement::Arg(a) => {
                if let Some(default) = &a.default {
                    self.walk_expression(default);
                }
            }
            Statement::Env(e) => {
                if let Some(default) = &e.default {
                    self.walk_expression(default);
                }
            }
            Statement::Dep(d) => {
                if let Some(overrides) = &d.overrides {
                    self.walk_expression(overrides);
                }
            }
            Statement::Block { body, pos } => self.walk_block(body, "standalone", *pos),
            Statement::If(s) => {
                self.constant_condition(&s.test, "if");
                self.walk_expression(&s.test);
                self.walk_block(&s.consequent, "if", s.pos);
                if let Some(alternate) = &s.alternate {
                    self.walk_statement(alternate);
                }
            }
            Statement::While { test, body, pos } => {
                self.constant_condition(test, "while");
                self.walk_expression(test);
                self.walk_block(body, "while", *pos);
            }
            Statement::ForIn {
                binding,
                iterable,
                body,
                pos,
            } => {
                self.walk_expression(iterable);
                self.enter_scope();
                self.declare(binding, DeclKind::Variable, *pos, true);
                self.walk_block(body, "for", *pos);
                self.leave_scope();
            }
            Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.walk_expression(value);
                }
            }
            Statement::Break { .. } | Statement::Continue { .. } => {}
            Statement::Try(s) => {
                self.walk_block(&s.block, "try", s.pos);
                if let Some(handler) = &s.handler {
                    self.enter_scope();
                    if let Some(param) = &handler.param {
                        let param = param.clone();
                        self.declare(&param, DeclKind::Variable, s.pos, true);
                    }
                    self.walk_block(&handler.body, "catch", s.pos);
                    self.leave_scope();
                }
                if let Some(finalizer) = &s.finalizer {
                    self.walk_block(finalizer, "finally", s.pos);
                }
            }
            Statement::Throw { value, .. } => self.walk_expression(value),
            Statement::Match(s) => {
                for arm in &s.arms {
                    self.constant_condition(&arm.guard, "guard");
                    self.walk_expression(&arm.guard);
                    self.walk_block(&arm.body, "match arm", arm.pos);
                }
            }
            Statement::Print { args, .. } => {
                for arg in args {
                    self.walk_expression(arg);
                }
            }
            Statement::Expr(e) => self.walk_expression(e),
            Statement::Js(block) => {
                for input in &block.inputs {
                    self.mark_used(input);
                }
            }
            Statement::Shell(block) => {
                for input in &block.inputs {
                    self.mark_used(input);
                }
            }
            Statement::Test(t) => self.walk_block(&t.body, "test", t.pos),
            Statement::Describe(d) => self.walk_block(&d.body, "describe", d.pos),
            Statement::Expect(e) => {
                self.walk_expression(&e.actual);
                if let Some(expected) = &e.expected {
                    self.walk_expression(expected);
                }
            }
            Statement::Assert(a) => {
                self.walk_expression(&a.condition);
                if let Some(message) = &a.message {
                    self.walk_expression(message);
                }
            }
        }
    }

    fn walk_expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Literal { .. } | Expression::Regex { .. } => {}
            Expression::Template { expressions, .. } => {
                for e in expressions {
                    self.walk_expression(e);
                }
            }
            Expression::Identifier { name, .. } => self.mark_used(name),
            Expression::Member {
                object, property, ..
            } => {
                self.walk_expression(object);
                if let Property::Computed(index) = property {
                    self.walk_expression(index);
                }
            }
            Expression::Call { callee, args, .. } => {
                self.walk_expression(callee);
                for arg in args {
                    self.walk_expression(arg);
                }
            }
            Expression::Unary { operand, .. } => self.walk_expression(operand),
            Expression::Binary { left, right, .. } => {
                self.walk_expression(left);
                self.walk_expression(right);
            }
            Expression::Assign { target, value, .. } => {
                self.walk_expression(target);
                self.walk_expression(value);
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.walk_expression(test);
                self.walk_expression(consequent);
                self.walk_expression(alternate);
            }
            Expression::Arrow { params, body, pos, .. } => {
                self.enter_scope();
                for param in params {
                    self.declare(param, DeclKind::Variable, *pos, true);
                }
                match body {
                    ArrowBody::Expr(e) => self.walk_expression(e),
                    ArrowBody::Block(stmts) => {
                        self.enter_scope();
                        self.collect(stmts, false);
                        for s in stmts {
                            self.walk_statement(s);
                        }
                        self.leave_scope();
                    }
                }
                self.leave_scope();
            }
            Expression::Array { elements, .. } => {
                for e in elements {
                    self.walk_expression(e);
                }
            }
            Expression::Object {
                properties, pos, ..
            } => {
                let mut seen: HashSet<&str> = HashSet::new();
                for entry in properties {
                    match entry {
                        ObjectEntry::Property { key, value, .. } => {
                            if !seen.insert(key.as_str()) {
                                self.report(
                                    "duplicate-key",
                                    Severity::Error,
                                    *pos,
                                    format!("Duplicate object key '{}'", key),
                                );
                            }
                            self.walk_expression(value);
                        }
                        ObjectEntry::Spread { argument } => self.walk_expression(argument),
                    }
                }
            }
            Expression::Spread { argument, .. } | Expression::Await { argument, .. } => {
                self.walk_expression(argument)
            }
            Expression::Range { start, end, .. } => {
                self.walk_expression(start);
                self.walk_expression(end);
            }
            Expression::Flow { functions, .. } => {
                for f in functions {
                    self.mark_used(f);
                }
            }
            Expression::Pipe { left, right, .. } => {
                self.walk_expression(left);
                self.walk_expression(right);
            }
            Expression::Js(block) => {
                for input in &block.inputs {
                    self.mark_used(input);
                }
            }
            Expression::Shell(block) => {
                for input in &block.inputs {
                    self.mark_used(input);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn lint_src(source: &str) -> Vec<LintMessage> {
        lint(&parse_source(source).unwrap(), &LintOptions::default())
    }

    fn rules(messages: &[LintMessage]) -> Vec<&'static str> {
        messages.iter().map(|m| m.rule).collect()
    }

    #[test]
    fn test_unused_variable() {
        let msgs = lint_src("dec unused = 1\ndec used = 2\nprint(used)");
        assert_eq!(rules(&msgs), vec!["unused-variable"]);
        assert!(msgs[0].message.contains("'unused'"));
    }

    #[test]
    fn test_underscore_and_exposed_suppressed() {
        let msgs = lint_src("dec _scratch = 1\nexpose dec api = 2");
        assert!(msgs.is_empty(), "unexpected messages: {:?}", msgs);
    }

    #[test]
    fn test_unused_function() {
        let msgs = lint_src("fn helper() { return 1 }");
        assert_eq!(rules(&msgs), vec!["unused-function"]);
    }

    #[test]
    fn test_shadow_variable() {
        let msgs = lint_src("dec x = 1\nfn f() { dec x = 2\nreturn x }\nprint(f(), x)");
        assert_eq!(rules(&msgs), vec!["shadow-variable"]);
    }

    #[test]
    fn test_unreachable_code() {
        let msgs = lint_src("fn f() { return 1\nprint(2) }\nprint(f())");
        assert!(rules(&msgs).contains(&"unreachable-code"));
    }

    #[test]
    fn test_empty_block() {
        let msgs = lint_src("if ready { }\nprint(ready)");
        assert!(rules(&msgs).contains(&"empty-block"));
        assert_eq!(
            msgs.iter().find(|m| m.rule == "empty-block").unwrap().severity,
            Severity::Info
        );
    }

    #[test]
    fn test_constant_condition() {
        let msgs = lint_src("while true { step() }");
        assert!(rules(&msgs).contains(&"constant-condition"));
    }

    #[test]
    fn test_duplicate_key_is_error() {
        let msgs = lint_src("dec o = { a: 1, a: 2 }\nprint(o)");
        let dup = msgs.iter().find(|m| m.rule == "duplicate-key").unwrap();
        assert_eq!(dup.severity, Severity::Error);
    }

    #[test]
    fn test_disabled_rule() {
        let options = LintOptions::default().disable("unused-variable");
        let msgs = lint(&parse_source("dec unused = 1").unwrap(), &options);
        assert!(msgs.is_empty());
    }

    #[test]
    fn test_hoisted_use_counts() {
        // `compute` is used before its declaration; hoisting must see it.
        let msgs = lint_src("dec r = compute(1)\nfn compute(a) { return a }\nprint(r)");
        assert!(msgs.is_empty(), "unexpected messages: {:?}", msgs);
    }
}

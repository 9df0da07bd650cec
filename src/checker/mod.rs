//! Structural type checker for KimchiLang.
//!
//! The checker walks the AST with a lexical scope stack holding
//! name-to-shape bindings. Each scope is checked in two passes: function and
//! enum declarations are hoisted first, then statements are visited in
//! order. Errors accumulate; the checker never fails fast.
//!
//! On success (zero type errors), the module's export surface — every
//! `expose`d binding plus every `arg` and `env` — is published to the
//! process-wide [`ExportRegistry`](crate::registry::ExportRegistry) under
//! the supplied module path, where later compiles can validate their `dep`
//! bindings against it.

pub mod builtins;
pub mod shape;

pub use shape::Shape;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::diagnostics::Diagnostic;
use crate::parser::ast::*;
use crate::registry::{ExportRegistry, ModuleExports};

/// Type-check a program.
///
/// Returns the accumulated diagnostics. When `module_path` is given and the
/// check is clean, the module's export shape is published to `registry`.
pub fn check(
    program: &Program,
    module_path: Option<&str>,
    registry: &ExportRegistry,
) -> Vec<Diagnostic> {
    let mut checker = Checker::new(registry);
    checker.check_program(program);

    if checker.diagnostics.is_empty() {
        if let Some(path) = module_path {
            registry.register(
                path,
                Arc::new(ModuleExports {
                    path: path.to_string(),
                    members: checker.exports.clone(),
                    required_args: checker.required_args.clone(),
                }),
            );
        }
    }

    checker.diagnostics
}

struct Checker<'a> {
    registry: &'a ExportRegistry,
    scopes: Vec<HashMap<String, Shape>>,
    diagnostics: Vec<Diagnostic>,
    exports: BTreeMap<String, Shape>,
    required_args: Vec<String>,
}

impl<'a> Checker<'a> {
    fn new(registry: &'a ExportRegistry) -> Self {
        Self {
            registry,
            scopes: vec![HashMap::new()],
            diagnostics: Vec::new(),
            exports: BTreeMap::new(),
            required_args: Vec::new(),
        }
    }

    fn error(&mut self, pos: crate::location::Position, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::type_error(pos, message));
    }

    fn declare(&mut self, name: &str, shape: Shape) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), shape);
        }
    }

    fn resolve(&self, name: &str) -> Option<Shape> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    fn check_program(&mut self, program: &Program) {
        self.hoist(&program.statements);
        for stmt in &program.statements {
            self.check_statement(stmt);
        }
    }

    /// First pass over a scope: make function and enum names visible before
    /// their definitions.
    fn hoist(&mut self, statements: &[Statement]) {
        for stmt in statements {
            match stmt {
                Statement::Function(f) => {
                    self.declare(&f.name, Shape::function_any(f.params.len()));
                }
                Statement::Enum(e) => {
                    self.declare(
                        &e.name,
                        Shape::Enum {
                            name: e.name.clone(),
                            members: e.members.iter().map(|m| m.name.clone()).collect(),
                        },
                    );
                }
                _ => {}
            }
        }
    }

    fn check_block(&mut self, statements: &[Statement]) {
        self.scopes.push(HashMap::new());
        self.hoist(statements);
        for stmt in statements {
            self.check_statement(stmt);
        }
        self.scopes.pop();
    }

    fn check_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Dec(dec) => self.check_dec(dec),
            Statement::Function(f) => {
                self.declare(&f.name, Shape::function_any(f.params.len()));
                self.scopes.push(HashMap::new());
                for param in &f.params {
                    self.declare(param, Shape::Any);
                }
                self.hoist(&f.body);
                for s in &f.body {
                    self.check_statement(s);
                }
                self.scopes.pop();
                if f.exposed {
                    self.exports
                        .insert(f.name.clone(), Shape::function_any(f.params.len()));
                }
            }
            Statement::Enum(_) => {
                // Hoisted already; members are numeric constants.
            }
            Statement::Arg(arg) => {
                self.declare(&arg.name, Shape::Any);
                if let Some(default) = &arg.default {
                    self.infer(default);
                }
                self.exports.insert(arg.name.clone(), Shape::Any);
                if arg.required {
                    self.required_args.push(arg.name.clone());
                }
            }
            Statement::Env(env) => {
                self.declare(&env.name, Shape::Any);
                if let Some(default) = &env.default {
                    self.infer(default);
                }
                self.exports.insert(env.name.clone(), Shape::Any);
            }
            Statement::Dep(dep) => self.check_dep(dep),
            Statement::Block { body, .. } => self.check_block(body),
            Statement::If(stmt) => {
                self.infer(&stmt.test);
                self.check_block(&stmt.consequent);
                if let Some(alternate) = &stmt.alternate {
                    self.check_statement(alternate);
                }
            }
            Statement::While { test, body, .. } => {
                self.infer(test);
                self.check_block(body);
            }
            Statement::ForIn {
                binding,
                iterable,
                body,
                ..
            } => {
                let iter_shape = self.infer(iterable);
                let element = match iter_shape {
                    Shape::Array(el) => *el,
                    _ => Shape::Unknown,
                };
                self.scopes.push(HashMap::new());
                self.declare(binding, element);
                self.hoist(body);
                for s in body {
                    self.check_statement(s);
                }
                self.scopes.pop();
            }
            Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.infer(value);
                }
            }
            Statement::Break { .. } | Statement::Continue { .. } => {}
            Statement::Try(stmt) => {
                self.check_block(&stmt.block);
                if let Some(handler) = &stmt.handler {
                    self.scopes.push(HashMap::new());
                    if let Some(param) = &handler.param {
                        self.declare(param, Shape::Any);
                    }
                    self.hoist(&handler.body);
                    for s in &handler.body {
                        self.check_statement(s);
                    }
                    self.scopes.pop();
                }
                if let Some(finalizer) = &stmt.finalizer {
                    self.check_block(finalizer);
                }
            }
            Statement::Throw { value, .. } => {
                self.infer(value);
            }
            Statement::Match(stmt) => {
                for arm in &stmt.arms {
                    self.infer(&arm.guard);
                    self.check_block(&arm.body);
                }
            }
            Statement::Print { args, .. } => {
                for arg in args {
                    self.infer(arg);
                }
            }
            Statement::Expr(expr) => {
                self.infer(expr);
            }
            Statement::Js(block) => self.check_js_inputs(block),
            Statement::Shell(block) => self.check_shell_inputs(block),
            Statement::Test(t) => self.check_block(&t.body),
            Statement::Describe(d) => self.check_block(&d.body),
            Statement::Expect(e) => {
                self.infer(&e.actual);
                if let Some(expected) = &e.expected {
                    self.infer(expected);
                }
            }
            Statement::Assert(a) => {
                self.infer(&a.condition);
                if let Some(message) = &a.message {
                    self.infer(message);
                }
            }
        }
    }

    fn check_dec(&mut self, dec: &DecBinding) {
        let init_shape = self.infer(&dec.init);

        if let Some(name) = &dec.name {
            self.declare(name, init_shape.clone());
            if dec.exposed {
                self.exports.insert(name.clone(), init_shape);
            }
            return;
        }

        let Some(pattern) = &dec.pattern else {
            return;
        };
        match pattern {
            Pattern::Object { props, pos } => {
                for prop in props {
                    let shape = match &init_shape {
                        Shape::Object(fields) if !fields.is_empty() => {
                            match fields.get(&prop.key) {
                                Some(shape) => shape.clone(),
                                None => {
                                    self.error(
                                        *pos,
                                        format!(
                                            "Cannot destructure missing property '{}'",
                                            prop.key
                                        ),
                                    );
                                    Shape::Unknown
                                }
                            }
                        }
                        _ => Shape::Unknown,
                    };
                    self.declare(&prop.binding, shape.clone());
                    if dec.exposed {
                        self.exports.insert(prop.binding.clone(), shape);
                    }
                }
            }
            Pattern::Array { elements, .. } => {
                let element = match &init_shape {
                    Shape::Array(el) => (**el).clone(),
                    _ => Shape::Unknown,
                };
                for name in elements.iter().flatten() {
                    self.declare(name, element.clone());
                    if dec.exposed {
                        self.exports.insert(name.clone(), element.clone());
                    }
                }
            }
        }
    }

    fn check_dep(&mut self, dep: &DepStmt) {
        let Some(entry) = self.registry.lookup(&dep.path) else {
            // Unregistered modules bind as `any`.
            self.declare(&dep.alias, Shape::Any);
            if let Some(overrides) = &dep.overrides {
                self.infer(overrides);
            }
            return;
        };

        self.declare(&dep.alias, entry.as_object_shape());

        if let Some(Expression::Object { properties, .. }) = &dep.overrides {
            let properties = properties.clone();
            for entry_prop in &properties {
                let ObjectEntry::Property { key, value, .. } = entry_prop else {
                    continue;
                };
                // Dotted keys are inner-dep overrides and are skipped.
                if key.contains('.') {
                    self.infer(value);
                    continue;
                }
                let actual = self.infer(value);
                if let Some(expected) = entry.members.get(key) {
                    if !expected.compatible(&actual) {
                        self.error(
                            value.pos(),
                            format!(
                                "Override '{}' for module '{}' has shape {}, expected {}",
                                key, dep.path, actual, expected
                            ),
                        );
                    }
                }
            }
        } else if let Some(overrides) = &dep.overrides {
            self.infer(overrides);
        }
    }

    fn check_js_inputs(&mut self, block: &JsBlock) {
        for input in &block.inputs {
            if self.resolve(input).is_none() && !builtins::is_builtin(input) {
                self.error(block.pos, format!("Undefined identifier '{}'", input));
            }
        }
    }

    fn check_shell_inputs(&mut self, block: &ShellBlock) {
        for input in &block.inputs {
            if self.resolve(input).is_none() && !builtins::is_builtin(input) {
                self.error(block.pos, format!("Undefined identifier '{}'", input));
            }
        }
    }

    /// Infer the shape of an expression, reporting any errors found inside.
    fn infer(&mut self, expr: &Expression) -> Shape {
        match expr {
            Expression::Literal { value, .. } => match value {
                LiteralValue::Number { .. } => Shape::Number,
                LiteralValue::Str(_) | LiteralValue::RawTemplate(_) => Shape::String,
                LiteralValue::Bool(_) => Shape::Boolean,
                LiteralValue::Null => Shape::Null,
            },
            Expression::Template { expressions, .. } => {
                for e in expressions {
                    self.infer(e);
                }
                Shape::String
            }
            Expression::Identifier { name, pos } => match self.resolve(name) {
                Some(shape) => shape,
                None => {
                    if !builtins::is_builtin(name) {
                        self.error(*pos, format!("Undefined identifier '{}'", name));
                    }
                    Shape::Any
                }
            },
            Expression::Member {
                object, property, ..
            } => self.infer_member(object, property),
            Expression::Call { callee, args, pos } => {
                let callee_shape = self.infer(callee);
                for arg in args {
                    self.infer(arg);
                }
                match callee_shape {
                    Shape::Function { ret, .. } => *ret,
                    shape if shape.is_wildcard() => Shape::Unknown,
                    shape => {
                        self.error(
                            *pos,
                            format!("Cannot call a value of shape {}", shape),
                        );
                        Shape::Unknown
                    }
                }
            }
            Expression::Unary { op, operand, .. } => {
                self.infer(operand);
                match op {
                    UnaryOp::Not => Shape::Boolean,
                    UnaryOp::Neg | UnaryOp::BitNot => Shape::Number,
                }
            }
            Expression::Binary {
                op, left, right, ..
            } => {
                let l = self.infer(left);
                let r = self.infer(right);
                match op {
                    BinaryOp::Add => {
                        if l == Shape::String || r == Shape::String {
                            Shape::String
                        } else {
                            Shape::Number
                        }
                    }
                    BinaryOp::Sub
                    | BinaryOp::Mul
                    | BinaryOp::Div
                    | BinaryOp::Mod
                    | BinaryOp::Pow
                    | BinaryOp::BitOr
                    | BinaryOp::Shl
                    | BinaryOp::Shr => Shape::Number,
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Is
                    | BinaryOp::IsNot
                    | BinaryOp::Lt
                    | BinaryOp::Gt
                    | BinaryOp::LtEq
                    | BinaryOp::GtEq => Shape::Boolean,
                    BinaryOp::And | BinaryOp::Or => {
                        if l == r {
                            l
                        } else {
                            Shape::Unknown
                        }
                    }
                }
            }
            Expression::Assign { target, value, .. } => {
                self.infer(target);
                self.infer(value)
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.infer(test);
                let t = self.infer(consequent);
                let f = self.infer(alternate);
                if t == f {
                    t
                } else {
                    Shape::Unknown
                }
            }
            Expression::Arrow { params, body, .. } => {
                self.scopes.push(HashMap::new());
                for param in params {
                    self.declare(param, Shape::Any);
                }
                match body {
                    ArrowBody::Expr(e) => {
                        self.infer(e);
                    }
                    ArrowBody::Block(stmts) => {
                        self.hoist(stmts);
                        for s in stmts {
                            self.check_statement(s);
                        }
                    }
                }
                self.scopes.pop();
                Shape::function_any(params.len())
            }
            Expression::Array { elements, .. } => {
                let mut shapes = elements.iter().map(|e| self.infer(e));
                let element = match shapes.next() {
                    Some(first) => {
                        let rest: Vec<Shape> = shapes.collect();
                        if rest.iter().all(|s| s == &first) {
                            first
                        } else {
                            Shape::Unknown
                        }
                    }
                    None => Shape::Unknown,
                };
                Shape::Array(Box::new(element))
            }
            Expression::Object { properties, .. } => {
                let mut props = BTreeMap::new();
                for entry in properties {
                    match entry {
                        ObjectEntry::Property { key, value, .. } => {
                            let shape = self.infer(value);
                            props.insert(key.clone(), shape);
                        }
                        ObjectEntry::Spread { argument } => {
                            // Spread contributions merge in when known.
                            if let Shape::Object(spread) = self.infer(argument) {
                                props.extend(spread);
                            }
                        }
                    }
                }
                Shape::Object(props)
            }
            Expression::Spread { argument, .. } => {
                self.infer(argument);
                Shape::Unknown
            }
            Expression::Await { argument, .. } => {
                self.infer(argument);
                Shape::Unknown
            }
            Expression::Range { start, end, .. } => {
                self.infer(start);
                self.infer(end);
                Shape::Array(Box::new(Shape::Number))
            }
            Expression::Flow {
                name,
                functions,
                pos,
            } => {
                for f in functions {
                    if self.resolve(f).is_none() && !builtins::is_builtin(f) {
                        self.error(*pos, format!("Undefined identifier '{}'", f));
                    }
                }
                let shape = Shape::Function {
                    params: vec![Shape::Any],
                    ret: Box::new(Shape::Unknown),
                };
                self.declare(name, shape.clone());
                shape
            }
            Expression::Pipe { left, right, pos } => {
                self.infer(left);
                let right_shape = self.infer(right);
                match right_shape {
                    Shape::Function { ret, .. } => *ret,
                    shape if shape.is_wildcard() => Shape::Unknown,
                    shape => {
                        self.error(
                            *pos,
                            format!("Cannot pipe into a value of shape {}", shape),
                        );
                        Shape::Unknown
                    }
                }
            }
            Expression::Regex { .. } => Shape::Unknown,
            Expression::Js(block) => {
                self.check_js_inputs(block);
                Shape::Unknown
            }
            Expression::Shell(block) => {
                self.check_shell_inputs(block);
                Shape::object([
                    ("stdout".to_string(), Shape::String),
                    ("stderr".to_string(), Shape::String),
                    ("exitCode".to_string(), Shape::Number),
                ])
            }
        }
    }

    /// Builtin members are methods whose call yields the table's shape;
    /// `length` alone is a plain property.
    fn builtin_member_shape(table_shape: Option<Shape>, name: &str) -> Shape {
        match table_shape {
            Some(shape) if name == "length" => shape,
            Some(shape) => Shape::Function {
                params: vec![Shape::Any],
                ret: Box::new(shape),
            },
            None => Shape::Unknown,
        }
    }

    fn infer_member(&mut self, object: &Expression, property: &Property) -> Shape {
        let object_shape = self.infer(object);

        match property {
            Property::Computed(index) => {
                self.infer(index);
                match object_shape {
                    Shape::Array(el) => *el,
                    _ => Shape::Unknown,
                }
            }
            Property::Name(name) => match &object_shape {
                Shape::Object(props) => {
                    if props.is_empty() {
                        Shape::Unknown
                    } else {
                        match props.get(name) {
                            Some(shape) => shape.clone(),
                            None => {
                                self.error(
                                    object.pos(),
                                    format!(
                                        "Object '{}' has no property '{}'",
                                        object.access_path(),
                                        name
                                    ),
                                );
                                Shape::Unknown
                            }
                        }
                    }
                }
                Shape::Enum {
                    name: enum_name,
                    members,
                } => {
                    if members.iter().any(|m| m == name) {
                        Shape::Number
                    } else {
                        self.error(
                            object.pos(),
                            format!("Enum '{}' has no member '{}'", enum_name, name),
                        );
                        Shape::Unknown
                    }
                }
                Shape::Array(el) => {
                    Self::builtin_member_shape(builtins::array_member(el, name), name)
                }
                Shape::String => {
                    Self::builtin_member_shape(builtins::string_member(name), name)
                }
                Shape::Number => {
                    Self::builtin_member_shape(builtins::number_member(name), name)
                }
                _ => Shape::Unknown,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn check_src(source: &str) -> Vec<Diagnostic> {
        let program = parse_source(source).unwrap();
        let registry = ExportRegistry::new();
        check(&program, None, &registry)
    }

    fn check_with_registry(
        source: &str,
        path: Option<&str>,
        registry: &ExportRegistry,
    ) -> Vec<Diagnostic> {
        let program = parse_source(source).unwrap();
        check(&program, path, registry)
    }

    #[test]
    fn test_clean_program() {
        let diags = check_src("dec x = 1\ndec y = x + 2");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_undefined_identifier() {
        let diags = check_src("dec x = missing");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Undefined identifier 'missing'"));
    }

    #[test]
    fn test_builtins_resolve() {
        let diags = check_src("dec x = Math\ndec y = JSON\nprint(console)");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_missing_property_on_known_object() {
        let diags = check_src("dec obj = { a: 1 }\ndec b = obj.b");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("no property 'b'"));
    }

    #[test]
    fn test_call_of_non_callable() {
        let diags = check_src("dec n = 1\ndec r = n()");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Cannot call"));
    }

    #[test]
    fn test_enum_member_access() {
        let diags = check_src("enum Color { Red, Green }\ndec c = Color.Red");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);

        let diags = check_src("enum Color { Red, Green }\ndec c = Color.Blue");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("no member 'Blue'"));
    }

    #[test]
    fn test_destructure_missing_property() {
        let diags = check_src("dec base = { a: 1 }\ndec { b } = base");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("missing property 'b'"));
    }

    #[test]
    fn test_builtin_method_chain() {
        let diags = check_src("dec xs = [1, 2, 3]\ndec n = xs.filter(x => x > 1).length");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_hoisted_function() {
        let diags = check_src("dec r = compute(1)\nfn compute(a) { return a }");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_export_publishing() {
        let registry = ExportRegistry::new();
        let diags = check_with_registry(
            "expose dec foo = \"hello\"\narg bar",
            Some("my.module"),
            &registry,
        );
        assert!(diags.is_empty());

        let entry = registry.lookup("my.module").unwrap();
        assert_eq!(entry.members.get("foo"), Some(&Shape::String));
        assert_eq!(entry.members.get("bar"), Some(&Shape::Any));
    }

    #[test]
    fn test_no_publish_on_error() {
        let registry = ExportRegistry::new();
        let diags = check_with_registry(
            "expose dec foo = missing",
            Some("broken.module"),
            &registry,
        );
        assert!(!diags.is_empty());
        assert!(registry.lookup("broken.module").is_none());
    }

    #[test]
    fn test_dep_override_validation() {
        let registry = ExportRegistry::new();
        let diags = check_with_registry(
            "expose dec foo = \"hello\"\narg bar",
            Some("lib.config"),
            &registry,
        );
        assert!(diags.is_empty());

        // Compatible overrides check clean.
        let diags = check_with_registry(
            "as cfg dep lib.config\ndec f = cfg.foo",
            None,
            &registry,
        );
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);

        // Incompatible override shape is an error.
        let program = "as cfg dep lib.config({ foo: 42 })";
        let diags = check_with_registry(program, None, &registry);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Override 'foo'"));
    }

    #[test]
    fn test_unregistered_dep_binds_any() {
        let registry = ExportRegistry::new();
        let diags = check_with_registry(
            "as x dep never.seen\ndec v = x.anything",
            None,
            &registry,
        );
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_range_is_number_array() {
        let diags = check_src("dec r = 0..5\ndec n = r.sum()");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_shell_result_shape() {
        let diags = check_src("dec r = shell { ls }\ndec out = r.stdout");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }
}

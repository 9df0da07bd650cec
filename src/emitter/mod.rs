//! JavaScript emitter.
//!
//! The emitter converts a checked AST directly into JavaScript text: a
//! buffered writer with an indent level, one emission routine per node
//! family, and conservative parenthesization (binary and unary expressions
//! are always wrapped; no attempt is made to recover minimal parens).
//! Member accesses emit `?.` so every access chain is null-safe.
//!
//! Output layout per compiled module:
//!
//! 1. the deterministic runtime preamble (plus the shell helper when the
//!    program contains shell blocks);
//! 2. one `import _dep_<alias> from './path.km';` per dep binding;
//! 3. `export default function(_opts = {}) { ... return { exposed }; }`.

pub mod preamble;

use crate::parser::ast::*;

pub use preamble::{PREAMBLE, SHELL_HELPER};

/// Generate JavaScript text for a program.
pub fn generate(program: &Program) -> String {
    Emitter::new().emit_program(program)
}

/// JavaScript emitter state.
struct Emitter {
    out: String,
    indent: usize,
    /// Depth of enclosing function bodies. Pattern-match arms emit a
    /// trailing `return;` only when this is positive.
    fn_depth: usize,
}

impl Emitter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            fn_depth: 0,
        }
    }

    fn push_line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if line.is_empty() {
            self.out.push('\n');
            return;
        }
        for segment in line.split('\n') {
            for _ in 0..self.indent {
                self.out.push_str("  ");
            }
            self.out.push_str(segment);
            self.out.push('\n');
        }
    }

    fn emit_program(mut self, program: &Program) -> String {
        self.out.push_str(PREAMBLE);
        if program_contains_shell(&program.statements) {
            self.out.push_str(SHELL_HELPER);
        }
        self.out.push('\n');

        // Dep imports: path segments joined by `/` with the `.km` suffix.
        for stmt in &program.statements {
            if let Statement::Dep(dep) = stmt {
                self.push_line(format!(
                    "import _dep_{} from './{}.km';",
                    dep.alias,
                    dep.segments.join("/")
                ));
            }
        }

        self.push_line("");
        self.push_line("export default function(_opts = {}) {");
        self.indent += 1;

        // Required-arg and required-env existence checks.
        for stmt in &program.statements {
            match stmt {
                Statement::Arg(arg) if arg.required => {
                    self.push_line(format!("if (_opts[\"{}\"] === undefined) {{", arg.name));
                    self.indent += 1;
                    self.push_line(format!(
                        "throw error(\"Missing required arg: {}\");",
                        arg.name
                    ));
                    self.indent -= 1;
                    self.push_line("}");
                }
                Statement::Env(env) if env.required => {
                    self.push_line(format!(
                        "if (process.env[\"{}\"] === undefined) {{",
                        env.name
                    ));
                    self.indent += 1;
                    self.push_line(format!(
                        "throw error(\"Missing required env: {}\");",
                        env.name
                    ));
                    self.indent -= 1;
                    self.push_line("}");
                }
                _ => {}
            }
        }

        // Arg extraction from _opts, env extraction from the process
        // environment, then dep resolution.
        for stmt in &program.statements {
            match stmt {
                Statement::Arg(arg) => {
                    let fallback = arg
                        .default
                        .as_ref()
                        .map(|d| self.expr(d))
                        .unwrap_or_else(|| "undefined".to_string());
                    let picked = format!(
                        "_opts[\"{}\"] !== undefined ? _opts[\"{}\"] : {}",
                        arg.name, arg.name, fallback
                    );
                    if arg.secret {
                        self.push_line(format!(
                            "const {} = _secret({});",
                            arg.name, picked
                        ));
                    } else {
                        self.push_line(format!("const {} = {};", arg.name, picked));
                    }
                }
                Statement::Env(env) => {
                    let fallback = env
                        .default
                        .as_ref()
                        .map(|d| self.expr(d))
                        .unwrap_or_else(|| "undefined".to_string());
                    let picked = format!(
                        "process.env[\"{}\"] !== undefined ? process.env[\"{}\"] : {}",
                        env.name, env.name, fallback
                    );
                    if env.secret {
                        self.push_line(format!(
                            "const {} = _secret({});",
                            env.name, picked
                        ));
                    } else {
                        self.push_line(format!("const {} = {};", env.name, picked));
                    }
                }
                Statement::Dep(dep) => {
                    let call = match &dep.overrides {
                        Some(overrides) => {
                            format!("_dep_{}({})", dep.alias, self.expr(overrides))
                        }
                        None => format!("_dep_{}()", dep.alias),
                    };
                    self.push_line(format!(
                        "const {} = _opts[\"{}\"] || {};",
                        dep.alias, dep.path, call
                    ));
                }
                _ => {}
            }
        }

        // Remaining statements in source order.
        for stmt in &program.statements {
            if matches!(
                stmt,
                Statement::Arg(_) | Statement::Env(_) | Statement::Dep(_)
            ) {
                continue;
            }
            self.emit_statement(stmt);
        }

        if program_contains_tests(&program.statements) {
            self.push_line("_runTests();");
        }

        // Return object of every exposed binding and function.
        let exposed = collect_exposed(&program.statements);
        if exposed.is_empty() {
            self.push_line("return {};");
        } else {
            self.push_line(format!("return {{ {} }};", exposed.join(", ")));
        }

        self.indent -= 1;
        self.push_line("}");
        self.out
    }

    fn emit_block_body(&mut self, statements: &[Statement]) {
        self.indent += 1;
        for stmt in statements {
            self.emit_statement(stmt);
        }
        self.indent -= 1;
    }

    fn emit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Dec(dec) => self.emit_dec(dec),
            Statement::Function(f) => self.emit_function(f),
            Statement::Enum(e) => self.emit_enum(e),
            // Module-surface declarations are emitted by the wrapper.
            Statement::Arg(_) | Statement::Env(_) | Statement::Dep(_) => {}
            Statement::Block { body, .. } => {
                self.push_line("{");
                self.emit_block_body(body);
                self.push_line("}");
            }
            Statement::If(stmt) => self.emit_if(stmt),
            Statement::While { test, body, .. } => {
                self.push_line(format!("while ({}) {{", self.expr(test)));
                self.emit_block_body(body);
                self.push_line("}");
            }
            Statement::ForIn {
                binding,
                iterable,
                body,
                ..
            } => {
                self.push_line(format!(
                    "for (const {} of {}) {{",
                    binding,
                    self.expr(iterable)
                ));
                self.emit_block_body(body);
                self.push_line("}");
            }
            Statement::Return { value, .. } => match value {
                Some(value) => self.push_line(format!("return {};", self.expr(value))),
                None => self.push_line("return;"),
            },
            Statement::Break { .. } => self.push_line("break;"),
            Statement::Continue { .. } => self.push_line("continue;"),
            Statement::Try(stmt) => self.emit_try(stmt),
            Statement::Throw { value, .. } => {
                self.push_line(format!("throw {};", self.expr(value)));
            }
            Statement::Match(stmt) => self.emit_match(stmt),
            Statement::Print { args, .. } => {
                let args: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                self.push_line(format!("console.log({});", args.join(", ")));
            }
            Statement::Expr(Expression::Flow {
                name, functions, ..
            }) => {
                self.push_line(format!(
                    "const {} = (..._args) => {};",
                    name,
                    compose_flow(functions, "..._args")
                ));
            }
            Statement::Expr(expr) => {
                self.push_line(format!("{};", self.expr(expr)));
            }
            Statement::Js(block) => self.emit_js_statement(block),
            Statement::Shell(block) => {
                self.push_line(format!("{};", self.shell_call(block)));
            }
            Statement::Test(t) => {
                let is_async = block_contains_await(&t.body);
                let arrow = if is_async { "async () =>" } else { "() =>" };
                self.push_line(format!(
                    "_test(\"{}\", {} {{",
                    crate::parser::token::escape_js_string(&t.name),
                    arrow
                ));
                self.fn_depth += 1;
                self.emit_block_body(&t.body);
                self.fn_depth -= 1;
                self.push_line("});");
            }
            Statement::Describe(d) => {
                self.push_line(format!(
                    "_describe(\"{}\", () => {{",
                    crate::parser::token::escape_js_string(&d.name)
                ));
                self.emit_block_body(&d.body);
                self.push_line("});");
            }
            Statement::Expect(e) => {
                let expected = e
                    .expected
                    .as_ref()
                    .map(|x| self.expr(x))
                    .unwrap_or_default();
                self.push_line(format!(
                    "_expect({}).{}({});",
                    self.expr(&e.actual),
                    e.matcher,
                    expected
                ));
            }
            Statement::Assert(a) => match &a.message {
                Some(message) => self.push_line(format!(
                    "_assert({}, {});",
                    self.expr(&a.condition),
                    self.expr(message)
                )),
                None => self.push_line(format!("_assert({});", self.expr(&a.condition))),
            },
        }
    }

    fn emit_dec(&mut self, dec: &DecBinding) {
        let init = self.expr(&dec.init);
        let frozen = if dec.secret {
            format!("_deepFreeze(_secret({}))", init)
        } else {
            format!("_deepFreeze({})", init)
        };
        match (&dec.name, &dec.pattern) {
            (Some(name), _) => {
                self.push_line(format!("const {} = {};", name, frozen));
            }
            (None, Some(Pattern::Object { props, .. })) => {
                let parts: Vec<String> = props
                    .iter()
                    .map(|p| {
                        if p.key == p.binding {
                            p.key.clone()
                        } else {
                            format!("{}: {}", p.key, p.binding)
                        }
                    })
                    .collect();
                self.push_line(format!(
                    "const {{ {} }} = {};",
                    parts.join(", "),
                    frozen
                ));
            }
            (None, Some(Pattern::Array { elements, .. })) => {
                let parts: Vec<String> = elements
                    .iter()
                    .map(|e| e.clone().unwrap_or_default())
                    .collect();
                self.push_line(format!("const [{}] = {};", parts.join(", "), frozen));
            }
            (None, None) => {}
        }
    }

    fn emit_function(&mut self, f: &FunctionDecl) {
        let params = f.params.join(", ");
        if !f.memoized {
            let keyword = if f.is_async {
                "async function"
            } else {
                "function"
            };
            self.push_line(format!("{} {}({}) {{", keyword, f.name, params));
            self.fn_depth += 1;
            self.emit_block_body(&f.body);
            self.fn_depth -= 1;
            self.push_line("}");
            return;
        }

        // Memoized variant: an IIFE holding the cache, keyed by
        // JSON.stringify(arguments).
        let keyword = if f.is_async {
            "async function"
        } else {
            "function"
        };
        self.push_line(format!("const {} = (() => {{", f.name));
        self.indent += 1;
        self.push_line("const _cache = {};");
        self.push_line(format!("const _fn = {} ({}) {{", keyword, params));
        self.fn_depth += 1;
        self.emit_block_body(&f.body);
        self.fn_depth -= 1;
        self.push_line("};");
        self.push_line("return function () {");
        self.indent += 1;
        self.push_line("const _key = JSON.stringify(arguments);");
        self.push_line("if (!(_key in _cache)) {");
        self.indent += 1;
        self.push_line("_cache[_key] = _fn.apply(this, arguments);");
        self.indent -= 1;
        self.push_line("}");
        self.push_line("return _cache[_key];");
        self.indent -= 1;
        self.push_line("};");
        self.indent -= 1;
        self.push_line("})();");
    }

    fn emit_enum(&mut self, e: &EnumDecl) {
        let mut counter: i64 = 0;
        let mut members = Vec::new();
        for member in &e.members {
            if let Some(raw) = &member.value {
                counter = parse_numeric_raw(raw);
            }
            members.push(format!("{}: {}", member.name, counter));
            counter += 1;
        }
        self.push_line(format!(
            "const {} = Object.freeze({{ {} }});",
            e.name,
            members.join(", ")
        ));
    }

    fn emit_if(&mut self, stmt: &IfStmt) {
        self.push_line(format!("if ({}) {{", self.expr(&stmt.test)));
        self.emit_block_body(&stmt.consequent);

        let mut alternate = &stmt.alternate;
        loop {
            match alternate {
                None => {
                    self.push_line("}");
                    return;
                }
                Some(next) => match next.as_ref() {
                    Statement::If(inner) => {
                        self.push_line(format!("}} else if ({}) {{", self.expr(&inner.test)));
                        self.emit_block_body(&inner.consequent);
                        alternate = &inner.alternate;
                    }
                    Statement::Block { body, .. } => {
                        self.push_line("} else {");
                        self.emit_block_body(body);
                        self.push_line("}");
                        return;
                    }
                    other => {
                        self.push_line("} else {");
                        self.indent += 1;
                        self.emit_statement(other);
                        self.indent -= 1;
                        self.push_line("}");
                        return;
                    }
                },
            }
        }
    }

    fn emit_try(&mut self, stmt: &TryStmt) {
        self.push_line("try {");
        self.emit_block_body(&stmt.block);
        if let Some(handler) = &stmt.handler {
            match &handler.param {
                Some(param) => self.push_line(format!("}} catch ({}) {{", param)),
                None => self.push_line("} catch {"),
            }
            self.emit_block_body(&handler.body);
        }
        if let Some(finalizer) = &stmt.finalizer {
            self.push_line("} finally {");
            self.emit_block_body(finalizer);
        }
        self.push_line("}");
    }

    /// Pattern-match lowering: an `if`/`else if` chain. Inside a function
    /// body each arm ends with `return;` so the first match completes the
    /// function; at top level arms fall through without returning.
    fn emit_match(&mut self, stmt: &PatternMatchStmt) {
        for (i, arm) in stmt.arms.iter().enumerate() {
            let guard = self.expr(&arm.guard);
            if i == 0 {
                self.push_line(format!("if ({}) {{", guard));
            } else {
                self.push_line(format!("}} else if ({}) {{", guard));
            }
            self.indent += 1;
            for s in &arm.body {
                self.emit_statement(s);
            }
            if self.fn_depth > 0 {
                self.push_line("return;");
            }
            self.indent -= 1;
        }
        self.push_line("}");
    }

    fn emit_js_statement(&mut self, block: &JsBlock) {
        if block.inputs.is_empty() {
            self.push_line("(() => {");
        } else {
            self.push_line(format!("(({}) => {{", block.inputs.join(", ")));
        }
        self.indent += 1;
        for line in block.body.lines() {
            self.push_line(line);
        }
        self.indent -= 1;
        if block.inputs.is_empty() {
            self.push_line("})();");
        } else {
            self.push_line(format!("}})({});", block.inputs.join(", ")));
        }
    }

    fn shell_call(&self, block: &ShellBlock) -> String {
        let command = escape_template(&block.command);
        if block.inputs.is_empty() {
            format!("_shell(`{}`)", command)
        } else {
            format!("_shell(`{}`, {{ {} }})", command, block.inputs.join(", "))
        }
    }

    // ========== Expressions ==========

    fn expr(&self, expr: &Expression) -> String {
        match expr {
            Expression::Literal { value, .. } => match value {
                LiteralValue::Number { raw } => raw.clone(),
                LiteralValue::Str(s) => {
                    format!("\"{}\"", crate::parser::token::escape_js_string(s))
                }
                LiteralValue::RawTemplate(raw) => raw.clone(),
                LiteralValue::Bool(b) => b.to_string(),
                LiteralValue::Null => "null".to_string(),
            },
            Expression::Template {
                parts, expressions, ..
            } => {
                let mut out = String::from("`");
                for (i, part) in parts.iter().enumerate() {
                    out.push_str(&escape_template(part));
                    if i < expressions.len() {
                        out.push_str("${");
                        out.push_str(&self.expr(&expressions[i]));
                        out.push('}');
                    }
                }
                out.push('`');
                out
            }
            Expression::Identifier { name, .. } => name.clone(),
            Expression::Member {
                object, property, ..
            } => {
                let base = self.expr(object);
                match property {
                    Property::Name(name) => format!("{}?.{}", base, name),
                    Property::Computed(index) => {
                        format!("{}?.[{}]", base, self.expr(index))
                    }
                }
            }
            Expression::Call { callee, args, .. } => {
                let args: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                let callee_text = match callee.as_ref() {
                    // Immediately-called function expressions need parens.
                    Expression::Arrow { .. } => format!("({})", self.expr(callee)),
                    _ => self.expr(callee),
                };
                format!("{}({})", callee_text, args.join(", "))
            }
            Expression::Unary { op, operand, .. } => {
                let op = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::BitNot => "~",
                };
                format!("({}{})", op, self.expr(operand))
            }
            Expression::Binary {
                op, left, right, ..
            } => {
                let l = self.expr(left);
                let r = self.expr(right);
                match op {
                    BinaryOp::Is => format!("({}?._id === {}?._id)", l, r),
                    BinaryOp::IsNot => format!("({}?._id !== {}?._id)", l, r),
                    _ => format!("({} {} {})", l, binary_op_js(*op), r),
                }
            }
            Expression::Assign {
                op, target, value, ..
            } => {
                format!(
                    "{} {} {}",
                    self.assign_target(target),
                    op.as_str(),
                    self.expr(value)
                )
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => format!(
                "({} ? {} : {})",
                self.expr(test),
                self.expr(consequent),
                self.expr(alternate)
            ),
            Expression::Arrow {
                params,
                body,
                is_async,
                ..
            } => {
                let prefix = if *is_async { "async " } else { "" };
                let params = format!("({})", params.join(", "));
                match body {
                    ArrowBody::Expr(e) => {
                        let body_text = match e.as_ref() {
                            Expression::Object { .. } => format!("({})", self.expr(e)),
                            _ => self.expr(e),
                        };
                        format!("{}{} => {}", prefix, params, body_text)
                    }
                    ArrowBody::Block(stmts) => {
                        format!("{}{} => {}", prefix, params, self.block_text(stmts))
                    }
                }
            }
            Expression::Array { elements, .. } => {
                let elements: Vec<String> = elements.iter().map(|e| self.expr(e)).collect();
                format!("[{}]", elements.join(", "))
            }
            Expression::Object { properties, .. } => {
                if properties.is_empty() {
                    return "{}".to_string();
                }
                let entries: Vec<String> = properties
                    .iter()
                    .map(|entry| match entry {
                        ObjectEntry::Property {
                            key,
                            value,
                            shorthand,
                        } => {
                            if *shorthand {
                                key.clone()
                            } else if is_valid_js_ident(key) {
                                format!("{}: {}", key, self.expr(value))
                            } else {
                                format!(
                                    "\"{}\": {}",
                                    crate::parser::token::escape_js_string(key),
                                    self.expr(value)
                                )
                            }
                        }
                        ObjectEntry::Spread { argument } => {
                            format!("...{}", self.expr(argument))
                        }
                    })
                    .collect();
                format!("{{ {} }}", entries.join(", "))
            }
            Expression::Spread { argument, .. } => format!("...{}", self.expr(argument)),
            Expression::Await { argument, .. } => format!("(await {})", self.expr(argument)),
            Expression::Range { start, end, .. } => format!(
                "Array.from({{ length: {} - {} }}, (_, i) => {} + i)",
                self.expr(end),
                self.expr(start),
                self.expr(start)
            ),
            Expression::Flow { functions, .. } => {
                format!("((..._args) => {})", compose_flow(functions, "..._args"))
            }
            Expression::Pipe { left, right, .. } => {
                format!("{}({})", self.expr(right), self.expr(left))
            }
            Expression::Regex { pattern, flags, .. } => format!("/{}/{}", pattern, flags),
            Expression::Js(block) => {
                let inputs = block.inputs.join(", ");
                format!("(({}) => {{ {} }})({})", inputs, block.body, inputs)
            }
            Expression::Shell(block) => self.shell_call(block),
        }
    }

    /// Render an arrow block body as `{ ... }` text at the current indent.
    fn block_text(&self, statements: &[Statement]) -> String {
        let mut sub = Emitter {
            out: String::new(),
            indent: self.indent + 1,
            fn_depth: self.fn_depth + 1,
        };
        for stmt in statements {
            sub.emit_statement(stmt);
        }
        let mut out = String::from("{\n");
        out.push_str(&sub.out);
        for _ in 0..self.indent {
            out.push_str("  ");
        }
        out.push('}');
        out
    }

    /// Assignment targets are emitted without optional chaining: `?.` is
    /// not valid on the left of `=`.
    fn assign_target(&self, expr: &Expression) -> String {
        match expr {
            Expression::Identifier { name, .. } => name.clone(),
            Expression::Member {
                object, property, ..
            } => {
                let base = self.assign_target(object);
                match property {
                    Property::Name(name) => format!("{}.{}", base, name),
                    Property::Computed(index) => format!("{}[{}]", base, self.expr(index)),
                }
            }
            other => self.expr(other),
        }
    }
}

/// Compose flow function names inside-out: `f3(f2(f1(args)))`.
fn compose_flow(functions: &[String], args: &str) -> String {
    let mut out = args.to_string();
    for f in functions {
        out = format!("{}({})", f, out);
    }
    out
}

fn binary_op_js(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
        BinaryOp::Eq => "===",
        BinaryOp::NotEq => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::LtEq => "<=",
        BinaryOp::GtEq => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::BitOr => "|",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::Is | BinaryOp::IsNot => unreachable!("is/is not emit identity tags"),
    }
}

/// Escape text for inclusion inside a JS backtick template literal.
fn escape_template(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => {
                out.push_str("\\${");
                chars.next();
            }
            c => out.push(c),
        }
    }
    out
}

/// Parse the raw text of a numeric literal (any radix) to an integer, for
/// enum auto-increment bookkeeping.
fn parse_numeric_raw(raw: &str) -> i64 {
    let lower = raw.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).unwrap_or(0)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).unwrap_or(0)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).unwrap_or(0)
    } else {
        lower
            .parse::<i64>()
            .or_else(|_| lower.parse::<f64>().map(|f| f as i64))
            .unwrap_or(0)
    }
}

fn is_valid_js_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Names returned from the module factory: every exposed binding and
/// function, in source order.
fn collect_exposed(statements: &[Statement]) -> Vec<String> {
    let mut exposed = Vec::new();
    for stmt in statements {
        match stmt {
            Statement::Dec(dec) if dec.exposed => {
                exposed.extend(dec.bound_names().iter().map(|n| n.to_string()));
            }
            Statement::Function(f) if f.exposed => exposed.push(f.name.clone()),
            _ => {}
        }
    }
    exposed
}

fn program_contains_shell(statements: &[Statement]) -> bool {
    statements_contain(statements, &mut |stmt| matches!(stmt, Statement::Shell(_)))
        || statements_contain_expr(statements, &mut |e| matches!(e, Expression::Shell(_)))
}

fn program_contains_tests(statements: &[Statement]) -> bool {
    statements_contain(statements, &mut |stmt| {
        matches!(stmt, Statement::Test(_) | Statement::Describe(_))
    })
}

fn block_contains_await(statements: &[Statement]) -> bool {
    statements_contain_expr(statements, &mut |e| matches!(e, Expression::Await { .. }))
}

/// Walk every statement (recursively) testing a predicate.
fn statements_contain(
    statements: &[Statement],
    pred: &mut dyn FnMut(&Statement) -> bool,
) -> bool {
    statements.iter().any(|stmt| {
        if pred(stmt) {
            return true;
        }
        match stmt {
            Statement::Function(f) => statements_contain(&f.body, pred),
            Statement::Block { body, .. } => statements_contain(body, pred),
            Statement::If(s) => {
                statements_contain(&s.consequent, pred)
                    || s.alternate
                        .as_ref()
                        .is_some_and(|a| statements_contain(std::slice::from_ref(a), pred))
            }
            Statement::While { body, .. } | Statement::ForIn { body, .. } => {
                statements_contain(body, pred)
            }
            Statement::Try(s) => {
                statements_contain(&s.block, pred)
                    || s.handler
                        .as_ref()
                        .is_some_and(|h| statements_contain(&h.body, pred))
                    || s.finalizer
                        .as_ref()
                        .is_some_and(|f| statements_contain(f, pred))
            }
            Statement::Match(s) => s.arms.iter().any(|a| statements_contain(&a.body, pred)),
            Statement::Test(t) => statements_contain(&t.body, pred),
            Statement::Describe(d) => statements_contain(&d.body, pred),
            _ => false,
        }
    })
}

/// Walk every expression reachable from the statements testing a predicate.
fn statements_contain_expr(
    statements: &[Statement],
    pred: &mut dyn FnMut(&Expression) -> bool,
) -> bool {
    fn expr_contains(expr: &Expression, pred: &mut dyn FnMut(&Expression) -> bool) -> bool {
        if pred(expr) {
            return true;
        }
        match expr {
            Expression::Template { expressions, .. } => {
                expressions.iter().any(|e| expr_contains(e, pred))
            }
            Expression::Member {
                object, property, ..
            } => {
                expr_contains(object, pred)
                    || matches!(property, Property::Computed(i) if expr_contains(i, pred))
            }
            Expression::Call { callee, args, .. } => {
                expr_contains(callee, pred) || args.iter().any(|a| expr_contains(a, pred))
            }
            Expression::Unary { operand, .. } => expr_contains(operand, pred),
            Expression::Binary { left, right, .. } => {
                expr_contains(left, pred) || expr_contains(right, pred)
            }
            Expression::Assign { target, value, .. } => {
                expr_contains(target, pred) || expr_contains(value, pred)
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                expr_contains(test, pred)
                    || expr_contains(consequent, pred)
                    || expr_contains(alternate, pred)
            }
            Expression::Arrow { body, .. } => match body {
                ArrowBody::Expr(e) => expr_contains(e, pred),
                ArrowBody::Block(stmts) => statements_contain_expr_inner(stmts, pred),
            },
            Expression::Array { elements, .. } => {
                elements.iter().any(|e| expr_contains(e, pred))
            }
            Expression::Object { properties, .. } => properties.iter().any(|p| match p {
                ObjectEntry::Property { value, .. } => expr_contains(value, pred),
                ObjectEntry::Spread { argument } => expr_contains(argument, pred),
            }),
            Expression::Spread { argument, .. } | Expression::Await { argument, .. } => {
                expr_contains(argument, pred)
            }
            Expression::Range { start, end, .. } => {
                expr_contains(start, pred) || expr_contains(end, pred)
            }
            Expression::Pipe { left, right, .. } => {
                expr_contains(left, pred) || expr_contains(right, pred)
            }
            _ => false,
        }
    }

    fn statements_contain_expr_inner(
        statements: &[Statement],
        pred: &mut dyn FnMut(&Expression) -> bool,
    ) -> bool {
        statements.iter().any(|stmt| match stmt {
            Statement::Dec(dec) => expr_contains(&dec.init, pred),
            Statement::Function(f) => statements_contain_expr_inner(&f.body, pred),
            Statement::Arg(a) => a.default.as_ref().is_some_and(|d| expr_contains(d, pred)),
            Statement::Env(e) => e.default.as_ref().is_some_and(|d| expr_contains(d, pred)),
            Statement::Dep(d) => d
                .overrides
                .as_ref()
                .is_some_and(|o| expr_contains(o, pred)),
            Statement::Block { body, .. } => statements_contain_expr_inner(body, pred),
            Statement::If(s) => {
                expr_contains(&s.test, pred)
                    || statements_contain_expr_inner(&s.consequent, pred)
                    || s.alternate.as_ref().is_some_and(|a| {
                        statements_contain_expr_inner(std::slice::from_ref(a), pred)
                    })
            }
            Statement::While { test, body, .. } => {
                expr_contains(test, pred) || statements_contain_expr_inner(body, pred)
            }
            Statement::ForIn {
                iterable, body, ..
            } => expr_contains(iterable, pred) || statements_contain_expr_inner(body, pred),
            Statement::Return { value, .. } => {
                value.as_ref().is_some_and(|v| expr_contains(v, pred))
            }
            Statement::Try(s) => {
                statements_contain_expr_inner(&s.block, pred)
                    || s.handler
                        .as_ref()
                        .is_some_and(|h| statements_contain_expr_inner(&h.body, pred))
                    || s.finalizer
                        .as_ref()
                        .is_some_and(|f| statements_contain_expr_inner(f, pred))
            }
            Statement::Throw { value, .. } => expr_contains(value, pred),
            Statement::Match(s) => s.arms.iter().any(|a| {
                expr_contains(&a.guard, pred) || statements_contain_expr_inner(&a.body, pred)
            }),
            Statement::Print { args, .. } => args.iter().any(|a| expr_contains(a, pred)),
            Statement::Expr(e) => expr_contains(e, pred),
            Statement::Test(t) => statements_contain_expr_inner(&t.body, pred),
            Statement::Describe(d) => statements_contain_expr_inner(&d.body, pred),
            Statement::Expect(e) => {
                expr_contains(&e.actual, pred)
                    || e.expected.as_ref().is_some_and(|x| expr_contains(x, pred))
            }
            Statement::Assert(a) => {
                expr_contains(&a.condition, pred)
                    || a.message.as_ref().is_some_and(|m| expr_contains(m, pred))
            }
            _ => false,
        })
    }

    statements_contain_expr_inner(statements, pred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn emit(source: &str) -> String {
        generate(&parse_source(source).unwrap())
    }

    #[test]
    fn test_dec_deep_freeze() {
        let js = emit("dec x = 0xFF");
        assert!(js.contains("const x = _deepFreeze(0xFF);"), "got:\n{}", js);
    }

    #[test]
    fn test_function_body_parens() {
        let js = emit("fn add(a, b) { return a + b }");
        assert!(js.contains("function add(a, b) {"), "got:\n{}", js);
        assert!(js.contains("return (a + b);"), "got:\n{}", js);
    }

    #[test]
    fn test_range_emission() {
        let js = emit("dec sum = 0..5");
        assert!(
            js.contains("Array.from({ length: 5 - 0 }, (_, i) => 0 + i)"),
            "got:\n{}",
            js
        );
    }

    #[test]
    fn test_pipe_emission() {
        let js = emit("dec r = 5 ~> double ~> addOne");
        assert!(js.contains("addOne(double(5))"), "got:\n{}", js);
    }

    #[test]
    fn test_flow_emission() {
        let js = emit("transform >> addOne double");
        assert!(
            js.contains("const transform = (..._args) => double(addOne(..._args));"),
            "got:\n{}",
            js
        );
    }

    #[test]
    fn test_enum_values() {
        let js = emit("enum C { A, B = 10, C }");
        assert!(
            js.contains("const C = Object.freeze({ A: 0, B: 10, C: 11 });"),
            "got:\n{}",
            js
        );
    }

    #[test]
    fn test_null_safe_member_chain() {
        let js = emit("dec obj = { foo: { bar: 1 } }\ndec v = obj.foo.bar");
        assert!(js.contains("obj?.foo?.bar"), "got:\n{}", js);
    }

    #[test]
    fn test_equality_strictness() {
        let js = emit("dec t = a == b\ndec u = a != b");
        assert!(js.contains("(a === b)"), "got:\n{}", js);
        assert!(js.contains("(a !== b)"), "got:\n{}", js);
    }

    #[test]
    fn test_is_identity_tags() {
        let js = emit("dec t = e is NotFound");
        assert!(js.contains("(e?._id === NotFound?._id)"), "got:\n{}", js);
        let js = emit("dec t = e is not NotFound");
        assert!(js.contains("(e?._id !== NotFound?._id)"), "got:\n{}", js);
    }

    #[test]
    fn test_secret_dec_wrapping() {
        let js = emit("secret dec k = \"s\"");
        assert!(
            js.contains("const k = _deepFreeze(_secret(\"s\"));"),
            "got:\n{}",
            js
        );
    }

    #[test]
    fn test_destructured_dec_freezes_source() {
        let js = emit("dec { a, b: x } = source");
        assert!(
            js.contains("const { a, b: x } = _deepFreeze(source);"),
            "got:\n{}",
            js
        );
        let js = emit("dec [p, , q] = xs");
        assert!(js.contains("const [p, , q] = _deepFreeze(xs);"), "got:\n{}", js);
    }

    #[test]
    fn test_memo_function() {
        let js = emit("memo fn fib(n) { return n }");
        assert!(js.contains("const fib = (() => {"), "got:\n{}", js);
        assert!(js.contains("JSON.stringify(arguments)"), "got:\n{}", js);
        assert!(js.contains("_fn.apply(this, arguments)"), "got:\n{}", js);
    }

    #[test]
    fn test_module_wrapper_and_exports() {
        let js = emit("expose dec greeting = \"hi\"\nexpose fn hello() { return greeting }");
        assert!(js.contains("export default function(_opts = {}) {"), "got:\n{}", js);
        assert!(js.contains("return { greeting, hello };"), "got:\n{}", js);
    }

    #[test]
    fn test_dep_import_and_resolution() {
        let js = emit("as db dep services.database({ url: \"x\" })");
        assert!(
            js.contains("import _dep_db from './services/database.km';"),
            "got:\n{}",
            js
        );
        assert!(
            js.contains("const db = _opts[\"services.database\"] || _dep_db({ url: \"x\" });"),
            "got:\n{}",
            js
        );
    }

    #[test]
    fn test_required_arg_check_and_extraction() {
        let js = emit("arg !port = 8080\nsecret arg token");
        assert!(
            js.contains("if (_opts[\"port\"] === undefined) {"),
            "got:\n{}",
            js
        );
        assert!(js.contains("Missing required arg: port"), "got:\n{}", js);
        assert!(
            js.contains(
                "const port = _opts[\"port\"] !== undefined ? _opts[\"port\"] : 8080;"
            ),
            "got:\n{}",
            js
        );
        assert!(js.contains("const token = _secret("), "got:\n{}", js);
    }

    #[test]
    fn test_env_extraction() {
        let js = emit("env !HOME\nenv PORT = 3000");
        assert!(
            js.contains("if (process.env[\"HOME\"] === undefined) {"),
            "got:\n{}",
            js
        );
        assert!(
            js.contains(
                "const PORT = process.env[\"PORT\"] !== undefined ? process.env[\"PORT\"] : 3000;"
            ),
            "got:\n{}",
            js
        );
    }

    #[test]
    fn test_match_in_function_returns() {
        let js = emit("fn classify(x) {\n|x > 10| => { print(\"big\") }\n|x > 5| => { print(\"mid\") }\n}");
        assert!(js.contains("if ((x > 10)) {"), "got:\n{}", js);
        assert!(js.contains("} else if ((x > 5)) {"), "got:\n{}", js);
        assert!(js.contains("return;"), "got:\n{}", js);
    }

    #[test]
    fn test_match_at_top_level_no_return() {
        let js = emit("|ready| => { go() }");
        assert!(js.contains("if (ready) {"), "got:\n{}", js);
        // Only the module wrapper's own returns exist; the arm adds none.
        assert!(!js.contains("go();\n    return;"), "got:\n{}", js);
    }

    #[test]
    fn test_js_block_statement() {
        let js = emit("js(a) { use(a); }");
        assert!(js.contains("((a) => {"), "got:\n{}", js);
        assert!(js.contains("})(a);"), "got:\n{}", js);
    }

    #[test]
    fn test_shell_block_emission() {
        let js = emit("dec r = shell(host) {\n  ping $host\n}");
        assert!(js.contains("const _shell = "), "got:\n{}", js);
        assert!(js.contains("_shell(`ping $host`, { host })"), "got:\n{}", js);
    }

    #[test]
    fn test_no_shell_helper_without_shell() {
        let js = emit("dec x = 1");
        assert!(!js.contains("const _shell = "), "got:\n{}", js);
    }

    #[test]
    fn test_testing_harness_calls() {
        let js = emit("test \"adds\" {\n  expect add(1, 2) toBe 3\n  assert 1 < 2, \"math\"\n}");
        assert!(js.contains("_test(\"adds\", () => {"), "got:\n{}", js);
        assert!(js.contains("_expect(add(1, 2)).toBe(3);"), "got:\n{}", js);
        assert!(js.contains("_assert((1 < 2), \"math\");"), "got:\n{}", js);
        assert!(js.contains("_runTests();"), "got:\n{}", js);
    }

    #[test]
    fn test_template_literal_emission() {
        let js = emit("dec msg = \"hi ${name}!\"");
        assert!(js.contains("`hi ${name}!`"), "got:\n{}", js);
    }

    #[test]
    fn test_if_chain() {
        let js = emit("if a { x() } elif b { y() } else { z() }");
        assert!(js.contains("if (a) {"), "got:\n{}", js);
        assert!(js.contains("} else if (b) {"), "got:\n{}", js);
        assert!(js.contains("} else {"), "got:\n{}", js);
    }

    #[test]
    fn test_for_in_and_while() {
        let js = emit("for x in 0..3 { print(x) }\nwhile cond { step() }");
        assert!(js.contains("for (const x of "), "got:\n{}", js);
        assert!(js.contains("while (cond) {"), "got:\n{}", js);
    }

    #[test]
    fn test_preamble_present_once() {
        let js = emit("dec x = 1");
        assert_eq!(js.matches("--- KimchiLang runtime ---").count(), 1);
    }

    #[test]
    fn test_no_optional_chain_on_assignment_target() {
        let js = emit("mutable.field = 1");
        assert!(js.contains("mutable.field = 1;"), "got:\n{}", js);
        assert!(!js.contains("mutable?.field = "), "got:\n{}", js);
    }
}

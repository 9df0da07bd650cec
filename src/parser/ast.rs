//! Abstract syntax tree for KimchiLang.
//!
//! Every family is a sealed sum type (`Statement`, `Expression`, `Pattern`)
//! so each pass can match exhaustively. Every node carries the source
//! position of its first token.

use serde::{Deserialize, Serialize};

use crate::location::Position;

/// A parsed program: an ordered sequence of top-level statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Top-level statements in source order.
    pub statements: Vec<Statement>,
}

/// A statement or declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Immutable binding: `dec x = ...` / `secret dec k = ...`.
    Dec(DecBinding),
    /// Function declaration, possibly `async` and/or `memo`.
    Function(FunctionDecl),
    /// Enum declaration.
    Enum(EnumDecl),
    /// Module argument declaration: `arg !name = default`.
    Arg(ArgDecl),
    /// Environment variable declaration: `env !NAME = default`.
    Env(EnvDecl),
    /// Dependency binding: `as alias dep dotted.path(overrides?)`.
    Dep(DepStmt),
    /// A standalone brace block.
    Block {
        /// Statements inside the block.
        body: Vec<Statement>,
        /// Source position.
        pos: Position,
    },
    /// `if` / `elif` / `else` chain (elif is rewritten as `else if`).
    If(IfStmt),
    /// `while` loop.
    While {
        /// Loop condition.
        test: Expression,
        /// Loop body.
        body: Vec<Statement>,
        /// Source position.
        pos: Position,
    },
    /// `for x in iterable` loop.
    ForIn {
        /// Loop binding name.
        binding: String,
        /// Iterated expression.
        iterable: Expression,
        /// Loop body.
        body: Vec<Statement>,
        /// Source position.
        pos: Position,
    },
    /// `return` with an optional value.
    Return {
        /// Returned expression, if any.
        value: Option<Expression>,
        /// Source position.
        pos: Position,
    },
    /// `break`.
    Break {
        /// Source position.
        pos: Position,
    },
    /// `continue`.
    Continue {
        /// Source position.
        pos: Position,
    },
    /// `try` / `catch` / `finally`.
    Try(TryStmt),
    /// `throw expr`.
    Throw {
        /// Thrown expression.
        value: Expression,
        /// Source position.
        pos: Position,
    },
    /// Pattern-match statement: ordered `|guard| => body` arms.
    Match(PatternMatchStmt),
    /// `print(...)`.
    Print {
        /// Printed expressions.
        args: Vec<Expression>,
        /// Source position.
        pos: Position,
    },
    /// Expression statement.
    Expr(Expression),
    /// Embedded JavaScript block in statement position.
    Js(JsBlock),
    /// Embedded shell block in statement position.
    Shell(ShellBlock),
    /// `test "name" { ... }`.
    Test(TestBlock),
    /// `describe "name" { ... }`.
    Describe(DescribeBlock),
    /// `expect actual matcher expected?`.
    Expect(ExpectStmt),
    /// `assert cond, message?`.
    Assert(AssertStmt),
}

/// An immutable binding introduced by `dec`.
///
/// Exactly one of `name` and `pattern` is set; the initializer is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecBinding {
    /// Scalar binding name, when not destructuring.
    pub name: Option<String>,
    /// Destructure pattern, when not a scalar binding.
    pub pattern: Option<Pattern>,
    /// Initializer expression.
    pub init: Expression,
    /// Whether the binding is exported from the module.
    pub exposed: bool,
    /// Whether the value is secret-wrapped.
    pub secret: bool,
    /// Source position.
    pub pos: Position,
}

impl DecBinding {
    /// Names introduced by this binding, in source order.
    pub fn bound_names(&self) -> Vec<&str> {
        match (&self.name, &self.pattern) {
            (Some(name), _) => vec![name.as_str()],
            (None, Some(pattern)) => pattern.bound_names(),
            (None, None) => Vec::new(),
        }
    }
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Function name.
    pub name: String,
    /// Parameter names.
    pub params: Vec<String>,
    /// Body statements.
    pub body: Vec<Statement>,
    /// Whether the function is `async`.
    pub is_async: bool,
    /// Whether calls are memoized.
    pub memoized: bool,
    /// Whether the function is exported from the module.
    pub exposed: bool,
    /// Source position.
    pub pos: Position,
}

/// An enum declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    /// Enum name.
    pub name: String,
    /// Ordered members.
    pub members: Vec<EnumMember>,
    /// Source position.
    pub pos: Position,
}

/// One member of an enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    /// Member name.
    pub name: String,
    /// Explicit numeric value (raw text, any radix). Resets the running
    /// auto-increment counter.
    pub value: Option<String>,
}

/// A module argument declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgDecl {
    /// Argument name.
    pub name: String,
    /// Whether the argument must be supplied by the caller.
    pub required: bool,
    /// Default value when not supplied.
    pub default: Option<Expression>,
    /// Whether the value is secret-wrapped.
    pub secret: bool,
    /// Source position.
    pub pos: Position,
}

/// An environment variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvDecl {
    /// Variable name.
    pub name: String,
    /// Whether the variable must be present in the environment.
    pub required: bool,
    /// Default value when absent.
    pub default: Option<Expression>,
    /// Whether the value is secret-wrapped.
    pub secret: bool,
    /// Source position.
    pub pos: Position,
}

/// A dependency binding: `as alias dep dotted.path(overrides?)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepStmt {
    /// Local alias for the imported module value.
    pub alias: String,
    /// Dotted module path.
    pub path: String,
    /// Path segments.
    pub segments: Vec<String>,
    /// Optional override object expression.
    pub overrides: Option<Expression>,
    /// Source position.
    pub pos: Position,
}

/// An `if` chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    /// Condition.
    pub test: Expression,
    /// Then-branch statements.
    pub consequent: Vec<Statement>,
    /// `else` branch: either a nested `If` or a `Block`.
    pub alternate: Option<Box<Statement>>,
    /// Source position.
    pub pos: Position,
}

/// A `try` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStmt {
    /// Protected statements.
    pub block: Vec<Statement>,
    /// Optional handler.
    pub handler: Option<CatchClause>,
    /// Optional finalizer statements.
    pub finalizer: Option<Vec<Statement>>,
    /// Source position.
    pub pos: Position,
}

/// The `catch` clause of a `try` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// Caught-error binding, if any.
    pub param: Option<String>,
    /// Handler statements.
    pub body: Vec<Statement>,
}

/// A pattern-match statement.
///
/// Arms are evaluated top-to-bottom; the first matching arm wins. Inside a
/// function body each arm implicitly returns after executing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatchStmt {
    /// Ordered guarded arms (at least one).
    pub arms: Vec<MatchArm>,
    /// Whether this is the regex-literal form.
    pub is_regex: bool,
    /// Source position.
    pub pos: Position,
}

/// One arm of a pattern-match statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    /// Guard condition.
    pub guard: Expression,
    /// Arm body.
    pub body: Vec<Statement>,
    /// Source position.
    pub pos: Position,
}

/// An embedded JavaScript block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsBlock {
    /// Explicitly listed input identifiers.
    pub inputs: Vec<String>,
    /// Reassembled raw JavaScript text.
    pub body: String,
    /// Whether the block is used as an expression.
    pub as_expression: bool,
    /// Source position.
    pub pos: Position,
}

/// An embedded shell block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellBlock {
    /// Explicitly listed input identifiers.
    pub inputs: Vec<String>,
    /// Raw command text (trimmed).
    pub command: String,
    /// Whether the block is used as an expression.
    pub as_expression: bool,
    /// Source position.
    pub pos: Position,
}

/// A `test "name" { ... }` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestBlock {
    /// Test name.
    pub name: String,
    /// Test body.
    pub body: Vec<Statement>,
    /// Source position.
    pub pos: Position,
}

/// A `describe "name" { ... }` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescribeBlock {
    /// Suite name.
    pub name: String,
    /// Suite body.
    pub body: Vec<Statement>,
    /// Source position.
    pub pos: Position,
}

/// An `expect` statement: `expect actual matcher expected?`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectStmt {
    /// Actual value.
    pub actual: Expression,
    /// Matcher name (e.g. `toBe`).
    pub matcher: String,
    /// Expected value, for matchers that take one.
    pub expected: Option<Expression>,
    /// Source position.
    pub pos: Position,
}

/// An `assert` statement: `assert cond, message?`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertStmt {
    /// Asserted condition.
    pub condition: Expression,
    /// Optional failure message.
    pub message: Option<Expression>,
    /// Source position.
    pub pos: Position,
}

/// A destructure pattern used inside `dec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Object pattern: `{ a, b: x }`.
    Object {
        /// Destructured properties.
        props: Vec<ObjectPatternProp>,
        /// Source position.
        pos: Position,
    },
    /// Array pattern: `[a, , b]`. Holes are `None`.
    Array {
        /// Destructured elements; holes are explicit `None`s.
        elements: Vec<Option<String>>,
        /// Source position.
        pos: Position,
    },
}

impl Pattern {
    /// Names bound by this pattern, in source order.
    pub fn bound_names(&self) -> Vec<&str> {
        match self {
            Pattern::Object { props, .. } => {
                props.iter().map(|p| p.binding.as_str()).collect()
            }
            Pattern::Array { elements, .. } => elements
                .iter()
                .filter_map(|e| e.as_deref())
                .collect(),
        }
    }
}

/// One property of an object destructure pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatternProp {
    /// Property key on the source object.
    pub key: String,
    /// Name the value is bound to (equals `key` unless renamed with `:`).
    pub binding: String,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    /// Numeric literal; the raw text preserves the radix.
    Number {
        /// Raw source text.
        raw: String,
    },
    /// String literal.
    Str(String),
    /// Backtick literal, emitted verbatim.
    RawTemplate(String),
    /// Boolean literal.
    Bool(bool),
    /// `null`.
    Null,
}

/// Member access property: a fixed name or a computed expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    /// `obj.name`
    Name(String),
    /// `obj[expr]`
    Computed(Box<Expression>),
}

/// One entry of an object literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectEntry {
    /// `key: value` (or shorthand `key`).
    Property {
        /// Property key.
        key: String,
        /// Property value.
        value: Expression,
        /// Whether the entry was written in shorthand form.
        shorthand: bool,
    },
    /// `...expr` spread.
    Spread {
        /// Spread argument.
        argument: Expression,
    },
}

/// An arrow function body: a bare expression or a brace block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrowBody {
    /// Expression body.
    Expr(Box<Expression>),
    /// Block body.
    Block(Vec<Statement>),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical negation (`!` or `not`).
    Not,
    /// Arithmetic negation.
    Neg,
    /// Bitwise not (`~`).
    BitNot,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `==` (emitted as `===`)
    Eq,
    /// `!=` (emitted as `!==`)
    NotEq,
    /// `is` — identity-tag comparison.
    Is,
    /// `is not` — negated identity-tag comparison.
    IsNot,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `&&` / `and`
    And,
    /// `||` / `or`
    Or,
    /// `|`
    BitOr,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `*=`
    Mul,
    /// `/=`
    Div,
}

impl AssignOp {
    /// JavaScript spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A literal value.
    Literal {
        /// The literal payload.
        value: LiteralValue,
        /// Source position.
        pos: Position,
    },
    /// A template literal: `|parts| == |expressions| + 1`.
    Template {
        /// Text parts between interpolations.
        parts: Vec<String>,
        /// Parsed interpolation expressions.
        expressions: Vec<Expression>,
        /// Source position.
        pos: Position,
    },
    /// An identifier reference.
    Identifier {
        /// The name.
        name: String,
        /// Source position.
        pos: Position,
    },
    /// Member access, plain or computed.
    Member {
        /// Object expression.
        object: Box<Expression>,
        /// Property name or computed index.
        property: Property,
        /// Source position.
        pos: Position,
    },
    /// A call.
    Call {
        /// Callee expression.
        callee: Box<Expression>,
        /// Call arguments.
        args: Vec<Expression>,
        /// Source position.
        pos: Position,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expression>,
        /// Source position.
        pos: Position,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
        /// Source position.
        pos: Position,
    },
    /// An assignment (possibly compound).
    Assign {
        /// The operator.
        op: AssignOp,
        /// Assignment target.
        target: Box<Expression>,
        /// Assigned value.
        value: Box<Expression>,
        /// Source position.
        pos: Position,
    },
    /// A ternary conditional.
    Conditional {
        /// Condition.
        test: Box<Expression>,
        /// Value when true.
        consequent: Box<Expression>,
        /// Value when false.
        alternate: Box<Expression>,
        /// Source position.
        pos: Position,
    },
    /// An arrow function.
    Arrow {
        /// Parameter names.
        params: Vec<String>,
        /// Body (expression or block).
        body: ArrowBody,
        /// Whether the function is `async`.
        is_async: bool,
        /// Source position.
        pos: Position,
    },
    /// An array literal.
    Array {
        /// Elements.
        elements: Vec<Expression>,
        /// Source position.
        pos: Position,
    },
    /// An object literal.
    Object {
        /// Entries (properties and spreads).
        properties: Vec<ObjectEntry>,
        /// Source position.
        pos: Position,
    },
    /// A spread: `...expr`.
    Spread {
        /// Spread argument.
        argument: Box<Expression>,
        /// Source position.
        pos: Position,
    },
    /// An `await` expression.
    Await {
        /// Awaited expression.
        argument: Box<Expression>,
        /// Source position.
        pos: Position,
    },
    /// A half-open integer range `start..end`.
    Range {
        /// Inclusive start.
        start: Box<Expression>,
        /// Exclusive end.
        end: Box<Expression>,
        /// Source position.
        pos: Position,
    },
    /// A flow composition: `name >> f1 f2 ...`.
    Flow {
        /// Bound name.
        name: String,
        /// Composed function names (at least one).
        functions: Vec<String>,
        /// Source position.
        pos: Position,
    },
    /// A pipe: `left ~> right`.
    Pipe {
        /// Piped value.
        left: Box<Expression>,
        /// Applied function.
        right: Box<Expression>,
        /// Source position.
        pos: Position,
    },
    /// A regex literal.
    Regex {
        /// Pattern text.
        pattern: String,
        /// Flags.
        flags: String,
        /// Source position.
        pos: Position,
    },
    /// An embedded JavaScript block used as a value.
    Js(JsBlock),
    /// An embedded shell block used as a value.
    Shell(ShellBlock),
}

impl Expression {
    /// The source position of this expression.
    pub fn pos(&self) -> Position {
        match self {
            Expression::Literal { pos, .. }
            | Expression::Template { pos, .. }
            | Expression::Identifier { pos, .. }
            | Expression::Member { pos, .. }
            | Expression::Call { pos, .. }
            | Expression::Unary { pos, .. }
            | Expression::Binary { pos, .. }
            | Expression::Assign { pos, .. }
            | Expression::Conditional { pos, .. }
            | Expression::Arrow { pos, .. }
            | Expression::Array { pos, .. }
            | Expression::Object { pos, .. }
            | Expression::Spread { pos, .. }
            | Expression::Await { pos, .. }
            | Expression::Range { pos, .. }
            | Expression::Flow { pos, .. }
            | Expression::Pipe { pos, .. }
            | Expression::Regex { pos, .. } => *pos,
            Expression::Js(block) => block.pos,
            Expression::Shell(block) => block.pos,
        }
    }

    /// The root identifier of an access chain, if this expression is an
    /// identifier or a member chain rooted at one.
    pub fn root_identifier(&self) -> Option<&str> {
        match self {
            Expression::Identifier { name, .. } => Some(name),
            Expression::Member { object, .. } => object.root_identifier(),
            _ => None,
        }
    }

    /// Render an access chain as a dotted/bracketed path for diagnostics,
    /// e.g. `obj.foo.bar` or `xs[0].name`.
    pub fn access_path(&self) -> String {
        match self {
            Expression::Identifier { name, .. } => name.clone(),
            Expression::Member {
                object, property, ..
            } => {
                let base = object.access_path();
                match property {
                    Property::Name(name) => format!("{}.{}", base, name),
                    Property::Computed(index) => match index.as_ref() {
                        Expression::Literal {
                            value: LiteralValue::Number { raw },
                            ..
                        } => format!("{}[{}]", base, raw),
                        Expression::Literal {
                            value: LiteralValue::Str(s),
                            ..
                        } => format!("{}[\"{}\"]", base, s),
                        Expression::Identifier { name, .. } => format!("{}[{}]", base, name),
                        _ => format!("{}[...]", base),
                    },
                }
            }
            _ => String::from("<expr>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expression {
        Expression::Identifier {
            name: name.to_string(),
            pos: Position::default(),
        }
    }

    #[test]
    fn test_root_identifier() {
        let chain = Expression::Member {
            object: Box::new(Expression::Member {
                object: Box::new(ident("obj")),
                property: Property::Name("foo".to_string()),
                pos: Position::default(),
            }),
            property: Property::Name("bar".to_string()),
            pos: Position::default(),
        };
        assert_eq!(chain.root_identifier(), Some("obj"));
        assert_eq!(chain.access_path(), "obj.foo.bar");
    }

    #[test]
    fn test_access_path_computed() {
        let chain = Expression::Member {
            object: Box::new(ident("xs")),
            property: Property::Computed(Box::new(Expression::Literal {
                value: LiteralValue::Number {
                    raw: "0".to_string(),
                },
                pos: Position::default(),
            })),
            pos: Position::default(),
        };
        assert_eq!(chain.access_path(), "xs[0]");
    }

    #[test]
    fn test_pattern_bound_names() {
        let pattern = Pattern::Object {
            props: vec![
                ObjectPatternProp {
                    key: "a".to_string(),
                    binding: "a".to_string(),
                },
                ObjectPatternProp {
                    key: "b".to_string(),
                    binding: "x".to_string(),
                },
            ],
            pos: Position::default(),
        };
        assert_eq!(pattern.bound_names(), vec!["a", "x"]);

        let array = Pattern::Array {
            elements: vec![Some("a".to_string()), None, Some("b".to_string())],
            pos: Position::default(),
        };
        assert_eq!(array.bound_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_dec_bound_names() {
        let dec = DecBinding {
            name: Some("x".to_string()),
            pattern: None,
            init: ident("y"),
            exposed: false,
            secret: false,
            pos: Position::default(),
        };
        assert_eq!(dec.bound_names(), vec!["x"]);
    }
}

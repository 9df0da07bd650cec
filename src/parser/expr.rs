//! Expression parsing for KimchiLang.
//!
//! Precedence climbing, one function per level. Top to bottom:
//! assignment → ternary → flow → pipe → logical-or → logical-and →
//! bitwise-or → equality → relational → shift → range → additive →
//! multiplicative → power → unary → call/member → primary.
//!
//! Two tokens need context to interpret:
//!
//! - `|` is bitwise-or unless a second `|` followed (after newlines) by `=>`
//!   lies ahead in the statement, in which case it opens a pattern guard and
//!   is never consumed here;
//! - `>>` builds a flow composition when its left operand is a bare
//!   identifier and an identifier follows, and a shift otherwise.

use crate::diagnostics::Diagnostic;
use crate::location::Position;

use super::ast::*;
use super::state::Parser;
use super::stmt;
use super::token::{TokenKind, INTERP_CLOSE, INTERP_OPEN};

/// Parse a full expression (assignment level).
pub fn parse_expression(p: &mut Parser) -> Result<Expression, Diagnostic> {
    parse_assignment(p)
}

/// Parse a pattern-guard condition.
///
/// The guard grammar is the ordinary expression grammar with the bitwise-or
/// level disabled, so the closing `|` of the guard is never swallowed.
pub fn parse_guard(p: &mut Parser) -> Result<Expression, Diagnostic> {
    p.guard_depth += 1;
    let result = parse_ternary(p);
    p.guard_depth -= 1;
    result
}

fn parse_assignment(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let left = parse_ternary(p)?;

    let op = match p.kind() {
        TokenKind::Eq => AssignOp::Assign,
        TokenKind::PlusEq => AssignOp::Add,
        TokenKind::MinusEq => AssignOp::Sub,
        TokenKind::StarEq => AssignOp::Mul,
        TokenKind::SlashEq => AssignOp::Div,
        _ => return Ok(left),
    };

    if !matches!(
        left,
        Expression::Identifier { .. } | Expression::Member { .. }
    ) {
        return Err(p.error("Invalid assignment target"));
    }

    // Deep immutability: a `dec`-bound root may never be assigned through,
    // no matter how deep the access chain goes.
    if let Some(root) = left.root_identifier() {
        if p.is_immutable(root) {
            return Err(p.error_at(
                left.pos(),
                format!(
                    "Cannot reassign '{}': '{}' is a dec binding",
                    left.access_path(),
                    root
                ),
            ));
        }
    }

    let pos = left.pos();
    p.bump();
    p.skip_newlines();
    let value = parse_assignment(p)?;
    Ok(Expression::Assign {
        op,
        target: Box::new(left),
        value: Box::new(value),
        pos,
    })
}

fn parse_ternary(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let test = parse_flow(p)?;
    if !p.eat(&TokenKind::Question) {
        return Ok(test);
    }
    p.skip_newlines();
    let consequent = parse_ternary(p)?;
    p.skip_newlines();
    p.expect(TokenKind::Colon)?;
    p.skip_newlines();
    let alternate = parse_ternary(p)?;
    let pos = test.pos();
    Ok(Expression::Conditional {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
        pos,
    })
}

fn parse_flow(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let left = parse_pipe(p)?;

    if let Expression::Identifier { name, pos } = &left {
        if matches!(p.kind(), TokenKind::GtGt)
            && matches!(p.peek_kind(1), TokenKind::Ident(_))
        {
            let name = name.clone();
            let pos = *pos;
            p.bump();
            let mut functions = Vec::new();
            while let TokenKind::Ident(f) = p.kind().clone() {
                p.bump();
                functions.push(f);
            }
            return Ok(Expression::Flow {
                name,
                functions,
                pos,
            });
        }
    }

    Ok(left)
}

fn parse_pipe(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut left = parse_logical_or(p)?;
    while p.eat(&TokenKind::PipeArrow) {
        p.skip_newlines();
        let right = parse_logical_or(p)?;
        let pos = left.pos();
        left = Expression::Pipe {
            left: Box::new(left),
            right: Box::new(right),
            pos,
        };
    }
    Ok(left)
}

fn parse_logical_or(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut left = parse_logical_and(p)?;
    while matches!(p.kind(), TokenKind::OrOr | TokenKind::Or) {
        p.bump();
        p.skip_newlines();
        let right = parse_logical_and(p)?;
        let pos = left.pos();
        left = Expression::Binary {
            op: BinaryOp::Or,
            left: Box::new(left),
            right: Box::new(right),
            pos,
        };
    }
    Ok(left)
}

fn parse_logical_and(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut left = parse_bitwise_or(p)?;
    while matches!(p.kind(), TokenKind::AndAnd | TokenKind::And) {
        p.bump();
        p.skip_newlines();
        let right = parse_bitwise_or(p)?;
        let pos = left.pos();
        left = Expression::Binary {
            op: BinaryOp::And,
            left: Box::new(left),
            right: Box::new(right),
            pos,
        };
    }
    Ok(left)
}

fn parse_bitwise_or(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut left = parse_equality(p)?;
    while matches!(p.kind(), TokenKind::Bar) {
        // Inside a guard the closing `|` belongs to the match arm; at any
        // other position a guard-opening `|` belongs to the next statement.
        if p.guard_depth > 0 || p.guard_ahead() {
            break;
        }
        p.bump();
        p.skip_newlines();
        let right = parse_equality(p)?;
        let pos = left.pos();
        left = Expression::Binary {
            op: BinaryOp::BitOr,
            left: Box::new(left),
            right: Box::new(right),
            pos,
        };
    }
    Ok(left)
}

fn parse_equality(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut left = parse_relational(p)?;
    loop {
        let op = if matches!(p.kind(), TokenKind::EqEq) {
            p.bump();
            BinaryOp::Eq
        } else if matches!(p.kind(), TokenKind::BangEq) {
            p.bump();
            BinaryOp::NotEq
        } else if matches!(p.kind(), TokenKind::Is) {
            p.bump();
            if p.eat(&TokenKind::Not) {
                BinaryOp::IsNot
            } else {
                BinaryOp::Is
            }
        } else {
            break;
        };
        p.skip_newlines();
        let right = parse_relational(p)?;
        let pos = left.pos();
        left = Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            pos,
        };
    }
    Ok(left)
}

fn parse_relational(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut left = parse_shift(p)?;
    loop {
        let op = match p.kind() {
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::GtEq => BinaryOp::GtEq,
            _ => break,
        };
        p.bump();
        p.skip_newlines();
        let right = parse_shift(p)?;
        let pos = left.pos();
        left = Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            pos,
        };
    }
    Ok(left)
}

fn parse_shift(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut left = parse_range(p)?;
    loop {
        let op = match p.kind() {
            TokenKind::LtLt => BinaryOp::Shl,
            TokenKind::GtGt => {
                // A bare identifier followed by `>> ident` is a flow
                // composition, handled above the pipe level.
                if matches!(left, Expression::Identifier { .. })
                    && matches!(p.peek_kind(1), TokenKind::Ident(_))
                {
                    break;
                }
                BinaryOp::Shr
            }
            _ => break,
        };
        p.bump();
        p.skip_newlines();
        let right = parse_range(p)?;
        let pos = left.pos();
        left = Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            pos,
        };
    }
    Ok(left)
}

fn parse_range(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let left = parse_additive(p)?;
    if !p.eat(&TokenKind::DotDot) {
        return Ok(left);
    }
    let end = parse_additive(p)?;
    let pos = left.pos();
    Ok(Expression::Range {
        start: Box::new(left),
        end: Box::new(end),
        pos,
    })
}

fn parse_additive(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut left = parse_multiplicative(p)?;
    loop {
        let op = match p.kind() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            _ => break,
        };
        p.bump();
        p.skip_newlines();
        let right = parse_multiplicative(p)?;
        let pos = left.pos();
        left = Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            pos,
        };
    }
    Ok(left)
}

fn parse_multiplicative(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut left = parse_power(p)?;
    loop {
        let op = match p.kind() {
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            _ => break,
        };
        p.bump();
        p.skip_newlines();
        let right = parse_power(p)?;
        let pos = left.pos();
        left = Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            pos,
        };
    }
    Ok(left)
}

fn parse_power(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let left = parse_unary(p)?;
    if !p.eat(&TokenKind::Power) {
        return Ok(left);
    }
    p.skip_newlines();
    // Right-associative.
    let right = parse_power(p)?;
    let pos = left.pos();
    Ok(Expression::Binary {
        op: BinaryOp::Pow,
        left: Box::new(left),
        right: Box::new(right),
        pos,
    })
}

fn parse_unary(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let pos = p.pos();

    if matches!(p.kind(), TokenKind::Await) {
        p.bump();
        let argument = parse_unary(p)?;
        return Ok(Expression::Await {
            argument: Box::new(argument),
            pos,
        });
    }
    if matches!(p.kind(), TokenKind::DotDotDot) {
        p.bump();
        let argument = parse_unary(p)?;
        return Ok(Expression::Spread {
            argument: Box::new(argument),
            pos,
        });
    }

    let op = match p.kind() {
        TokenKind::Bang | TokenKind::Not => Some(UnaryOp::Not),
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Tilde => Some(UnaryOp::BitNot),
        _ => None,
    };

    if let Some(op) = op {
        p.bump();
        let operand = parse_unary(p)?;
        return Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
            pos,
        });
    }

    parse_postfix(p)
}

fn parse_postfix(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let mut expr = parse_primary(p)?;
    loop {
        match p.kind() {
            TokenKind::Lparen => {
                let pos = expr.pos();
                p.bump();
                let args = parse_call_args(p)?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    args,
                    pos,
                };
            }
            TokenKind::Dot => {
                let pos = expr.pos();
                p.bump();
                let name = parse_property_name(p)?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    property: Property::Name(name),
                    pos,
                };
            }
            TokenKind::Lbracket => {
                let pos = expr.pos();
                p.bump();
                p.skip_newlines();
                let index = parse_expression(p)?;
                p.skip_newlines();
                p.expect(TokenKind::Rbracket)?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    property: Property::Computed(Box::new(index)),
                    pos,
                };
            }
            _ => break,
        }
    }
    Ok(expr)
}

/// Parse a property name after `.`. Keywords are permitted here so that
/// member names like `.test` or `.is` stay usable.
fn parse_property_name(p: &mut Parser) -> Result<String, Diagnostic> {
    match p.kind().clone() {
        TokenKind::Ident(name) => {
            p.bump();
            Ok(name)
        }
        other if other.is_keyword() => {
            p.bump();
            Ok(other.to_string())
        }
        other => Err(p.error(format!("Expected a property name, found `{}`", other))),
    }
}

fn parse_call_args(p: &mut Parser) -> Result<Vec<Expression>, Diagnostic> {
    let mut args = Vec::new();
    p.skip_newlines();
    while !matches!(p.kind(), TokenKind::Rparen) {
        args.push(parse_expression(p)?);
        p.skip_newlines();
        if !p.eat(&TokenKind::Comma) {
            break;
        }
        p.skip_newlines();
    }
    p.expect(TokenKind::Rparen)?;
    Ok(args)
}

fn parse_primary(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let pos = p.pos();
    match p.kind().clone() {
        TokenKind::Number { raw } => {
            p.bump();
            Ok(Expression::Literal {
                value: LiteralValue::Number { raw },
                pos,
            })
        }
        TokenKind::Str(s) => {
            p.bump();
            Ok(Expression::Literal {
                value: LiteralValue::Str(s),
                pos,
            })
        }
        TokenKind::TemplateStr(value) => {
            p.bump();
            parse_template(&value, pos)
        }
        TokenKind::BacktickStr(raw) => {
            p.bump();
            Ok(Expression::Literal {
                value: LiteralValue::RawTemplate(raw),
                pos,
            })
        }
        TokenKind::Regex { pattern, flags } => {
            p.bump();
            Ok(Expression::Regex {
                pattern,
                flags,
                pos,
            })
        }
        TokenKind::True => {
            p.bump();
            Ok(Expression::Literal {
                value: LiteralValue::Bool(true),
                pos,
            })
        }
        TokenKind::False => {
            p.bump();
            Ok(Expression::Literal {
                value: LiteralValue::Bool(false),
                pos,
            })
        }
        TokenKind::Null => {
            p.bump();
            Ok(Expression::Literal {
                value: LiteralValue::Null,
                pos,
            })
        }
        TokenKind::Ident(name) => {
            if matches!(p.peek_kind(1), TokenKind::FatArrow) {
                return parse_arrow_from_single_param(p, false);
            }
            p.bump();
            Ok(Expression::Identifier { name, pos })
        }
        TokenKind::Async => {
            p.bump();
            match p.kind() {
                TokenKind::Lparen if p.arrow_params_ahead() => parse_arrow(p, true),
                TokenKind::Ident(_) if matches!(p.peek_kind(1), TokenKind::FatArrow) => {
                    parse_arrow_from_single_param(p, true)
                }
                _ => Err(p.error("Expected an arrow function after `async`")),
            }
        }
        TokenKind::Lparen => {
            if p.arrow_params_ahead() {
                return parse_arrow(p, false);
            }
            p.bump();
            p.skip_newlines();
            let inner = parse_expression(p)?;
            p.skip_newlines();
            p.expect(TokenKind::Rparen)?;
            Ok(inner)
        }
        TokenKind::Lbracket => parse_array_literal(p),
        TokenKind::Lbrace => parse_object_literal(p),
        TokenKind::Js => Ok(Expression::Js(stmt::parse_js_block(p, true)?)),
        TokenKind::Shell => Ok(Expression::Shell(stmt::parse_shell_block(p, true)?)),
        other => Err(p.error(format!("Unexpected token `{}`", other))),
    }
}

fn parse_arrow_from_single_param(
    p: &mut Parser,
    is_async: bool,
) -> Result<Expression, Diagnostic> {
    let pos = p.pos();
    let param = p.expect_ident()?;
    p.expect(TokenKind::FatArrow)?;
    parse_arrow_body(p, vec![param], is_async, pos)
}

fn parse_arrow(p: &mut Parser, is_async: bool) -> Result<Expression, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Lparen)?;
    let mut params = Vec::new();
    p.skip_newlines();
    while !matches!(p.kind(), TokenKind::Rparen) {
        params.push(p.expect_ident()?);
        p.skip_newlines();
        if !p.eat(&TokenKind::Comma) {
            break;
        }
        p.skip_newlines();
    }
    p.expect(TokenKind::Rparen)?;
    p.expect(TokenKind::FatArrow)?;
    parse_arrow_body(p, params, is_async, pos)
}

fn parse_arrow_body(
    p: &mut Parser,
    params: Vec<String>,
    is_async: bool,
    pos: Position,
) -> Result<Expression, Diagnostic> {
    p.skip_newlines();
    let body = if matches!(p.kind(), TokenKind::Lbrace) {
        p.push_scope();
        let block = stmt::parse_brace_block(p);
        p.pop_scope();
        ArrowBody::Block(block?)
    } else {
        ArrowBody::Expr(Box::new(parse_expression(p)?))
    };
    Ok(Expression::Arrow {
        params,
        body,
        is_async,
        pos,
    })
}

fn parse_array_literal(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Lbracket)?;
    let mut elements = Vec::new();
    p.skip_newlines();
    while !matches!(p.kind(), TokenKind::Rbracket) {
        elements.push(parse_expression(p)?);
        p.skip_newlines();
        if !p.eat(&TokenKind::Comma) {
            break;
        }
        p.skip_newlines();
    }
    p.expect(TokenKind::Rbracket)?;
    Ok(Expression::Array { elements, pos })
}

fn parse_object_literal(p: &mut Parser) -> Result<Expression, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Lbrace)?;
    let mut properties = Vec::new();
    p.skip_newlines();
    while !matches!(p.kind(), TokenKind::Rbrace) {
        if p.eat(&TokenKind::DotDotDot) {
            let argument = parse_expression(p)?;
            properties.push(ObjectEntry::Spread { argument });
        } else {
            let key = match p.kind().clone() {
                TokenKind::Ident(name) => {
                    p.bump();
                    name
                }
                TokenKind::Str(s) => {
                    p.bump();
                    s
                }
                other if other.is_keyword() => {
                    p.bump();
                    other.to_string()
                }
                other => {
                    return Err(p.error(format!(
                        "Expected a property key, found `{}`",
                        other
                    )));
                }
            };
            if p.eat(&TokenKind::Colon) {
                p.skip_newlines();
                let value = parse_expression(p)?;
                properties.push(ObjectEntry::Property {
                    key,
                    value,
                    shorthand: false,
                });
            } else {
                let value = Expression::Identifier {
                    name: key.clone(),
                    pos: p.pos(),
                };
                properties.push(ObjectEntry::Property {
                    key,
                    value,
                    shorthand: true,
                });
            }
        }
        p.skip_newlines();
        if !p.eat(&TokenKind::Comma) {
            break;
        }
        p.skip_newlines();
    }
    p.expect(TokenKind::Rbrace)?;
    Ok(Expression::Object { properties, pos })
}

/// Parse a template-string token value into a `Template` expression.
///
/// Each interpolation span between the sentinel marks is re-scanned and
/// re-parsed through a fresh scanner and parser instance, yielding an inner
/// expression AST embedded as a child.
fn parse_template(value: &str, pos: Position) -> Result<Expression, Diagnostic> {
    let mut parts = vec![String::new()];
    let mut expressions = Vec::new();
    let mut expr_text: Option<String> = None;

    for ch in value.chars() {
        match ch {
            INTERP_OPEN => expr_text = Some(String::new()),
            INTERP_CLOSE => {
                let text = expr_text.take().unwrap_or_default();
                expressions.push(parse_embedded_expression(&text, pos)?);
                parts.push(String::new());
            }
            c => match expr_text.as_mut() {
                Some(buf) => buf.push(c),
                None => {
                    if let Some(part) = parts.last_mut() {
                        part.push(c);
                    }
                }
            },
        }
    }

    Ok(Expression::Template {
        parts,
        expressions,
        pos,
    })
}

/// Re-scan and re-parse one embedded interpolation expression.
fn parse_embedded_expression(text: &str, pos: Position) -> Result<Expression, Diagnostic> {
    let tokens = super::scanner::tokenize(text)
        .map_err(|e| Diagnostic::parse(pos, format!("In interpolation: {}", e.message)))?;
    let mut sub = Parser::new(tokens);
    sub.skip_newlines();
    let expr = parse_expression(&mut sub)
        .map_err(|e| Diagnostic::parse(pos, format!("In interpolation: {}", e.message)))?;
    sub.skip_newlines();
    if !sub.at_eof() {
        return Err(Diagnostic::parse(
            pos,
            format!("Unexpected `{}` in interpolation", sub.kind()),
        ));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::scanner::tokenize;

    fn parse_one(source: &str) -> Expression {
        let mut p = Parser::new(tokenize(source).unwrap());
        parse_expression(&mut p).unwrap()
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let e = parse_one("1 + 2 * 3");
        match e {
            Expression::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expression::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            )),
            other => panic!("expected Add at root, got {:?}", other),
        }
    }

    #[test]
    fn test_power_right_assoc() {
        let e = parse_one("2 ** 3 ** 4");
        match e {
            Expression::Binary {
                op: BinaryOp::Pow,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expression::Binary {
                    op: BinaryOp::Pow,
                    ..
                }
            )),
            other => panic!("expected Pow at root, got {:?}", other),
        }
    }

    #[test]
    fn test_pipe_left_assoc() {
        let e = parse_one("5 ~> double ~> addOne");
        match e {
            Expression::Pipe { left, right, .. } => {
                assert!(matches!(*left, Expression::Pipe { .. }));
                assert!(matches!(
                    *right,
                    Expression::Identifier { ref name, .. } if name == "addOne"
                ));
            }
            other => panic!("expected Pipe at root, got {:?}", other),
        }
    }

    #[test]
    fn test_flow_vs_shift() {
        let e = parse_one("transform >> addOne double");
        match e {
            Expression::Flow {
                name, functions, ..
            } => {
                assert_eq!(name, "transform");
                assert_eq!(functions, vec!["addOne", "double"]);
            }
            other => panic!("expected Flow, got {:?}", other),
        }

        let e = parse_one("x >> 2");
        assert!(matches!(
            e,
            Expression::Binary {
                op: BinaryOp::Shr,
                ..
            }
        ));
    }

    #[test]
    fn test_bitwise_or_plain() {
        let e = parse_one("a | b");
        assert!(matches!(
            e,
            Expression::Binary {
                op: BinaryOp::BitOr,
                ..
            }
        ));
    }

    #[test]
    fn test_is_and_is_not() {
        let e = parse_one("e is NotFound");
        assert!(matches!(
            e,
            Expression::Binary {
                op: BinaryOp::Is,
                ..
            }
        ));
        let e = parse_one("e is not NotFound");
        assert!(matches!(
            e,
            Expression::Binary {
                op: BinaryOp::IsNot,
                ..
            }
        ));
    }

    #[test]
    fn test_range() {
        let e = parse_one("0..5");
        assert!(matches!(e, Expression::Range { .. }));
    }

    #[test]
    fn test_member_and_call() {
        let e = parse_one("a.b[0](x, y)");
        match e {
            Expression::Call { callee, args, .. } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(*callee, Expression::Member { .. }));
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_keyword_property_name() {
        let e = parse_one("suite.test");
        match e {
            Expression::Member { property, .. } => {
                assert_eq!(property, Property::Name("test".to_string()));
            }
            other => panic!("expected Member, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_functions() {
        let e = parse_one("(a, b) => a + b");
        match e {
            Expression::Arrow { params, body, .. } => {
                assert_eq!(params, vec!["a", "b"]);
                assert!(matches!(body, ArrowBody::Expr(_)));
            }
            other => panic!("expected Arrow, got {:?}", other),
        }

        let e = parse_one("x => x * 2");
        assert!(matches!(e, Expression::Arrow { ref params, .. } if params == &["x"]));

        let e = parse_one("async (u) => fetch(u)");
        assert!(matches!(e, Expression::Arrow { is_async: true, .. }));
    }

    #[test]
    fn test_template_literal() {
        let e = parse_one("\"sum is ${a + b}!\"");
        match e {
            Expression::Template {
                parts, expressions, ..
            } => {
                assert_eq!(parts, vec!["sum is ".to_string(), "!".to_string()]);
                assert_eq!(expressions.len(), 1);
                assert!(matches!(
                    expressions[0],
                    Expression::Binary {
                        op: BinaryOp::Add,
                        ..
                    }
                ));
            }
            other => panic!("expected Template, got {:?}", other),
        }
    }

    #[test]
    fn test_template_part_count_invariant() {
        let e = parse_one("\"${a}${b}\"");
        match e {
            Expression::Template {
                parts, expressions, ..
            } => {
                assert_eq!(parts.len(), expressions.len() + 1);
            }
            other => panic!("expected Template, got {:?}", other),
        }
    }

    #[test]
    fn test_ternary() {
        let e = parse_one("a ? b : c");
        assert!(matches!(e, Expression::Conditional { .. }));
    }

    #[test]
    fn test_spread_and_await() {
        let e = parse_one("...xs");
        assert!(matches!(e, Expression::Spread { .. }));
        let e = parse_one("await task");
        assert!(matches!(e, Expression::Await { .. }));
    }

    #[test]
    fn test_object_literal() {
        let e = parse_one("{ a: 1, b, ...rest }");
        match e {
            Expression::Object { properties, .. } => {
                assert_eq!(properties.len(), 3);
                assert!(matches!(
                    properties[1],
                    ObjectEntry::Property {
                        shorthand: true,
                        ..
                    }
                ));
                assert!(matches!(properties[2], ObjectEntry::Spread { .. }));
            }
            other => panic!("expected Object, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_to_unbound_is_ok() {
        let e = parse_one("x = 1");
        assert!(matches!(
            e,
            Expression::Assign {
                op: AssignOp::Assign,
                ..
            }
        ));
    }

    #[test]
    fn test_assignment_to_dec_bound_fails() {
        let mut p = Parser::new(tokenize("obj.foo.bar = \"x\"").unwrap());
        p.declare_immutable("obj");
        let err = parse_expression(&mut p).unwrap_err();
        assert!(err.message.contains("Cannot reassign 'obj.foo.bar'"));
        assert!(err.message.contains("'obj'"));
    }
}

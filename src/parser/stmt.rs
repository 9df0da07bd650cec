//! Statement and declaration parsing for KimchiLang.
//!
//! The statement grammar is keyword-dispatched: every declaration form opens
//! with a keyword (`dec`, `fn`, `enum`, `arg`, `env`, `as ... dep`), the
//! `expose`/`secret` modifiers are parsed as prefixes that must precede a
//! valid declaration form, and a `|` or `/regex/ =>` at statement position
//! opens a pattern-match statement.
//!
//! `js` blocks are tokenized normally and their raw text is reassembled here
//! from token lexemes; `shell` blocks arrive pre-captured by the scanner.

use regex_lite::Regex;

use crate::diagnostics::Diagnostic;

use super::ast::*;
use super::expr;
use super::state::Parser;
use super::token::{Token, TokenKind};

/// Parse a complete token buffer into a program.
pub fn parse_program_tokens(tokens: Vec<Token>) -> Result<Program, Diagnostic> {
    let mut p = Parser::new(tokens);
    let mut statements = Vec::new();
    p.skip_separators();
    while !p.at_eof() {
        statements.push(parse_statement(&mut p)?);
        p.skip_separators();
    }
    Ok(Program { statements })
}

/// Parse a single statement.
pub fn parse_statement(p: &mut Parser) -> Result<Statement, Diagnostic> {
    match p.kind().clone() {
        TokenKind::Expose => {
            p.bump();
            match p.kind() {
                TokenKind::Dec => parse_dec(p, true, false),
                TokenKind::Secret => {
                    p.bump();
                    if matches!(p.kind(), TokenKind::Dec) {
                        parse_dec(p, true, true)
                    } else {
                        Err(p.error("`secret` is only valid on `dec`, `env`, or `arg`"))
                    }
                }
                TokenKind::Fn | TokenKind::Memo | TokenKind::Async => {
                    parse_function(p, true)
                }
                other => Err(p.error(format!(
                    "`expose` must precede a declaration, found `{}`",
                    other
                ))),
            }
        }
        TokenKind::Secret => {
            p.bump();
            match p.kind() {
                TokenKind::Dec => parse_dec(p, false, true),
                TokenKind::Arg => parse_arg(p, true),
                TokenKind::Env => parse_env(p, true),
                _ => Err(p.error("`secret` is only valid on `dec`, `env`, or `arg`")),
            }
        }
        TokenKind::Dec => parse_dec(p, false, false),
        TokenKind::Fn | TokenKind::Memo => parse_function(p, false),
        TokenKind::Async
            if matches!(p.peek_kind(1), TokenKind::Fn | TokenKind::Memo) =>
        {
            parse_function(p, false)
        }
        TokenKind::Enum => parse_enum(p),
        TokenKind::Arg => parse_arg(p, false),
        TokenKind::Env => parse_env(p, false),
        TokenKind::As => parse_dep(p),
        TokenKind::If => parse_if(p),
        TokenKind::While => parse_while(p),
        TokenKind::For => parse_for(p),
        TokenKind::Return => parse_return(p),
        TokenKind::Break => {
            let pos = p.pos();
            p.bump();
            Ok(Statement::Break { pos })
        }
        TokenKind::Continue => {
            let pos = p.pos();
            p.bump();
            Ok(Statement::Continue { pos })
        }
        TokenKind::Try => parse_try(p),
        TokenKind::Throw => {
            let pos = p.pos();
            p.bump();
            let value = expr::parse_expression(p)?;
            Ok(Statement::Throw { value, pos })
        }
        TokenKind::Print => parse_print(p),
        TokenKind::Js => Ok(Statement::Js(parse_js_block(p, false)?)),
        TokenKind::Shell => Ok(Statement::Shell(parse_shell_block(p, false)?)),
        TokenKind::Test => parse_test(p),
        TokenKind::Describe => parse_describe(p),
        TokenKind::Expect => parse_expect(p),
        TokenKind::Assert => parse_assert(p),
        TokenKind::Bar => Ok(Statement::Match(parse_match(p, false)?)),
        TokenKind::Regex { .. }
            if matches!(p.peek_kind(1), TokenKind::FatArrow) =>
        {
            Ok(Statement::Match(parse_match(p, true)?))
        }
        TokenKind::Lbrace => {
            let pos = p.pos();
            let body = parse_brace_block(p)?;
            Ok(Statement::Block { body, pos })
        }
        _ => {
            let e = expr::parse_expression(p)?;
            Ok(Statement::Expr(e))
        }
    }
}

/// Parse a `{ ... }` block of statements, introducing a lexical scope.
pub fn parse_brace_block(p: &mut Parser) -> Result<Vec<Statement>, Diagnostic> {
    p.expect(TokenKind::Lbrace)?;
    p.push_scope();
    let mut body = Vec::new();
    p.skip_separators();
    while !matches!(p.kind(), TokenKind::Rbrace | TokenKind::Eof) {
        let stmt = parse_statement(p);
        match stmt {
            Ok(stmt) => body.push(stmt),
            Err(e) => {
                p.pop_scope();
                return Err(e);
            }
        }
        p.skip_separators();
    }
    p.pop_scope();
    p.expect(TokenKind::Rbrace)?;
    Ok(body)
}

fn parse_dec(p: &mut Parser, exposed: bool, secret: bool) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Dec)?;

    let (name, pattern) = match p.kind().clone() {
        TokenKind::Ident(name) => {
            p.bump();
            (Some(name), None)
        }
        TokenKind::Lbrace => (None, Some(parse_object_pattern(p)?)),
        TokenKind::Lbracket => (None, Some(parse_array_pattern(p)?)),
        other => {
            return Err(p.error(format!(
                "Expected a name or destructure pattern after `dec`, found `{}`",
                other
            )));
        }
    };

    p.expect(TokenKind::Eq)?;
    p.skip_newlines();
    let init = expr::parse_expression(p)?;

    let binding = DecBinding {
        name,
        pattern,
        init,
        exposed,
        secret,
        pos,
    };
    for bound in binding.bound_names() {
        p.declare_immutable(bound);
        if secret {
            p.declare_secret(bound);
        }
    }
    Ok(Statement::Dec(binding))
}

fn parse_object_pattern(p: &mut Parser) -> Result<Pattern, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Lbrace)?;
    let mut props = Vec::new();
    p.skip_newlines();
    while !matches!(p.kind(), TokenKind::Rbrace) {
        let key = p.expect_ident()?;
        let binding = if p.eat(&TokenKind::Colon) {
            p.expect_ident()?
        } else {
            key.clone()
        };
        props.push(ObjectPatternProp { key, binding });
        p.skip_newlines();
        if !p.eat(&TokenKind::Comma) {
            break;
        }
        p.skip_newlines();
    }
    p.expect(TokenKind::Rbrace)?;
    Ok(Pattern::Object { props, pos })
}

fn parse_array_pattern(p: &mut Parser) -> Result<Pattern, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Lbracket)?;
    let mut elements = Vec::new();
    p.skip_newlines();
    loop {
        match p.kind().clone() {
            TokenKind::Rbracket => break,
            TokenKind::Comma => {
                // A comma with no element before it marks a hole.
                elements.push(None);
                p.bump();
            }
            TokenKind::Ident(name) => {
                p.bump();
                elements.push(Some(name));
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            other => {
                return Err(p.error(format!(
                    "Expected a name, `,` or `]` in array pattern, found `{}`",
                    other
                )));
            }
        }
        p.skip_newlines();
    }
    p.expect(TokenKind::Rbracket)?;
    Ok(Pattern::Array { elements, pos })
}

fn parse_function(p: &mut Parser, exposed: bool) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    let mut is_async = false;
    let mut memoized = false;
    loop {
        if p.eat(&TokenKind::Async) {
            is_async = true;
        } else if p.eat(&TokenKind::Memo) {
            memoized = true;
        } else {
            break;
        }
    }
    p.expect(TokenKind::Fn)?;
    let name = p.expect_ident()?;
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
    p.skip_newlines();
    let body = parse_brace_block(p)?;
    Ok(Statement::Function(FunctionDecl {
        name,
        params,
        body,
        is_async,
        memoized,
        exposed,
        pos,
    }))
}

fn parse_enum(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Enum)?;
    let name = p.expect_ident()?;
    p.expect(TokenKind::Lbrace)?;
    let mut members = Vec::new();
    p.skip_separators();
    while !matches!(p.kind(), TokenKind::Rbrace) {
        let member_name = p.expect_ident()?;
        let value = if p.eat(&TokenKind::Eq) {
            match p.kind().clone() {
                TokenKind::Number { raw } => {
                    p.bump();
                    Some(raw)
                }
                other => {
                    return Err(p.error(format!(
                        "Enum member values must be numeric literals, found `{}`",
                        other
                    )));
                }
            }
        } else {
            None
        };
        members.push(EnumMember {
            name: member_name,
            value,
        });
        p.skip_separators();
        if p.eat(&TokenKind::Comma) {
            p.skip_separators();
        }
    }
    p.expect(TokenKind::Rbrace)?;
    Ok(Statement::Enum(EnumDecl { name, members, pos }))
}

fn parse_arg(p: &mut Parser, secret: bool) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Arg)?;
    let required = p.eat(&TokenKind::Bang);
    let name = p.expect_ident()?;
    let default = if p.eat(&TokenKind::Eq) {
        Some(expr::parse_expression(p)?)
    } else {
        None
    };
    if secret {
        p.declare_secret(&name);
    }
    Ok(Statement::Arg(ArgDecl {
        name,
        required,
        default,
        secret,
        pos,
    }))
}

fn parse_env(p: &mut Parser, secret: bool) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Env)?;
    let required = p.eat(&TokenKind::Bang);
    let name = p.expect_ident()?;
    let default = if p.eat(&TokenKind::Eq) {
        Some(expr::parse_expression(p)?)
    } else {
        None
    };
    if secret {
        p.declare_secret(&name);
    }
    Ok(Statement::Env(EnvDecl {
        name,
        required,
        default,
        secret,
        pos,
    }))
}

fn parse_dep(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::As)?;
    let alias = p.expect_ident()?;
    p.expect(TokenKind::Dep)?;
    let mut segments = vec![p.expect_ident()?];
    while p.eat(&TokenKind::Dot) {
        segments.push(p.expect_ident()?);
    }
    let overrides = if p.eat(&TokenKind::Lparen) {
        p.skip_newlines();
        let value = if matches!(p.kind(), TokenKind::Rparen) {
            None
        } else {
            Some(expr::parse_expression(p)?)
        };
        p.skip_newlines();
        p.expect(TokenKind::Rparen)?;
        value
    } else {
        None
    };
    Ok(Statement::Dep(DepStmt {
        alias,
        path: segments.join("."),
        segments,
        overrides,
        pos,
    }))
}

/// Parse an `if`/`elif`/`else` chain. `elif` is rewritten as `else if`.
fn parse_if(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    // The opening token is `if` or an `elif` being rewritten.
    p.bump();
    let test = expr::parse_expression(p)?;
    p.skip_newlines();
    let consequent = parse_brace_block(p)?;
    p.skip_newlines();

    let alternate = match p.kind() {
        TokenKind::Elif => Some(Box::new(parse_if(p)?)),
        TokenKind::Else => {
            p.bump();
            p.skip_newlines();
            if matches!(p.kind(), TokenKind::If) {
                Some(Box::new(parse_if(p)?))
            } else {
                let else_pos = p.pos();
                let body = parse_brace_block(p)?;
                Some(Box::new(Statement::Block {
                    body,
                    pos: else_pos,
                }))
            }
        }
        _ => None,
    };

    Ok(Statement::If(IfStmt {
        test,
        consequent,
        alternate,
        pos,
    }))
}

fn parse_while(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::While)?;
    let test = expr::parse_expression(p)?;
    p.skip_newlines();
    let body = parse_brace_block(p)?;
    Ok(Statement::While { test, body, pos })
}

fn parse_for(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::For)?;
    let binding = p.expect_ident()?;
    p.expect(TokenKind::In)?;
    let iterable = expr::parse_expression(p)?;
    p.skip_newlines();
    let body = parse_brace_block(p)?;
    Ok(Statement::ForIn {
        binding,
        iterable,
        body,
        pos,
    })
}

fn parse_return(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Return)?;
    let value = if matches!(
        p.kind(),
        TokenKind::Newline | TokenKind::Semicolon | TokenKind::Rbrace | TokenKind::Eof
    ) {
        None
    } else {
        Some(expr::parse_expression(p)?)
    };
    Ok(Statement::Return { value, pos })
}

fn parse_try(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Try)?;
    p.skip_newlines();
    let block = parse_brace_block(p)?;
    p.skip_newlines();

    let handler = if p.eat(&TokenKind::Catch) {
        let param = if p.eat(&TokenKind::Lparen) {
            let name = p.expect_ident()?;
            p.expect(TokenKind::Rparen)?;
            Some(name)
        } else if let TokenKind::Ident(name) = p.kind().clone() {
            p.bump();
            Some(name)
        } else {
            None
        };
        p.skip_newlines();
        let body = parse_brace_block(p)?;
        Some(CatchClause { param, body })
    } else {
        None
    };

    p.skip_newlines();
    let finalizer = if p.eat(&TokenKind::Finally) {
        p.skip_newlines();
        Some(parse_brace_block(p)?)
    } else {
        None
    };

    Ok(Statement::Try(TryStmt {
        block,
        handler,
        finalizer,
        pos,
    }))
}

fn parse_print(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Print)?;
    let args = if p.eat(&TokenKind::Lparen) {
        let mut args = Vec::new();
        p.skip_newlines();
        while !matches!(p.kind(), TokenKind::Rparen) {
            args.push(expr::parse_expression(p)?);
            p.skip_newlines();
            if !p.eat(&TokenKind::Comma) {
                break;
            }
            p.skip_newlines();
        }
        p.expect(TokenKind::Rparen)?;
        args
    } else {
        vec![expr::parse_expression(p)?]
    };
    Ok(Statement::Print { args, pos })
}

/// Parse a pattern-match statement: consecutive adjacent guards accumulate
/// into one match node.
fn parse_match(p: &mut Parser, is_regex: bool) -> Result<PatternMatchStmt, Diagnostic> {
    let pos = p.pos();
    let mut arms = Vec::new();

    loop {
        let arm_pos = p.pos();
        let guard = if is_regex {
            match p.kind().clone() {
                TokenKind::Regex { pattern, flags } => {
                    p.bump();
                    Expression::Regex {
                        pattern,
                        flags,
                        pos: arm_pos,
                    }
                }
                other => {
                    return Err(p.error(format!("Expected a regex guard, found `{}`", other)));
                }
            }
        } else {
            p.expect(TokenKind::Bar)?;
            let guard = expr::parse_guard(p)?;
            p.expect(TokenKind::Bar)?;
            guard
        };

        p.skip_newlines();
        p.expect(TokenKind::FatArrow)?;
        p.skip_newlines();
        let body = if matches!(p.kind(), TokenKind::Lbrace) {
            parse_brace_block(p)?
        } else {
            vec![parse_statement(p)?]
        };
        arms.push(MatchArm {
            guard,
            body,
            pos: arm_pos,
        });

        p.skip_separators();
        let another = if is_regex {
            matches!(p.kind(), TokenKind::Regex { .. })
                && matches!(p.peek_kind(1), TokenKind::FatArrow)
        } else {
            matches!(p.kind(), TokenKind::Bar) && p.guard_ahead()
        };
        if !another {
            break;
        }
    }

    Ok(PatternMatchStmt {
        arms,
        is_regex,
        pos,
    })
}

fn parse_test(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Test)?;
    let name = parse_block_name(p)?;
    p.skip_newlines();
    let body = parse_brace_block(p)?;
    Ok(Statement::Test(TestBlock { name, body, pos }))
}

fn parse_describe(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Describe)?;
    let name = parse_block_name(p)?;
    p.skip_newlines();
    let body = parse_brace_block(p)?;
    Ok(Statement::Describe(DescribeBlock { name, body, pos }))
}

fn parse_block_name(p: &mut Parser) -> Result<String, Diagnostic> {
    match p.kind().clone() {
        TokenKind::Str(name) => {
            p.bump();
            Ok(name)
        }
        other => Err(p.error(format!("Expected a name string, found `{}`", other))),
    }
}

fn parse_expect(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Expect)?;
    let actual = expr::parse_expression(p)?;
    let matcher = p.expect_ident()?;
    let expected = if matches!(
        p.kind(),
        TokenKind::Newline | TokenKind::Semicolon | TokenKind::Rbrace | TokenKind::Eof
    ) {
        None
    } else {
        Some(expr::parse_expression(p)?)
    };
    Ok(Statement::Expect(ExpectStmt {
        actual,
        matcher,
        expected,
        pos,
    }))
}

fn parse_assert(p: &mut Parser) -> Result<Statement, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Assert)?;
    let condition = expr::parse_expression(p)?;
    let message = if p.eat(&TokenKind::Comma) {
        Some(expr::parse_expression(p)?)
    } else {
        None
    };
    Ok(Statement::Assert(AssertStmt {
        condition,
        message,
        pos,
    }))
}

/// Parse a `js` block, reassembling its raw text from token lexemes.
///
/// The scanner tokenizes `js` bodies normally; this function rebuilds
/// readable JS source using the per-token conversion table, collapsing the
/// token pairs `== =` and `!= =` back into `===` and `!==`. Any listed
/// secret input is then checked against `console.<method>(...)` usage over
/// the assembled text.
pub fn parse_js_block(p: &mut Parser, as_expression: bool) -> Result<JsBlock, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Js)?;

    let mut inputs = Vec::new();
    if p.eat(&TokenKind::Lparen) {
        p.skip_newlines();
        while !matches!(p.kind(), TokenKind::Rparen) {
            inputs.push(p.expect_ident()?);
            p.skip_newlines();
            if !p.eat(&TokenKind::Comma) {
                break;
            }
            p.skip_newlines();
        }
        p.expect(TokenKind::Rparen)?;
    }

    p.skip_newlines();
    p.expect(TokenKind::Lbrace)?;

    let mut pieces: Vec<String> = Vec::new();
    let mut depth = 1usize;
    loop {
        match p.kind().clone() {
            TokenKind::Eof => {
                return Err(p.error_at(pos, "Unterminated js block"));
            }
            TokenKind::Lbrace => {
                depth += 1;
                pieces.push("{".to_string());
                p.bump();
            }
            TokenKind::Rbrace => {
                depth -= 1;
                if depth == 0 {
                    p.bump();
                    break;
                }
                pieces.push("}".to_string());
                p.bump();
            }
            TokenKind::EqEq if matches!(p.peek_kind(1), TokenKind::Eq) => {
                pieces.push("===".to_string());
                p.bump();
                p.bump();
            }
            TokenKind::BangEq if matches!(p.peek_kind(1), TokenKind::Eq) => {
                pieces.push("!==".to_string());
                p.bump();
                p.bump();
            }
            kind => {
                pieces.push(kind.js_source());
                p.bump();
            }
        }
    }

    let body = join_js_pieces(&pieces);

    for input in &inputs {
        if p.is_secret(input) {
            let pattern = format!(
                r"(?s)console\s*\.\s*(?:log|error|warn|info|debug|trace)\s*\(.*\b{}\b",
                input
            );
            if let Ok(re) = Regex::new(&pattern) {
                if re.is_match(&body) {
                    return Err(p.error_at(
                        pos,
                        format!(
                            "Secret value '{}' must not be passed to console in a js block",
                            input
                        ),
                    ));
                }
            }
        }
    }

    Ok(JsBlock {
        inputs,
        body,
        as_expression,
        pos,
    })
}

/// Join reassembled token texts: pieces are space-separated, newlines pass
/// through, and no space is inserted around a newline.
fn join_js_pieces(pieces: &[String]) -> String {
    let mut out = String::new();
    for piece in pieces {
        if piece == "\n" {
            out.push('\n');
            continue;
        }
        if !out.is_empty() && !out.ends_with('\n') {
            out.push(' ');
        }
        out.push_str(piece);
    }
    out.trim().to_string()
}

/// Parse a `shell` block. The body arrives as a single pre-captured
/// `ShellContent` token.
pub fn parse_shell_block(
    p: &mut Parser,
    as_expression: bool,
) -> Result<ShellBlock, Diagnostic> {
    let pos = p.pos();
    p.expect(TokenKind::Shell)?;

    let mut inputs = Vec::new();
    if p.eat(&TokenKind::Lparen) {
        while !matches!(p.kind(), TokenKind::Rparen) {
            inputs.push(p.expect_ident()?);
            if !p.eat(&TokenKind::Comma) {
                break;
            }
        }
        p.expect(TokenKind::Rparen)?;
    }

    p.expect(TokenKind::Lbrace)?;
    let command = match p.kind().clone() {
        TokenKind::ShellContent(command) => {
            p.bump();
            command
        }
        other => {
            return Err(p.error(format!("Expected shell content, found `{}`", other)));
        }
    };
    p.expect(TokenKind::Rbrace)?;

    Ok(ShellBlock {
        inputs,
        command,
        as_expression,
        pos,
    })
}

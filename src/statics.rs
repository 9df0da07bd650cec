//! Static data files (`.static`).
//!
//! A static file is data-only: a sequence of named declarations whose
//! grammar is a subset of the expression grammar (no executable
//! constructs). The loader reuses the scanner and produces a plain value
//! tree; the generator turns the tree into a JavaScript module of
//! `export const` bindings, wrapping secret-marked values in `_secret(...)`.
//!
//! Declarations:
//!
//! ```text
//! Name "string"
//! Name 123
//! Name true
//! Name [ value, value ]
//! Name { key = value, secret token = "..." }
//! Name `MEMBER, MEMBER = 10, MEMBER`
//! secret Name "..."
//! ```
//!
//! Values are literals, local or dotted identifiers (recorded as
//! references, resolved at runtime by the host import graph), nested
//! arrays, or nested objects. Commas and newlines both separate elements.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::parser::scanner::tokenize;
use crate::parser::state::Parser;
use crate::parser::token::{escape_js_string, TokenKind};

/// A parsed static file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticData {
    /// Module path the file was loaded for, if any.
    pub module_path: Option<String>,
    /// Declarations in source order.
    pub entries: Vec<StaticEntry>,
}

/// One named declaration of a static file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticEntry {
    /// Binding name.
    pub name: String,
    /// The value tree.
    pub value: StaticNode,
    /// Whether the whole declaration is secret.
    pub secret: bool,
}

/// A node of the static value tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticNode {
    /// The node payload.
    pub kind: StaticKind,
    /// Whether this node is secret-marked.
    pub secret: bool,
}

impl StaticNode {
    fn plain(kind: StaticKind) -> Self {
        Self {
            kind,
            secret: false,
        }
    }
}

/// Static value variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StaticKind {
    /// An ordered array of values.
    Array(Vec<StaticNode>),
    /// An object of named properties.
    Object(Vec<(String, StaticNode)>),
    /// An enum: member names with optional explicit numeric values.
    Enum(Vec<(String, Option<String>)>),
    /// A literal value.
    Literal(StaticLiteral),
    /// A reference to a local or dotted identifier, resolved at runtime.
    Reference(String),
}

/// Literal payloads of static values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StaticLiteral {
    /// Numeric literal with its raw text preserved.
    Number(String),
    /// String literal.
    Str(String),
    /// Boolean literal.
    Bool(bool),
    /// `null`.
    Null,
}

/// Parse the text of a `.static` file.
pub fn parse_static_file(
    text: &str,
    module_path: Option<&str>,
) -> Result<StaticData, Diagnostic> {
    let tokens = tokenize(text)?;
    let mut p = Parser::new(tokens);
    let mut entries = Vec::new();

    p.skip_separators();
    while !p.at_eof() {
        let secret = p.eat(&TokenKind::Secret);
        let name = p.expect_ident()?;
        let value = parse_value(&mut p)?;
        entries.push(StaticEntry {
            name,
            value,
            secret,
        });
        p.skip_separators();
    }

    Ok(StaticData {
        module_path: module_path.map(|s| s.to_string()),
        entries,
    })
}

fn parse_value(p: &mut Parser) -> Result<StaticNode, Diagnostic> {
    match p.kind().clone() {
        TokenKind::Str(s) => {
            p.bump();
            Ok(StaticNode::plain(StaticKind::Literal(StaticLiteral::Str(s))))
        }
        TokenKind::Number { raw } => {
            p.bump();
            Ok(StaticNode::plain(StaticKind::Literal(
                StaticLiteral::Number(raw),
            )))
        }
        TokenKind::True => {
            p.bump();
            Ok(StaticNode::plain(StaticKind::Literal(
                StaticLiteral::Bool(true),
            )))
        }
        TokenKind::False => {
            p.bump();
            Ok(StaticNode::plain(StaticKind::Literal(
                StaticLiteral::Bool(false),
            )))
        }
        TokenKind::Null => {
            p.bump();
            Ok(StaticNode::plain(StaticKind::Literal(StaticLiteral::Null)))
        }
        TokenKind::Lbracket => parse_array(p),
        TokenKind::Lbrace => parse_object(p),
        TokenKind::BacktickStr(raw) => {
            p.bump();
            parse_enum_body(p, &raw)
        }
        TokenKind::Ident(first) => {
            p.bump();
            let mut path = first;
            while p.eat(&TokenKind::Dot) {
                path.push('.');
                path.push_str(&p.expect_ident()?);
            }
            Ok(StaticNode::plain(StaticKind::Reference(path)))
        }
        other => Err(p.error(format!("Expected a static value, found `{}`", other))),
    }
}

fn parse_array(p: &mut Parser) -> Result<StaticNode, Diagnostic> {
    p.expect(TokenKind::Lbracket)?;
    let mut values = Vec::new();
    p.skip_separators();
    while !matches!(p.kind(), TokenKind::Rbracket) {
        values.push(parse_value(p)?);
        p.skip_separators();
        if p.eat(&TokenKind::Comma) {
            p.skip_separators();
        }
    }
    p.expect(TokenKind::Rbracket)?;
    Ok(StaticNode::plain(StaticKind::Array(values)))
}

fn parse_object(p: &mut Parser) -> Result<StaticNode, Diagnostic> {
    p.expect(TokenKind::Lbrace)?;
    let mut props = Vec::new();
    p.skip_separators();
    while !matches!(p.kind(), TokenKind::Rbrace) {
        let secret = p.eat(&TokenKind::Secret);
        let key = p.expect_ident()?;
        p.expect(TokenKind::Eq)?;
        let mut value = parse_value(p)?;
        value.secret = secret;
        props.push((key, value));
        p.skip_separators();
        if p.eat(&TokenKind::Comma) {
            p.skip_separators();
        }
    }
    p.expect(TokenKind::Rbrace)?;
    Ok(StaticNode::plain(StaticKind::Object(props)))
}

/// Parse the body of a backtick enum declaration:
/// `` `MEMBER, MEMBER = 10, MEMBER` ``.
fn parse_enum_body(p: &mut Parser, raw: &str) -> Result<StaticNode, Diagnostic> {
    let inner = raw.trim_matches('`');
    let mut members = Vec::new();
    for piece in inner.split(|c| c == ',' || c == '\n') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match piece.split_once('=') {
            Some((name, value)) => {
                let name = name.trim();
                let value = value.trim();
                if name.is_empty() || value.is_empty() {
                    return Err(p.error(format!("Invalid enum member `{}`", piece)));
                }
                members.push((name.to_string(), Some(value.to_string())));
            }
            None => members.push((piece.to_string(), None)),
        }
    }
    if members.is_empty() {
        return Err(p.error("An enum needs at least one member"));
    }
    Ok(StaticNode::plain(StaticKind::Enum(members)))
}

/// The `_Secret` helper emitted at the top of static modules that carry
/// secret values.
const SECRET_HELPER: &str = r#"class _Secret {
  constructor(value) {
    this._value = value;
  }
  toString() {
    return "********";
  }
  [Symbol.toPrimitive](hint) {
    return hint === "string" ? "********" : this._value;
  }
  valueOf() {
    return this._value;
  }
}
const _secret = (value) => (value instanceof _Secret ? value : new _Secret(value));
"#;

/// Generate the JavaScript module for a static data tree: a header
/// comment, optionally the `_Secret` helper, then one `export const` per
/// declaration.
pub fn generate_static_code(data: &StaticData, module_path: &str) -> String {
    let mut out = format!("// Static data module: {}\n", module_path);

    if data_has_secret(data) {
        out.push_str(SECRET_HELPER);
    }
    out.push('\n');

    for entry in &data.entries {
        let rendered = render_node(&entry.value);
        if entry.secret {
            out.push_str(&format!(
                "export const {} = _secret({});\n",
                entry.name, rendered
            ));
        } else {
            out.push_str(&format!("export const {} = {};\n", entry.name, rendered));
        }
    }
    out
}

fn data_has_secret(data: &StaticData) -> bool {
    fn node_has_secret(node: &StaticNode) -> bool {
        if node.secret {
            return true;
        }
        match &node.kind {
            StaticKind::Array(values) => values.iter().any(node_has_secret),
            StaticKind::Object(props) => props.iter().any(|(_, v)| node_has_secret(v)),
            _ => false,
        }
    }
    data.entries
        .iter()
        .any(|e| e.secret || node_has_secret(&e.value))
}

fn render_node(node: &StaticNode) -> String {
    let rendered = match &node.kind {
        StaticKind::Literal(lit) => match lit {
            StaticLiteral::Number(raw) => raw.clone(),
            StaticLiteral::Str(s) => format!("\"{}\"", escape_js_string(s)),
            StaticLiteral::Bool(b) => b.to_string(),
            StaticLiteral::Null => "null".to_string(),
        },
        StaticKind::Reference(path) => path.clone(),
        StaticKind::Array(values) => {
            let parts: Vec<String> = values.iter().map(render_node).collect();
            format!("[{}]", parts.join(", "))
        }
        StaticKind::Object(props) => {
            if props.is_empty() {
                "{}".to_string()
            } else {
                let parts: Vec<String> = props
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, render_node(value)))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
        }
        StaticKind::Enum(members) => {
            let mut counter: i64 = 0;
            let parts: Vec<String> = members
                .iter()
                .map(|(name, value)| {
                    if let Some(raw) = value {
                        counter = raw.parse::<i64>().unwrap_or(counter);
                    }
                    let line = format!("{}: {}", name, counter);
                    counter += 1;
                    line
                })
                .collect();
            format!("Object.freeze({{ {} }})", parts.join(", "))
        }
    };

    if node.secret {
        format!("_secret({})", rendered)
    } else {
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> StaticData {
        parse_static_file(text, Some("config.main")).unwrap()
    }

    #[test]
    fn test_parse_literals() {
        let data = parse("Name \"kimchi\"\nPort 8080\nDebug true");
        assert_eq!(data.entries.len(), 3);
        assert_eq!(data.entries[0].name, "Name");
        assert_eq!(
            data.entries[1].value.kind,
            StaticKind::Literal(StaticLiteral::Number("8080".to_string()))
        );
        assert_eq!(
            data.entries[2].value.kind,
            StaticKind::Literal(StaticLiteral::Bool(true))
        );
    }

    #[test]
    fn test_parse_array_and_object() {
        let data = parse("Hosts [ \"a\", \"b\" ]\nDb { host = \"localhost\", port = 5432 }");
        assert!(matches!(&data.entries[0].value.kind, StaticKind::Array(v) if v.len() == 2));
        match &data.entries[1].value.kind {
            StaticKind::Object(props) => {
                assert_eq!(props[0].0, "host");
                assert_eq!(props[1].0, "port");
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_enum() {
        let data = parse("Level `Low, Mid = 10, High`");
        match &data.entries[0].value.kind {
            StaticKind::Enum(members) => {
                assert_eq!(members.len(), 3);
                assert_eq!(members[1].1.as_deref(), Some("10"));
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_references() {
        let data = parse("Primary Db\nFallback config.backup.Db");
        assert_eq!(
            data.entries[0].value.kind,
            StaticKind::Reference("Db".to_string())
        );
        assert_eq!(
            data.entries[1].value.kind,
            StaticKind::Reference("config.backup.Db".to_string())
        );
    }

    #[test]
    fn test_secret_declaration_and_property() {
        let data = parse("secret Token \"t\"\nDb { secret password = \"p\", user = \"u\" }");
        assert!(data.entries[0].secret);
        match &data.entries[1].value.kind {
            StaticKind::Object(props) => {
                assert!(props[0].1.secret);
                assert!(!props[1].1.secret);
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_generate_exports() {
        let data = parse("Name \"kimchi\"\nPort 8080");
        let js = generate_static_code(&data, "config.main");
        assert!(js.starts_with("// Static data module: config.main"));
        assert!(js.contains("export const Name = \"kimchi\";"));
        assert!(js.contains("export const Port = 8080;"));
        assert!(!js.contains("_Secret"));
    }

    #[test]
    fn test_generate_secret_wrapping() {
        let data = parse("secret Token \"t\"\nDb { secret password = \"p\" }");
        let js = generate_static_code(&data, "config.secrets");
        assert!(js.contains("class _Secret"));
        assert!(js.contains("export const Token = _secret(\"t\");"));
        assert!(js.contains("password: _secret(\"p\")"));
    }

    #[test]
    fn test_generate_enum_auto_increment() {
        let data = parse("Level `Low, Mid = 10, High`");
        let js = generate_static_code(&data, "config.levels");
        assert!(js.contains("Object.freeze({ Low: 0, Mid: 10, High: 11 })"));
    }

    #[test]
    fn test_generate_reference_stays_bare() {
        let data = parse("Primary shared.Db");
        let js = generate_static_code(&data, "config.main");
        assert!(js.contains("export const Primary = shared.Db;"));
    }

    #[test]
    fn test_parse_error_on_garbage() {
        assert!(parse_static_file("Name =", None).is_err());
    }
}

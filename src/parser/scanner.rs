//! Lexical scanner for KimchiLang source code.
//!
//! The scanner converts source text into a token buffer, handling:
//! - Identifiers and keywords
//! - Numeric literals with their radix preserved as raw text
//! - String literals with escapes and `${...}` interpolation capture
//! - Backtick literals captured verbatim
//! - Comments (single-line and non-nesting block comments)
//! - Regex-vs-division disambiguation via a one-token lookbehind
//! - Raw capture of `shell { ... }` bodies
//! - All operators and punctuation
//!
//! Newline runs collapse into a single `Newline` token. Scanning fails fast:
//! the first lexical error aborts tokenization.

use crate::diagnostics::Diagnostic;
use crate::location::Position;

use super::token::{Token, TokenKind, INTERP_CLOSE, INTERP_OPEN};

/// Special character value indicating end of input.
const EOF_CHAR: char = '\0';

/// The lexical scanner state.
#[derive(Debug)]
pub struct Scanner {
    /// Source characters.
    chars: Vec<char>,
    /// Current character offset.
    offset: usize,
    /// Current line number (1-indexed).
    line: i32,
    /// Offset of the first character of the current line.
    line_start: usize,
    /// Tokens emitted so far.
    tokens: Vec<Token>,
}

/// Tokenize a complete source text.
///
/// Returns the token buffer (terminated by an `Eof` token) or the first
/// lexical error encountered.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Diagnostic> {
    Scanner::new(source).scan_all()
}

impl Scanner {
    /// Create a new scanner for the given source.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            offset: 0,
            line: 1,
            line_start: 0,
            tokens: Vec::new(),
        }
    }

    /// Current position (1-indexed line and column).
    fn pos(&self) -> Position {
        Position::new(self.line, (self.offset - self.line_start) as i32 + 1)
    }

    /// Current character, or `EOF_CHAR` at end of input.
    fn ch(&self) -> char {
        self.chars.get(self.offset).copied().unwrap_or(EOF_CHAR)
    }

    /// Peek `n` characters ahead of the current one.
    fn peek(&self, n: usize) -> char {
        self.chars
            .get(self.offset + n)
            .copied()
            .unwrap_or(EOF_CHAR)
    }

    /// Advance past the current character, maintaining line bookkeeping.
    fn bump(&mut self) {
        if let Some(&c) = self.chars.get(self.offset) {
            self.offset += 1;
            if c == '\n' {
                self.line += 1;
                self.line_start = self.offset;
            }
        }
    }

    /// Emit a token at the given position.
    fn push(&mut self, kind: TokenKind, pos: Position) {
        self.tokens.push(Token::new(kind, pos));
    }

    /// The kind of the most recently emitted token.
    fn prev_kind(&self) -> Option<&TokenKind> {
        self.tokens.last().map(|t| &t.kind)
    }

    /// Scan the entire source into a token buffer.
    pub fn scan_all(mut self) -> Result<Vec<Token>, Diagnostic> {
        loop {
            let pos = self.pos();
            match self.ch() {
                EOF_CHAR if self.offset >= self.chars.len() => {
                    self.push(TokenKind::Eof, pos);
                    return Ok(self.tokens);
                }
                ' ' | '\t' | '\r' => self.bump(),
                '\n' => {
                    // Runs of newlines collapse into one token.
                    if !matches!(self.prev_kind(), Some(TokenKind::Newline) | None) {
                        self.push(TokenKind::Newline, pos);
                    }
                    self.bump();
                }
                'A'..='Z' | 'a'..='z' | '_' => self.scan_identifier()?,
                '0'..='9' => self.scan_number()?,
                '"' | '\'' => self.scan_string()?,
                '`' => self.scan_backtick()?,
                '/' => self.scan_slash()?,
                '+' => self.scan_op2('=', TokenKind::PlusEq, TokenKind::Plus),
                '-' => match self.peek(1) {
                    '>' => self.scan_two(TokenKind::Arrow),
                    '=' => self.scan_two(TokenKind::MinusEq),
                    _ => self.scan_one(TokenKind::Minus),
                },
                '*' => match self.peek(1) {
                    '*' => self.scan_two(TokenKind::Power),
                    '=' => self.scan_two(TokenKind::StarEq),
                    _ => self.scan_one(TokenKind::Star),
                },
                '%' => self.scan_one(TokenKind::Percent),
                '=' => match self.peek(1) {
                    '=' => self.scan_two(TokenKind::EqEq),
                    '>' => self.scan_two(TokenKind::FatArrow),
                    _ => self.scan_one(TokenKind::Eq),
                },
                '!' => self.scan_op2('=', TokenKind::BangEq, TokenKind::Bang),
                '<' => match self.peek(1) {
                    '=' => self.scan_two(TokenKind::LtEq),
                    '<' => self.scan_two(TokenKind::LtLt),
                    _ => self.scan_one(TokenKind::Lt),
                },
                '>' => match self.peek(1) {
                    '=' => self.scan_two(TokenKind::GtEq),
                    '>' => self.scan_two(TokenKind::GtGt),
                    _ => self.scan_one(TokenKind::Gt),
                },
                '&' => {
                    if self.peek(1) == '&' {
                        self.scan_two(TokenKind::AndAnd);
                    } else {
                        return Err(Diagnostic::scan(
                            pos,
                            "The `&` operator is not supported; use the stdlib bitwise module",
                        ));
                    }
                }
                '|' => self.scan_op2('|', TokenKind::OrOr, TokenKind::Bar),
                '^' => {
                    return Err(Diagnostic::scan(
                        pos,
                        "The `^` operator is not supported; use the stdlib bitwise module",
                    ));
                }
                '~' => self.scan_op2('>', TokenKind::PipeArrow, TokenKind::Tilde),
                '?' => self.scan_one(TokenKind::Question),
                ':' => self.scan_op2(':', TokenKind::ColonColon, TokenKind::Colon),
                '.' => match (self.peek(1), self.peek(2)) {
                    ('.', '.') => self.scan_three(TokenKind::DotDotDot),
                    ('.', _) => self.scan_two(TokenKind::DotDot),
                    _ => self.scan_one(TokenKind::Dot),
                },
                ',' => self.scan_one(TokenKind::Comma),
                ';' => self.scan_one(TokenKind::Semicolon),
                '(' => self.scan_one(TokenKind::Lparen),
                ')' => self.scan_one(TokenKind::Rparen),
                '{' => self.scan_one(TokenKind::Lbrace),
                '}' => self.scan_one(TokenKind::Rbrace),
                '[' => self.scan_one(TokenKind::Lbracket),
                ']' => self.scan_one(TokenKind::Rbracket),
                other => {
                    return Err(Diagnostic::scan(
                        pos,
                        format!("Unexpected character '{}'", other),
                    ));
                }
            }
        }
    }

    /// Emit a single-character token.
    fn scan_one(&mut self, kind: TokenKind) {
        let pos = self.pos();
        self.bump();
        self.push(kind, pos);
    }

    /// Emit a two-character token.
    fn scan_two(&mut self, kind: TokenKind) {
        let pos = self.pos();
        self.bump();
        self.bump();
        self.push(kind, pos);
    }

    /// Emit a three-character token.
    fn scan_three(&mut self, kind: TokenKind) {
        let pos = self.pos();
        self.bump();
        self.bump();
        self.bump();
        self.push(kind, pos);
    }

    /// Emit `double` if the next character is `next`, otherwise `single`.
    fn scan_op2(&mut self, next: char, double: TokenKind, single: TokenKind) {
        if self.peek(1) == next {
            self.scan_two(double);
        } else {
            self.scan_one(single);
        }
    }

    /// Scan an identifier or keyword. Recognizing `shell` switches the
    /// scanner into raw-capture mode for the block body.
    fn scan_identifier(&mut self) -> Result<(), Diagnostic> {
        let pos = self.pos();
        let start = self.offset;
        while matches!(self.ch(), 'A'..='Z' | 'a'..='z' | '0'..='9' | '_') {
            self.bump();
        }
        let word: String = self.chars[start..self.offset].iter().collect();
        let kind = TokenKind::lookup_keyword(&word);
        let is_shell = kind == TokenKind::Shell;
        self.push(kind, pos);
        if is_shell {
            self.scan_shell_tail()?;
        }
        Ok(())
    }

    /// Raw-capture mode entered after the `shell` keyword: optional
    /// parenthesized input identifiers, then a brace-delimited body captured
    /// verbatim as a single `ShellContent` token.
    fn scan_shell_tail(&mut self) -> Result<(), Diagnostic> {
        // Optional input list: (id, id, ...)
        while matches!(self.ch(), ' ' | '\t') {
            self.bump();
        }
        if self.ch() == '(' {
            self.scan_one(TokenKind::Lparen);
            loop {
                while matches!(self.ch(), ' ' | '\t') {
                    self.bump();
                }
                match self.ch() {
                    ')' => {
                        self.scan_one(TokenKind::Rparen);
                        break;
                    }
                    'A'..='Z' | 'a'..='z' | '_' => {
                        let pos = self.pos();
                        let start = self.offset;
                        while matches!(self.ch(), 'A'..='Z' | 'a'..='z' | '0'..='9' | '_') {
                            self.bump();
                        }
                        let word: String = self.chars[start..self.offset].iter().collect();
                        self.push(TokenKind::Ident(word), pos);
                        while matches!(self.ch(), ' ' | '\t') {
                            self.bump();
                        }
                        if self.ch() == ',' {
                            self.scan_one(TokenKind::Comma);
                        }
                    }
                    _ => {
                        return Err(Diagnostic::scan(
                            self.pos(),
                            "Expected an identifier or `)` in shell inputs",
                        ));
                    }
                }
            }
        }

        // Skip whitespace and newlines before the opening brace.
        while matches!(self.ch(), ' ' | '\t' | '\r' | '\n') {
            self.bump();
        }
        if self.ch() != '{' {
            return Err(Diagnostic::scan(self.pos(), "Expected `{` after shell"));
        }
        self.scan_one(TokenKind::Lbrace);

        // Capture everything to the matching close brace, tracking depth.
        let content_pos = self.pos();
        let start = self.offset;
        let mut depth = 1usize;
        loop {
            match self.ch() {
                EOF_CHAR if self.offset >= self.chars.len() => {
                    return Err(Diagnostic::scan(content_pos, "Unterminated shell block"));
                }
                '{' => {
                    depth += 1;
                    self.bump();
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    self.bump();
                }
                _ => self.bump(),
            }
        }
        let content: String = self.chars[start..self.offset].iter().collect();
        self.push(
            TokenKind::ShellContent(content.trim().to_string()),
            content_pos,
        );
        self.scan_one(TokenKind::Rbrace);
        Ok(())
    }

    /// Scan a numeric literal, preserving its raw textual form.
    fn scan_number(&mut self) -> Result<(), Diagnostic> {
        let pos = self.pos();
        let start = self.offset;

        if self.ch() == '0' && matches!(self.peek(1), 'x' | 'X' | 'b' | 'B' | 'o' | 'O') {
            let base = self.peek(1);
            self.bump();
            self.bump();
            let digit_start = self.offset;
            loop {
                let valid = match base {
                    'x' | 'X' => self.ch().is_ascii_hexdigit(),
                    'b' | 'B' => matches!(self.ch(), '0' | '1'),
                    _ => matches!(self.ch(), '0'..='7'),
                };
                if valid {
                    self.bump();
                } else {
                    break;
                }
            }
            if self.offset == digit_start {
                return Err(Diagnostic::scan(pos, "Invalid number literal"));
            }
        } else {
            while self.ch().is_ascii_digit() {
                self.bump();
            }
            // Fraction only when a digit follows the dot, so `0..5` stays a range.
            if self.ch() == '.' && self.peek(1).is_ascii_digit() {
                self.bump();
                while self.ch().is_ascii_digit() {
                    self.bump();
                }
            }
            if matches!(self.ch(), 'e' | 'E') {
                self.bump();
                if matches!(self.ch(), '+' | '-') {
                    self.bump();
                }
                if !self.ch().is_ascii_digit() {
                    return Err(Diagnostic::scan(pos, "Expected digits after exponent"));
                }
                while self.ch().is_ascii_digit() {
                    self.bump();
                }
            }
        }

        let raw: String = self.chars[start..self.offset].iter().collect();
        self.push(TokenKind::Number { raw }, pos);
        Ok(())
    }

    /// Scan a string literal delimited by `"` or `'`, capturing `${...}`
    /// interpolation spans between sentinel marks.
    fn scan_string(&mut self) -> Result<(), Diagnostic> {
        let pos = self.pos();
        let quote = self.ch();
        self.bump();

        let mut value = String::new();
        let mut interpolated = false;

        loop {
            match self.ch() {
                EOF_CHAR if self.offset >= self.chars.len() => {
                    return Err(Diagnostic::scan(pos, "Unterminated string"));
                }
                c if c == quote => {
                    self.bump();
                    break;
                }
                '\\' => {
                    self.bump();
                    let escaped = self.ch();
                    if escaped == EOF_CHAR && self.offset >= self.chars.len() {
                        return Err(Diagnostic::scan(pos, "Unterminated string"));
                    }
                    self.bump();
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                '$' if self.peek(1) == '{' => {
                    interpolated = true;
                    self.bump();
                    self.bump();
                    value.push(INTERP_OPEN);
                    let mut depth = 1usize;
                    loop {
                        match self.ch() {
                            EOF_CHAR if self.offset >= self.chars.len() => {
                                return Err(Diagnostic::scan(
                                    pos,
                                    "Unterminated interpolation",
                                ));
                            }
                            '{' => {
                                depth += 1;
                                value.push('{');
                                self.bump();
                            }
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    self.bump();
                                    break;
                                }
                                value.push('}');
                                self.bump();
                            }
                            c => {
                                value.push(c);
                                self.bump();
                            }
                        }
                    }
                    value.push(INTERP_CLOSE);
                }
                c => {
                    value.push(c);
                    self.bump();
                }
            }
        }

        if interpolated {
            self.push(TokenKind::TemplateStr(value), pos);
        } else {
            self.push(TokenKind::Str(value), pos);
        }
        Ok(())
    }

    /// Scan a backtick literal, captured verbatim including its delimiters.
    fn scan_backtick(&mut self) -> Result<(), Diagnostic> {
        let pos = self.pos();
        let mut value = String::from("`");
        self.bump();
        loop {
            match self.ch() {
                EOF_CHAR if self.offset >= self.chars.len() => {
                    return Err(Diagnostic::scan(pos, "Unterminated backtick literal"));
                }
                '\\' => {
                    value.push('\\');
                    self.bump();
                    value.push(self.ch());
                    self.bump();
                }
                '`' => {
                    value.push('`');
                    self.bump();
                    break;
                }
                c => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        self.push(TokenKind::BacktickStr(value), pos);
        Ok(())
    }

    /// Dispatch on `/`: a comment, a division operator, or a regex literal
    /// depending on the previous emitted token.
    fn scan_slash(&mut self) -> Result<(), Diagnostic> {
        match self.peek(1) {
            '/' => {
                while !matches!(self.ch(), '\n') && self.offset < self.chars.len() {
                    self.bump();
                }
                Ok(())
            }
            '*' => self.scan_block_comment(),
            _ => {
                let divides = self
                    .prev_kind()
                    .map(|k| k.ends_expression())
                    .unwrap_or(false);
                if divides {
                    if self.peek(1) == '=' {
                        self.scan_two(TokenKind::SlashEq);
                    } else {
                        self.scan_one(TokenKind::Slash);
                    }
                    Ok(())
                } else {
                    self.scan_regex()
                }
            }
        }
    }

    /// Scan a `/* ... */` comment. Nesting is not supported.
    fn scan_block_comment(&mut self) -> Result<(), Diagnostic> {
        let pos = self.pos();
        self.bump();
        self.bump();
        loop {
            if self.offset >= self.chars.len() {
                return Err(Diagnostic::scan(pos, "Unterminated block comment"));
            }
            if self.ch() == '*' && self.peek(1) == '/' {
                self.bump();
                self.bump();
                return Ok(());
            }
            self.bump();
        }
    }

    /// Scan a regex literal. The body ends at the first unescaped `/`;
    /// a newline or end of input inside the body is an error.
    fn scan_regex(&mut self) -> Result<(), Diagnostic> {
        let pos = self.pos();
        self.bump(); // opening '/'

        let mut pattern = String::new();
        loop {
            match self.ch() {
                EOF_CHAR if self.offset >= self.chars.len() => {
                    return Err(Diagnostic::scan(pos, "Unterminated regex literal"));
                }
                '\n' | '\r' => {
                    return Err(Diagnostic::scan(pos, "Unterminated regex literal"));
                }
                '\\' => {
                    pattern.push('\\');
                    self.bump();
                    pattern.push(self.ch());
                    self.bump();
                }
                '/' => {
                    self.bump();
                    break;
                }
                c => {
                    pattern.push(c);
                    self.bump();
                }
            }
        }

        let mut flags = String::new();
        while matches!(self.ch(), 'g' | 'i' | 'm' | 's' | 'u' | 'y') {
            flags.push(self.ch());
            self.bump();
        }

        self.push(TokenKind::Regex { pattern, flags }, pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_scan_identifiers_and_keywords() {
        assert_eq!(
            kinds("dec foo"),
            vec![
                TokenKind::Dec,
                TokenKind::Ident("foo".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_scan_numbers_preserve_raw() {
        let toks = kinds("42 3.14 0xFF 0b101 0o17 1e9");
        let raws: Vec<&str> = toks
            .iter()
            .filter_map(|k| match k {
                TokenKind::Number { raw } => Some(raw.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(raws, vec!["42", "3.14", "0xFF", "0b101", "0o17", "1e9"]);
    }

    #[test]
    fn test_range_is_not_a_fraction() {
        assert_eq!(
            kinds("0..5"),
            vec![
                TokenKind::Number {
                    raw: "0".to_string()
                },
                TokenKind::DotDot,
                TokenKind::Number {
                    raw: "5".to_string()
                },
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_scan_string_escapes() {
        assert_eq!(
            kinds("\"a\\nb\""),
            vec![TokenKind::Str("a\nb".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_scan_template_string() {
        let toks = kinds("\"hi ${name}!\"");
        match &toks[0] {
            TokenKind::TemplateStr(value) => {
                assert_eq!(
                    value,
                    &format!("hi {}name{}!", INTERP_OPEN, INTERP_CLOSE)
                );
            }
            other => panic!("expected template string, got {:?}", other),
        }
    }

    #[test]
    fn test_escaped_dollar_is_plain_string() {
        assert_eq!(
            kinds("\"\\${x}\""),
            vec![TokenKind::Str("${x}".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_newline_collapse() {
        assert_eq!(
            kinds("a\n\n\nb"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Newline,
                TokenKind::Ident("b".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_regex_after_operator() {
        let toks = kinds("x = /ab+c/gi");
        assert!(matches!(
            &toks[2],
            TokenKind::Regex { pattern, flags } if pattern == "ab+c" && flags == "gi"
        ));
    }

    #[test]
    fn test_division_after_operand() {
        assert_eq!(
            kinds("x / 2"),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::Slash,
                TokenKind::Number {
                    raw: "2".to_string()
                },
                TokenKind::Eof
            ]
        );
        // After a closing paren, `/` is also division.
        let toks = kinds("(x) / 2");
        assert!(toks.contains(&TokenKind::Slash));
    }

    #[test]
    fn test_regex_unterminated() {
        let err = tokenize("dec r = /abc").unwrap_err();
        assert!(err.message.contains("regex"));
    }

    #[test]
    fn test_shell_raw_capture() {
        let toks = kinds("shell(host) {\n  echo $host | wc -l\n}");
        assert_eq!(toks[0], TokenKind::Shell);
        assert_eq!(toks[1], TokenKind::Lparen);
        assert_eq!(toks[2], TokenKind::Ident("host".to_string()));
        assert_eq!(toks[3], TokenKind::Rparen);
        assert_eq!(toks[4], TokenKind::Lbrace);
        assert_eq!(
            toks[5],
            TokenKind::ShellContent("echo $host | wc -l".to_string())
        );
        assert_eq!(toks[6], TokenKind::Rbrace);
    }

    #[test]
    fn test_shell_without_inputs() {
        let toks = kinds("shell { ls -la }");
        assert_eq!(toks[1], TokenKind::Lbrace);
        assert_eq!(toks[2], TokenKind::ShellContent("ls -la".to_string()));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a // trailing\nb /* block */ c"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Newline,
                TokenKind::Ident("b".to_string()),
                TokenKind::Ident("c".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = tokenize("/* never closed").unwrap_err();
        assert!(err.message.contains("block comment"));
    }

    #[test]
    fn test_disallowed_bitwise_chars() {
        assert!(tokenize("a & b").is_err());
        assert!(tokenize("a ^ b").is_err());
        assert!(tokenize("a && b").is_ok());
    }

    #[test]
    fn test_multichar_operators() {
        assert_eq!(
            kinds("~> >> << ** => -> .. ..."),
            vec![
                TokenKind::PipeArrow,
                TokenKind::GtGt,
                TokenKind::LtLt,
                TokenKind::Power,
                TokenKind::FatArrow,
                TokenKind::Arrow,
                TokenKind::DotDot,
                TokenKind::DotDotDot,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_backtick_verbatim() {
        assert_eq!(
            kinds("`raw ${x}`"),
            vec![
                TokenKind::BacktickStr("`raw ${x}`".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_position_tracking() {
        let toks = tokenize("dec\n  x").unwrap();
        assert_eq!(toks[0].pos, Position::new(1, 1));
        // Newline token, then `x` at line 2 column 3.
        assert_eq!(toks[2].pos, Position::new(2, 3));
    }
}

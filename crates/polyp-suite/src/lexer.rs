//! A JavaScript tokenizer sufficient for top-level structure.
//!
//! Produces spans only; token text is always sliced from the source so
//! that extracted fragments stay byte-identical to what upstream wrote.
//! Comments and whitespace are skipped, but a line break between two
//! tokens is recorded on the second one.
//!
//! Regular-expression literals are told apart from division by the
//! previous significant token. Template literals are split into chunk
//! tokens around their `${ … }` substitutions, whose contents are
//! tokenized normally.

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Punct,
    String,
    Template,
    Number,
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// A line terminator separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn is_punct(&self, source: &str, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text(source) == punct
    }

    pub fn is_identifier(&self, source: &str, name: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text(source) == name
    }

    /// Whether this token can end an expression, so that a following
    /// line break may terminate the statement.
    pub fn ends_expression(&self, source: &str) -> bool {
        match self.kind {
            TokenKind::Identifier => !OPERATOR_KEYWORDS.contains(&self.text(source)),
            TokenKind::String | TokenKind::Template | TokenKind::Number | TokenKind::Regex => true,
            TokenKind::Punct => matches!(self.text(source), ")" | "]" | "}" | "++" | "--"),
        }
    }
}

/// Longest first, so the first match is the maximal munch.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@", "#",
];

/// Keywords after which a `/` starts a regular expression.
const REGEX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Keywords that act as binary or unary operators.
const OPERATOR_KEYWORDS: &[&str] = &[
    "in",
    "instanceof",
    "typeof",
    "void",
    "delete",
    "new",
    "return",
    "throw",
    "case",
    "yield",
    "await",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, ExtractError> {
    let mut lexer = Lexer {
        src: source,
        pos: 0,
        tokens: Vec::new(),
        brace_depth: 0,
        template_stack: Vec::new(),
        newline_before: false,
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    brace_depth: usize,
    template_stack: Vec<usize>,
    newline_before: bool,
}

impl Lexer<'_> {
    fn run(&mut self) -> Result<(), ExtractError> {
        if self.src.starts_with("#!") {
            self.skip_line();
        }
        loop {
            self.skip_trivia()?;
            let Some(c) = self.peek() else {
                break;
            };
            let start = self.pos;
            let kind = match c {
                '\'' | '"' => {
                    self.scan_string(c)?;
                    TokenKind::String
                }
                '`' => {
                    self.bump();
                    self.scan_template_chunk(start)?;
                    TokenKind::Template
                }
                '}' if self.template_stack.last() == Some(&self.brace_depth) => {
                    self.template_stack.pop();
                    self.bump();
                    self.scan_template_chunk(start)?;
                    TokenKind::Template
                }
                '0'..='9' => {
                    self.scan_number();
                    TokenKind::Number
                }
                '.' if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => {
                    self.scan_number();
                    TokenKind::Number
                }
                '/' if self.regex_allowed() => {
                    self.scan_regex()?;
                    TokenKind::Regex
                }
                c if is_identifier_start(c) || c == '\\' => {
                    self.scan_identifier()?;
                    TokenKind::Identifier
                }
                _ => {
                    self.scan_punct()?;
                    TokenKind::Punct
                }
            };
            self.push(kind, start);
        }
        if let Some(open) = self.template_stack.last() {
            return Err(ExtractError::lex(
                self.pos,
                format!("unterminated template substitution (brace depth {open})"),
            ));
        }
        Ok(())
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            start,
            end: self.pos,
            newline_before: self.newline_before,
        });
        self.newline_before = false;
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                break;
            }
            self.bump();
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ExtractError> {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                self.newline_before = true;
                self.bump();
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.bump();
            } else if c == '/' && self.peek_at(1) == Some('/') {
                self.skip_line();
            } else if c == '/' && self.peek_at(1) == Some('*') {
                let start = self.pos;
                let Some(close) = self.src[self.pos + 2..].find("*/") else {
                    return Err(ExtractError::lex(start, "unterminated block comment"));
                };
                let body = &self.src[self.pos + 2..self.pos + 2 + close];
                if body.chars().any(is_line_terminator) {
                    self.newline_before = true;
                }
                self.pos += 2 + close + 2;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn regex_allowed(&self) -> bool {
        let Some(last) = self.tokens.last() else {
            return true;
        };
        match last.kind {
            TokenKind::Identifier => REGEX_KEYWORDS.contains(&last.text(self.src)),
            // `++`/`--` before a slash can only be postfix: a regex is not
            // an assignable operand.
            TokenKind::Punct => !matches!(last.text(self.src), ")" | "]" | "++" | "--"),
            TokenKind::String | TokenKind::Template | TokenKind::Number | TokenKind::Regex => false,
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<(), ExtractError> {
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                None => return Err(ExtractError::lex(start, "unterminated string literal")),
                Some('\\') => {
                    if self.bump().is_none() {
                        return Err(ExtractError::lex(start, "unterminated string literal"));
                    }
                }
                Some(c) if c == quote => return Ok(()),
                Some('\n' | '\r') => {
                    return Err(ExtractError::lex(start, "line break in string literal"));
                }
                Some(_) => {}
            }
        }
    }

    /// Scan from just after "`" or "}" up to and including the closing
    /// "`" or the next "${".
    fn scan_template_chunk(&mut self, start: usize) -> Result<(), ExtractError> {
        loop {
            match self.bump() {
                None => return Err(ExtractError::lex(start, "unterminated template literal")),
                Some('\\') => {
                    if self.bump().is_none() {
                        return Err(ExtractError::lex(start, "unterminated template literal"));
                    }
                }
                Some('`') => return Ok(()),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    self.template_stack.push(self.brace_depth);
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn scan_number(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.bump();
                let literal = &self.src[start..self.pos];
                let is_hex = literal.starts_with("0x") || literal.starts_with("0X");
                if (c == 'e' || c == 'E')
                    && !is_hex
                    && matches!(self.peek(), Some('+' | '-'))
                {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn scan_regex(&mut self) -> Result<(), ExtractError> {
        let start = self.pos;
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                None => return Err(ExtractError::lex(start, "unterminated regular expression")),
                Some(c) if is_line_terminator(c) => {
                    return Err(ExtractError::lex(start, "unterminated regular expression"));
                }
                Some('\\') => {
                    if self.bump().is_none() {
                        return Err(ExtractError::lex(start, "unterminated regular expression"));
                    }
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        while let Some(c) = self.peek() {
            if is_identifier_part(c) {
                self.bump();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn scan_identifier(&mut self) -> Result<(), ExtractError> {
        while let Some(c) = self.peek() {
            if c == '\\' {
                let start = self.pos;
                self.bump();
                if self.bump() != Some('u') {
                    return Err(ExtractError::lex(start, "invalid escape in identifier"));
                }
                if self.peek() == Some('{') {
                    let Some(close) = self.src[self.pos..].find('}') else {
                        return Err(ExtractError::lex(start, "unterminated unicode escape"));
                    };
                    self.pos += close + 1;
                } else {
                    for _ in 0..4 {
                        if !self.bump().is_some_and(|h| h.is_ascii_hexdigit()) {
                            return Err(ExtractError::lex(start, "invalid unicode escape"));
                        }
                    }
                }
            } else if is_identifier_part(c) {
                self.bump();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn scan_punct(&mut self) -> Result<(), ExtractError> {
        let rest = &self.src[self.pos..];
        let Some(punct) = PUNCTUATORS.iter().find(|p| {
            rest.starts_with(**p)
                // `?.5` is a conditional followed by a number.
                && !(**p == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()))
        }) else {
            let c = rest.chars().next().unwrap_or('\0');
            return Err(ExtractError::lex(self.pos, format!("unexpected character {c:?}")));
        };
        match *punct {
            "{" => self.brace_depth += 1,
            "}" => self.brace_depth = self.brace_depth.saturating_sub(1),
            _ => {}
        }
        self.pos += punct.len();
        Ok(())
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '$' || c == '_' || (!c.is_ascii() && c.is_alphabetic())
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c)
        || c.is_ascii_digit()
        || c == '\u{200c}'
        || c == '\u{200d}'
        || (!c.is_ascii() && c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source)
            .expect("source should tokenize")
            .iter()
            .map(|t| t.text(source))
            .collect()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("source should tokenize")
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn skips_comments_and_records_line_breaks() {
        let source = "a // note\n/* block\n */ b /* inline */ c";
        let tokens = tokenize(source).expect("tokenize");
        assert_eq!(texts(source), vec!["a", "b", "c"]);
        assert!(tokens[1].newline_before);
        assert!(!tokens[2].newline_before);
    }

    #[test]
    fn maximal_munch_punctuators() {
        assert_eq!(texts("a >>>= b === c"), vec!["a", ">>>=", "b", "===", "c"]);
        assert_eq!(texts("x?.y ?? z"), vec!["x", "?.", "y", "??", "z"]);
        assert_eq!(texts("a?.5:1"), vec!["a", "?", ".5", ":", "1"]);
    }

    #[test]
    fn regex_versus_division() {
        assert_eq!(
            kinds("x = /a[/]b/g.test(y)"),
            vec![
                TokenKind::Identifier,
                TokenKind::Punct,
                TokenKind::Regex,
                TokenKind::Punct,
                TokenKind::Identifier,
                TokenKind::Punct,
                TokenKind::Identifier,
                TokenKind::Punct,
            ]
        );
        assert_eq!(texts("a / b / c"), vec!["a", "/", "b", "/", "c"]);
        assert_eq!(texts("(a) / 2"), vec!["(", "a", ")", "/", "2"]);
        assert_eq!(texts("return /x/"), vec!["return", "/x/"]);
        assert_eq!(texts("i++ / 2"), vec!["i", "++", "/", "2"]);
        assert_eq!(texts("n-- / m / k"), vec!["n", "--", "/", "m", "/", "k"]);
    }

    #[test]
    fn strings_keep_escaped_quotes() {
        assert_eq!(texts(r#"'it\'s' "a\"b""#), vec![r"'it\'s'", r#""a\"b""#]);
    }

    #[test]
    fn template_substitutions_are_tokenized() {
        let source = "`a${ {b: 1}.b }c${d}`";
        assert_eq!(
            texts(source),
            vec!["`a${", "{", "b", ":", "1", "}", ".", "b", "}c${", "d", "}`"]
        );
    }

    #[test]
    fn numbers_with_exponents_and_separators() {
        assert_eq!(texts("1e-7 + 0x1F + 1_000n + .5"), vec!["1e-7", "+", "0x1F", "+", "1_000n", "+", ".5"]);
    }

    #[test]
    fn unterminated_literals_are_lex_errors() {
        for source in ["'abc", "`abc", "/* abc", "x = /abc", "`a${b`"] {
            assert!(
                matches!(tokenize(source), Err(ExtractError::Lex { .. })),
                "{source:?} should fail"
            );
        }
    }
}

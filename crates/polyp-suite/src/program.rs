//! Top-level structure of a tokenized program.
//!
//! Only what extraction needs: bracket matching, statement boundaries at
//! depth zero, and splitting of object/array literal bodies into
//! comma-separated items.

use crate::error::ExtractError;
use crate::lexer::{Token, TokenKind, tokenize};

/// Identifiers that continue the previous expression or statement across
/// a line break instead of starting a new one.
const CONTINUATION_IDENTIFIERS: &[&str] = &["in", "instanceof", "of", "else", "catch", "finally"];

#[derive(Debug)]
pub struct Program<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    /// Bracket depth before each token.
    depth: Vec<usize>,
    /// For opening brackets: index of the matching closing bracket.
    matching: Vec<Option<usize>>,
}

impl<'a> Program<'a> {
    pub fn parse(source: &'a str) -> Result<Self, ExtractError> {
        let tokens = tokenize(source)?;
        let mut depth = Vec::with_capacity(tokens.len());
        let mut matching = vec![None; tokens.len()];
        let mut stack: Vec<(usize, &str)> = Vec::new();

        for (idx, token) in tokens.iter().enumerate() {
            depth.push(stack.len());
            if token.kind != TokenKind::Punct {
                continue;
            }
            match token.text(source) {
                open @ ("(" | "[" | "{") => stack.push((idx, open)),
                close @ (")" | "]" | "}") => {
                    let Some((open_idx, open)) = stack.pop() else {
                        return Err(ExtractError::assertion(
                            "balanced_brackets",
                            format!("unmatched `{close}` at byte {}", token.start),
                        ));
                    };
                    let expected = match open {
                        "(" => ")",
                        "[" => "]",
                        _ => "}",
                    };
                    if close != expected {
                        return Err(ExtractError::assertion(
                            "balanced_brackets",
                            format!(
                                "`{open}` at byte {} closed by `{close}` at byte {}",
                                tokens[open_idx].start, token.start
                            ),
                        ));
                    }
                    matching[open_idx] = Some(idx);
                    // The closing bracket sits at the depth of its opener.
                    if let Some(d) = depth.last_mut() {
                        *d = stack.len();
                    }
                }
                _ => {}
            }
        }
        if let Some((open_idx, open)) = stack.pop() {
            return Err(ExtractError::assertion(
                "balanced_brackets",
                format!("unclosed `{open}` at byte {}", tokens[open_idx].start),
            ));
        }

        Ok(Self {
            source,
            tokens,
            depth,
            matching,
        })
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, idx: usize) -> Option<&Token> {
        self.tokens.get(idx)
    }

    pub fn text(&self, idx: usize) -> &'a str {
        self.tokens[idx].text(self.source)
    }

    pub fn depth(&self, idx: usize) -> usize {
        self.depth[idx]
    }

    pub fn is_punct(&self, idx: usize, punct: &str) -> bool {
        self.tokens
            .get(idx)
            .is_some_and(|t| t.is_punct(self.source, punct))
    }

    pub fn is_identifier(&self, idx: usize, name: &str) -> bool {
        self.tokens
            .get(idx)
            .is_some_and(|t| t.is_identifier(self.source, name))
    }

    /// Index of the bracket closing the one opened at `open`.
    pub fn matching(&self, open: usize) -> Option<usize> {
        self.matching.get(open).copied().flatten()
    }

    /// Source text from the start of token `first` to the end of token
    /// `last`, inclusive.
    pub fn slice(&self, first: usize, last: usize) -> &'a str {
        &self.source[self.tokens[first].start..self.tokens[last].end]
    }

    /// Byte range covered by tokens `first..=last`.
    pub fn span(&self, first: usize, last: usize) -> (usize, usize) {
        (self.tokens[first].start, self.tokens[last].end)
    }

    /// Whether token `idx` begins a statement at its depth.
    ///
    /// True after `;`, after a closing `}`, at the start of a block, or
    /// where automatic semicolon insertion applies.
    pub fn starts_statement(&self, idx: usize) -> bool {
        if idx == 0 {
            return true;
        }
        let prev = &self.tokens[idx - 1];
        prev.is_punct(self.source, ";")
            || prev.is_punct(self.source, "}")
            || prev.is_punct(self.source, "{")
            || self.asi_break(idx)
    }

    /// A line break before token `idx` terminates the previous statement:
    /// the previous token can end an expression and this one cannot
    /// continue it.
    fn asi_break(&self, idx: usize) -> bool {
        if idx == 0 {
            return false;
        }
        let prev = &self.tokens[idx - 1];
        let here = &self.tokens[idx];
        here.newline_before
            && prev.ends_expression(self.source)
            && match here.kind {
                TokenKind::Identifier => {
                    !CONTINUATION_IDENTIFIERS.contains(&here.text(self.source))
                }
                TokenKind::String | TokenKind::Number => true,
                TokenKind::Punct | TokenKind::Template | TokenKind::Regex => false,
            }
    }

    /// Last token of the statement starting at `start`: the first `;` at
    /// the statement's depth, the token before an automatic semicolon at
    /// that depth, or the last token of the program.
    pub fn statement_end(&self, start: usize) -> usize {
        let depth = self.depth[start];
        let mut idx = start;
        while idx + 1 < self.tokens.len() {
            if self.depth[idx] == depth && self.is_punct(idx, ";") {
                return idx;
            }
            let next = idx + 1;
            if self.depth[next] < depth || (self.depth[next] == depth && self.asi_break(next)) {
                return idx;
            }
            idx = next;
        }
        idx
    }

    /// Split the tokens strictly between brackets `open` and its match
    /// into comma-separated items. Each item is `Some((first, last))`, or
    /// `None` for an elision (`[a, , b]`). A trailing comma does not
    /// produce an item.
    pub fn split_items(&self, open: usize) -> Result<Vec<Option<(usize, usize)>>, ExtractError> {
        let close = self.matching(open).ok_or_else(|| {
            ExtractError::assertion(
                "balanced_brackets",
                format!("no closing bracket for token at byte {}", self.tokens[open].start),
            )
        })?;
        let inner = self.depth[open] + 1;
        let mut items = Vec::new();
        let mut item_start = open + 1;
        for idx in open + 1..close {
            if self.depth[idx] == inner && self.is_punct(idx, ",") {
                items.push((item_start < idx).then(|| (item_start, idx - 1)));
                item_start = idx + 1;
            }
        }
        if item_start < close {
            items.push(Some((item_start, close - 1)));
        }
        Ok(items)
    }
}

//! String literal values.

use crate::error::ExtractError;

/// Decode a quoted JavaScript string literal (quotes included) to its
/// value. `offset` is the literal's byte position, for error reporting.
pub fn string_value(literal: &str, offset: usize) -> Result<String, ExtractError> {
    let inner = literal
        .get(1..literal.len().saturating_sub(1))
        .filter(|_| literal.len() >= 2)
        .ok_or_else(|| ExtractError::lex(offset, "string literal without quotes"))?;

    let mut out = String::with_capacity(inner.len());
    let mut units: Vec<u16> = Vec::new();
    let mut chars = inner.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        if c != '\\' {
            flush_units(&mut units, &mut out);
            out.push(c);
            continue;
        }
        let at = offset + 1 + at;
        let Some((_, escaped)) = chars.next() else {
            return Err(ExtractError::lex(at, "dangling backslash in string literal"));
        };
        match escaped {
            'u' => {
                let code = if chars.peek().is_some_and(|(_, c)| *c == '{') {
                    chars.next();
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, d)) => digits.push(d),
                            None => return Err(ExtractError::lex(at, "unterminated unicode escape")),
                        }
                    }
                    hex_value(&digits, at)?
                } else {
                    fixed_hex(&mut chars, 4, at)?
                };
                if code > 0xffff {
                    flush_units(&mut units, &mut out);
                    let c = char::from_u32(code)
                        .ok_or_else(|| ExtractError::lex(at, "unicode escape out of range"))?;
                    out.push(c);
                } else {
                    // Surrogate halves combine across consecutive escapes.
                    units.push(code as u16);
                }
                continue;
            }
            'x' => {
                flush_units(&mut units, &mut out);
                let code = fixed_hex(&mut chars, 2, at)?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                continue;
            }
            _ => {}
        }
        flush_units(&mut units, &mut out);
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !chars.peek().is_some_and(|(_, c)| c.is_ascii_digit()) => out.push('\0'),
            // Line continuation.
            '\r' => {
                if chars.peek().is_some_and(|(_, c)| *c == '\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
    }
    flush_units(&mut units, &mut out);
    Ok(out)
}

fn fixed_hex(
    chars: &mut impl Iterator<Item = (usize, char)>,
    len: usize,
    at: usize,
) -> Result<u32, ExtractError> {
    let digits: String = chars.take(len).map(|(_, c)| c).collect();
    if digits.len() != len {
        return Err(ExtractError::lex(at, format!("truncated escape `{digits}`")));
    }
    hex_value(&digits, at)
}

fn hex_value(digits: &str, at: usize) -> Result<u32, ExtractError> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ExtractError::lex(at, format!("invalid hex escape `{digits}`")));
    }
    u32::from_str_radix(digits, 16).map_err(|err| ExtractError::lex(at, err.to_string()))
}

fn flush_units(units: &mut Vec<u16>, out: &mut String) {
    if units.is_empty() {
        return;
    }
    out.extend(char::decode_utf16(units.drain(..)).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_escaped_literals() {
        assert_eq!(string_value("'es.array.at'", 0).unwrap(), "es.array.at");
        assert_eq!(string_value(r#""a\"b""#, 0).unwrap(), "a\"b");
        assert_eq!(string_value(r"'it\'s\n'", 0).unwrap(), "it's\n");
        assert_eq!(string_value(r"'\x41B\u{43}'", 0).unwrap(), "ABC");
    }

    #[test]
    fn surrogate_pairs_combine() {
        assert_eq!(string_value(r"'\uD83D\uDE00'", 0).unwrap(), "\u{1F600}");
        assert_eq!(string_value(r"'\uD83D'", 0).unwrap(), "\u{FFFD}");
    }

    #[test]
    fn malformed_escapes_are_lex_errors() {
        for literal in [r"'\u12'", r"'\xZZ'", r"'\u{110000}'", "'"] {
            assert!(
                matches!(string_value(literal, 0), Err(ExtractError::Lex { .. })),
                "{literal}"
            );
        }
    }
}

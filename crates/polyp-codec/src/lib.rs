//! # polyp-codec
//!
//! Bijective transform from arbitrary strings to filesystem/URL-safe
//! tokens, used to turn a source URL into a cache file name.
//!
//! Encoding works on the UTF-8 bytes of the input:
//!
//! ```text
//! A-Z          → '!' + lowercase      "Hi" → "!hi"
//! '/'          → '_'
//! unsafe byte  → '%' + two hex digits ("!" → "%21", 0xC3 → "%c3")
//! safe byte    → itself
//! ```
//!
//! The safe set is printable ASCII minus `! " % * / : < > ? \ _ |` and
//! uppercase letters. Decoding accepts only the escapes the encoder can
//! emit and fails with [`CodecError::InvalidEscape`] on anything else.

use regex::Regex;
use std::sync::OnceLock;

/// Errors from [`decode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// An escape sequence the encoder never produces.
    #[error("invalid escape {escape:?}")]
    InvalidEscape { escape: String },

    /// The decoded bytes are not UTF-8.
    #[error("decoded token is not valid UTF-8")]
    InvalidUtf8,
}

const CASE_MARKER: u8 = b'!';
const SEPARATOR_MARKER: u8 = b'_';
const ESCAPE_MARKER: u8 = b'%';

fn is_safe(byte: u8) -> bool {
    matches!(
        byte,
        b' ' | b'#' | b'$'
            | b'&'..=b')'
            | b'+'..=b'9'
            | b';'
            | b'='
            | b'@'..=b'['
            | b']'
            | b'^'
            | b'`'..=b'{'
            | b'}'
            | b'~'
    )
}

/// Two-digit lowercase hex codes [`encode`] can emit after `%`.
fn escape_whitelist_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[0189a-f][0-9a-f]|2[125a]|3[acef]|[57][cf])$")
            .expect("escape whitelist regex must compile")
    })
}

/// Encode `input` into a safe token.
pub fn encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        match byte {
            b'A'..=b'Z' => {
                out.push(CASE_MARKER as char);
                out.push(byte.to_ascii_lowercase() as char);
            }
            b'/' => out.push(SEPARATOR_MARKER as char),
            _ if is_safe(byte) => out.push(byte as char),
            _ => {
                out.push(ESCAPE_MARKER as char);
                out.push_str(&format!("{byte:02x}"));
            }
        }
    }
    out
}

/// Decode a token produced by [`encode`].
pub fn decode(token: &str) -> Result<String, CodecError> {
    let bytes = token.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let byte = bytes[idx];
        match byte {
            CASE_MARKER => {
                match bytes.get(idx + 1) {
                    Some(next) if next.is_ascii_lowercase() => {
                        out.push(next.to_ascii_uppercase());
                    }
                    _ => return Err(invalid_escape(token, idx, 2)),
                }
                idx += 2;
            }
            SEPARATOR_MARKER => {
                out.push(b'/');
                idx += 1;
            }
            ESCAPE_MARKER => {
                let code = token
                    .get(idx + 1..idx + 3)
                    .filter(|code| escape_whitelist_re().is_match(code))
                    .ok_or_else(|| invalid_escape(token, idx, 3))?;
                let value =
                    u8::from_str_radix(code, 16).map_err(|_| invalid_escape(token, idx, 3))?;
                out.push(value);
                idx += 3;
            }
            _ => {
                out.push(byte);
                idx += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| CodecError::InvalidUtf8)
}

fn invalid_escape(token: &str, start: usize, len: usize) -> CodecError {
    let escape: String = token[start..].chars().take(len).collect();
    CodecError::InvalidEscape { escape }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(input: &str) {
        let token = encode(input);
        assert_eq!(decode(&token).as_deref(), Ok(input), "token: {token}");
    }

    #[test]
    fn encodes_case_separators_and_unsafe_bytes() {
        assert_eq!(encode("Hi/There!"), "!hi_!there%21");
        assert_eq!(encode("a_b%c"), "a%5fb%25c");
        assert_eq!(encode("\n"), "%0a");
        assert_eq!(encode("é"), "%c3%a9");
    }

    #[test]
    fn round_trips_representative_strings() {
        round_trip("");
        round_trip("Hi/There!");
        round_trip(
            "https://raw.githubusercontent.com/zloirock/core-js/refs/tags/v3.39.0/tests/compat/tests.js",
        );
        round_trip("MiXeD/CaSe/\\path:with?query=1&x=<y>|*\"");
        round_trip("snow ☃ and 𝄞 clef");
        round_trip("\u{0}\u{1f}\u{7f}");
    }

    #[test]
    fn round_trips_every_byte_sized_char() {
        let all: String = (0u32..=0xff).filter_map(char::from_u32).collect();
        round_trip(&all);
    }

    #[test]
    fn encoded_tokens_use_only_safe_characters() {
        let token = encode("Path/To/File Name?.JS");
        assert!(!token.contains('/'));
        assert!(!token.chars().any(|c| c.is_ascii_uppercase()));
        assert!(token.bytes().all(|b| is_safe(b) || b == b'!' || b == b'_' || b == b'%'));
    }

    #[test]
    fn rejects_escapes_outside_whitelist() {
        for token in ["%41", "%2f", "%30", "%7e", "%20", "%g1", "%2", "%"] {
            assert!(
                matches!(decode(token), Err(CodecError::InvalidEscape { .. })),
                "{token} should be rejected"
            );
        }
        assert_eq!(
            decode("ok%41"),
            Err(CodecError::InvalidEscape {
                escape: "%41".to_string()
            })
        );
    }

    #[test]
    fn rejects_case_marker_without_lowercase_letter() {
        assert!(matches!(decode("!A"), Err(CodecError::InvalidEscape { .. })));
        assert!(matches!(decode("!1"), Err(CodecError::InvalidEscape { .. })));
        assert!(matches!(decode("tail!"), Err(CodecError::InvalidEscape { .. })));
    }

    #[test]
    fn rejects_truncated_multibyte_sequence() {
        assert_eq!(decode("%c3"), Err(CodecError::InvalidUtf8));
    }
}

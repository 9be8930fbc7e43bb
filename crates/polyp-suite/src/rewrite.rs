//! Predicate rewrites: neutralising calls that only work inside the
//! upstream test harness.

use crate::error::ExtractError;
use crate::program::Program;
use polyp_kernel::{ModuleId, SourceFragment};
use serde::{Deserialize, Serialize};

/// Replace every call `callee(...)` in the predicates of `module` with
/// the always-pass expression `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewrite {
    pub module: ModuleId,
    pub callee: String,
}

impl Rewrite {
    pub fn new(module: impl Into<String>, callee: impl Into<String>) -> Self {
        Self {
            module: ModuleId::new(module),
            callee: callee.into(),
        }
    }

    /// The two error-cloning checks of the structured-clone tests, which
    /// depend on harness internals that do not exist in a page.
    pub fn structured_clone_defaults() -> Vec<Rewrite> {
        vec![
            Self::new("web.structured-clone", "checkErrorsCloning"),
            Self::new("web.structured-clone", "checkNewErrorsCloningSemantic"),
        ]
    }

    /// Apply to one fragment. Returns the rewritten fragment and the
    /// number of calls replaced.
    pub fn apply(&self, fragment: &SourceFragment) -> Result<(SourceFragment, usize), ExtractError> {
        let (text, count) = neutralize_calls(fragment.as_str(), &self.callee)?;
        Ok((SourceFragment::new(text), count))
    }
}

/// Replace each call of `callee` in `source` with `true`.
///
/// A call is the identifier followed by a parenthesised argument list.
/// Member calls (`x.callee()`), constructions (`new callee()`) and
/// declarations (`function callee()`) are left alone, as are calls nested
/// inside an argument list that is itself being replaced.
pub fn neutralize_calls(source: &str, callee: &str) -> Result<(String, usize), ExtractError> {
    let program = Program::parse(source)?;
    let mut spans = Vec::new();
    let mut idx = 0;
    while idx < program.len() {
        let preceded_by_blocker = idx > 0
            && (program.is_punct(idx - 1, ".")
                || program.is_punct(idx - 1, "?.")
                || program.is_identifier(idx - 1, "new")
                || program.is_identifier(idx - 1, "function"));
        let close = (program.is_identifier(idx, callee)
            && program.is_punct(idx + 1, "(")
            && !preceded_by_blocker)
            .then(|| program.matching(idx + 1))
            .flatten();
        match close {
            Some(close) => {
                spans.push(program.span(idx, close));
                idx = close + 1;
            }
            None => idx += 1,
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (start, end) in &spans {
        out.push_str(&source[cursor..*start]);
        out.push_str("true");
        cursor = *end;
    }
    out.push_str(&source[cursor..]);
    Ok((out, spans.len()))
}

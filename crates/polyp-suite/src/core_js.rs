//! Adapter for core-js 3.x `tests/compat/tests.js`.
//!
//! The file is a flat script. A declaration binds the harness channel
//! (`var GLOBAL = …`), helpers follow, and one statement assigns the test
//! map:
//!
//! ```js
//! GLOBAL.tests = {
//!   'es.array.at': function () { … },
//!   'es.promise': [PROMISES_SUPPORT, function () { … }],
//! };
//! ```
//!
//! Both the channel declaration and the assignment are cut from the
//! program; what remains is the detection prefix.

use crate::adapter::{Extraction, SuiteAdapter};
use crate::error::ExtractError;
use crate::lexer::TokenKind;
use crate::literal::string_value;
use crate::program::Program;
use crate::rewrite::Rewrite;
use polyp_kernel::{ModuleId, PredicateTable, SourceFragment};
use semver::{Version, VersionReq};
use tracing::{debug, warn};

/// Identifier the harness and the tests share.
pub const HARNESS_CHANNEL: &str = "GLOBAL";

/// Property of the channel that holds the test map.
const TEST_MAP_PROPERTY: &str = "tests";

const SUPPORTED_VERSIONS: &str = ">=3.0.0, <4.0.0";

#[derive(Debug, Clone)]
pub struct CoreJsTestsAdapter {
    requirement: VersionReq,
    channel: String,
    rewrites: Vec<Rewrite>,
}

impl Default for CoreJsTestsAdapter {
    fn default() -> Self {
        Self {
            requirement: VersionReq::parse(SUPPORTED_VERSIONS).unwrap_or(VersionReq::STAR),
            channel: HARNESS_CHANNEL.to_string(),
            rewrites: Rewrite::structured_clone_defaults(),
        }
    }
}

impl CoreJsTestsAdapter {
    /// Replace the predicate rewrites applied after extraction.
    pub fn with_rewrites(mut self, rewrites: Vec<Rewrite>) -> Self {
        self.rewrites = rewrites;
        self
    }

    pub fn rewrites(&self) -> &[Rewrite] {
        &self.rewrites
    }

    /// `var|let|const <channel> = …` with a single declarator.
    fn is_scaffolding(&self, program: &Program<'_>, start: usize, end: usize) -> bool {
        let declares = ["var", "let", "const"]
            .iter()
            .any(|keyword| program.is_identifier(start, keyword));
        if !declares || !program.is_identifier(start + 1, &self.channel) {
            return false;
        }
        let depth = program.depth(start);
        !(start + 1..=end).any(|idx| program.depth(idx) == depth && program.is_punct(idx, ","))
    }

    /// `<channel>.tests = …`
    fn is_test_map(&self, program: &Program<'_>, start: usize) -> bool {
        program.is_identifier(start, &self.channel)
            && program.is_punct(start + 1, ".")
            && program.is_identifier(start + 2, TEST_MAP_PROPERTY)
            && program.is_punct(start + 3, "=")
    }

    /// Read the test map assigned at `start`. Returns the table and the
    /// last token of the assignment statement.
    fn read_test_map(
        &self,
        program: &Program<'_>,
        start: usize,
    ) -> Result<(PredicateTable, usize), ExtractError> {
        let open = start + 4;
        let close = program
            .is_punct(open, "{")
            .then(|| program.matching(open))
            .flatten()
            .ok_or_else(|| {
                ExtractError::assertion(
                    "test_map_is_object_literal",
                    format!(
                        "`{}.{TEST_MAP_PROPERTY}` is assigned `{}` instead of an object literal",
                        self.channel,
                        program.token(open).map_or("", |_| program.text(open))
                    ),
                )
            })?;
        let end = program.statement_end(start);
        if end != close && !(end == close + 1 && program.is_punct(end, ";")) {
            return Err(ExtractError::assertion(
                "test_map_is_object_literal",
                format!(
                    "`{}.{TEST_MAP_PROPERTY}` assignment continues past its object literal",
                    self.channel
                ),
            ));
        }

        let mut table = PredicateTable::new();
        for item in program.split_items(open)? {
            let Some((first, last)) = item else {
                return Err(ExtractError::assertion(
                    "property_is_plain",
                    "empty slot in test map",
                ));
            };
            let (module, predicates) = read_property(program, first, last)?;
            if table.contains(&module) {
                debug!(target: "polyp::suite", %module, "duplicate test map key, last value wins");
            }
            table.insert(module, predicates);
        }
        Ok((table, end))
    }

    fn apply_rewrites(&self, table: &mut PredicateTable) -> Result<(), ExtractError> {
        for rewrite in &self.rewrites {
            let Some(predicates) = table.get_mut(&rewrite.module) else {
                warn!(
                    target: "polyp::suite",
                    module = %rewrite.module,
                    callee = %rewrite.callee,
                    "rewrite target module has no tests"
                );
                continue;
            };
            let mut replaced = 0;
            for predicate in predicates.iter_mut() {
                let (rewritten, count) = rewrite.apply(predicate)?;
                *predicate = rewritten;
                replaced += count;
            }
            if replaced == 0 {
                warn!(
                    target: "polyp::suite",
                    module = %rewrite.module,
                    callee = %rewrite.callee,
                    "rewrite matched no calls"
                );
            } else {
                debug!(
                    target: "polyp::suite",
                    module = %rewrite.module,
                    callee = %rewrite.callee,
                    replaced,
                    "neutralised harness calls"
                );
            }
        }
        Ok(())
    }
}

impl SuiteAdapter for CoreJsTestsAdapter {
    fn name(&self) -> &'static str {
        "core-js-tests"
    }

    fn supports(&self, version: &Version) -> bool {
        self.requirement.matches(version)
    }

    fn extract(&self, source: &str) -> Result<Extraction, ExtractError> {
        let program = Program::parse(source)?;
        let mut removed = Vec::new();
        let mut table = None;

        let mut idx = 0;
        while idx < program.len() {
            let end = program.statement_end(idx);
            if self.is_test_map(&program, idx) {
                if table.is_some() {
                    return Err(ExtractError::assertion(
                        "test_map_unique",
                        format!("`{}.{TEST_MAP_PROPERTY}` is assigned twice", self.channel),
                    ));
                }
                let (predicates, last) = self.read_test_map(&program, idx)?;
                removed.push(program.span(idx, last));
                table = Some(predicates);
            } else if self.is_scaffolding(&program, idx, end) {
                removed.push(program.span(idx, end));
            }
            idx = end + 1;
        }

        let mut predicates = table.ok_or_else(|| {
            ExtractError::assertion(
                "test_map_present",
                format!("no `{}.{TEST_MAP_PROPERTY} = {{…}}` statement", self.channel),
            )
        })?;
        self.apply_rewrites(&mut predicates)?;

        let detection_prefix = cut(source, &removed).trim().to_string();
        debug!(
            target: "polyp::suite",
            modules = predicates.len(),
            prefix_bytes = detection_prefix.len(),
            "extracted test map"
        );
        Ok(Extraction {
            detection_prefix,
            predicates,
        })
    }
}

/// One `'module': value` property of the test map.
fn read_property(
    program: &Program<'_>,
    first: usize,
    last: usize,
) -> Result<(ModuleId, Vec<SourceFragment>), ExtractError> {
    let at = program.token(first).map_or(0, |token| token.start);
    if program.is_punct(first, "...") {
        return Err(ExtractError::assertion(
            "property_is_plain",
            format!("spread `{}` in test map", program.slice(first, last)),
        ));
    }
    let key_is_string = program
        .token(first)
        .is_some_and(|token| token.kind == TokenKind::String);
    if !key_is_string {
        return Err(ExtractError::assertion(
            "property_key_is_string_literal",
            format!("test map key `{}` at byte {at}", program.text(first)),
        ));
    }
    let module = ModuleId::new(string_value(program.text(first), at)?);
    if first == last || !program.is_punct(first + 1, ":") {
        return Err(ExtractError::assertion(
            "property_is_key_value",
            format!("test map entry `{module}` is not `key: value`"),
        ));
    }
    let value = first + 2;
    if value > last {
        return Err(ExtractError::assertion(
            "property_value_present",
            format!("test map entry `{module}` has no value"),
        ));
    }

    let is_list = program.is_punct(value, "[") && program.matching(value) == Some(last);
    if !is_list {
        return Ok((module, vec![SourceFragment::new(program.slice(value, last))]));
    }
    let mut predicates = Vec::new();
    for element in program.split_items(value)? {
        // Holes carry no predicate.
        let Some((a, b)) = element else {
            continue;
        };
        if program.is_punct(a, "...") {
            return Err(ExtractError::assertion(
                "array_element_is_expression",
                format!("spread element in tests of `{module}`"),
            ));
        }
        predicates.push(SourceFragment::new(program.slice(a, b)));
    }
    Ok((module, predicates))
}

/// `source` without the given byte ranges.
fn cut(source: &str, ranges: &[(usize, usize)]) -> String {
    let mut ranges = ranges.to_vec();
    ranges.sort_unstable();
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (start, end) in ranges {
        if start >= cursor {
            out.push_str(&source[cursor..start]);
        }
        cursor = cursor.max(end);
    }
    out.push_str(&source[cursor..]);
    out
}

//! # polyp suite
//!
//! Extracts runtime feature-detection predicates from an upstream test
//! suite program without evaluating it.
//!
//! The suite is tokenized and read at top level only: harness scaffolding
//! and the test-map assignment are cut out, every other statement is kept
//! verbatim as the detection prefix, and each test-map value becomes one
//! or more opaque predicate fragments.
//!
//! Any deviation from the expected shape is an `ExtractError::Assertion`
//! naming the failed invariant. There is no partial extraction.

mod core_js;
mod lexer;
mod literal;
mod program;

pub mod adapter;
pub mod error;
pub mod rewrite;

pub use adapter::{AdapterRegistry, Extraction, SuiteAdapter, extract, parse_version};
pub use core_js::{CoreJsTestsAdapter, HARNESS_CHANNEL};
pub use error::ExtractError;
pub use rewrite::{Rewrite, neutralize_calls};

//! Extraction errors. Every variant is build-fatal.

/// Errors from tokenizing or extracting a test suite.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The source could not be tokenized.
    #[error("lex error at byte {offset}: {message}")]
    Lex { offset: usize, message: String },

    /// A structural assumption about the suite failed.
    #[error("assertion `{invariant}` failed: {detail}")]
    Assertion {
        invariant: &'static str,
        detail: String,
    },

    /// No adapter understands this suite version.
    #[error("no extraction adapter supports test suite version {0}")]
    UnsupportedVersion(String),

    /// The requested version is not a semantic version.
    #[error("invalid test suite version `{version}`: {message}")]
    InvalidVersion { version: String, message: String },
}

impl ExtractError {
    pub(crate) fn assertion(invariant: &'static str, detail: impl Into<String>) -> Self {
        Self::Assertion {
            invariant,
            detail: detail.into(),
        }
    }

    pub(crate) fn lex(offset: usize, message: impl Into<String>) -> Self {
        Self::Lex {
            offset,
            message: message.into(),
        }
    }

    /// The failed invariant name, for assertion errors.
    pub fn invariant(&self) -> Option<&'static str> {
        match self {
            Self::Assertion { invariant, .. } => Some(invariant),
            _ => None,
        }
    }
}

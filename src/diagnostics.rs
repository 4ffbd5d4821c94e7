//! Error and notice types for the front end
//!
//! Two fatal error kinds map onto the two phases that can reject a
//! translation unit:
//!
//! - [`FrontendError::Syntax`]: a committed grammar rule did not find the
//!   token or identifier it required.  Speculative-parse failures never
//!   surface here; they are caught by the rule that opened the snapshot and
//!   converted into the other grammar alternative.
//! - [`FrontendError::Semantic`]: a resolver pass found an undeclared
//!   identifier, an arity or type mismatch, or an ill-formed declaration.
//!
//! Non-fatal notices (warnings and hints) accumulate in a bounded ring
//! buffer owned by [`crate::context::Context`] and are surfaced to the
//! caller at the end of a run; they never abort resolution.

use std::fmt;

use thiserror::Error;

use crate::ast::SourceLocation;

/// Fatal errors produced by the parser and the semantic resolver.
///
/// Any of these aborts the current translation unit; there is no
/// partial-success state that later stages could use.
#[derive(Debug, Clone, Error)]
pub enum FrontendError {
    /// A committed grammar rule did not find an expected token.
    #[error("syntax error at {location}: expected {expected}")]
    Syntax {
        expected: String,
        location: SourceLocation,
    },

    /// A resolver pass rejected the tree.
    #[error("semantic error: {message}{}", DisplayAt(.location))]
    Semantic {
        message: String,
        location: Option<SourceLocation>,
    },
}

impl FrontendError {
    pub fn syntax(expected: impl Into<String>, location: SourceLocation) -> Self {
        FrontendError::Syntax {
            expected: expected.into(),
            location,
        }
    }

    pub fn semantic(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        FrontendError::Semantic {
            message: message.into(),
            location,
        }
    }
}

/// Helper that renders `" at line L, column C"` when a location is known.
struct DisplayAt<'a>(&'a Option<SourceLocation>);

impl fmt::Display for DisplayAt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(loc) => write!(f, " at {loc}"),
            None => Ok(()),
        }
    }
}

/// A non-fatal diagnostic notice.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "notice: {} ({loc})", self.message),
            None => write!(f, "notice: {}", self.message),
        }
    }
}

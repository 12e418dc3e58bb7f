//! Rich diagnostic error types for the NAR reasoning core.
//!
//! Each subsystem defines its own error type with `miette` `#[diagnostic]`
//! derives, providing error codes, help text, and source chains so callers
//! know exactly what went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the reasoning core.
#[derive(Debug, Error, Diagnostic)]
pub enum NarError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Hypergraph(#[from] HypergraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Contradiction(#[from] ContradictionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Question(#[from] QuestionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Argument(#[from] InvalidArgument),
}

/// Convenience alias for functions returning core results.
pub type NarResult<T> = std::result::Result<T, NarError>;

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
#[error("parse error at position {position}: expected {expected}")]
#[diagnostic(
    code(nar::parse::error),
    help("Check the statement grammar in the Term Parser docs — unbalanced delimiters and unknown operators are the usual culprits.")
)]
pub struct ParseError {
    pub position: usize,
    pub expected: String,
}

impl ParseError {
    pub fn new(position: usize, expected: impl Into<String>) -> Self {
        Self {
            position,
            expected: expected.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hypergraph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum HypergraphError {
    #[error("edge {edge_id} has an empty belief list; it must be deleted, not retained")]
    #[diagnostic(
        code(nar::hypergraph::empty_beliefs),
        help("An edge with zero beliefs is an internal invariant violation. Call remove() instead of leaving it in the store.")
    )]
    EmptyBeliefs { edge_id: String },

    #[error("internal invariant violation on edge {edge_id}: {detail}")]
    #[diagnostic(
        code(nar::hypergraph::invariant_violation),
        help("This indicates a bug in index maintenance or id canonicalization. File a report with the offending edge id.")
    )]
    InternalInvariantViolation { edge_id: String, detail: String },
}

// ---------------------------------------------------------------------------
// Contradiction errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ContradictionError {
    #[error("unknown contradiction resolution strategy: {strategy}")]
    #[diagnostic(
        code(nar::contradiction::unknown_strategy),
        help("Valid strategies are: dominant_evidence, merge, specialize, recency-biased, evidence-weighted, source-reliability.")
    )]
    UnknownStrategy { strategy: String },

    #[error("contradiction {edge_id} not found")]
    #[diagnostic(
        code(nar::contradiction::not_found),
        help("Call getContradictions() to list currently registered contradiction ids.")
    )]
    NotFound { edge_id: String },

    #[error("resolver unavailable: circuit breaker open for {remaining_ms} ms more")]
    #[diagnostic(
        code(nar::contradiction::resolver_unavailable),
        help("Too many resolutions failed recently; the breaker suspends resolution for a cooldown window. Retry after it elapses.")
    )]
    ResolverUnavailable { remaining_ms: u64 },
}

// ---------------------------------------------------------------------------
// Question errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QuestionError {
    #[error("question timed out: {text} ({timeout_ms} ms)")]
    #[diagnostic(
        code(nar::question::timeout),
        help("No belief matching the pattern reached minExpectation before the deadline. Increase timeout, lower minExpectation, or add supporting beliefs.")
    )]
    Timeout { text: String, timeout_ms: u64 },

    #[error("question not found: {question_id}")]
    #[diagnostic(
        code(nar::question::not_found),
        help("The question id does not correspond to a pending or answered question.")
    )]
    NotFound { question_id: String },
}

// ---------------------------------------------------------------------------
// State (persistence) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StateError {
    #[error("invalid state: {reason}")]
    #[diagnostic(
        code(nar::state::invalid),
        help("loadState() requires a version \"1.0\" payload with a hypergraph array. No partial load is committed on failure.")
    )]
    InvalidState { reason: String },
}

// ---------------------------------------------------------------------------
// Invalid argument (generic, caller-facing API misuse)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
#[error("invalid argument: {message}")]
#[diagnostic(code(nar::invalid_argument), help("{help}"))]
pub struct InvalidArgument {
    pub message: String,
    pub help: String,
}

impl InvalidArgument {
    pub fn new(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: help.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_converts_to_nar_error() {
        let err = ParseError::new(3, "closing '>'");
        let nar: NarError = err.into();
        assert!(matches!(nar, NarError::Parse(_)));
    }

    #[test]
    fn contradiction_error_converts() {
        let err = ContradictionError::UnknownStrategy {
            strategy: "bogus".into(),
        };
        let nar: NarError = err.into();
        assert!(matches!(nar, NarError::Contradiction(_)));
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = QuestionError::Timeout {
            text: "<moon --> cheese>?".into(),
            timeout_ms: 100,
        };
        let msg = format!("{err}");
        assert!(msg.contains("moon"));
        assert!(msg.contains("100"));
    }
}

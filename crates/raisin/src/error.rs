use crate::{
    args::StrRepr,
    capture::CaptureState,
    compare::Mismatch,
    raised::Raised,
};

/// Everything a capture can report instead of a silent match.
///
/// None of the assertion failures carry the captured exception as their `source()`: a
/// failure reads as a single assertion, never as "another error occurred while handling
/// the first one".
#[derive(Debug, thiserror::Error)]
pub enum RaisesError {
    /// The protected block completed without raising.
    #[error("{message}")]
    NotRaised { message: String },
    /// Exact type matched but the comparator rejected the value.
    #[error("{0}")]
    Comparison(Mismatch),
    /// Type and value matched but the exception's message does not match the pattern.
    #[error("{}", pattern_mismatch_message(.pattern, .text))]
    PatternMismatch { pattern: String, text: String },
    /// The match pattern is not a valid regular expression.
    #[error("invalid match pattern {}: {source}", StrRepr(.pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// The exception did not match and leaves the capture unchanged.
    ///
    /// Only produced for exceptions that escaped through the block's return value; panics
    /// are resumed instead.
    #[error("{0}")]
    Propagated(Raised),
    /// A capture was entered or exited out of order.
    #[error("cannot {operation} a capture that is {state}")]
    InvalidState {
        state: CaptureState,
        operation: &'static str,
    },
}

impl RaisesError {
    pub(crate) fn not_raised(message: impl Into<String>) -> Self {
        Self::NotRaised {
            message: message.into(),
        }
    }

    /// True for the failures that count as a failed assertion.
    #[must_use]
    pub fn is_assertion_failure(&self) -> bool {
        matches!(
            self,
            Self::NotRaised { .. } | Self::Comparison(_) | Self::PatternMismatch { .. }
        )
    }
}

fn pattern_mismatch_message(pattern: &str, text: &str) -> String {
    let mut message = format!("Regex pattern {} does not match {}.", StrRepr(pattern), StrRepr(text));
    if pattern == text {
        message.push_str("\n Did you mean to `regex::escape()` the pattern?");
    }
    message
}

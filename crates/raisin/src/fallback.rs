//! The type-based capture the entry point falls back to.
//!
//! Unlike [`ScopedCapture`](crate::ScopedCapture), a [`TypeCapture`] accepts any exception
//! whose type is one of the expected types or derives from one of them, and never compares
//! values.

use std::fmt::Write;

use smallvec::SmallVec;

use crate::{
    capture::{self, Capture, CaptureState, Exit},
    error::RaisesError,
    exception::{Exception, ExceptionType},
    info::{CapturedException, ExceptionInfo},
    pattern,
    raised::{Outcome, Raised},
};

/// Captures an exception by type, accepting subclasses of the expected types.
///
/// ```
/// use raisin::{TypeCapture, builtins::{IndexError, LookupError}};
///
/// let info = TypeCapture::of::<LookupError>()
///     .run(|| Err::<(), _>(IndexError::new("out of range")))
///     .unwrap();
/// assert_eq!(info.type_name(), Some("IndexError"));
/// ```
#[derive(Debug)]
pub struct TypeCapture {
    expected: SmallVec<[ExceptionType; 2]>,
    pattern: Option<String>,
    message: Option<String>,
    info: ExceptionInfo,
    state: CaptureState,
}

impl TypeCapture {
    /// Expects an exception of any of `types` (or a subclass of one).
    pub fn new(types: impl IntoIterator<Item = ExceptionType>) -> Self {
        Self {
            expected: types.into_iter().collect(),
            pattern: None,
            message: None,
            info: ExceptionInfo::for_later(),
            state: CaptureState::Created,
        }
    }

    /// Expects an `E` or a subclass of it.
    #[must_use]
    pub fn of<E: Exception>() -> Self {
        Self::new([ExceptionType::of::<E>()])
    }

    /// Also requires the exception's message to match `pattern` (regex search).
    #[must_use]
    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Replaces the failure message reported when the block does not raise.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn expected_types(&self) -> &[ExceptionType] {
        &self.expected
    }

    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Message of the failure reported when the block does not raise.
    ///
    /// A single type renders as `<class 'Name'>`, several as a tuple of those.
    #[must_use]
    pub fn not_raised_message(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        let mut out = String::from("DID NOT RAISE ");
        if let [single] = self.expected.as_slice() {
            let _ = write!(out, "{single:?}");
        } else {
            out.push('(');
            for (i, ty) in self.expected.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{ty:?}");
            }
            out.push(')');
        }
        out
    }

    fn accepts(&self, raised: ExceptionType) -> bool {
        self.expected.iter().any(|&ty| raised.is_subclass_of(ty))
    }

    pub fn try_run<R: Outcome>(mut self, block: impl FnOnce() -> R) -> Result<ExceptionInfo, RaisesError> {
        capture::try_run(&mut self, block)
    }

    /// Runs `block`, panicking with the failure message if the assertion fails.
    #[track_caller]
    pub fn run<R: Outcome>(mut self, block: impl FnOnce() -> R) -> Result<ExceptionInfo, Raised> {
        capture::run(&mut self, block)
    }

    fn fail(&mut self, err: RaisesError) -> Result<Exit, RaisesError> {
        self.state = CaptureState::Failed;
        tracing::trace!("type capture failed: {err}");
        Err(err)
    }
}

impl Capture for TypeCapture {
    fn enter(&mut self) -> Result<ExceptionInfo, RaisesError> {
        if self.state != CaptureState::Created {
            return Err(RaisesError::InvalidState {
                state: self.state,
                operation: "enter",
            });
        }
        self.state = CaptureState::Entered;
        Ok(self.info.clone())
    }

    fn exit(&mut self, escaped: Option<Raised>) -> Result<Exit, RaisesError> {
        if self.state != CaptureState::Entered {
            return Err(RaisesError::InvalidState {
                state: self.state,
                operation: "exit",
            });
        }
        let Some(raised) = escaped else {
            let message = self.not_raised_message();
            return self.fail(RaisesError::not_raised(message));
        };
        self.info.fill(CapturedException::from(&raised));

        if !self.accepts(raised.exception_type()) {
            self.state = CaptureState::Propagated;
            tracing::trace!(raised = %raised.exception_type(), "no expected type accepts exception, propagating");
            return Ok(Exit::Propagate(raised));
        }
        if let Some(pattern) = &self.pattern
            && let Err(err) = pattern::search(pattern, &raised.value().message())
        {
            return self.fail(err);
        }

        self.state = CaptureState::Matched;
        tracing::trace!(raised = %raised.exception_type(), "exception accepted by type, suppressing");
        Ok(Exit::Suppressed)
    }

    fn state(&self) -> CaptureState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builtins::{IndexError, KeyError, LookupError, ValueError};

    #[test]
    fn accepts_subclasses() {
        let mut capture = TypeCapture::of::<LookupError>();
        let info = capture.enter().unwrap();
        let exit = capture.exit(Some(Raised::new(KeyError::new("k")))).unwrap();
        assert!(matches!(exit, Exit::Suppressed));
        assert_eq!(info.downcast_ref::<KeyError>(), Some(&KeyError::new("k")));
        assert_eq!(capture.state(), CaptureState::Matched);
    }

    #[test]
    fn unrelated_type_propagates() {
        let mut capture = TypeCapture::of::<LookupError>();
        capture.enter().unwrap();
        let exit = capture.exit(Some(Raised::new(ValueError::new("v")))).unwrap();
        assert!(matches!(exit, Exit::Propagate(_)));
        assert_eq!(capture.state(), CaptureState::Propagated);
    }

    #[test]
    fn not_raised_names_the_types() {
        assert_eq!(
            TypeCapture::of::<KeyError>().not_raised_message(),
            "DID NOT RAISE <class 'KeyError'>"
        );
        assert_eq!(
            TypeCapture::new([ExceptionType::of::<KeyError>(), ExceptionType::of::<IndexError>()])
                .not_raised_message(),
            "DID NOT RAISE (<class 'KeyError'>, <class 'IndexError'>)"
        );
    }

    #[test]
    fn custom_message_replaces_the_default() {
        let mut capture = TypeCapture::of::<KeyError>().with_message("expected a missing key");
        capture.enter().unwrap();
        let err = capture.exit(None).unwrap_err();
        assert_eq!(err.to_string(), "expected a missing key");
        assert_eq!(capture.state(), CaptureState::Failed);
    }

    #[test]
    fn pattern_applies_to_accepted_exceptions() {
        let mut capture = TypeCapture::of::<LookupError>().matching("^missing");
        capture.enter().unwrap();
        let err = capture.exit(Some(Raised::new(KeyError::new("not here")))).unwrap_err();
        assert!(matches!(err, RaisesError::PatternMismatch { .. }));
    }
}

//! Scoped capture of the exception leaving a protected block.
//!
//! A capture goes through exactly one enter/exit cycle:
//!
//! ```text
//! Created --enter--> Entered --exit--> Matched | Propagated | Failed
//! ```
//!
//! `enter` hands out an unfilled [`ExceptionInfo`]; `exit` receives whatever escaped the
//! block (or nothing), fills the info, and decides between suppressing the exception,
//! letting it propagate unchanged, or failing the assertion.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use strum::{Display, IntoStaticStr};

use crate::{
    compare::Mismatch,
    error::RaisesError,
    exception::{Exception, ExceptionType},
    info::{CapturedException, ExceptionInfo},
    pattern,
    raised::{Outcome, Raised},
    registry::ComparatorRegistry,
};

/// Lifecycle state of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CaptureState {
    /// Built but not entered yet.
    Created,
    /// Inside the protected block, the only non-terminal state after creation.
    Entered,
    /// The exception matched and was suppressed.
    Matched,
    /// The exception did not match and continues unchanged.
    Propagated,
    /// The assertion failed: nothing raised, comparator mismatch or pattern mismatch.
    Failed,
}

/// Decision taken when a capture exits with an exception.
#[derive(Debug)]
pub enum Exit {
    /// The exception matched; the block's exit is silent.
    Suppressed,
    /// The exception did not match and must continue to the caller.
    Propagate(Raised),
}

/// The enter/exit protocol shared by instance and type captures.
pub trait Capture {
    /// Enters the protected block and returns the placeholder for the captured exception.
    fn enter(&mut self) -> Result<ExceptionInfo, RaisesError>;

    /// Exits the protected block with whatever escaped it.
    ///
    /// A comparator that panics counts as a mismatch, so every exit ends in a terminal state.
    fn exit(&mut self, escaped: Option<Raised>) -> Result<Exit, RaisesError>;

    /// Current lifecycle state.
    fn state(&self) -> CaptureState;
}

/// What left a protected block.
enum Escape {
    Completed,
    Returned(Raised),
    Panicked(Raised, Box<dyn std::any::Any + Send>),
}

fn protect<R: Outcome>(block: impl FnOnce() -> R) -> Escape {
    match panic::catch_unwind(AssertUnwindSafe(block)) {
        Ok(outcome) => outcome.into_raised().map_or(Escape::Completed, Escape::Returned),
        Err(payload) => Escape::Panicked(Raised::from_panic(&*payload), payload),
    }
}

/// Runs `block` through a full enter/exit cycle of `capture`.
///
/// A non-matching exception that escaped as a panic is resumed with its original payload;
/// one that escaped as an `Err` comes back as [`RaisesError::Propagated`].
pub(crate) fn try_run<C: Capture, R: Outcome>(
    capture: &mut C,
    block: impl FnOnce() -> R,
) -> Result<ExceptionInfo, RaisesError> {
    let info = capture.enter()?;
    let (escaped, payload) = match protect(block) {
        Escape::Completed => (None, None),
        Escape::Returned(raised) => (Some(raised), None),
        Escape::Panicked(raised, payload) => (Some(raised), Some(payload)),
    };
    match capture.exit(escaped)? {
        Exit::Suppressed => Ok(info),
        Exit::Propagate(raised) => match payload {
            Some(payload) => panic::resume_unwind(payload),
            None => Err(RaisesError::Propagated(raised)),
        },
    }
}

/// Like [`try_run`], but reports assertion failures through a panic carrying only the
/// failure's message, which is how a test fails.
#[track_caller]
pub(crate) fn run<C: Capture, R: Outcome>(
    capture: &mut C,
    block: impl FnOnce() -> R,
) -> Result<ExceptionInfo, Raised> {
    match try_run(capture, block) {
        Ok(info) => Ok(info),
        Err(RaisesError::Propagated(raised)) => Err(raised),
        Err(err) => panic!("{err}"),
    }
}

/// The exception a [`ScopedCapture`] waits for. Immutable once built.
#[derive(Debug, Clone)]
pub struct ExpectedException {
    exception_type: ExceptionType,
    instance: Arc<dyn Exception>,
    pattern: Option<String>,
}

impl ExpectedException {
    pub(crate) fn new(instance: Arc<dyn Exception>, pattern: Option<String>) -> Self {
        Self {
            exception_type: instance.exception_type(),
            instance,
            pattern,
        }
    }

    /// Exact type the raised exception must have.
    #[must_use]
    pub fn exception_type(&self) -> ExceptionType {
        self.exception_type
    }

    /// The value the raised exception is compared with.
    #[must_use]
    pub fn instance(&self) -> &dyn Exception {
        &*self.instance
    }

    /// Regular expression searched in the message once the value matched.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }
}

/// Captures an exception and checks it against an expected exception *value*.
///
/// The raised exception must have exactly the expected type; subclasses do not match. On a
/// type match the comparator registered for the expected type (or [`default_compare`]
/// when none is) decides equivalence, then the optional pattern is searched in the
/// exception's message.
///
/// [`default_compare`]: crate::compare::default_compare
#[derive(Debug)]
pub struct ScopedCapture {
    expected: ExpectedException,
    registry: ComparatorRegistry,
    info: ExceptionInfo,
    state: CaptureState,
}

impl ScopedCapture {
    /// Expects exactly `expected`, comparing with the process-wide registry.
    pub fn new<E: Exception>(expected: E) -> Self {
        Self::from_parts(Arc::new(expected), None, ComparatorRegistry::global().clone())
    }

    pub(crate) fn from_parts(
        instance: Arc<dyn Exception>,
        pattern: Option<String>,
        registry: ComparatorRegistry,
    ) -> Self {
        Self {
            expected: ExpectedException::new(instance, pattern),
            registry,
            info: ExceptionInfo::for_later(),
            state: CaptureState::Created,
        }
    }

    /// Also requires the exception's message to match `pattern` (regex search).
    #[must_use]
    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.expected.pattern = Some(pattern.into());
        self
    }

    /// Looks comparators up in `registry` instead of the process-wide one.
    #[must_use]
    pub fn with_registry(mut self, registry: ComparatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn expected(&self) -> &ExpectedException {
        &self.expected
    }

    /// Message of the failure reported when the block does not raise.
    #[must_use]
    pub fn not_raised_message(&self) -> String {
        format!("DID NOT RAISE {}", self.expected.instance.repr())
    }

    /// Runs `block` and checks what it raised; see [`Capture`] for the protocol.
    pub fn try_run<R: Outcome>(mut self, block: impl FnOnce() -> R) -> Result<ExceptionInfo, RaisesError> {
        try_run(&mut self, block)
    }

    /// Runs `block`, panicking with the failure message if the assertion fails.
    ///
    /// Returns the filled [`ExceptionInfo`] on a match and `Err` with the original exception
    /// when a non-matching exception was returned by the block.
    #[track_caller]
    pub fn run<R: Outcome>(mut self, block: impl FnOnce() -> R) -> Result<ExceptionInfo, Raised> {
        run(&mut self, block)
    }

    fn fail(&mut self, err: RaisesError) -> Result<Exit, RaisesError> {
        self.state = CaptureState::Failed;
        tracing::trace!(expected = %self.expected.exception_type, "capture failed: {err}");
        Err(err)
    }
}

impl Capture for ScopedCapture {
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

        // exact type only, a subclass of the expected type is a different exception
        if raised.exception_type() != self.expected.exception_type {
            self.state = CaptureState::Propagated;
            tracing::trace!(
                expected = %self.expected.exception_type,
                raised = %raised.exception_type(),
                "exception type differs, propagating"
            );
            return Ok(Exit::Propagate(raised));
        }

        // keyed by the expected type, never by what was raised
        let comparator = self.registry.comparator_for(self.expected.exception_type);
        let verdict = panic::catch_unwind(AssertUnwindSafe(|| {
            comparator.compare(raised.value(), self.expected.instance())
        }))
        .unwrap_or_else(|payload| Err(Mismatch::new(Raised::from_panic(&*payload).value().message())));
        if let Err(mismatch) = verdict {
            return self.fail(RaisesError::Comparison(mismatch));
        }
        if let Some(pattern) = &self.expected.pattern
            && let Err(err) = pattern::search(pattern, &raised.value().message())
        {
            return self.fail(err);
        }

        self.state = CaptureState::Matched;
        tracing::trace!(expected = %self.expected.exception_type, "exception matched, suppressing");
        Ok(Exit::Suppressed)
    }

    fn state(&self) -> CaptureState {
        self.state
    }
}

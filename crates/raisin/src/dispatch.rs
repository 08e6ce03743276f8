//! Entry point: picks value matching or type matching per call.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::{
    capture::{self, Capture, CaptureState, Exit, ScopedCapture},
    error::RaisesError,
    exception::{Exception, ExceptionType},
    fallback::TypeCapture,
    info::ExceptionInfo,
    raised::{Outcome, Raised},
    registry::{ComparatorRegistry, Registration},
};

/// What the caller expects a block to raise.
#[derive(Debug, Clone)]
pub enum Expected {
    /// One exact exception value.
    Instance(Arc<dyn Exception>),
    /// Any exception of these types or their subclasses.
    Types(SmallVec<[ExceptionType; 2]>),
}

impl Expected {
    /// Expects any of `types`, the tuple form.
    pub fn types(types: impl IntoIterator<Item = ExceptionType>) -> Self {
        Self::Types(types.into_iter().collect())
    }
}

impl<E: Exception> From<E> for Expected {
    fn from(exc: E) -> Self {
        Self::Instance(Arc::new(exc))
    }
}

impl From<ExceptionType> for Expected {
    fn from(exception_type: ExceptionType) -> Self {
        Self::Types(SmallVec::from_elem(exception_type, 1))
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaisesOptions {
    /// Regular expression searched in the exception's message.
    pub pattern: Option<String>,
    /// Custom failure message when nothing is raised; selects type matching.
    pub message: Option<String>,
}

impl RaisesOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The dispatch function a test harness installs once, bound to a comparator registry.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    registry: ComparatorRegistry,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: ComparatorRegistry) -> Self {
        Self { registry }
    }

    /// A dispatcher over the process-wide registry.
    #[must_use]
    pub fn global() -> Self {
        Self::new(ComparatorRegistry::global().clone())
    }

    #[must_use]
    pub fn registry(&self) -> &ComparatorRegistry {
        &self.registry
    }

    pub fn raises(&self, expected: impl Into<Expected>) -> Raises {
        self.raises_with(expected, RaisesOptions::default())
    }

    /// Builds the capture for one assertion.
    ///
    /// An instance without a `message` option gets an exact-value [`ScopedCapture`]; everything
    /// else goes to the type-based [`TypeCapture`].
    pub fn raises_with(&self, expected: impl Into<Expected>, options: RaisesOptions) -> Raises {
        let RaisesOptions { pattern, message } = options;
        let types = match expected.into() {
            Expected::Instance(instance) if message.is_none() => {
                return Raises::Instance(ScopedCapture::from_parts(instance, pattern, self.registry.clone()));
            }
            Expected::Instance(instance) => SmallVec::from_elem(instance.exception_type(), 1),
            Expected::Types(types) => types,
        };
        let mut capture = TypeCapture::new(types);
        if let Some(pattern) = pattern {
            capture = capture.matching(pattern);
        }
        if let Some(message) = message {
            capture = capture.with_message(message);
        }
        Raises::Type(capture)
    }

    /// Starts registering a comparator for `E` in this dispatcher's registry.
    pub fn register<E: Exception>(&self) -> Registration {
        self.registry.register::<E>()
    }
}

/// The capture chosen by a [`Dispatcher`].
#[derive(Debug)]
pub enum Raises {
    Instance(ScopedCapture),
    Type(TypeCapture),
}

impl Raises {
    pub fn try_run<R: Outcome>(mut self, block: impl FnOnce() -> R) -> Result<ExceptionInfo, RaisesError> {
        capture::try_run(&mut self, block)
    }

    /// Runs `block`, panicking with the failure message if the assertion fails.
    ///
    /// On a match returns the filled [`ExceptionInfo`]. A non-matching exception comes back as
    /// `Err` when the block returned it, and keeps unwinding when the block panicked.
    #[track_caller]
    pub fn run<R: Outcome>(mut self, block: impl FnOnce() -> R) -> Result<ExceptionInfo, Raised> {
        capture::run(&mut self, block)
    }
}

impl Capture for Raises {
    fn enter(&mut self) -> Result<ExceptionInfo, RaisesError> {
        match self {
            Self::Instance(capture) => capture.enter(),
            Self::Type(capture) => capture.enter(),
        }
    }

    fn exit(&mut self, escaped: Option<Raised>) -> Result<Exit, RaisesError> {
        match self {
            Self::Instance(capture) => capture.exit(escaped),
            Self::Type(capture) => capture.exit(escaped),
        }
    }

    fn state(&self) -> CaptureState {
        match self {
            Self::Instance(capture) => capture.state(),
            Self::Type(capture) => capture.state(),
        }
    }
}

/// Expects `expected` to be raised, using the process-wide registry.
///
/// ```
/// use raisin::{builtins::IndexError, raises};
///
/// fn first(items: &[i64]) -> Result<i64, IndexError> {
///     items.first().copied().ok_or_else(|| IndexError::new("list index out of range"))
/// }
///
/// raises(IndexError::new("list index out of range")).run(|| first(&[])).unwrap();
/// ```
pub fn raises(expected: impl Into<Expected>) -> Raises {
    Dispatcher::global().raises(expected)
}

/// [`raises`] with a pattern or a custom not-raised message.
pub fn raises_with(expected: impl Into<Expected>, options: RaisesOptions) -> Raises {
    Dispatcher::global().raises_with(expected, options)
}

/// Starts registering a comparator for `E` in the process-wide registry.
///
/// ```
/// use raisin::{Mismatch, exception, register};
///
/// exception! {
///     pub struct QuotaExceeded;
/// }
///
/// register::<QuotaExceeded>().compare(|_: &QuotaExceeded, _: &QuotaExceeded| Mismatch::ensure(false, "user wtf message"));
/// ```
pub fn register<E: Exception>() -> Registration {
    ComparatorRegistry::global().register::<E>()
}

/// Starts registering one comparator for several types in the process-wide registry.
pub fn register_many(types: impl IntoIterator<Item = ExceptionType>) -> Registration {
    ComparatorRegistry::global().register_many(types)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        builtins::{IndexError, KeyError, LookupError},
        compare::Mismatch,
    };

    fn isolated() -> Dispatcher {
        Dispatcher::new(ComparatorRegistry::new())
    }

    #[test]
    fn instance_selects_scoped_capture() {
        let raises = isolated().raises_with(IndexError::new("x"), RaisesOptions::new().matching("x"));
        let Raises::Instance(capture) = raises else {
            panic!("an instance must be matched by value");
        };
        assert_eq!(capture.expected().pattern(), Some("x"));
        assert_eq!(capture.expected().exception_type(), ExceptionType::of::<IndexError>());
    }

    #[test]
    fn message_option_selects_type_capture() {
        let raises = isolated().raises_with(IndexError::new("x"), RaisesOptions::new().message("custom"));
        let Raises::Type(capture) = raises else {
            panic!("a message option must fall back to type matching");
        };
        assert_eq!(capture.expected_types(), [ExceptionType::of::<IndexError>()]);
        assert_eq!(capture.not_raised_message(), "custom");
    }

    #[test]
    fn types_select_type_capture() {
        let expected = Expected::types([ExceptionType::of::<KeyError>(), ExceptionType::of::<IndexError>()]);
        assert!(matches!(isolated().raises(expected), Raises::Type(_)));
        assert!(matches!(isolated().raises(ExceptionType::of::<LookupError>()), Raises::Type(_)));
    }

    #[test]
    fn dispatched_capture_uses_the_dispatcher_registry() {
        let dispatcher = isolated();
        dispatcher
            .register::<KeyError>()
            .compare(|_: &KeyError, _: &KeyError| Mismatch::ensure(false, "never"));
        let err = dispatcher
            .raises(KeyError::new("k"))
            .try_run(|| Err::<(), _>(KeyError::new("k")))
            .unwrap_err();
        assert_eq!(err.to_string(), "never");
    }

    #[test]
    fn state_follows_the_inner_capture() {
        let mut raises = isolated().raises(ExceptionType::of::<LookupError>());
        assert_eq!(raises.state(), CaptureState::Created);
        raises.enter().unwrap();
        raises.exit(Some(Raised::new(KeyError::new("k")))).unwrap();
        assert_eq!(raises.state(), CaptureState::Matched);
    }
}

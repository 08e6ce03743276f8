use std::{
    any::Any,
    backtrace::Backtrace,
    fmt,
    panic::Location,
    sync::Arc,
};

use crate::{
    builtins::Panic,
    exception::{Exception, ExceptionType},
};

/// Where an exception was raised.
///
/// The location is known for exceptions raised through `Raised::new` or `?`; panics only
/// report their message. The backtrace follows `RUST_BACKTRACE`, so it costs nothing unless
/// enabled.
#[derive(Debug, Clone)]
pub struct Traceback {
    location: Option<&'static Location<'static>>,
    backtrace: Option<Arc<Backtrace>>,
}

impl Traceback {
    #[track_caller]
    pub(crate) fn here() -> Self {
        Self {
            location: Some(Location::caller()),
            backtrace: Some(Arc::new(Backtrace::capture())),
        }
    }

    pub(crate) fn unknown() -> Self {
        Self {
            location: None,
            backtrace: None,
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }

    #[must_use]
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_deref()
    }
}

/// An exception in flight.
///
/// Any [`Exception`] converts into `Raised`, which is what lets a protected block raise with
/// `?` or by returning `Err(..)`. Clones share the same exception value.
#[derive(Clone)]
pub struct Raised {
    value: Arc<dyn Exception>,
    traceback: Traceback,
}

impl Raised {
    #[track_caller]
    pub fn new<E: Exception>(exc: E) -> Self {
        Self {
            value: Arc::new(exc),
            traceback: Traceback::here(),
        }
    }

    /// Converts a panic payload into the exception it carries.
    ///
    /// A `Raised` payload is taken as is, a string payload becomes [`Panic`] with the panic
    /// message, and anything else becomes `Panic("Box<dyn Any>")`, the same text the default
    /// panic hook prints for it.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(raised) = payload.downcast_ref::<Self>() {
            return raised.clone();
        }
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_owned()
        };
        Self {
            value: Arc::new(Panic::new(message)),
            traceback: Traceback::unknown(),
        }
    }

    #[must_use]
    pub fn value(&self) -> &dyn Exception {
        &*self.value
    }

    pub(crate) fn shared_value(&self) -> Arc<dyn Exception> {
        Arc::clone(&self.value)
    }

    #[must_use]
    pub fn exception_type(&self) -> ExceptionType {
        self.value.exception_type()
    }

    #[must_use]
    pub fn traceback(&self) -> &Traceback {
        &self.traceback
    }

    /// Returns the concrete exception if it is exactly an `E`.
    #[must_use]
    pub fn downcast_ref<E: Exception>(&self) -> Option<&E> {
        self.value.downcast_ref::<E>()
    }
}

impl<E: Exception> From<E> for Raised {
    #[track_caller]
    fn from(exc: E) -> Self {
        Self::new(exc)
    }
}

impl fmt::Debug for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Raised({})", self.value.repr())
    }
}

/// Formats as the last line of a traceback: `IndexError: list index out of range`.
impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.value.message();
        if message.is_empty() {
            f.write_str(self.exception_type().name())
        } else {
            write!(f, "{}: {message}", self.exception_type().name())
        }
    }
}

impl std::error::Error for Raised {}

/// What a protected block hands back when it returns instead of panicking.
///
/// Implemented for `()` and for `Result<T, E>` where the error converts into [`Raised`], so
/// a block can be written either as plain statements or with `?`.
pub trait Outcome {
    /// The exception that escaped through the return value, if any.
    fn into_raised(self) -> Option<Raised>;
}

impl Outcome for () {
    fn into_raised(self) -> Option<Raised> {
        None
    }
}

impl<T, E: Into<Raised>> Outcome for Result<T, E> {
    fn into_raised(self) -> Option<Raised> {
        self.err().map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::panic::panic_any;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builtins::{IndexError, KeyError};

    #[test]
    fn display_is_traceback_tail() {
        assert_eq!(Raised::new(IndexError::new("oops")).to_string(), "IndexError: oops");
        assert_eq!(Raised::new(KeyError::empty()).to_string(), "KeyError");
    }

    #[test]
    fn raise_records_the_caller() {
        let raised = Raised::new(IndexError::new("x"));
        let location = raised.traceback().location().expect("raise location");
        assert!(location.file().ends_with("raised.rs"));
    }

    #[test]
    fn string_panic_payload_becomes_panic_exception() {
        let payload = std::panic::catch_unwind::<_, ()>(|| panic!("boom {}", 1)).expect_err("should panic");
        let raised = Raised::from_panic(&*payload);
        assert_eq!(raised.downcast_ref::<Panic>(), Some(&Panic::new("boom 1")));
        assert!(raised.traceback().location().is_none());
    }

    #[test]
    fn raised_payload_is_taken_as_is() {
        let payload =
            std::panic::catch_unwind::<_, ()>(|| panic_any(Raised::new(KeyError::new("k")))).expect_err("should panic");
        let raised = Raised::from_panic(&*payload);
        assert_eq!(raised.downcast_ref::<KeyError>(), Some(&KeyError::new("k")));
    }

    #[test]
    fn opaque_payload_is_described_like_the_panic_hook() {
        let payload = std::panic::catch_unwind::<_, ()>(|| panic_any(42_u8)).expect_err("should panic");
        let raised = Raised::from_panic(&*payload);
        assert_eq!(raised.value().message(), "Box<dyn Any>");
    }

    #[test]
    fn results_convert_into_outcomes() {
        assert!(().into_raised().is_none());
        assert!(Ok::<_, IndexError>(1).into_raised().is_none());
        let raised = Err::<(), _>(IndexError::new("x")).into_raised().expect("raised");
        assert_eq!(raised.exception_type(), IndexError::exception_type());
    }
}

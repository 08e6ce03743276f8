use std::sync::{Arc, OnceLock};

use crate::{
    error::RaisesError,
    exception::{Exception, ExceptionType},
    pattern,
    raised::{Raised, Traceback},
};

/// The exception that left a protected block: its exact type, value and traceback.
#[derive(Debug, Clone)]
pub struct CapturedException {
    exception_type: ExceptionType,
    value: Arc<dyn Exception>,
    traceback: Traceback,
}

impl CapturedException {
    #[must_use]
    pub fn exception_type(&self) -> ExceptionType {
        self.exception_type
    }

    #[must_use]
    pub fn value(&self) -> &dyn Exception {
        &*self.value
    }

    #[must_use]
    pub fn traceback(&self) -> &Traceback {
        &self.traceback
    }
}

impl From<&Raised> for CapturedException {
    fn from(raised: &Raised) -> Self {
        Self {
            exception_type: raised.exception_type(),
            value: raised.shared_value(),
            traceback: raised.traceback().clone(),
        }
    }
}

/// Handle to the exception a capture will record.
///
/// Returned on entering a capture, before anything was raised, and filled exactly once
/// when the block exits with an exception. Clones observe the same slot, so the handle
/// can be inspected after the block completes:
///
/// ```
/// use raisin::{builtins::IndexError, raises};
///
/// let info = raises(IndexError::new("gone")).run(|| Err::<(), _>(IndexError::new("gone"))).unwrap();
/// assert_eq!(info.type_name(), Some("IndexError"));
/// assert_eq!(info.message().as_deref(), Some("gone"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExceptionInfo {
    slot: Arc<OnceLock<CapturedException>>,
}

impl ExceptionInfo {
    /// Creates an unfilled placeholder.
    #[must_use]
    pub fn for_later() -> Self {
        Self::default()
    }

    /// Fills the placeholder; returns false if it was already filled.
    pub(crate) fn fill(&self, captured: CapturedException) -> bool {
        self.slot.set(captured).is_ok()
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.slot.get().is_some()
    }

    #[must_use]
    pub fn get(&self) -> Option<&CapturedException> {
        self.slot.get()
    }

    #[must_use]
    pub fn exception_type(&self) -> Option<ExceptionType> {
        self.get().map(CapturedException::exception_type)
    }

    #[must_use]
    pub fn type_name(&self) -> Option<&'static str> {
        self.exception_type().map(|ty| ty.name())
    }

    #[must_use]
    pub fn value(&self) -> Option<&dyn Exception> {
        self.get().map(CapturedException::value)
    }

    /// Returns the captured exception if it is exactly an `E`.
    #[must_use]
    pub fn downcast_ref<E: Exception>(&self) -> Option<&E> {
        self.value()?.downcast_ref::<E>()
    }

    #[must_use]
    pub fn traceback(&self) -> Option<&Traceback> {
        self.get().map(CapturedException::traceback)
    }

    /// str() of the captured exception.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.value().map(|value| value.message())
    }

    /// Checks the captured exception's message against a regular expression.
    ///
    /// Uses search semantics, so the pattern may match anywhere in the message. An unfilled
    /// placeholder is matched as an empty message.
    pub fn matches(&self, pattern: &str) -> Result<(), RaisesError> {
        pattern::search(pattern, &self.message().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builtins::{IndexError, LookupError};

    #[test]
    fn placeholder_starts_empty() {
        let info = ExceptionInfo::for_later();
        assert!(!info.is_filled());
        assert_eq!(info.type_name(), None);
        assert!(info.value().is_none());
    }

    #[test]
    fn fill_is_one_shot_and_shared_between_clones() {
        let info = ExceptionInfo::for_later();
        let observer = info.clone();
        let first = Raised::new(IndexError::new("first"));
        let second = Raised::new(IndexError::new("second"));
        assert!(info.fill(CapturedException::from(&first)));
        assert!(!info.fill(CapturedException::from(&second)));
        assert_eq!(observer.downcast_ref::<IndexError>(), Some(&IndexError::new("first")));
        assert!(observer.downcast_ref::<LookupError>().is_none());
    }

    #[test]
    fn matches_searches_the_message() {
        let info = ExceptionInfo::for_later();
        info.fill(CapturedException::from(&Raised::new(IndexError::new("list index out of range"))));
        assert!(info.matches("index out").is_ok());
        assert!(matches!(info.matches("^range"), Err(RaisesError::PatternMismatch { .. })));
    }
}

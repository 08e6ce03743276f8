//! Comparators decide whether a raised exception is equivalent to the expected one.
//!
//! A comparator signals a match by returning `Ok(())` and a mismatch by returning a
//! [`Mismatch`] whose message is shown to the user verbatim.

use std::{any, fmt, sync::Arc};

use crate::exception::Exception;

/// Result of a comparison.
pub type CompareResult = Result<(), Mismatch>;

/// A comparator's verdict that two exceptions are not equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    message: String,
}

impl Mismatch {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// `Ok(())` when `condition` holds, otherwise a mismatch with `message`.
    ///
    /// ```
    /// use raisin::Mismatch;
    ///
    /// assert!(Mismatch::ensure(1 == 1, "never shown").is_ok());
    /// assert_eq!(Mismatch::ensure(1 == 2, "user wtf message").unwrap_err().message(), "user wtf message");
    /// ```
    pub fn ensure(condition: bool, message: impl Into<String>) -> CompareResult {
        if condition { Ok(()) } else { Err(Self::new(message)) }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Mismatch {}

type CompareFn = dyn Fn(&dyn Exception, &dyn Exception) -> CompareResult + Send + Sync;

/// A shareable comparison function.
///
/// Receives the actual (raised) exception first and the expected one second. Cloning is
/// cheap and clones compare identically.
#[derive(Clone)]
pub struct Comparator {
    name: &'static str,
    func: Arc<CompareFn>,
}

impl Comparator {
    /// Wraps a function over type-erased exceptions, suitable for registering under several
    /// exception types at once.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&dyn Exception, &dyn Exception) -> CompareResult + Send + Sync + 'static,
    {
        Self {
            name: any::type_name::<F>(),
            func: Arc::new(func),
        }
    }

    /// Wraps a function over a concrete exception type.
    ///
    /// Both sides are downcast to `E` before the call; if either is not exactly an `E` the
    /// comparison fails without calling `func`.
    pub fn typed<E, F>(func: F) -> Self
    where
        E: Exception,
        F: Fn(&E, &E) -> CompareResult + Send + Sync + 'static,
    {
        Self {
            name: any::type_name::<F>(),
            func: Arc::new(move |actual: &dyn Exception, expected: &dyn Exception| {
                match (actual.downcast_ref::<E>(), expected.downcast_ref::<E>()) {
                    (Some(actual), Some(expected)) => func(actual, expected),
                    _ => Err(Mismatch::new(format!(
                        "comparator for {} cannot compare {} with {}",
                        E::exception_type(),
                        actual.exception_type(),
                        expected.exception_type(),
                    ))),
                }
            }),
        }
    }

    /// The built-in structural comparator, used when nothing is registered.
    #[must_use]
    pub fn default_compare() -> Self {
        Self::new(default_compare)
    }

    /// Name of the wrapped function, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn compare(&self, actual: &dyn Exception, expected: &dyn Exception) -> CompareResult {
        (self.func)(actual, expected)
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Comparator").field(&self.name).finish()
    }
}

/// Compares the positional argument tuples of both exceptions.
///
/// Any other state the exceptions carry is ignored; register a comparator for types where
/// that matters.
pub fn default_compare(actual: &dyn Exception, expected: &dyn Exception) -> CompareResult {
    let actual_args = actual.args();
    let expected_args = expected.args();
    if actual_args == expected_args {
        return Ok(());
    }
    Err(Mismatch::new(format!(
        "{} args do not match!\n    Actual:   {actual_args}\n    Expected: {expected_args}",
        expected.exception_type().name(),
    )))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        args,
        builtins::{IndexError, KeyError, SystemExit},
    };

    #[test]
    fn default_compare_accepts_equal_args() {
        assert_eq!(default_compare(&IndexError::new("x"), &IndexError::new("x")), Ok(()));
    }

    #[test]
    fn default_compare_reports_both_tuples() {
        let err = default_compare(
            &IndexError::new("list index out of range"),
            &IndexError::new("wrong message"),
        )
        .unwrap_err();
        assert_eq!(
            err.message(),
            "IndexError args do not match!\n    Actual:   ('list index out of range',)\n    Expected: ('wrong message',)"
        );
    }

    #[test]
    fn default_compare_is_order_sensitive() {
        let err = default_compare(
            &SystemExit::with_args(args!["bye", 2]),
            &SystemExit::with_args(args![2, "bye"]),
        )
        .unwrap_err();
        assert!(err.message().contains("Actual:   ('bye', 2)"));
    }

    #[test]
    fn typed_comparator_refuses_foreign_types() {
        let comparator = Comparator::typed(|_: &IndexError, _: &IndexError| Ok(()));
        let err = comparator.compare(&KeyError::new("x"), &IndexError::new("x")).unwrap_err();
        assert_eq!(err.message(), "comparator for IndexError cannot compare KeyError with IndexError");
    }

    #[test]
    fn comparator_name_identifies_the_function() {
        assert!(Comparator::default_compare().name().ends_with("default_compare"));
    }
}

//! The standard exception hierarchy.
//!
//! Mirrors the familiar built-in classes so tests can say `IndexError::new("...")` without
//! declaring anything. The hierarchy only matters to the type-based fallback; instance
//! matching compares exact types:
//! - `BaseException` is the root; `SystemExit`, `KeyboardInterrupt` and `Panic` derive from
//!   it directly and are not `Exception`s
//! - `LookupError` is the base for `IndexError` and `KeyError`
//! - `ArithmeticError` is the base for `ZeroDivisionError` and `OverflowError`
//! - `RuntimeError` is the base for `NotImplementedError` and `RecursionError`
//! - `OSError` is the base for `FileNotFoundError`, `PermissionError` and `TimeoutError`

crate::exception! {
    /// Root of the hierarchy, matches everything in type-based checks.
    pub struct BaseException;
    pub struct SystemExit: BaseException;
    pub struct KeyboardInterrupt: BaseException;
    /// A plain Rust panic that escaped a protected block.
    ///
    /// Its single argument is the panic message, so `Panic::new("boom")` matches `panic!("boom")`.
    pub struct Panic: BaseException;

    /// Base class of all ordinary exceptions.
    pub struct Exception: BaseException;

    /// Intermediate class for arithmetic errors.
    pub struct ArithmeticError: Exception;
    pub struct ZeroDivisionError: ArithmeticError;
    pub struct OverflowError: ArithmeticError;

    /// Intermediate class for lookup errors.
    pub struct LookupError: Exception;
    pub struct IndexError: LookupError;
    pub struct KeyError: LookupError;

    pub struct RuntimeError: Exception;
    pub struct NotImplementedError: RuntimeError;
    pub struct RecursionError: RuntimeError;

    /// OS-related errors (file not found, permission denied, etc.)
    pub struct OSError: Exception;
    pub struct FileNotFoundError: OSError;
    pub struct PermissionError: OSError;
    pub struct TimeoutError: OSError;

    pub struct AssertionError: Exception;
    pub struct AttributeError: Exception;
    pub struct NameError: Exception;
    pub struct TypeError: Exception;
    pub struct ValueError: Exception;
}

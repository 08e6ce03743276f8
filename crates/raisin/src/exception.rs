use std::{
    any::{Any, TypeId},
    fmt::{self, Write},
    hash::{Hash, Hasher},
};

use crate::args::Args;

/// Upper bound on base-chain walks, guarding against a hand-written cyclic hierarchy.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// Runtime descriptor of an exception type.
///
/// Two descriptors are equal exactly when they describe the same Rust type: equality and
/// hashing use the `TypeId` only, so the name is purely for display. The optional base
/// links the type into a hierarchy, which only the subclass-accepting fallback consults;
/// instance matching never looks past the exact type.
#[derive(Clone, Copy)]
pub struct ExceptionType {
    id: TypeId,
    name: &'static str,
    base: Option<fn() -> ExceptionType>,
}

impl ExceptionType {
    /// Returns the descriptor of `E`.
    #[must_use]
    pub fn of<E: Exception>() -> Self {
        E::exception_type()
    }

    /// Creates a root descriptor (no base) for the Rust type `T`.
    #[must_use]
    pub fn new<T: Any>(name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
            base: None,
        }
    }

    /// Sets the base type, e.g. `ExceptionType::new::<Self>("IndexError").extending(LookupError::exception_type)`.
    #[must_use]
    pub const fn extending(mut self, base: fn() -> Self) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn base(&self) -> Option<Self> {
        self.base.map(|base| base())
    }

    /// Iterates this type followed by its bases, nearest first.
    pub fn mro(self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(self), Self::base).take(MAX_HIERARCHY_DEPTH)
    }

    /// Checks if this type is `other` or derives from it.
    ///
    /// This is the relation the type-based fallback uses; a `ScopedCapture` deliberately
    /// compares descriptors with `==` instead.
    #[must_use]
    pub fn is_subclass_of(self, other: Self) -> bool {
        self.mro().any(|ty| ty == other)
    }
}

impl PartialEq for ExceptionType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ExceptionType {}

impl Hash for ExceptionType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.name)
    }
}

impl fmt::Display for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An exception value that can be raised out of a protected block and compared.
///
/// Implement this for custom error types; simple args-only exceptions are easier to
/// declare with [`exception!`](crate::exception!). Stored and compared exceptions are
/// handled as `dyn Exception`.
///
/// ```
/// use raisin::{Args, Exception, ExceptionType, args, builtins};
///
/// #[derive(Debug)]
/// struct MyError {
///     code: i64,
/// }
///
/// impl Exception for MyError {
///     fn exception_type() -> ExceptionType {
///         ExceptionType::new::<Self>("MyError").extending(builtins::Exception::exception_type)
///     }
///
///     fn args(&self) -> Args {
///         args![self.code]
///     }
/// }
///
/// assert_eq!(MyError { code: 2 }.repr(), "MyError(2)");
/// ```
pub trait Exception: Any + fmt::Debug + Send + Sync + ErasedException {
    /// Descriptor used for exact-type checks and comparator lookup.
    fn exception_type() -> ExceptionType
    where
        Self: Sized;

    /// Positional constructor arguments.
    fn args(&self) -> Args;

    /// str() of the exception, the text a pattern is matched against.
    fn message(&self) -> String {
        self.args().message()
    }

    /// `Name(arg, ...)`, as Python would repr the exception.
    ///
    /// Shown in "DID NOT RAISE" failures; override it for types whose args do not tell the
    /// whole story.
    fn repr(&self) -> String {
        repr(self.erased_type().name(), &self.args())
    }
}

fn repr(name: &str, args: &Args) -> String {
    let mut s = String::new();
    // writing into a String cannot fail
    let _ = repr_fmt(name, args, &mut s);
    s
}

fn repr_fmt(name: &str, args: &Args, f: &mut impl Write) -> fmt::Result {
    f.write_str(name)?;
    f.write_char('(')?;
    args.inner_repr_fmt(f)?;
    f.write_char(')')
}

/// Object-safe plumbing behind `dyn Exception`, implemented for every [`Exception`].
#[doc(hidden)]
pub trait ErasedException {
    fn erased_type(&self) -> ExceptionType;

    fn as_any(&self) -> &dyn Any;
}

impl<E: Exception> ErasedException for E {
    fn erased_type(&self) -> ExceptionType {
        E::exception_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn Exception + '_ {
    /// Descriptor of the concrete type behind this exception.
    #[must_use]
    pub fn exception_type(&self) -> ExceptionType {
        self.erased_type()
    }

    /// Returns the concrete exception if it is exactly an `E`.
    #[must_use]
    pub fn downcast_ref<E: Exception>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }

    #[must_use]
    pub fn is<E: Exception>(&self) -> bool {
        self.as_any().is::<E>()
    }
}

/// Declares args-only exception types, optionally deriving from a base.
///
/// Each declaration produces a struct holding an [`Args`](crate::Args) tuple, with
/// `new(arg)`, `with_args(args)` and `empty()` constructors and an
/// [`Exception`](crate::Exception) impl.
///
/// ```
/// use raisin::{Exception, ExceptionType, args, exception};
///
/// exception! {
///     /// Raised by the parser.
///     pub struct ParseError;
///     pub struct UnexpectedEof: ParseError;
/// }
///
/// let exc = UnexpectedEof::with_args(args![3, "eof"]);
/// assert_eq!(exc.repr(), "UnexpectedEof(3, 'eof')");
/// assert!(ExceptionType::of::<UnexpectedEof>().is_subclass_of(ExceptionType::of::<ParseError>()));
/// ```
#[macro_export]
macro_rules! exception {
    ($(
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(: $base:ty)?;
    )*) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default)]
        $vis struct $name {
            args: $crate::Args,
        }

        impl $name {
            /// Creates the exception with a single argument.
            #[must_use]
            pub fn new(arg: impl Into<$crate::Arg>) -> Self {
                Self {
                    args: $crate::Args::from_vec(vec![arg.into()]),
                }
            }

            /// Creates the exception from a full argument tuple.
            #[must_use]
            pub fn with_args(args: $crate::Args) -> Self {
                Self { args }
            }

            /// Creates the exception without arguments.
            #[must_use]
            pub fn empty() -> Self {
                Self::default()
            }
        }

        impl $crate::Exception for $name {
            fn exception_type() -> $crate::ExceptionType {
                $crate::ExceptionType::new::<Self>(stringify!($name))
                    $(.extending(<$base as $crate::Exception>::exception_type))?
            }

            fn args(&self) -> $crate::Args {
                self.args.clone()
            }
        }
    )*};
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        args,
        builtins::{self, BaseException, IndexError, KeyError, LookupError, SystemExit},
    };

    #[test]
    fn descriptor_equality_uses_type_identity() {
        assert_eq!(ExceptionType::of::<IndexError>(), ExceptionType::of::<IndexError>());
        assert_ne!(ExceptionType::of::<IndexError>(), ExceptionType::of::<KeyError>());
        assert_ne!(ExceptionType::of::<IndexError>(), ExceptionType::of::<LookupError>());
    }

    #[test]
    fn mro_walks_to_the_root() {
        let names: Vec<_> = ExceptionType::of::<IndexError>().mro().map(|ty| ty.name()).collect();
        assert_eq!(names, ["IndexError", "LookupError", "Exception", "BaseException"]);
    }

    #[test]
    fn subclass_relation_is_directional() {
        let index = ExceptionType::of::<IndexError>();
        let lookup = ExceptionType::of::<LookupError>();
        assert!(index.is_subclass_of(lookup));
        assert!(index.is_subclass_of(index));
        assert!(!lookup.is_subclass_of(index));
        assert!(!ExceptionType::of::<SystemExit>().is_subclass_of(ExceptionType::of::<builtins::Exception>()));
        assert!(ExceptionType::of::<SystemExit>().is_subclass_of(ExceptionType::of::<BaseException>()));
    }

    #[test]
    fn repr_omits_single_element_comma() {
        assert_eq!(IndexError::new("x").repr(), "IndexError('x')");
        assert_eq!(SystemExit::with_args(args![2, "bye"]).repr(), "SystemExit(2, 'bye')");
        assert_eq!(KeyError::empty().repr(), "KeyError()");
    }

    #[test]
    fn erased_view_downcasts_exactly() {
        let exc: &dyn Exception = &IndexError::new("x");
        assert!(exc.is::<IndexError>());
        assert!(exc.downcast_ref::<LookupError>().is_none());
        assert_eq!(exc.exception_type(), ExceptionType::of::<IndexError>());
        assert_eq!(exc.downcast_ref::<IndexError>(), Some(&IndexError::new("x")));
        assert_eq!(exc.repr(), "IndexError('x')");
        assert_eq!(exc.message(), "x");
    }

    #[derive(Debug)]
    struct Opaque;

    impl Exception for Opaque {
        fn exception_type() -> ExceptionType {
            ExceptionType::new::<Self>("Opaque")
        }

        fn args(&self) -> Args {
            args![1]
        }

        fn repr(&self) -> String {
            "Opaque<handle>".to_owned()
        }
    }

    #[test]
    fn repr_override_survives_erasure() {
        let exc: &dyn Exception = &Opaque;
        assert_eq!(exc.repr(), "Opaque<handle>");
        assert_eq!(Opaque.repr(), "Opaque<handle>");
    }
}

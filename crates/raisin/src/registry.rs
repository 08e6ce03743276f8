//! Comparator registry: which function decides equivalence for which exception type.
//!
//! The registry is consulted with the *expected* exception's type only, so the comparator
//! is chosen by what the test expects, never by what was actually raised. Lookups during
//! matching only read; writes happen when tests register comparators.

use std::sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::RandomState;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    compare::Comparator,
    exception::{Exception, ExceptionType},
};

type ComparatorMap = IndexMap<ExceptionType, Comparator, RandomState>;

static GLOBAL: LazyLock<ComparatorRegistry> = LazyLock::new(ComparatorRegistry::new);

/// Mapping from exception type to the comparator used for it.
///
/// A cheaply clonable handle: clones share the same entries. Use [`global`](Self::global)
/// for the process-wide registry the free functions use, or [`new`](Self::new) for an
/// isolated one, e.g. per test.
///
/// Registration is checked by the compiler: only [`Exception`] types can be registered,
/// ```compile_fail
/// raisin::ComparatorRegistry::new().register::<u32>();
/// ```
/// and only functions can be registered as comparators.
/// ```compile_fail
/// use raisin::{ComparatorRegistry, Comparator, builtins::KeyError};
///
/// ComparatorRegistry::new().register::<KeyError>().with(Comparator::new(123));
/// ```
#[derive(Clone, Default)]
pub struct ComparatorRegistry {
    comparators: Arc<RwLock<ComparatorMap>>,
}

impl ComparatorRegistry {
    /// Creates an empty, isolated registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, empty at start and kept for the life of the process.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Starts registering a comparator for `E`.
    ///
    /// ```
    /// use raisin::{ComparatorRegistry, Comparator, Exception, Mismatch, builtins::KeyError};
    ///
    /// let registry = ComparatorRegistry::new();
    /// registry.register::<KeyError>().with(Comparator::typed(|actual: &KeyError, expected: &KeyError| {
    ///     Mismatch::ensure(actual.message() == expected.message(), "keys differ")
    /// }));
    /// assert!(registry.contains::<KeyError>());
    /// ```
    pub fn register<E: Exception>(&self) -> Registration {
        self.register_many([ExceptionType::of::<E>()])
    }

    /// Starts registering one comparator for several exception types at once.
    pub fn register_many(&self, types: impl IntoIterator<Item = ExceptionType>) -> Registration {
        Registration {
            registry: self.clone(),
            targets: types.into_iter().collect(),
        }
    }

    /// Stores `comparator` under `exception_type`, replacing (with a warning) any previous one.
    pub fn insert(&self, exception_type: ExceptionType, comparator: Comparator) -> Option<Comparator> {
        let mut comparators = self.write();
        if comparators.contains_key(&exception_type) {
            tracing::warn!("{exception_type:?} was registered multiple times");
        }
        let name = comparator.name();
        let previous = comparators.insert(exception_type, comparator);
        tracing::debug!("Registered {name} to handle {exception_type:?} comparisons");
        previous
    }

    /// The comparator registered for exactly `exception_type`.
    #[must_use]
    pub fn get(&self, exception_type: ExceptionType) -> Option<Comparator> {
        self.read().get(&exception_type).cloned()
    }

    /// The registered comparator, or the default structural one.
    #[must_use]
    pub fn comparator_for(&self, exception_type: ExceptionType) -> Comparator {
        self.get(exception_type).unwrap_or_else(Comparator::default_compare)
    }

    #[must_use]
    pub fn contains<E: Exception>(&self) -> bool {
        self.read().contains_key(&ExceptionType::of::<E>())
    }

    /// Registered types, in registration order.
    #[must_use]
    pub fn registered_types(&self) -> Vec<ExceptionType> {
        self.read().keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Removes the comparator for `exception_type`, if any.
    pub fn unregister(&self, exception_type: ExceptionType) -> Option<Comparator> {
        self.write().shift_remove(&exception_type)
    }

    /// Removes every entry, e.g. when a test session ends.
    pub fn clear(&self) {
        self.write().clear();
    }

    // a comparator that panicked mid-registration cannot leave the map half-written,
    // so a poisoned lock is still safe to use
    fn read(&self) -> RwLockReadGuard<'_, ComparatorMap> {
        self.comparators.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ComparatorMap> {
        self.comparators.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ComparatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.read().iter()).finish()
    }
}

/// A pending registration, completed by [`with`](Self::with).
#[derive(Debug)]
#[must_use = "nothing is registered until `with` is called"]
pub struct Registration {
    registry: ComparatorRegistry,
    targets: SmallVec<[ExceptionType; 2]>,
}

impl Registration {
    /// Registers `comparator` for every target type and hands it back.
    pub fn with(self, comparator: Comparator) -> Comparator {
        for exception_type in &self.targets {
            self.registry.insert(*exception_type, comparator.clone());
        }
        comparator
    }

    /// Registers a typed comparator; shorthand for `with(Comparator::typed(func))`.
    ///
    /// Every target must be exactly `E`, otherwise the comparator reports a mismatch when
    /// it is handed another type.
    pub fn compare<E, F>(self, func: F) -> Comparator
    where
        E: Exception,
        F: Fn(&E, &E) -> crate::compare::CompareResult + Send + Sync + 'static,
    {
        self.with(Comparator::typed(func))
    }

    /// The types this registration will cover.
    #[must_use]
    pub fn targets(&self) -> &[ExceptionType] {
        &self.targets
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use uuid::Uuid;

/// Identity of a [`Predicate`].
///
/// Assigned once at construction and shared by every clone of the handle.
/// Two predicates built from identical closures still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PredicateId(Uuid);

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

type PredicateFn = dyn Fn(&PredicateCache) -> bool + Send + Sync;

/// A cacheable, lazily evaluated boolean condition.
///
/// A predicate carries no per-run state: the value it produced during a run
/// lives in the [`PredicateCache`] of that run. Build predicates once and
/// reuse them across runs and across rules.
#[derive(Clone)]
pub struct Predicate {
    id: PredicateId,
    f: Arc<PredicateFn>,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("id", &self.id).finish()
    }
}

impl Predicate {
    /// Creates a leaf predicate from a zero-argument function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::with_cache(move |_| f())
    }

    /// Creates a predicate whose function receives the cache it is evaluated
    /// against, so it can evaluate other predicates through it.
    pub fn with_cache<F>(f: F) -> Self
    where
        F: Fn(&PredicateCache) -> bool + Send + Sync + 'static,
    {
        Predicate {
            id: PredicateId(Uuid::new_v4()),
            f: Arc::new(f),
        }
    }

    pub fn id(&self) -> PredicateId {
        self.id
    }

    /// Evaluates this predicate against `cache`. Same as [`PredicateCache::eval`].
    pub fn eval(&self, cache: &PredicateCache) -> bool {
        cache.eval(self)
    }

    /// Logical AND of `preds`, evaluated left to right.
    ///
    /// Stops at the first false child; children after it are neither invoked
    /// nor cached. An empty list is true.
    pub fn and<I>(preds: I) -> Self
    where
        I: IntoIterator<Item = Predicate>,
    {
        let children: Vec<Predicate> = preds.into_iter().collect();
        Self::with_cache(move |cache| children.iter().all(|p| cache.eval(p)))
    }

    /// Logical OR of `preds`, evaluated left to right.
    ///
    /// Stops at the first true child. An empty list is false.
    pub fn or<I>(preds: I) -> Self
    where
        I: IntoIterator<Item = Predicate>,
    {
        let children: Vec<Predicate> = preds.into_iter().collect();
        Self::with_cache(move |cache| children.iter().any(|p| cache.eval(p)))
    }

    /// Logical negation of `pred`.
    pub fn not(pred: Predicate) -> Self {
        Self::with_cache(move |cache| !cache.eval(&pred))
    }

    pub fn always_true() -> Self {
        Self::new(|| true)
    }

    pub fn always_false() -> Self {
        Self::new(|| false)
    }
}

/// See [`Predicate::and`].
pub fn and<I: IntoIterator<Item = Predicate>>(preds: I) -> Predicate {
    Predicate::and(preds)
}

/// See [`Predicate::or`].
pub fn or<I: IntoIterator<Item = Predicate>>(preds: I) -> Predicate {
    Predicate::or(preds)
}

/// See [`Predicate::not`].
pub fn not(pred: Predicate) -> Predicate {
    Predicate::not(pred)
}

pub fn always_true() -> Predicate {
    Predicate::always_true()
}

pub fn always_false() -> Predicate {
    Predicate::always_false()
}

/// Per-run memo table of predicate values, keyed by predicate identity.
///
/// Once a predicate has a value in a cache, its function is never invoked
/// again for that cache. A fresh cache is created for every run.
#[derive(Default)]
pub struct PredicateCache {
    values: Mutex<HashMap<PredicateId, Arc<OnceLock<bool>>>>,
}

impl fmt::Debug for PredicateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateCache")
            .field("len", &self.len())
            .finish()
    }
}

impl PredicateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized value of `pred`, computing and storing it first
    /// if this cache has not seen it.
    ///
    /// Each predicate owns a once-cell in the table. The table lock only
    /// guards finding that cell, so composite predicates may re-enter the
    /// cache. Branches racing on the same predicate wait for the first one
    /// to finish and all observe its value.
    pub fn eval(&self, pred: &Predicate) -> bool {
        let cell = self.table().entry(pred.id).or_default().clone();
        if let Some(value) = cell.get() {
            log::trace!("predicate {} cached: {}", pred.id, value);
            return *value;
        }
        let value = *cell.get_or_init(|| (pred.f)(self));
        log::trace!("predicate {} evaluated: {}", pred.id, value);
        value
    }

    /// Peeks at the memoized value without evaluating.
    pub fn get(&self, pred: &Predicate) -> Option<bool> {
        self.table().get(&pred.id).and_then(|cell| cell.get().copied())
    }

    pub fn contains(&self, pred: &Predicate) -> bool {
        self.get(pred).is_some()
    }

    /// Number of predicates with a settled value.
    pub fn len(&self) -> usize {
        self.table().values().filter(|cell| cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries are only ever added, so a poisoned lock is still consistent.
    fn table(&self) -> MutexGuard<'_, HashMap<PredicateId, Arc<OnceLock<bool>>>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

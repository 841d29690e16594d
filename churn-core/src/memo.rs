//! Instrumented memoization
//!
//! [`memoize`] wraps an expensive, pure producer so that each distinct
//! argument tuple is computed once per wrapper and then served from the
//! wrapper's private [`FlightCache`]. Every call, hit or miss, is bracketed by
//! `calling` / `completed` log events tagged with the wrapper's label and the
//! environment label.
//!
//! Arguments must be `Hash + Eq + Clone`; there is no runtime fallback for
//! arguments that cannot be hashed.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStats, FlightCache};
use crate::settings::EnvironmentContext;

/// Log label for dataset loaders
pub const DATA_LOAD: &str = "DATA_LOAD";

/// Log label for model loaders
pub const MODEL_LOAD: &str = "MODEL_LOAD";

/// Identity of one memoized call: the producer plus its arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey<A> {
    /// Name of the producer the arguments were passed to
    pub producer: &'static str,

    /// The argument tuple
    pub args: A,
}

/// Run `f` between `calling` and `completed` log events.
///
/// A failing `f` logs `failed` at WARN instead of `completed`.
pub fn instrumented<T, E, F>(
    label: &str,
    producer: &str,
    context: &EnvironmentContext,
    f: F,
) -> Result<T, E>
where
    E: fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    info!(env = context.env(), label, producer, "calling {label} {producer}");
    match f() {
        Ok(value) => {
            info!(env = context.env(), label, producer, "completed {label} {producer}");
            Ok(value)
        }
        Err(err) => {
            warn!(env = context.env(), label, producer, error = %err, "failed {label} {producer}");
            Err(err)
        }
    }
}

/// A producer wrapped with a per-argument result cache
pub struct Memoized<A, V, E, F> {
    /// Log category, e.g. [`DATA_LOAD`]
    label: &'static str,

    /// Producer name used in keys and log events
    producer: &'static str,

    /// Environment tagged onto log events
    context: EnvironmentContext,

    /// Results owned by this wrapper only
    cache: FlightCache<CacheKey<A>, V>,

    /// The wrapped producer
    func: F,

    _error: PhantomData<fn() -> E>,
}

/// Wrap `func` in a memoizing, logging combinator
pub fn memoize<A, V, E, F>(
    label: &'static str,
    producer: &'static str,
    context: EnvironmentContext,
    func: F,
) -> Memoized<A, V, E, F>
where
    A: Hash + Eq + Clone,
    V: Clone,
    E: fmt::Display,
    F: Fn(&A) -> Result<V, E>,
{
    Memoized::new(label, producer, context, func)
}

impl<A, V, E, F> Memoized<A, V, E, F>
where
    A: Hash + Eq + Clone,
    V: Clone,
    E: fmt::Display,
    F: Fn(&A) -> Result<V, E>,
{
    /// Create a new wrapper with an empty cache
    pub fn new(
        label: &'static str,
        producer: &'static str,
        context: EnvironmentContext,
        func: F,
    ) -> Self {
        Self {
            label,
            producer,
            context,
            cache: FlightCache::new(),
            func,
            _error: PhantomData,
        }
    }

    /// Return the cached result for `args`, computing it on first use.
    ///
    /// Errors from the producer are returned unchanged and never cached.
    pub fn call(&self, args: A) -> Result<V, E> {
        let key = CacheKey {
            producer: self.producer,
            args,
        };

        instrumented(self.label, self.producer, &self.context, || {
            let lookup = self
                .cache
                .get_or_try_insert_with(&key, || (self.func)(&key.args))?;
            debug!(
                label = self.label,
                producer = self.producer,
                hit = lookup.hit,
                "memo lookup"
            );
            Ok(lookup.value)
        })
    }

    /// Cached entry for `args`, if one exists
    pub fn cached(&self, args: A) -> Option<CacheEntry<CacheKey<A>, V>> {
        self.cache.entry(&CacheKey {
            producer: self.producer,
            args,
        })
    }

    /// Log label
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Producer name
    pub fn producer(&self) -> &'static str {
        self.producer
    }

    /// Cache activity counters
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl<V, E, F> Memoized<(), V, E, F>
where
    V: Clone,
    E: fmt::Display,
    F: Fn(&()) -> Result<V, E>,
{
    /// Call a zero-argument producer
    pub fn get(&self) -> Result<V, E> {
        self.call(())
    }
}

impl<A, V, E, F> fmt::Debug for Memoized<A, V, E, F>
where
    A: Hash + Eq + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("label", &self.label)
            .field("producer", &self.producer)
            .field("env", &self.context.env())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

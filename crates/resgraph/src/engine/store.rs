//! The dependency store: cached entries, reverse edges and in-flight
//! computations.

use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::{Condvar, Mutex};

use crate::{
    config::Config,
    engine::ResourceKey,
    error::Error,
    resource::{DynArgs, Resource},
};

/// A monotonic stamp assigned to every committed entry.
pub(crate) type Generation = u64;

pub(crate) type ErasedValue = Arc<dyn Any + Send + Sync>;

/// The dependencies read by a computation and the generation each one had
/// when it was read. `None` marks a read of an uncached value.
pub(crate) type RecordedDeps<C> =
    HashMap<ResourceKey, Option<Generation>, <C as Config>::BuildHasher>;

pub(crate) struct CacheEntry {
    pub(crate) type_id: TypeId,
    pub(crate) resource: &'static str,
    pub(crate) args: Box<dyn DynArgs>,
    pub(crate) value: ErasedValue,
    pub(crate) deps: Box<[ResourceKey]>,
    pub(crate) generation: Generation,
}

impl CacheEntry {
    pub(crate) fn new<R: Resource>(
        args: &R::Args,
        value: ErasedValue,
        deps: Box<[ResourceKey]>,
    ) -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            resource: std::any::type_name::<R>(),
            args: Box::new(args.clone()),
            value,
            deps,
            generation: 0,
        }
    }

    /// Recovers the typed value, checking that this entry really belongs to
    /// `R` with `args`.
    pub(crate) fn downcast<R: Resource>(
        &self,
        key: ResourceKey,
        args: &R::Args,
    ) -> Result<R::Value, Error> {
        if self.type_id != TypeId::of::<R>() || !self.args.eq_dyn(args) {
            return Err(self.integrity_violation::<R>(key, args));
        }

        self.value
            .downcast_ref::<R::Value>()
            .cloned()
            .ok_or_else(|| self.integrity_violation::<R>(key, args))
    }

    fn integrity_violation<R: Resource>(
        &self,
        key: ResourceKey,
        args: &R::Args,
    ) -> Error {
        Error::IntegrityViolation {
            key,
            requested: format!("{}{:?}", std::any::type_name::<R>(), args),
            cached: format!("{}{:?}", self.resource, self.args.as_debug()),
        }
    }
}

/// The value produced by a finished computation, shared with every caller
/// that waited on it. `generation` is `None` when the value was not cached.
#[derive(Clone)]
pub(crate) struct Computed {
    pub(crate) value: ErasedValue,
    pub(crate) generation: Option<Generation>,
}

/// The in-flight record of a key being computed.
pub(crate) struct Flight {
    outcome: Mutex<Option<Result<Computed, Error>>>,
    ready: Condvar,
    stale: AtomicBool,
}

impl Flight {
    pub(crate) fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            ready: Condvar::new(),
            stale: AtomicBool::new(false),
        }
    }

    pub(crate) fn complete(&self, outcome: Result<Computed, Error>) {
        *self.outcome.lock() = Some(outcome);
        self.ready.notify_all();
    }

    /// Blocks until the owner completes the flight.
    pub(crate) fn wait(&self) -> Result<Computed, Error> {
        let mut outcome = self.outcome.lock();

        loop {
            if let Some(outcome) = outcome.as_ref() {
                return outcome.clone();
            }

            self.ready.wait(&mut outcome);
        }
    }

    pub(crate) fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }
}

pub(crate) struct StoreState<C: Config> {
    pub(crate) entries: HashMap<ResourceKey, CacheEntry, C::BuildHasher>,
    pub(crate) subs: HashMap<
        ResourceKey,
        HashSet<ResourceKey, C::BuildHasher>,
        C::BuildHasher,
    >,
    pub(crate) in_flight: HashMap<ResourceKey, Arc<Flight>, C::BuildHasher>,
    last_generation: Generation,
}

impl<C: Config> Default for StoreState<C> {
    fn default() -> Self {
        Self {
            entries: HashMap::default(),
            subs: HashMap::default(),
            in_flight: HashMap::default(),
            last_generation: 0,
        }
    }
}

impl<C: Config> StoreState<C> {
    /// Checks that every recorded dependency is still cached with the
    /// generation the computation observed.
    pub(crate) fn deps_live<'a>(
        &self,
        mut deps: impl Iterator<
            Item = (&'a ResourceKey, &'a Option<Generation>),
        >,
    ) -> bool {
        deps.all(|(dep, observed)| {
            observed.is_some_and(|observed| {
                self.entries
                    .get(dep)
                    .is_some_and(|entry| entry.generation == observed)
            })
        })
    }

    /// Inserts a fresh entry, wiring its reverse edges, and returns the
    /// generation assigned to it.
    pub(crate) fn insert(
        &mut self,
        key: ResourceKey,
        mut entry: CacheEntry,
    ) -> Generation {
        self.last_generation += 1;
        entry.generation = self.last_generation;

        for dep in &entry.deps {
            self.subs.entry(*dep).or_default().insert(key);
        }

        self.entries.insert(key, entry);

        self.last_generation
    }

    /// Removes the in-flight record for `key` if it is still `flight`.
    pub(crate) fn detach(&mut self, key: ResourceKey, flight: &Arc<Flight>) {
        if self
            .in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, flight))
        {
            self.in_flight.remove(&key);
        }
    }

    /// Purges `root` and everything reachable from it through reverse edges.
    /// In-flight computations of purged keys are marked stale and detached.
    ///
    /// Returns the number of cached entries removed.
    pub(crate) fn purge(&mut self, root: ResourceKey) -> usize {
        let mut visited = HashSet::<ResourceKey, C::BuildHasher>::default();
        let mut stack = vec![root];
        let mut purged = 0;

        while let Some(key) = stack.pop() {
            if !visited.insert(key) {
                continue;
            }

            if let Some(flight) = self.in_flight.remove(&key) {
                flight.mark_stale();
            }

            if let Some(dependents) = self.subs.remove(&key) {
                stack.extend(dependents);
            }

            let Some(entry) = self.entries.remove(&key) else {
                continue;
            };

            purged += 1;

            for dep in &entry.deps {
                let emptied =
                    self.subs.get_mut(dep).is_some_and(|dependents| {
                        dependents.remove(&key);
                        dependents.is_empty()
                    });

                if emptied {
                    self.subs.remove(dep);
                }
            }
        }

        purged
    }

    /// Purges every entry and marks every in-flight computation stale.
    pub(crate) fn purge_all(&mut self) -> usize {
        for flight in self.in_flight.values() {
            flight.mark_stale();
        }

        let purged = self.entries.len();

        self.in_flight.clear();
        self.entries.clear();
        self.subs.clear();

        purged
    }
}

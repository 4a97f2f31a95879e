//! The synchronous resolution engine.
//!
//! [`Resources`] caches resource values by [`ResourceKey`] and records, for
//! every cached value, which other cached values were read while computing
//! it. Invalidating a value purges everything that transitively depended on
//! it; nothing is recomputed until it is requested again.
//!
//! # Concurrency
//!
//! `Resources` is `Send + Sync` and is usually shared behind an `Arc`. The
//! store sits behind a single reader-writer lock: cache hits take the read
//! lock, misses take the write lock only long enough to register an
//! in-flight record, and no lock is held while a resource body runs. Threads
//! requesting a key that is already being computed block until that
//! computation finishes and share its outcome.
//!
//! A computation that read a value which was invalidated before the
//! computation finished still returns its result to the caller that started
//! it, but the result is not cached. Callers that were waiting on it resolve
//! the key again.

use std::{
    any::{TypeId, type_name},
    fmt,
    sync::Arc,
};

use parking_lot::RwLock;

use crate::{
    config::{Config, DefaultConfig},
    error::Error,
    resource::{Resource, ResourceKind},
};

mod builder;
mod deps;
mod fingerprint;
mod mutation;
mod statistic;
mod store;


pub use builder::ResourcesBuilder;
pub use deps::ResourceDeps;
pub use fingerprint::{ResourceKey, fingerprint};
pub use mutation::ResourceMutation;
pub use statistic::Statistics;

use self::{
    builder::Bindings,
    deps::Ancestry,
    statistic::Statistic,
    store::{
        CacheEntry, Computed, ErasedValue, Flight, Generation, RecordedDeps,
        StoreState,
    },
};

/// A resolved value together with the key it was stored under and the
/// generation of the entry it came from, if it was cached.
pub(crate) struct Resolved<V> {
    pub(crate) key: ResourceKey,
    pub(crate) value: V,
    pub(crate) generation: Option<Generation>,
}

enum Role<V> {
    Hit(Resolved<V>),
    Owner(Arc<Flight>),
    Waiter(Arc<Flight>),
}

/// Completes the flight with [`Error::Panicked`] if the owning computation
/// unwinds before it commits or fails normally.
struct FlightGuard<'a, C: Config> {
    resources: &'a Resources<C>,
    key: ResourceKey,
    flight: &'a Arc<Flight>,
    resource: &'static str,
    defused: bool,
}

impl<C: Config> FlightGuard<'_, C> {
    fn defuse(mut self) { self.defused = true; }
}

impl<C: Config> Drop for FlightGuard<'_, C> {
    fn drop(&mut self) {
        if self.defused {
            return;
        }

        self.resources.fail(self.key, self.flight, Error::Panicked {
            resource: self.resource,
        });
    }
}

/// The resource graph.
///
/// See the [module-level documentation](self) for the caching and
/// concurrency model.
///
/// ```rust
/// use resgraph::{Config, Error, Resource, ResourceDeps, Resources};
///
/// struct Tile;
///
/// impl Resource for Tile {
///     type Args = (i32, i32);
///     type Value = String;
///
///     fn compute<C: Config>(
///         _deps: &mut ResourceDeps<'_, C>,
///         &(x, y): &(i32, i32),
///     ) -> Result<String, Error> {
///         Ok(format!("tile({x},{y})"))
///     }
/// }
///
/// struct Row;
///
/// impl Resource for Row {
///     type Args = i32;
///     type Value = Vec<String>;
///
///     fn compute<C: Config>(
///         deps: &mut ResourceDeps<'_, C>,
///         &y: &i32,
///     ) -> Result<Vec<String>, Error> {
///         (0..3).map(|x| deps.get::<Tile>(&(x, y))).collect()
///     }
/// }
///
/// let resources = Resources::new();
/// assert_eq!(resources.get::<Row>(&1).unwrap().len(), 3);
///
/// // purges `Tile(0, 1)` and `Row(1)`
/// assert_eq!(resources.invalidate::<Tile>(&(0, 1)), 2);
/// ```
pub struct Resources<C: Config = DefaultConfig> {
    store: RwLock<StoreState<C>>,
    bindings: Bindings<C>,
    statistic: Statistic,
}

static_assertions::assert_impl_all!(Resources: Send, Sync);

impl Resources<DefaultConfig> {
    /// Creates an engine with the default configuration and no bindings.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Creates a builder for an engine with the default configuration.
    #[must_use]
    pub fn builder() -> ResourcesBuilder<DefaultConfig> {
        ResourcesBuilder::new()
    }
}

impl<C: Config> Default for Resources<C> {
    fn default() -> Self { Self::from_bindings(Bindings::<C>::default()) }
}

impl<C: Config> fmt::Debug for Resources<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("entries", &self.len())
            .field("bindings", &self.bindings.len())
            .finish_non_exhaustive()
    }
}

impl<C: Config> Resources<C> {
    pub(crate) fn from_bindings(bindings: Bindings<C>) -> Self {
        Self {
            store: RwLock::new(StoreState::default()),
            bindings,
            statistic: Statistic::default(),
        }
    }

    /// Returns the value of resource `R` for `args`, computing and caching
    /// it if needed.
    ///
    /// # Errors
    ///
    /// Returns the error of the computation (or of the computation this call
    /// waited on). Failed computations are never cached; the next call
    /// retries.
    pub fn get<R: Resource>(&self, args: &R::Args) -> Result<R::Value, Error> {
        self.resolve::<R>(args, None).map(|resolved| resolved.value)
    }

    /// Purges `R` with `args` and every cached value that transitively
    /// depends on it. Computations of purged keys that are still running
    /// will not be cached.
    ///
    /// Returns the number of cached entries removed.
    #[tracing::instrument(
        skip(self),
        level = "debug",
        fields(resource = type_name::<R>())
    )]
    pub fn invalidate<R: Resource>(&self, args: &R::Args) -> usize {
        let key = self.key::<R>(args);
        let purged = self.store.write().purge(key);

        self.statistic.add_purged(purged);
        tracing::debug!(%key, purged, "invalidated resource");

        purged
    }

    /// Invalidates `R` with `args` and resolves it again.
    ///
    /// Dependents of `R` are purged by the invalidation and recompute on
    /// their next request, however many times `R` is updated in between.
    ///
    /// # Errors
    ///
    /// Returns any error [`get`](Self::get) would return.
    #[tracing::instrument(
        skip(self),
        level = "debug",
        fields(resource = type_name::<R>())
    )]
    pub fn update<R: Resource>(
        &self,
        args: &R::Args,
    ) -> Result<R::Value, Error> {
        self.invalidate::<R>(args);
        self.get::<R>(args)
    }

    /// Purges every cached value. Running computations will not be cached.
    ///
    /// Returns the number of cached entries removed.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn clear(&self) -> usize {
        let purged = self.store.write().purge_all();

        self.statistic.add_purged(purged);
        tracing::debug!(purged, "cleared resources");

        purged
    }

    /// Returns the key `R` with `args` is cached under.
    #[must_use]
    pub fn key<R: Resource>(&self, args: &R::Args) -> ResourceKey {
        fingerprint::<R>(args, C::fingerprint_seed())
    }

    /// Returns whether a value is cached under `key`.
    #[must_use]
    pub fn contains(&self, key: ResourceKey) -> bool {
        self.store.read().entries.contains_key(&key)
    }

    /// Returns the cached value of `R` with `args` without computing it.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::IntegrityViolation`] if the key is bound to a
    /// different resource.
    pub fn peek<R: Resource>(
        &self,
        args: &R::Args,
    ) -> Result<Option<R::Value>, Error> {
        let key = self.key::<R>(args);
        let store = self.store.read();

        store
            .entries
            .get(&key)
            .map(|entry| entry.downcast::<R>(key, args))
            .transpose()
    }

    /// Returns the keys the value cached under `key` was computed from, in
    /// ascending order, or `None` if nothing is cached under `key`.
    #[must_use]
    pub fn dependencies(&self, key: ResourceKey) -> Option<Vec<ResourceKey>> {
        let store = self.store.read();
        let mut deps = store.entries.get(&key)?.deps.to_vec();

        deps.sort_unstable();

        Some(deps)
    }

    /// Returns the keys of cached values computed from the value under
    /// `key`, in ascending order.
    #[must_use]
    pub fn dependents(&self, key: ResourceKey) -> Vec<ResourceKey> {
        let store = self.store.read();
        let mut subs: Vec<ResourceKey> = store
            .subs
            .get(&key)
            .map(|subs| subs.iter().copied().collect())
            .unwrap_or_default();

        subs.sort_unstable();

        subs
    }

    /// Returns the number of cached values.
    #[must_use]
    pub fn len(&self) -> usize { self.store.read().entries.len() }

    /// Returns whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub(crate) fn resolve<R: Resource>(
        &self,
        args: &R::Args,
        parent: Option<&Ancestry<'_>>,
    ) -> Result<Resolved<R::Value>, Error> {
        let key = self.key::<R>(args);

        if parent.is_some_and(|parent| parent.contains(key)) {
            return Err(Error::CyclicDependency { resource: type_name::<R>() });
        }

        let flight = loop {
            let hit = self.lookup::<R>(key, args, &self.store.read())?;
            if let Some(hit) = hit {
                return Ok(hit);
            }

            match self.join_or_register::<R>(key, args)? {
                Role::Hit(hit) => return Ok(hit),
                Role::Owner(flight) => break flight,
                Role::Waiter(flight) => {
                    if let Some(resolved) = self.wait::<R>(key, &flight)? {
                        return Ok(resolved);
                    }
                }
            }
        };

        let guard = FlightGuard {
            resources: self,
            key,
            flight: &flight,
            resource: type_name::<R>(),
            defused: false,
        };

        let outcome = self.compute::<R>(key, args, parent);

        guard.defuse();

        match outcome {
            Ok((value, deps)) => {
                let generation =
                    self.commit::<R>(key, args, &flight, &value, deps);

                Ok(Resolved { key, value, generation })
            }

            Err(error) => {
                self.fail(key, &flight, error.clone());

                Err(error)
            }
        }
    }

    fn join_or_register<R: Resource>(
        &self,
        key: ResourceKey,
        args: &R::Args,
    ) -> Result<Role<R::Value>, Error> {
        let mut store = self.store.write();

        // another thread may have committed between the two locks
        if let Some(hit) = self.lookup::<R>(key, args, &store)? {
            return Ok(Role::Hit(hit));
        }

        if let Some(flight) = store.in_flight.get(&key) {
            return Ok(Role::Waiter(flight.clone()));
        }

        let flight = Arc::new(Flight::new());
        store.in_flight.insert(key, flight.clone());

        Ok(Role::Owner(flight))
    }

    /// Waits for another thread's computation of `key`.
    ///
    /// Returns `None` if that computation was not cached. It may have read
    /// values invalidated while it ran, so the caller must resolve again.
    fn wait<R: Resource>(
        &self,
        key: ResourceKey,
        flight: &Flight,
    ) -> Result<Option<Resolved<R::Value>>, Error> {
        tracing::trace!(%key, resource = type_name::<R>(), "waiting");

        let computed = flight.wait()?;

        let Some(generation) = computed.generation else {
            tracing::trace!(
                %key,
                resource = type_name::<R>(),
                "shared computation was discarded, resolving again"
            );

            return Ok(None);
        };

        let value = computed
            .value
            .downcast_ref::<R::Value>()
            .cloned()
            .ok_or_else(|| Error::IntegrityViolation {
                key,
                requested: type_name::<R>().to_owned(),
                cached: "a value of another type".to_owned(),
            })?;

        Ok(Some(Resolved { key, value, generation: Some(generation) }))
    }

    fn lookup<R: Resource>(
        &self,
        key: ResourceKey,
        args: &R::Args,
        store: &StoreState<C>,
    ) -> Result<Option<Resolved<R::Value>>, Error> {
        let Some(entry) = store.entries.get(&key) else {
            return Ok(None);
        };

        let value = entry.downcast::<R>(key, args)?;

        self.statistic.add_hit();
        tracing::trace!(%key, resource = type_name::<R>(), "cache hit");

        Ok(Some(Resolved { key, value, generation: Some(entry.generation) }))
    }

    fn compute<R: Resource>(
        &self,
        key: ResourceKey,
        args: &R::Args,
        parent: Option<&Ancestry<'_>>,
    ) -> Result<(R::Value, RecordedDeps<C>), Error> {
        let mut deps = ResourceDeps::new(self, Ancestry {
            key,
            resource: type_name::<R>(),
            parent,
        });

        let binding = self.bindings.get(&TypeId::of::<R>());

        if binding.is_none() && R::KIND == ResourceKind::Seed {
            return Err(Error::UnboundSeed { resource: type_name::<R>() });
        }

        self.statistic.add_computation();
        tracing::debug!(
            %key,
            resource = type_name::<R>(),
            ?args,
            "computing resource"
        );

        let value = match binding {
            Some(binding) => binding.resolve::<R>(&mut deps, args)?,
            None => R::compute(&mut deps, args)?,
        };

        Ok((value, deps.into_recorded()))
    }

    /// Caches a finished computation unless it went stale, then releases
    /// the callers waiting on it.
    fn commit<R: Resource>(
        &self,
        key: ResourceKey,
        args: &R::Args,
        flight: &Arc<Flight>,
        value: &R::Value,
        deps: RecordedDeps<C>,
    ) -> Option<Generation> {
        let erased: ErasedValue = Arc::new(value.clone());

        let generation = {
            let mut store = self.store.write();
            store.detach(key, flight);

            if flight.is_stale()
                || store.entries.contains_key(&key)
                || !store.deps_live(deps.iter())
            {
                self.statistic.add_rejected_commit();
                tracing::debug!(
                    %key,
                    resource = type_name::<R>(),
                    "discarding computation that observed invalidated values"
                );

                None
            } else {
                let entry = CacheEntry::new::<R>(
                    args,
                    erased.clone(),
                    deps.into_keys().collect(),
                );
                let generation = store.insert(key, entry);

                tracing::debug!(
                    %key,
                    resource = type_name::<R>(),
                    generation,
                    "committed resource"
                );

                Some(generation)
            }
        };

        flight.complete(Ok(Computed { value: erased, generation }));

        generation
    }

    fn fail(&self, key: ResourceKey, flight: &Arc<Flight>, error: Error) {
        self.statistic.add_failure();
        tracing::debug!(%key, %error, "resource computation failed");

        self.store.write().detach(key, flight);
        flight.complete(Err(error));
    }
}

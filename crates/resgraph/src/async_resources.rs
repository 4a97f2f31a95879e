//! Resolution of resources on a [`TaskExecutor`].

use std::{panic::AssertUnwindSafe, sync::Arc};

use dashmap::DashSet;

use crate::{
    config::{Config, DefaultConfig},
    engine::{ResourceKey, ResourceMutation, Resources},
    error::Error,
    executor::{QueueExecutor, Task, TaskExecutor, TaskExecutorExt, TaskHandle},
    resource::Resource,
};

/// Runs [`Resources`] lookups on a task executor.
///
/// Every request becomes one task that resolves the resource, including all
/// of its nested dependencies, on a single worker. Concurrent requests for
/// the same key share one computation through the engine's in-flight table,
/// and failures (including panics) are reported through the returned
/// [`TaskHandle`].
///
/// ```rust
/// use std::sync::Arc;
///
/// use resgraph::{AsyncResources, Resources};
///
/// # fn main() -> Result<(), resgraph::Error> {
/// let resources =
///     AsyncResources::with_queue_executor(Arc::new(Resources::new()))?;
/// assert!(resources.resources().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct AsyncResources<C: Config = DefaultConfig> {
    resources: Arc<Resources<C>>,
    executor: Arc<dyn TaskExecutor>,
    scheduled: Arc<DashSet<ResourceKey, C::BuildHasher>>,
}

static_assertions::assert_impl_all!(AsyncResources: Send, Sync);

impl<C: Config> AsyncResources<C> {
    /// Wraps `resources`, running requests on `executor`.
    pub fn new(
        resources: Arc<Resources<C>>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        let scheduled = DashSet::with_hasher(C::BuildHasher::default());

        Self { resources, executor, scheduled: Arc::new(scheduled) }
    }

    /// Wraps `resources` with a [`QueueExecutor`] configured by `C`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::WorkerSpawn`] if a worker cannot be spawned.
    pub fn with_queue_executor(
        resources: Arc<Resources<C>>,
    ) -> Result<Self, Error> {
        let executor = QueueExecutor::from_config::<C>()?;

        Ok(Self::new(resources, Arc::new(executor)))
    }

    /// The underlying synchronous engine.
    #[must_use]
    pub fn resources(&self) -> &Arc<Resources<C>> { &self.resources }

    /// Resolves `R` with `args` on the executor.
    pub fn get<R: Resource>(&self, args: &R::Args) -> TaskHandle<R::Value> {
        let resources = self.resources.clone();
        let args = args.clone();

        self.executor.submit(move || resources.get::<R>(&args))
    }

    /// Invalidates and resolves `R` with `args` on the executor.
    ///
    /// The invalidation happens inside the task, so requests submitted
    /// earlier may still observe the old value.
    pub fn update<R: Resource>(&self, args: &R::Args) -> TaskHandle<R::Value> {
        let resources = self.resources.clone();
        let args = args.clone();

        self.executor.submit(move || resources.update::<R>(&args))
    }

    /// Purges `R` with `args` and its dependents immediately, on the calling
    /// thread.
    pub fn invalidate<R: Resource>(&self, args: &R::Args) -> usize {
        self.resources.invalidate::<R>(args)
    }

    /// Fetches `R` with `args` on the executor for mutation, blocking until
    /// it is available. `R` is invalidated when the returned guard drops.
    ///
    /// Must not be called from within an asynchronous context.
    ///
    /// # Errors
    ///
    /// Returns any error the [`TaskHandle`] of [`get`](Self::get) reports.
    /// No invalidation happens in that case.
    pub fn mutate<R: Resource>(
        &self,
        args: &R::Args,
    ) -> Result<ResourceMutation<'_, R, C>, Error> {
        let value = self.get::<R>(args).wait()?;

        Ok(ResourceMutation::new(&self.resources, args.clone(), value))
    }

    /// Returns the cached value of `R` with `args`, or schedules a
    /// background computation and returns `None`.
    ///
    /// At most one background computation per key is scheduled at a time.
    /// Failures of background computations are logged and otherwise dropped;
    /// the next call schedules a new attempt.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::IntegrityViolation`] if the key is bound to a
    /// different resource, or with [`Error::ExecutorShutdown`] if the
    /// computation cannot be scheduled.
    pub fn get_if_ready<R: Resource>(
        &self,
        args: &R::Args,
    ) -> Result<Option<R::Value>, Error> {
        if let Some(value) = self.resources.peek::<R>(args)? {
            return Ok(Some(value));
        }

        let key = self.resources.key::<R>(args);

        if !self.scheduled.insert(key) {
            return Ok(None);
        }

        let resources = self.resources.clone();
        let scheduled = self.scheduled.clone();
        let args = args.clone();

        let task: Task = Box::new(move || {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                resources.get::<R>(&args)
            }))
            .unwrap_or(Err(Error::TaskPanicked));

            if let Err(error) = outcome {
                tracing::warn!(
                    %key,
                    resource = std::any::type_name::<R>(),
                    %error,
                    "background resource computation failed"
                );
            }

            scheduled.remove(&key);
        });

        if let Err(error) = self.executor.execute(task) {
            self.scheduled.remove(&key);

            return Err(error);
        }

        Ok(None)
    }
}

impl<C: Config> Clone for AsyncResources<C> {
    fn clone(&self) -> Self {
        Self {
            resources: self.resources.clone(),
            executor: self.executor.clone(),
            scheduled: self.scheduled.clone(),
        }
    }
}

impl<C: Config> std::fmt::Debug for AsyncResources<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncResources")
            .field("resources", &self.resources)
            .field("scheduled", &self.scheduled.len())
            .finish_non_exhaustive()
    }
}

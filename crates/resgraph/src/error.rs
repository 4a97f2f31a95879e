//! The error type shared by every resource graph operation.

use std::sync::Arc;

use crate::{engine::ResourceKey, resource::Resource};

/// Errors produced while resolving, invalidating or scheduling resources.
///
/// The type is cheap to clone: every caller waiting on the same in-flight
/// computation receives its own copy of the failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A derived resource has neither a definition nor an override binding.
    #[error("resource `{resource}` has no definition and no override")]
    UnboundResource {
        /// The type name of the resource.
        resource: &'static str,
    },

    /// A seed resource was requested but no value was bound for it.
    #[error("missing seed resource `{resource}`")]
    UnboundSeed {
        /// The type name of the resource.
        resource: &'static str,
    },

    /// Two different resources mapped to the same key, or a cached value had
    /// an unexpected type.
    #[error(
        "integrity violation at key {key}: requested {requested}, found \
         {cached}"
    )]
    IntegrityViolation {
        /// The key the two resources collided on.
        key: ResourceKey,
        /// The resource and arguments that were requested.
        requested: String,
        /// The resource and arguments the key is bound to.
        cached: String,
    },

    /// An override binding does not produce the resource's value type.
    #[error("override for `{resource}` does not match its signature")]
    OverrideSignatureMismatch {
        /// The type name of the resource.
        resource: &'static str,
    },

    /// A resource transitively requested itself.
    #[error("cyclic dependency detected while resolving `{resource}`")]
    CyclicDependency {
        /// The type name of the resource that closed the cycle.
        resource: &'static str,
    },

    /// A resource body failed. The inner error is forwarded verbatim.
    #[error(transparent)]
    Computation(Arc<dyn std::error::Error + Send + Sync>),

    /// The computation owning an in-flight key panicked.
    #[error("computation of `{resource}` panicked")]
    Panicked {
        /// The type name of the resource.
        resource: &'static str,
    },

    /// A task was submitted to an executor that has shut down.
    #[error("task executor has shut down")]
    ExecutorShutdown,

    /// A submitted task panicked.
    #[error("task panicked")]
    TaskPanicked,

    /// A submitted task was dropped before it produced a result.
    #[error("task was dropped before it ran")]
    TaskCancelled,

    /// The executor could not spawn one of its worker threads.
    #[error("failed to spawn worker thread")]
    WorkerSpawn(#[source] Arc<std::io::Error>),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

impl Error {
    /// Wraps a failure raised inside a resource body.
    pub fn computation<E: std::error::Error + Send + Sync + 'static>(
        error: E,
    ) -> Self {
        Self::Computation(Arc::new(error))
    }

    /// Creates a computation failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::computation(Message(message.into()))
    }

    /// The error reported for a derived resource with no definition.
    #[must_use]
    pub fn unbound<R: Resource>() -> Self {
        Self::UnboundResource { resource: std::any::type_name::<R>() }
    }
}

//! Configuration for the resource graph.
//!
//! The [`Config`] trait bundles the knobs that are fixed for the lifetime of a
//! [`Resources`](crate::Resources) instance: the hasher used by the internal
//! maps, the seed mixed into every fingerprint and the shape of the worker
//! pool used by [`AsyncResources`](crate::AsyncResources).
//!
//! Most applications use [`DefaultConfig`]. A custom configuration only needs
//! to name its hasher; every function has a default:
//!
//! ```rust
//! use resgraph::{Config, Resources};
//!
//! #[derive(Debug, Clone, Copy, Default)]
//! struct TwoWorkers;
//!
//! impl Config for TwoWorkers {
//!     type BuildHasher = fxhash::FxBuildHasher;
//!
//!     fn worker_thread_count() -> usize { 2 }
//! }
//!
//! let resources = Resources::<TwoWorkers>::default();
//! assert!(resources.is_empty());
//! ```

use std::{fmt::Debug, hash::BuildHasher, num::NonZeroUsize};

/// Configuration trait for [`Resources`](crate::Resources) and
/// [`AsyncResources`](crate::AsyncResources).
pub trait Config:
    Debug + Default + Clone + Copy + Send + Sync + 'static
{
    /// The hasher builder for the engine's internal hash maps and sets. It
    /// does not take part in fingerprinting and does not need to be stable
    /// across runs.
    type BuildHasher: BuildHasher + Default + Clone + Send + Sync + 'static;

    /// The seed mixed into every [`ResourceKey`](crate::ResourceKey).
    ///
    /// Two engines with different seeds assign different keys to the same
    /// resource, which is occasionally useful to keep fingerprints of
    /// separate graphs apart in logs.
    #[must_use]
    fn fingerprint_seed() -> u64 { 0 }

    /// The number of worker threads spawned by
    /// [`QueueExecutor::from_config`](crate::QueueExecutor::from_config).
    ///
    /// Defaults to the available parallelism of the machine.
    #[must_use]
    fn worker_thread_count() -> usize {
        std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
    }

    /// The name given to the worker thread at `index`.
    #[must_use]
    fn worker_thread_name(index: usize) -> String {
        format!("resgraph-worker-{index}")
    }

    /// The number of tasks that may wait in the executor queue before
    /// submission blocks.
    #[must_use]
    fn task_queue_capacity() -> usize { 1024 }
}

/// The default configuration: `FxHash` for internal maps, a zero fingerprint
/// seed and one worker per available core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DefaultConfig;

impl Config for DefaultConfig {
    type BuildHasher = fxhash::FxBuildHasher;
}

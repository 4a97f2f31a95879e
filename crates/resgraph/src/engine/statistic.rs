use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{config::Config, engine::Resources};

#[derive(Debug, Default)]
pub(crate) struct Statistic {
    hits: AtomicUsize,
    computations: AtomicUsize,
    failures: AtomicUsize,
    rejected_commits: AtomicUsize,
    purged: AtomicUsize,
}

impl Statistic {
    pub(super) fn add_hit(&self) { self.hits.fetch_add(1, Ordering::Relaxed); }

    pub(super) fn add_computation(&self) {
        self.computations.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn add_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn add_rejected_commit(&self) {
        self.rejected_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn add_purged(&self, count: usize) {
        self.purged.fetch_add(count, Ordering::Relaxed);
    }
}

/// A snapshot of the engine's counters.
///
/// Counters are updated with relaxed ordering; a snapshot taken while other
/// threads resolve resources is not guaranteed to be mutually consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
    /// Requests served from the cache.
    pub hits: usize,
    /// Resource bodies, overrides and seed bindings invoked.
    pub computations: usize,
    /// Failed resolutions, including panics and unbound seeds.
    pub failures: usize,
    /// Successful computations that were not cached because a dependency
    /// was invalidated while they ran.
    pub rejected_commits: usize,
    /// Entries removed by invalidation or [`Resources::clear`].
    pub purged: usize,
}

impl<C: Config> Resources<C> {
    /// Returns a snapshot of the engine's counters.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        let statistic = &self.statistic;

        Statistics {
            hits: statistic.hits.load(Ordering::Relaxed),
            computations: statistic.computations.load(Ordering::Relaxed),
            failures: statistic.failures.load(Ordering::Relaxed),
            rejected_commits: statistic
                .rejected_commits
                .load(Ordering::Relaxed),
            purged: statistic.purged.load(Ordering::Relaxed),
        }
    }
}

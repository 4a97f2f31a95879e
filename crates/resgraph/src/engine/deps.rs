use std::collections::HashMap;

use crate::{
    config::{Config, DefaultConfig},
    engine::{ResourceKey, Resources, store::RecordedDeps},
    error::Error,
    resource::Resource,
};

/// The chain of computations currently running on this call stack, innermost
/// first. Used to report cyclic requests.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ancestry<'a> {
    pub(crate) key: ResourceKey,
    pub(crate) resource: &'static str,
    pub(crate) parent: Option<&'a Ancestry<'a>>,
}

impl Ancestry<'_> {
    pub(crate) fn contains(&self, key: ResourceKey) -> bool {
        let mut current = Some(self);

        while let Some(ancestry) = current {
            if ancestry.key == key {
                return true;
            }

            current = ancestry.parent;
        }

        false
    }
}

/// The dependency-recording context handed to a resource computation.
///
/// Every resource requested through [`get`](ResourceDeps::get) is recorded as
/// a dependency of the value being computed. Once the computation returns,
/// the recorded set becomes the entry's dependency edges.
pub struct ResourceDeps<'a, C: Config = DefaultConfig> {
    resources: &'a Resources<C>,
    ancestry: Ancestry<'a>,
    recorded: RecordedDeps<C>,
}

impl<'a, C: Config> ResourceDeps<'a, C> {
    pub(crate) fn new(
        resources: &'a Resources<C>,
        ancestry: Ancestry<'a>,
    ) -> Self {
        Self { resources, ancestry, recorded: HashMap::default() }
    }

    /// Resolves resource `R` with `args` and records it as a dependency of
    /// the computation this context belongs to.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::CyclicDependency`] if `R` with `args` is already
    /// being computed further up this call chain, and otherwise with any
    /// error [`Resources::get`] would return.
    pub fn get<R: Resource>(
        &mut self,
        args: &R::Args,
    ) -> Result<R::Value, Error> {
        let resolved = self.resources.resolve::<R>(args, Some(&self.ancestry))?;

        self.recorded
            .entry(resolved.key)
            .and_modify(|observed| {
                // the dependency was replaced between two reads
                if *observed != resolved.generation {
                    *observed = None;
                }
            })
            .or_insert(resolved.generation);

        Ok(resolved.value)
    }

    /// The key of the resource being computed.
    #[must_use]
    pub fn key(&self) -> ResourceKey { self.ancestry.key }

    /// The type name of the resource being computed.
    #[must_use]
    pub fn resource_name(&self) -> &'static str { self.ancestry.resource }

    /// The number of distinct dependencies recorded so far.
    #[must_use]
    pub fn dependency_count(&self) -> usize { self.recorded.len() }

    pub(crate) fn into_recorded(self) -> RecordedDeps<C> { self.recorded }
}

impl<C: Config> std::fmt::Debug for ResourceDeps<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDeps")
            .field("key", &self.ancestry.key)
            .field("resource", &self.ancestry.resource)
            .field("dependencies", &self.recorded.len())
            .finish_non_exhaustive()
    }
}

use std::{fmt, ops::Deref};

use crate::{
    config::{Config, DefaultConfig},
    engine::Resources,
    error::Error,
    resource::Resource,
};

/// A guard over a resource value that invalidates the resource when dropped.
///
/// Created by [`Resources::mutate`]. The guard dereferences to the cached
/// value, which is typically a shared handle with interior mutability (a
/// camera, a settings object). Once the guard goes away every dependent of
/// the resource is purged, so the next read observes the mutation.
pub struct ResourceMutation<'a, R: Resource, C: Config = DefaultConfig> {
    resources: &'a Resources<C>,
    args: R::Args,
    value: R::Value,
}

impl<'a, R: Resource, C: Config> ResourceMutation<'a, R, C> {
    pub(crate) fn new(
        resources: &'a Resources<C>,
        args: R::Args,
        value: R::Value,
    ) -> Self {
        Self { resources, args, value }
    }
}

impl<R: Resource, C: Config> Deref for ResourceMutation<'_, R, C> {
    type Target = R::Value;

    fn deref(&self) -> &Self::Target { &self.value }
}

impl<R: Resource, C: Config> Drop for ResourceMutation<'_, R, C> {
    fn drop(&mut self) { self.resources.invalidate::<R>(&self.args); }
}

impl<R: Resource, C: Config> fmt::Debug for ResourceMutation<'_, R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMutation")
            .field("resource", &std::any::type_name::<R>())
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl<C: Config> Resources<C> {
    /// Fetches the value of `R` for mutation. `R` is invalidated when the
    /// returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns any error [`get`](Self::get) would return. No invalidation
    /// happens in that case.
    pub fn mutate<R: Resource>(
        &self,
        args: &R::Args,
    ) -> Result<ResourceMutation<'_, R, C>, Error> {
        let value = self.get::<R>(args)?;

        Ok(ResourceMutation::new(self, args.clone(), value))
    }
}

//! Defines the [`Resource`] trait.

use std::{any::Any, fmt::Debug};

use resgraph_stable_hash::StableHash;

use crate::{config::Config, engine::ResourceDeps, error::Error};

/// Whether a resource computes its value or expects the host to bind one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ResourceKind {
    /// The value is computed by [`Resource::compute`] or an override.
    #[default]
    Derived,

    /// The value must be bound with
    /// [`ResourcesBuilder::with_seed`](crate::ResourcesBuilder::with_seed) or
    /// an override. Requesting an unbound seed fails with
    /// [`Error::UnboundSeed`].
    Seed,
}

/// The bounds required of a resource's arguments.
///
/// Arguments are fingerprinted with [`StableHash`] and compared with `Eq` on
/// every cache hit, so two argument values that compare equal must hash
/// identically.
pub trait ResourceArgs:
    StableHash + Eq + Clone + Debug + Send + Sync + 'static
{
}

impl<T: StableHash + Eq + Clone + Debug + Send + Sync + 'static> ResourceArgs
    for T
{
}

/// A memoized computation identified by its type and its arguments.
///
/// The engine calls [`compute`](Resource::compute) at most once per distinct
/// argument value until the result is invalidated. Every resource requested
/// through the [`ResourceDeps`] context becomes a dependency of the value
/// being computed; invalidating any of them purges this value too.
///
/// # Example
///
/// ```rust
/// use resgraph::{Config, Error, Resource, ResourceDeps, Resources};
///
/// struct Greeting;
///
/// impl Resource for Greeting {
///     type Args = String;
///     type Value = String;
///
///     fn compute<C: Config>(
///         _deps: &mut ResourceDeps<'_, C>,
///         name: &String,
///     ) -> Result<String, Error> {
///         Ok(format!("hello, {name}"))
///     }
/// }
///
/// let resources = Resources::new();
/// assert_eq!(
///     resources.get::<Greeting>(&"world".to_owned()).unwrap(),
///     "hello, world"
/// );
/// ```
pub trait Resource: Sized + 'static {
    /// The arguments distinguishing instances of this resource.
    type Args: ResourceArgs;

    /// The computed value. Cached values are cloned out to every caller, so
    /// large values are usually wrapped in an `Arc`.
    type Value: Clone + Send + Sync + 'static;

    /// Whether the value is computed or must be bound by the host.
    const KIND: ResourceKind = ResourceKind::Derived;

    /// Computes the value of this resource for `args`.
    ///
    /// Resources with no definition of their own fail with
    /// [`Error::UnboundResource`] unless an override is bound.
    ///
    /// # Errors
    ///
    /// Returns any error produced by the computation or by a dependency.
    #[allow(unused_variables)]
    fn compute<C: Config>(
        deps: &mut ResourceDeps<'_, C>,
        args: &Self::Args,
    ) -> Result<Self::Value, Error> {
        Err(Error::unbound::<Self>())
    }
}

/// Type-erased arguments kept alongside a cache entry to detect fingerprint
/// collisions.
pub(crate) trait DynArgs: Any + Send + Sync {
    fn eq_dyn(&self, other: &dyn Any) -> bool;

    fn as_debug(&self) -> &dyn Debug;
}

impl<T: ResourceArgs> DynArgs for T {
    fn eq_dyn(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn as_debug(&self) -> &dyn Debug { self }
}

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use crate::{
    config::{Config, DefaultConfig},
    engine::{ResourceDeps, Resources, store::ErasedValue},
    error::Error,
    resource::Resource,
};

type InvokeOverrideFn<C> = for<'a, 'd> fn(
    function: &'a (dyn Any + Send + Sync),
    deps: &'a mut ResourceDeps<'d, C>,
    args: &'a dyn Any,
) -> Result<Box<dyn Any + Send>, Error>;

fn invoke_override<C: Config, R: Resource, F>(
    function: &(dyn Any + Send + Sync),
    deps: &mut ResourceDeps<'_, C>,
    args: &dyn Any,
) -> Result<Box<dyn Any + Send>, Error>
where
    F: Fn(&mut ResourceDeps<'_, C>, &R::Args) -> Result<R::Value, Error>
        + Send
        + Sync
        + 'static,
{
    let mismatch = || Error::OverrideSignatureMismatch {
        resource: std::any::type_name::<R>(),
    };

    let function = function.downcast_ref::<F>().ok_or_else(mismatch)?;
    let args = args.downcast_ref::<R::Args>().ok_or_else(mismatch)?;

    function(deps, args).map(|value| Box::new(value) as Box<dyn Any + Send>)
}

/// A replacement for a resource's own definition.
pub(crate) enum Binding<C: Config> {
    Function {
        function: Arc<dyn Any + Send + Sync>,
        invoke: InvokeOverrideFn<C>,
    },
    Seed(ErasedValue),
}

impl<C: Config> Binding<C> {
    /// Runs the binding for `R`, checking that it produces `R::Value`.
    pub(crate) fn resolve<R: Resource>(
        &self,
        deps: &mut ResourceDeps<'_, C>,
        args: &R::Args,
    ) -> Result<R::Value, Error> {
        let mismatch = || Error::OverrideSignatureMismatch {
            resource: std::any::type_name::<R>(),
        };

        match self {
            Self::Function { function, invoke } => {
                let value = invoke(function.as_ref(), deps, args)?;

                value
                    .downcast::<R::Value>()
                    .map(|value| *value)
                    .map_err(|_| mismatch())
            }

            Self::Seed(value) => value
                .downcast_ref::<R::Value>()
                .cloned()
                .ok_or_else(mismatch),
        }
    }
}

pub(crate) type Bindings<C> =
    HashMap<TypeId, Binding<C>, <C as Config>::BuildHasher>;

/// Builds a [`Resources`] instance with overrides and seed values.
///
/// Bindings are keyed by resource type and are immutable once the engine is
/// built. Binding the same resource twice keeps the later binding.
///
/// ```rust
/// use resgraph::{Error, Resource, ResourceKind, Resources};
///
/// struct WorldSeed;
///
/// impl Resource for WorldSeed {
///     type Args = ();
///     type Value = u64;
///
///     const KIND: ResourceKind = ResourceKind::Seed;
/// }
///
/// let resources = Resources::builder().with_seed::<WorldSeed>(42).build();
/// assert_eq!(resources.get::<WorldSeed>(&()).unwrap(), 42);
///
/// let unbound = Resources::new();
/// assert!(matches!(
///     unbound.get::<WorldSeed>(&()),
///     Err(Error::UnboundSeed { .. })
/// ));
/// ```
pub struct ResourcesBuilder<C: Config = DefaultConfig> {
    bindings: Bindings<C>,
}

impl ResourcesBuilder<DefaultConfig> {
    /// Creates a builder for the default configuration.
    #[must_use]
    pub fn new() -> Self { Self::default() }
}

impl<C: Config> Default for ResourcesBuilder<C> {
    fn default() -> Self { Self { bindings: HashMap::default() } }
}

impl<C: Config> ResourcesBuilder<C> {
    /// Replaces the definition of `R` with `function`.
    ///
    /// The override receives the same dependency-recording context as a
    /// regular definition, so it may request other resources.
    #[must_use]
    pub fn with_override<R: Resource, F>(mut self, function: F) -> Self
    where
        F: Fn(&mut ResourceDeps<'_, C>, &R::Args) -> Result<R::Value, Error>
            + Send
            + Sync
            + 'static,
    {
        self.bindings.insert(TypeId::of::<R>(), Binding::Function {
            function: Arc::new(function),
            invoke: invoke_override::<C, R, F>,
        });

        self
    }

    /// Binds `R` to a constant value for every argument. The value is never
    /// recomputed and records no dependencies.
    #[must_use]
    pub fn with_seed<R: Resource>(mut self, value: R::Value) -> Self {
        self.bindings
            .insert(TypeId::of::<R>(), Binding::Seed(Arc::new(value)));

        self
    }

    /// Alias of [`with_seed`](Self::with_seed) for resources that hold a
    /// single shared object.
    #[must_use]
    pub fn with_singleton<R: Resource>(self, value: R::Value) -> Self {
        self.with_seed::<R>(value)
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> Resources<C> {
        Resources::from_bindings(self.bindings)
    }
}

impl<C: Config> std::fmt::Debug for ResourcesBuilder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcesBuilder")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

//! # resgraph - demand-driven resource graph
//!
//! `resgraph` computes and caches derived values ("resources") keyed by a
//! resource type and its arguments. Dependencies between cached values are
//! discovered while they are computed: every resource requested from inside
//! another resource's computation becomes an edge of the graph. Invalidating
//! a value purges everything that transitively depended on it, and the
//! purged values are recomputed the next time they are requested.
//!
//! There is no graph to author. Callers ask for a value and the graph is
//! inferred from the call pattern.
//!
//! ## Core Concepts
//!
//! ### Resources
//!
//! A **resource** is a type implementing [`Resource`]. Its associated `Args`
//! distinguish instances, its `Value` is what gets cached, and
//! [`Resource::compute`] produces the value. A computation requests other
//! resources through the [`ResourceDeps`] context it receives, which records
//! them as dependencies.
//!
//! ### Keys
//!
//! Every `(resource type, args)` pair maps to a deterministic 128-bit
//! [`ResourceKey`]. Arguments are hashed with [`StableHash`], which can be
//! derived.
//!
//! ### Overrides and seeds
//!
//! A [`ResourcesBuilder`] can replace the definition of any resource with a
//! closure, or bind it to a constant. Resources declared with
//! [`ResourceKind::Seed`] have no definition at all and must be bound.
//!
//! ### Invalidation
//!
//! [`Resources::invalidate`] purges a value and its transitive dependents
//! without recomputing anything. [`Resources::update`] invalidates and then
//! resolves the value again. [`Resources::mutate`] hands out a guard that
//! invalidates on drop.
//!
//! ### Asynchronous resolution
//!
//! [`AsyncResources`] runs requests on a [`TaskExecutor`] such as the bundled
//! [`QueueExecutor`] and returns [`TaskHandle`]s.
//!
//! ## Example
//!
//! ```rust
//! use resgraph::{Config, Error, Resource, ResourceDeps, Resources};
//!
//! struct Word;
//!
//! impl Resource for Word {
//!     type Args = usize;
//!     type Value = String;
//!
//!     fn compute<C: Config>(
//!         _deps: &mut ResourceDeps<'_, C>,
//!         &index: &usize,
//!     ) -> Result<String, Error> {
//!         Ok(["lorem", "ipsum", "dolor"][index % 3].to_owned())
//!     }
//! }
//!
//! struct Sentence;
//!
//! impl Resource for Sentence {
//!     type Args = usize;
//!     type Value = String;
//!
//!     fn compute<C: Config>(
//!         deps: &mut ResourceDeps<'_, C>,
//!         &len: &usize,
//!     ) -> Result<String, Error> {
//!         let words = (0..len)
//!             .map(|i| deps.get::<Word>(&i))
//!             .collect::<Result<Vec<_>, _>>()?;
//!
//!         Ok(words.join(" "))
//!     }
//! }
//!
//! let resources = Resources::new();
//!
//! assert_eq!(resources.get::<Sentence>(&2).unwrap(), "lorem ipsum");
//! assert!(resources.contains(resources.key::<Word>(&1)));
//!
//! // `Word(1)` and the sentence built from it are purged
//! assert_eq!(resources.invalidate::<Word>(&1), 2);
//! ```

extern crate self as resgraph;

pub mod async_resources;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod resource;

pub use async_resources::AsyncResources;
pub use config::{Config, DefaultConfig};
pub use engine::{
    ResourceDeps, ResourceKey, ResourceMutation, Resources, ResourcesBuilder,
    Statistics,
};
pub use error::Error;
pub use executor::{
    QueueExecutor, Task, TaskExecutor, TaskExecutorExt, TaskHandle,
};
pub use resgraph_stable_hash as stable_hash;
pub use resgraph_stable_hash::StableHash;
pub use resource::{Resource, ResourceArgs, ResourceKind};

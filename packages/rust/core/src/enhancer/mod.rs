//! Enhancer trait and built-in enhancers.
//!
//! Enhancers never call each other. Each one scans the fact store for an
//! outstanding goal it can satisfy and, when chosen, records its result and
//! persists the sidecar. New goals emitted by one enhancer are picked up by
//! the next on a later scheduling round.

mod remote_text;
mod type_detection;

use async_trait::async_trait;

use globdef_factstore::{FactStore, Term};
use globdef_shared::{Bundle, Result};

use crate::goal::Taxonomy;

pub use remote_text::{LANGUAGE_PARAM, RemoteTextEnhancer, build_client};
pub use type_detection::TypeDetectionEnhancer;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A pluggable enrichment stage.
///
/// Enhancers are tried in registry order; the first one whose
/// [`Enhancer::match_goal`] returns a goal processes the bundle.
#[async_trait]
pub trait Enhancer: Send + Sync {
    /// Human-readable name, also recorded on the enhancer-identity node.
    fn name(&self) -> &str;

    /// An outstanding goal this enhancer can satisfy, or `None`.
    fn match_goal(&self, store: &FactStore, taxonomy: &Taxonomy) -> Option<Term>;

    /// Satisfy `goal` and persist the mutated store to the bundle's sidecar.
    ///
    /// On error nothing has been persisted.
    async fn process(&self, bundle: &Bundle, goal: &Term, store: &mut FactStore) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered enhancers in priority order.
#[derive(Default)]
pub struct EnhancerRegistry {
    enhancers: Vec<Box<dyn Enhancer>>,
}

impl EnhancerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Type detection first, then the remote text enhancer when configured.
    pub fn standard(remote: Option<RemoteTextEnhancer>) -> Self {
        let mut registry = Self::new().with(TypeDetectionEnhancer::default());
        if let Some(remote) = remote {
            registry.register(Box::new(remote));
        }
        registry
    }

    /// Append an enhancer at the lowest priority.
    pub fn register(&mut self, enhancer: Box<dyn Enhancer>) {
        self.enhancers.push(enhancer);
    }

    /// Builder-style [`EnhancerRegistry::register`].
    pub fn with(mut self, enhancer: impl Enhancer + 'static) -> Self {
        self.register(Box::new(enhancer));
        self
    }

    /// The first enhancer with outstanding work, and the goal it matched.
    pub fn find_match(
        &self,
        store: &FactStore,
        taxonomy: &Taxonomy,
    ) -> Option<(&dyn Enhancer, Term)> {
        self.enhancers.iter().find_map(|enhancer| {
            enhancer
                .match_goal(store, taxonomy)
                .map(|goal| (enhancer.as_ref(), goal))
        })
    }

    /// Registered enhancer names in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.enhancers.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.enhancers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enhancers.is_empty()
    }
}

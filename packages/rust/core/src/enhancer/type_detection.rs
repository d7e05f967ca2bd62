//! Content-type detection for freshly bootstrapped bundles.

use async_trait::async_trait;
use tracing::{info, instrument};

use globdef_factstore::vocab::{dcterms, foaf, gsm, rdf};
use globdef_factstore::{FactStore, Term};
use globdef_shared::{Bundle, GlobdefError, Result};

use super::Enhancer;
use crate::goal::{self, Taxonomy};
use crate::sniff::{ContentSniffer, MagicSniffer};

/// Satisfies initial goals by recording the data file's content type.
///
/// Emits a `gsm:KnownTypeGoal` so type-aware enhancers can follow up.
pub struct TypeDetectionEnhancer {
    sniffer: Box<dyn ContentSniffer>,
}

impl TypeDetectionEnhancer {
    pub fn new(sniffer: Box<dyn ContentSniffer>) -> Self {
        Self { sniffer }
    }
}

impl Default for TypeDetectionEnhancer {
    fn default() -> Self {
        Self::new(Box::new(MagicSniffer))
    }
}

#[async_trait]
impl Enhancer for TypeDetectionEnhancer {
    fn name(&self) -> &str {
        "TypeDetectionEnhancer"
    }

    fn match_goal(&self, store: &FactStore, taxonomy: &Taxonomy) -> Option<Term> {
        goal::find_outstanding_goal(store, taxonomy, gsm::INITIAL_GOAL, |_, _| true)
    }

    #[instrument(skip_all, fields(bundle = %bundle, goal = %goal))]
    async fn process(&self, bundle: &Bundle, goal: &Term, store: &mut FactStore) -> Result<()> {
        let bytes = tokio::fs::read(&bundle.data_path)
            .await
            .map_err(|e| GlobdefError::io(&bundle.data_path, e))?;
        let content_type = self.sniffer.sniff(&bytes);

        let result = goal::record_result(store, goal, self.name())?;

        let document = store.fresh_blank();
        store.insert(document.clone(), rdf::TYPE, Term::iri(foaf::DOCUMENT));
        store.insert(document.clone(), dcterms::FORMAT, Term::literal(content_type.as_str()));
        goal::link_enhancement(store, &result, &document);

        goal::emit_goal(store, gsm::KNOWN_TYPE_GOAL);

        store.save(&bundle.sidecar_path)?;
        info!(%content_type, "content type recorded");
        Ok(())
    }
}

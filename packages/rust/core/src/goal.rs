//! Goal resolution and result bookkeeping shared by every enhancer.
//!
//! A goal is any node typed with a goal-type; it is satisfied once a
//! `gsm:hasResult` fact links it to a result node. Goal-types form a
//! subclass hierarchy: an enhancer names a root type and considers every
//! type reachable from it through `rdfs:subClassOf` edges.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use globdef_factstore::vocab::{dcterms, foaf, gsm, rdf, rdfs};
use globdef_factstore::{FactStore, Iri, Literal, Term};
use globdef_shared::{GlobdefError, Result};

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Goal-type subclass edges known independently of any single bundle.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    schema: FactStore,
}

impl Taxonomy {
    /// The built-in meta ontology: both standard goal-types specialise `gsm:Goal`.
    pub fn builtin() -> Self {
        let mut schema = FactStore::new();
        schema.insert(Term::iri(gsm::INITIAL_GOAL), rdfs::SUB_CLASS_OF, Term::iri(gsm::GOAL));
        schema.insert(Term::iri(gsm::KNOWN_TYPE_GOAL), rdfs::SUB_CLASS_OF, Term::iri(gsm::GOAL));
        Self { schema }
    }

    /// Built-in edges plus the `rdfs:subClassOf` facts of a root ontology file.
    pub fn with_ontology(path: &Path) -> Result<Self> {
        let ontology = FactStore::load(path)?;
        let mut taxonomy = Self::builtin();
        let sub_class_of = Iri::new(rdfs::SUB_CLASS_OF);
        for fact in ontology.query(None, Some(&sub_class_of), None) {
            taxonomy.schema.add(fact.clone());
        }
        debug!(edges = taxonomy.schema.len(), "taxonomy loaded");
        Ok(taxonomy)
    }

    /// Breadth-first closure of `root` over subtype edges, in discovery order.
    ///
    /// Edges are taken from the taxonomy and from `store`, so a bundle may
    /// introduce goal-types of its own. Each type appears once.
    pub fn subtype_closure(&self, root: &Term, store: &FactStore) -> Vec<Term> {
        let sub_class_of = Iri::new(rdfs::SUB_CLASS_OF);
        let mut seen: HashSet<Term> = HashSet::from([root.clone()]);
        let mut queue: VecDeque<Term> = VecDeque::from([root.clone()]);
        let mut closure = Vec::new();

        while let Some(ty) = queue.pop_front() {
            let subtypes = self
                .schema
                .subjects(&sub_class_of, &ty)
                .chain(store.subjects(&sub_class_of, &ty));
            for sub in subtypes {
                if seen.insert(sub.clone()) {
                    queue.push_back(sub.clone());
                }
            }
            closure.push(ty);
        }
        closure
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Whether `goal` already has a result.
pub fn is_satisfied(store: &FactStore, goal: &Term) -> bool {
    store.exists(Some(goal), Some(&Iri::new(gsm::HAS_RESULT)), None)
}

/// Goals typed exactly `goal_type`, earliest `gsm:isCreatedOn` first.
///
/// Goals without a timestamp sort after timestamped ones; ties fall back to
/// the node's lexical form so the order never depends on storage layout.
pub fn goals_of_type(store: &FactStore, goal_type: &Term) -> Vec<Term> {
    let type_iri = Iri::new(rdf::TYPE);
    let mut goals: Vec<(Option<DateTime<Utc>>, Term)> = store
        .subjects(&type_iri, goal_type)
        .map(|goal| (created_on(store, goal), goal.clone()))
        .collect();

    goals.sort_by(|(ta, a), (tb, b)| match (ta, tb) {
        (Some(x), Some(y)) => x.cmp(y).then_with(|| a.cmp(b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    goals.into_iter().map(|(_, goal)| goal).collect()
}

/// First outstanding goal under `root` accepted by `eligible`.
///
/// Goal-types are visited in closure order. A candidate rejected by
/// `eligible` is skipped and scanning continues.
pub fn find_outstanding_goal<F>(
    store: &FactStore,
    taxonomy: &Taxonomy,
    root: &str,
    eligible: F,
) -> Option<Term>
where
    F: Fn(&FactStore, &Term) -> bool,
{
    let goal_types = taxonomy.subtype_closure(&Term::iri(root), store);
    debug!(root, candidates = goal_types.len(), "candidate goal types");

    for goal_type in &goal_types {
        for goal in goals_of_type(store, goal_type) {
            if is_satisfied(store, &goal) {
                debug!(%goal, %goal_type, "goal already satisfied, skipping");
                continue;
            }
            if !eligible(store, &goal) {
                debug!(%goal, %goal_type, "goal not eligible, skipping");
                continue;
            }
            return Some(goal);
        }
    }
    None
}

/// Every unsatisfied goal whose type descends from `gsm:Goal`.
pub fn outstanding_goals(store: &FactStore, taxonomy: &Taxonomy) -> Vec<Term> {
    let mut seen = HashSet::new();
    taxonomy
        .subtype_closure(&Term::iri(gsm::GOAL), store)
        .iter()
        .flat_map(|ty| goals_of_type(store, ty))
        .filter(|goal| !is_satisfied(store, goal))
        .filter(|goal| seen.insert(goal.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Bookkeeping
// ---------------------------------------------------------------------------

/// Record that `enhancer` satisfied `goal`; returns the new result node.
///
/// Adds an enhancer-identity node, a result node linked to it, and the
/// `goal gsm:hasResult result` edge. Fails if the goal already has a result.
pub fn record_result(store: &mut FactStore, goal: &Term, enhancer: &str) -> Result<Term> {
    if is_satisfied(store, goal) {
        return Err(GlobdefError::validation(format!(
            "goal {goal} already has a result"
        )));
    }

    let now = Literal::date_time(Utc::now());

    let identity = store.fresh_blank();
    store.insert(identity.clone(), rdf::TYPE, Term::iri(gsm::ENHANCER));
    store.insert(identity.clone(), rdfs::LABEL, Term::literal(enhancer));

    let result = store.fresh_blank();
    store.insert(result.clone(), rdf::TYPE, Term::iri(gsm::GOAL_RESULT));
    store.insert(result.clone(), gsm::IS_CREATED_BY, identity);
    store.insert(result.clone(), gsm::IS_CREATED_ON, now);
    store.insert(goal.clone(), gsm::HAS_RESULT, result.clone());

    Ok(result)
}

/// Attach an enhancement payload node to a result.
pub fn link_enhancement(store: &mut FactStore, result: &Term, enhancement: &Term) {
    store.insert(result.clone(), gsm::HAS_ENHANCEMENT, enhancement.clone());
}

/// Create a fresh, timestamped goal of `goal_type` for later enhancers.
pub fn emit_goal(store: &mut FactStore, goal_type: &str) -> Term {
    let goal = store.fresh_blank();
    store.insert(goal.clone(), rdf::TYPE, Term::iri(goal_type));
    store.insert(goal.clone(), gsm::IS_CREATED_ON, Literal::date_time(Utc::now()));
    goal
}

/// Content type recorded for the bundle's data file, if any.
///
/// Looks for a `foaf:Document` enhancement carrying a `dcterms:format`.
pub fn recorded_content_type(store: &FactStore) -> Option<String> {
    let type_iri = Iri::new(rdf::TYPE);
    let format = Iri::new(dcterms::FORMAT);
    let document = Term::iri(foaf::DOCUMENT);

    let mut formats: Vec<&str> = store
        .subjects(&type_iri, &document)
        .flat_map(|doc| store.objects(doc, &format))
        .filter_map(Term::as_literal)
        .map(|lit| lit.lexical.as_str())
        .collect();
    formats.sort_unstable();
    formats.first().map(|s| s.to_string())
}

fn created_on(store: &FactStore, goal: &Term) -> Option<DateTime<Utc>> {
    store
        .objects(goal, &Iri::new(gsm::IS_CREATED_ON))
        .filter_map(Term::as_literal)
        .filter_map(Literal::as_date_time)
        .min()
}

//! In-memory fact graph with pattern queries and sidecar persistence.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::debug;

use globdef_shared::{GlobdefError, Result, temp_path_for};

use crate::codec;
use crate::term::{Fact, Iri, Term};

/// A set of facts describing one bundle.
///
/// Facts are kept in insertion order with positional indexes by subject,
/// predicate and object. The store only grows: there is no removal.
#[derive(Debug, Clone, Default)]
pub struct FactStore {
    facts: Vec<Fact>,
    seen: HashSet<Fact>,
    by_subject: HashMap<Term, Vec<usize>>,
    by_predicate: HashMap<Iri, Vec<usize>>,
    by_object: HashMap<Term, Vec<usize>>,
    blank_labels: HashSet<String>,
    next_blank: u64,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a sidecar file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GlobdefError::io(path, e))?;
        codec::from_rdf_json(&content).map_err(|e| match e {
            GlobdefError::Parse { message } => {
                GlobdefError::parse(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Persist the store to `path`.
    ///
    /// The content is written next to `path` first and renamed over it, so an
    /// interrupted save leaves the previous sidecar intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = codec::to_rdf_json(self)?;
        let tmp = temp_path_for(path);
        std::fs::write(&tmp, content).map_err(|e| GlobdefError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            GlobdefError::io(path, e)
        })?;
        debug!(path = %path.display(), facts = self.len(), "fact store saved");
        Ok(())
    }

    /// Add a fact. Returns `false` if it was already present.
    pub fn add(&mut self, fact: Fact) -> bool {
        if self.seen.contains(&fact) {
            return false;
        }

        let pos = self.facts.len();
        for term in [&fact.subject, &fact.object] {
            if let Term::Blank(label) = term {
                self.blank_labels.insert(label.clone());
            }
        }
        self.by_subject
            .entry(fact.subject.clone())
            .or_default()
            .push(pos);
        self.by_predicate
            .entry(fact.predicate.clone())
            .or_default()
            .push(pos);
        self.by_object
            .entry(fact.object.clone())
            .or_default()
            .push(pos);
        self.seen.insert(fact.clone());
        self.facts.push(fact);
        true
    }

    /// Convenience wrapper around [`FactStore::add`].
    pub fn insert(
        &mut self,
        subject: impl Into<Term>,
        predicate: impl Into<Iri>,
        object: impl Into<Term>,
    ) -> bool {
        self.add(Fact::new(subject, predicate, object))
    }

    /// Mint a blank node label not used anywhere in this store.
    pub fn fresh_blank(&mut self) -> Term {
        loop {
            let label = format!("b{}", self.next_blank);
            self.next_blank += 1;
            if self.blank_labels.insert(label.clone()) {
                return Term::Blank(label);
            }
        }
    }

    /// Lazily iterate the facts matching a pattern; `None` matches anything.
    pub fn query<'a>(
        &'a self,
        subject: Option<&'a Term>,
        predicate: Option<&'a Iri>,
        object: Option<&'a Term>,
    ) -> impl Iterator<Item = &'a Fact> + 'a {
        let candidates: Box<dyn Iterator<Item = &'a Fact> + 'a> =
            match self.narrowest(subject, predicate, object) {
                Some(positions) => Box::new(positions.iter().map(move |&i| &self.facts[i])),
                None => Box::new(self.facts.iter()),
            };

        candidates.filter(move |f| {
            subject.is_none_or(|s| &f.subject == s)
                && predicate.is_none_or(|p| &f.predicate == p)
                && object.is_none_or(|o| &f.object == o)
        })
    }

    /// Whether any fact matches the pattern.
    pub fn exists(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Iri>,
        object: Option<&Term>,
    ) -> bool {
        self.query(subject, predicate, object).next().is_some()
    }

    /// Objects of `(subject, predicate, ?)`.
    ///
    /// The returned iterator borrows only the store, not the arguments.
    pub fn objects<'a>(
        &'a self,
        subject: &Term,
        predicate: &Iri,
    ) -> impl Iterator<Item = &'a Term> + use<'a> {
        let subject = subject.clone();
        let predicate = predicate.clone();
        self.at(self.by_subject.get(&subject))
            .filter(move |f| f.subject == subject && f.predicate == predicate)
            .map(|f| &f.object)
    }

    /// Subjects of `(?, predicate, object)`.
    pub fn subjects<'a>(
        &'a self,
        predicate: &Iri,
        object: &Term,
    ) -> impl Iterator<Item = &'a Term> + use<'a> {
        let predicate = predicate.clone();
        let object = object.clone();
        self.at(self.by_object.get(&object))
            .filter(move |f| f.object == object && f.predicate == predicate)
            .map(|f| &f.subject)
    }

    /// Copy every fact of `other` into this store.
    ///
    /// Blank nodes of `other` are relabelled to fresh local labels; the
    /// returned map goes from `other`'s labels to the new terms.
    pub fn merge(&mut self, other: &FactStore) -> HashMap<String, Term> {
        let mut relabel: HashMap<String, Term> = HashMap::new();
        for fact in other.iter() {
            let subject = self.localize(&fact.subject, &mut relabel);
            let object = self.localize(&fact.object, &mut relabel);
            self.add(Fact {
                subject,
                predicate: fact.predicate.clone(),
                object,
            });
        }
        relabel
    }

    fn localize(&mut self, term: &Term, relabel: &mut HashMap<String, Term>) -> Term {
        match term {
            Term::Blank(label) => {
                if let Some(local) = relabel.get(label) {
                    return local.clone();
                }
                let local = self.fresh_blank();
                relabel.insert(label.clone(), local.clone());
                local
            }
            other => other.clone(),
        }
    }

    /// All facts in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Fact> {
        self.facts.iter()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    fn at<'a>(
        &'a self,
        positions: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = &'a Fact> + use<'a> {
        positions
            .into_iter()
            .flatten()
            .map(move |&i| &self.facts[i])
    }

    fn narrowest(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Iri>,
        object: Option<&Term>,
    ) -> Option<&[usize]> {
        let empty: &[usize] = &[];
        let candidates = [
            subject.map(|s| self.by_subject.get(s).map_or(empty, Vec::as_slice)),
            predicate.map(|p| self.by_predicate.get(p).map_or(empty, Vec::as_slice)),
            object.map(|o| self.by_object.get(o).map_or(empty, Vec::as_slice)),
        ];

        candidates
            .into_iter()
            .flatten()
            .min_by_key(|positions| positions.len())
    }
}

/// Two stores are equal when they hold the same set of facts, in any order.
impl PartialEq for FactStore {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for FactStore {}

impl Extend<Fact> for FactStore {
    fn extend<T: IntoIterator<Item = Fact>>(&mut self, iter: T) {
        for fact in iter {
            self.add(fact);
        }
    }
}

impl FromIterator<Fact> for FactStore {
    fn from_iter<T: IntoIterator<Item = Fact>>(iter: T) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Literal;
    use crate::vocab::{dcterms, gsm, rdf};

    fn type_iri() -> Iri {
        Iri::new(rdf::TYPE)
    }

    #[test]
    fn add_is_idempotent() {
        let mut store = FactStore::new();
        let goal = store.fresh_blank();
        assert!(store.insert(goal.clone(), rdf::TYPE, Term::iri(gsm::INITIAL_GOAL)));
        assert!(!store.insert(goal.clone(), rdf::TYPE, Term::iri(gsm::INITIAL_GOAL)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn query_filters_by_each_position() {
        let mut store = FactStore::new();
        let a = store.fresh_blank();
        let b = store.fresh_blank();
        store.insert(a.clone(), rdf::TYPE, Term::iri(gsm::INITIAL_GOAL));
        store.insert(b.clone(), rdf::TYPE, Term::iri(gsm::KNOWN_TYPE_GOAL));
        store.insert(b.clone(), dcterms::FORMAT, Term::literal("text/plain"));

        let ty = type_iri();
        assert_eq!(store.query(None, Some(&ty), None).count(), 2);
        assert_eq!(store.query(Some(&b), None, None).count(), 2);

        let known = Term::iri(gsm::KNOWN_TYPE_GOAL);
        let hits: Vec<_> = store.subjects(&ty, &known).collect();
        assert_eq!(hits, vec![&b]);

        assert_eq!(store.query(None, None, None).count(), 3);
        assert!(store.exists(Some(&a), Some(&ty), None));
        assert!(!store.exists(Some(&a), Some(&Iri::new(dcterms::FORMAT)), None));
    }

    #[test]
    fn query_on_unknown_term_is_empty() {
        let mut store = FactStore::new();
        store.insert(Term::iri("urn:x"), rdf::TYPE, Term::iri(gsm::FILE));
        let missing = Term::iri("urn:missing");
        assert!(!store.exists(Some(&missing), None, None));
        assert!(!store.exists(None, Some(&type_iri()), Some(&missing)));
    }

    #[test]
    fn fresh_blank_skips_loaded_labels() {
        let mut store = FactStore::new();
        store.insert(Term::blank("b0"), rdf::TYPE, Term::iri(gsm::GOAL));
        store.insert(Term::blank("b1"), rdf::TYPE, Term::iri(gsm::GOAL));
        let fresh = store.fresh_blank();
        assert_eq!(fresh, Term::blank("b2"));
        assert_ne!(store.fresh_blank(), fresh);
    }

    #[test]
    fn merge_relabels_blank_nodes() {
        let mut store = FactStore::new();
        store.insert(Term::blank("b0"), rdf::TYPE, Term::iri(gsm::INITIAL_GOAL));

        let mut incoming = FactStore::new();
        incoming.insert(Term::blank("b0"), rdf::TYPE, Term::iri(gsm::GOAL_RESULT));
        incoming.insert(
            Term::blank("b0"),
            dcterms::FORMAT,
            Literal::string("text/plain"),
        );

        let relabel = store.merge(&incoming);
        let local = relabel.get("b0").expect("relabelled");
        assert_ne!(local, &Term::blank("b0"));
        assert_eq!(store.len(), 3);
        assert!(store.exists(
            Some(local),
            Some(&type_iri()),
            Some(&Term::iri(gsm::GOAL_RESULT))
        ));
        // The pre-existing b0 keeps its own type only.
        assert_eq!(store.query(Some(&Term::blank("b0")), None, None).count(), 1);
    }

    #[test]
    fn equality_ignores_order() {
        let a: FactStore = [
            Fact::new(Term::iri("urn:a"), rdf::TYPE, Term::iri(gsm::FILE)),
            Fact::new(Term::iri("urn:b"), rdf::TYPE, Term::iri(gsm::SIDECAR_FILE)),
        ]
        .into_iter()
        .collect();
        let b: FactStore = a.iter().rev().cloned().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn lookups_outlive_their_arguments() {
        let mut store = FactStore::new();
        let goal = store.fresh_blank();
        let result = store.fresh_blank();
        store.insert(goal.clone(), gsm::HAS_RESULT, result.clone());

        let found = store
            .objects(&goal, &Iri::new(gsm::HAS_RESULT))
            .next()
            .unwrap();
        assert_eq!(found, &result);

        let owner = store
            .subjects(&Iri::new(gsm::HAS_RESULT), &result.clone())
            .next()
            .unwrap();
        assert_eq!(owner, &goal);
        assert_eq!(store.iter().rev().next().map(|f| &f.object), Some(&result));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt.globdef");

        let mut store = FactStore::new();
        let goal = store.fresh_blank();
        store.insert(goal.clone(), rdf::TYPE, Term::iri(gsm::INITIAL_GOAL));
        store.insert(goal, gsm::IS_CREATED_ON, Literal::date_time(chrono::Utc::now()));
        store.insert(
            Term::iri("file:///data/notes.txt"),
            gsm::HAS_FILE_NAME,
            Term::literal("notes.txt"),
        );
        store.save(&path).expect("save");

        assert!(!temp_path_for(&path).exists());
        let loaded = FactStore::load(&path).expect("load");
        assert_eq!(loaded, store);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FactStore::load(&dir.path().join("absent.globdef")).unwrap_err();
        assert!(matches!(err, GlobdefError::Io { .. }));
    }

    #[test]
    fn load_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.globdef");
        std::fs::write(&path, "{ not json").unwrap();
        let err = FactStore::load(&path).unwrap_err();
        assert!(matches!(err, GlobdefError::Parse { .. }));
        assert!(err.to_string().contains("broken.globdef"));
    }

    #[test]
    fn save_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("x.globdef");
        let err = FactStore::new().save(&path).unwrap_err();
        assert!(matches!(err, GlobdefError::Io { .. }));
    }
}

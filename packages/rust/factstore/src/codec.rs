//! RDF/JSON codec used for sidecars and remote enhancement responses.
//!
//! Layout: `{ subject: { predicate: [ { "type", "value", "lang"?, "datatype"? } ] } }`
//! with blank nodes written as `_:label`. Output is sorted, so the same fact
//! set always serializes to the same bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use globdef_shared::{GlobdefError, Result};

use crate::store::FactStore;
use crate::term::{Fact, Iri, Literal, Term};

/// Media type of the serialized form.
pub const RDF_JSON_MEDIA_TYPE: &str = "application/rdf+json";

const BLANK_PREFIX: &str = "_:";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ObjectKind {
    Uri,
    Bnode,
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct ObjectValue {
    #[serde(rename = "type")]
    kind: ObjectKind,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,
}

type Document = BTreeMap<String, BTreeMap<String, Vec<ObjectValue>>>;

/// Serialize a store as pretty-printed RDF/JSON.
pub fn to_rdf_json(store: &FactStore) -> Result<String> {
    let mut doc = Document::new();
    for fact in store.iter() {
        let subject = match &fact.subject {
            Term::Iri(iri) => iri.as_str().to_string(),
            Term::Blank(label) => format!("{BLANK_PREFIX}{label}"),
            Term::Literal(lit) => {
                return Err(GlobdefError::validation(format!(
                    "literal subject {lit} cannot be serialized"
                )));
            }
        };
        doc.entry(subject)
            .or_default()
            .entry(fact.predicate.as_str().to_string())
            .or_default()
            .push(encode_object(&fact.object));
    }

    for objects in doc.values_mut().flat_map(|preds| preds.values_mut()) {
        objects.sort();
    }

    let mut out = serde_json::to_string_pretty(&doc)
        .map_err(|e| GlobdefError::parse(format!("failed to serialize facts: {e}")))?;
    out.push('\n');
    Ok(out)
}

/// Parse RDF/JSON text into a new store.
pub fn from_rdf_json(input: &str) -> Result<FactStore> {
    let doc: Document = serde_json::from_str(input)
        .map_err(|e| GlobdefError::parse(format!("invalid RDF/JSON: {e}")))?;
    decode(doc)
}

/// Parse RDF/JSON bytes (e.g. an HTTP response body) into a new store.
pub fn from_rdf_json_slice(input: &[u8]) -> Result<FactStore> {
    let doc: Document = serde_json::from_slice(input)
        .map_err(|e| GlobdefError::parse(format!("invalid RDF/JSON: {e}")))?;
    decode(doc)
}

fn decode(doc: Document) -> Result<FactStore> {
    let mut store = FactStore::new();
    for (subject, predicates) in doc {
        let subject = decode_resource(&subject)?;
        for (predicate, objects) in predicates {
            if predicate.is_empty() || predicate.starts_with(BLANK_PREFIX) {
                return Err(GlobdefError::parse(format!(
                    "predicate '{predicate}' is not a resource identifier"
                )));
            }
            for object in objects {
                store.add(Fact {
                    subject: subject.clone(),
                    predicate: Iri::new(predicate.as_str()),
                    object: decode_object(object)?,
                });
            }
        }
    }
    Ok(store)
}

fn decode_resource(value: &str) -> Result<Term> {
    match value.strip_prefix(BLANK_PREFIX) {
        Some("") => Err(GlobdefError::parse("empty blank node label")),
        Some(label) => Ok(Term::Blank(label.to_string())),
        None if value.is_empty() => Err(GlobdefError::parse("empty resource identifier")),
        None => Ok(Term::iri(value)),
    }
}

fn decode_object(object: ObjectValue) -> Result<Term> {
    match object.kind {
        ObjectKind::Uri => {
            if object.value.is_empty() {
                return Err(GlobdefError::parse("empty resource identifier"));
            }
            Ok(Term::iri(object.value))
        }
        ObjectKind::Bnode => {
            let label = object
                .value
                .strip_prefix(BLANK_PREFIX)
                .unwrap_or(&object.value);
            if label.is_empty() {
                return Err(GlobdefError::parse("empty blank node label"));
            }
            Ok(Term::Blank(label.to_string()))
        }
        ObjectKind::Literal => Ok(Term::Literal(Literal {
            lexical: object.value,
            datatype: object.datatype.map(Iri::new),
            lang: object.lang,
        })),
    }
}

fn encode_object(term: &Term) -> ObjectValue {
    match term {
        Term::Iri(iri) => ObjectValue {
            kind: ObjectKind::Uri,
            value: iri.as_str().to_string(),
            lang: None,
            datatype: None,
        },
        Term::Blank(label) => ObjectValue {
            kind: ObjectKind::Bnode,
            value: format!("{BLANK_PREFIX}{label}"),
            lang: None,
            datatype: None,
        },
        Term::Literal(lit) => ObjectValue {
            kind: ObjectKind::Literal,
            value: lit.lexical.clone(),
            lang: lit.lang.clone(),
            datatype: lit.datatype.as_ref().map(|d| d.as_str().to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{dcterms, fise, gsm, rdf, xsd};

    const STANBOL_RESPONSE: &str = r#"{
  "urn:enhancement-1": {
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#type": [
      { "type": "uri", "value": "http://fise.iks-project.eu/ontology/Enhancement" },
      { "type": "uri", "value": "http://fise.iks-project.eu/ontology/TextAnnotation" }
    ],
    "http://fise.iks-project.eu/ontology/selected-text": [
      { "type": "literal", "value": "Paris", "lang": "en" }
    ]
  },
  "_:n0": {
    "http://purl.org/dc/terms/relation": [
      { "type": "uri", "value": "urn:enhancement-1" }
    ]
  }
}"#;

    #[test]
    fn parses_remote_style_document() {
        let store = from_rdf_json(STANBOL_RESPONSE).expect("parse");
        assert_eq!(store.len(), 4);

        let ty = Iri::new(rdf::TYPE);
        let enhancement = Term::iri(fise::ENHANCEMENT);
        let subjects: Vec<_> = store.subjects(&ty, &enhancement).collect();
        assert_eq!(subjects, vec![&Term::iri("urn:enhancement-1")]);

        let selected = Iri::new("http://fise.iks-project.eu/ontology/selected-text");
        let text = store
            .objects(&Term::iri("urn:enhancement-1"), &selected)
            .next()
            .and_then(Term::as_literal)
            .expect("literal");
        assert_eq!(text.lexical, "Paris");
        assert_eq!(text.lang.as_deref(), Some("en"));

        assert!(store.exists(Some(&Term::blank("n0")), None, None));
    }

    #[test]
    fn serialization_is_deterministic() {
        let mut a = FactStore::new();
        a.insert(Term::blank("b1"), rdf::TYPE, Term::iri(gsm::KNOWN_TYPE_GOAL));
        a.insert(Term::blank("b0"), rdf::TYPE, Term::iri(gsm::INITIAL_GOAL));
        a.insert(Term::blank("b0"), dcterms::FORMAT, Term::literal("text/plain"));

        let b: FactStore = a.iter().rev().cloned().collect();
        assert_eq!(to_rdf_json(&a).unwrap(), to_rdf_json(&b).unwrap());
    }

    #[test]
    fn typed_literals_survive_roundtrip() {
        let mut store = FactStore::new();
        store.insert(
            Term::iri("file:///data/notes.txt"),
            gsm::IS_MODIFIED_ON,
            Literal {
                lexical: "2024-05-01T10:00:00Z".into(),
                datatype: Some(Iri::new(xsd::DATE_TIME)),
                lang: None,
            },
        );
        let text = to_rdf_json(&store).unwrap();
        assert!(text.contains(xsd::DATE_TIME));
        assert_eq!(from_rdf_json(&text).unwrap(), store);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            from_rdf_json("[1, 2, 3]"),
            Err(GlobdefError::Parse { .. })
        ));
        assert!(matches!(
            from_rdf_json(r#"{"urn:a": {"urn:p": [{"type": "graph", "value": "x"}]}}"#),
            Err(GlobdefError::Parse { .. })
        ));
        assert!(matches!(
            from_rdf_json(r#"{"urn:a": {"_:p": [{"type": "uri", "value": "urn:b"}]}}"#),
            Err(GlobdefError::Parse { .. })
        ));
        assert!(matches!(
            from_rdf_json_slice(b"<rdf:RDF/>"),
            Err(GlobdefError::Parse { .. })
        ));
    }

    #[test]
    fn literal_subject_cannot_be_serialized() {
        let mut store = FactStore::new();
        store.insert(Term::literal("oops"), rdf::TYPE, Term::iri(gsm::FILE));
        assert!(matches!(
            to_rdf_json(&store),
            Err(GlobdefError::Validation { .. })
        ));
    }
}

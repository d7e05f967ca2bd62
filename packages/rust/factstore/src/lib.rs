//! Fact graph storage for globdef sidecars.
//!
//! This crate provides:
//! - [`FactStore`]: an append-only set of (subject, predicate, object) facts
//!   with indexed pattern queries, persisted as a sidecar file
//! - [`Term`], [`Iri`], [`Literal`], [`Fact`]: the graph's building blocks
//! - [`codec`]: the RDF/JSON serialization shared by sidecars and the
//!   remote enhancement protocol
//! - [`vocab`]: identifiers of the meta ontology and external vocabularies

pub mod codec;
pub mod store;
pub mod term;
pub mod vocab;

pub use codec::{RDF_JSON_MEDIA_TYPE, from_rdf_json, from_rdf_json_slice, to_rdf_json};
pub use store::FactStore;
pub use term::{Fact, Iri, Literal, Term};

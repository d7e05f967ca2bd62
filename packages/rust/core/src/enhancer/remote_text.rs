//! Remote text enrichment over HTTP.
//!
//! The data file is POSTed to an enrichment endpoint, which answers with an
//! RDF/JSON fact set. Those facts are merged into the bundle's store and
//! every `fise:Enhancement` node they describe is attached to the result.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, info, instrument};

use globdef_factstore::vocab::{fise, gsm, rdf};
use globdef_factstore::{FactStore, Iri, RDF_JSON_MEDIA_TYPE, Term, from_rdf_json_slice};
use globdef_shared::{Bundle, GlobdefError, RemoteEnhancerConfig, Result};

use super::Enhancer;
use crate::goal::{self, Taxonomy};

/// Query parameter carrying the language hint.
pub const LANGUAGE_PARAM: &str = "dbpedia-dereference:enhancer.engines.dereference.languages";

const TEXT_FAMILY: &str = "text/";

/// Build the HTTP client used for enrichment requests.
pub fn build_client(config: &RemoteEnhancerConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("globdef/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| GlobdefError::remote(format!("failed to build HTTP client: {e}")))
}

/// Satisfies known-type goals of text files via a remote enrichment service.
pub struct RemoteTextEnhancer {
    config: RemoteEnhancerConfig,
    client: reqwest::Client,
}

impl RemoteTextEnhancer {
    pub fn new(config: RemoteEnhancerConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Build an enhancer with its own client.
    pub fn from_config(config: RemoteEnhancerConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self::new(config, client))
    }

    fn request_url(&self) -> url::Url {
        let mut url = self.config.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(LANGUAGE_PARAM, &self.config.language);
        url
    }

    async fn enrich(&self, content_type: &str, body: Vec<u8>) -> Result<FactStore> {
        let url = self.request_url();
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, content_type)
            .header(ACCEPT, RDF_JSON_MEDIA_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| GlobdefError::remote(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GlobdefError::remote(format!("{url} returned HTTP {status}")));
        }

        let bytes = response.bytes().await.map_err(|e| {
            GlobdefError::remote(format!("failed to read response from {url}: {e}"))
        })?;
        debug!(bytes = bytes.len(), "enrichment response received");
        from_rdf_json_slice(&bytes)
    }
}

fn is_text(content_type: &str) -> bool {
    content_type
        .get(..TEXT_FAMILY.len())
        .is_some_and(|family| family.eq_ignore_ascii_case(TEXT_FAMILY))
}

#[async_trait]
impl Enhancer for RemoteTextEnhancer {
    fn name(&self) -> &str {
        "RemoteTextEnhancer"
    }

    fn match_goal(&self, store: &FactStore, taxonomy: &Taxonomy) -> Option<Term> {
        goal::find_outstanding_goal(store, taxonomy, gsm::KNOWN_TYPE_GOAL, |store, _| {
            goal::recorded_content_type(store).is_some_and(|ct| is_text(&ct))
        })
    }

    #[instrument(
        skip_all,
        fields(bundle = %bundle, goal = %goal, endpoint = %self.config.endpoint)
    )]
    async fn process(&self, bundle: &Bundle, goal: &Term, store: &mut FactStore) -> Result<()> {
        let content_type = goal::recorded_content_type(store).ok_or_else(|| {
            GlobdefError::validation(format!("{bundle} has no recorded content type"))
        })?;
        let body = tokio::fs::read(&bundle.data_path)
            .await
            .map_err(|e| GlobdefError::io(&bundle.data_path, e))?;

        // Parsed in isolation so a bad response never touches the store.
        let incoming = self.enrich(&content_type, body).await?;
        let type_iri = Iri::new(rdf::TYPE);
        let enhancements: Vec<Term> = incoming
            .subjects(&type_iri, &Term::iri(fise::ENHANCEMENT))
            .cloned()
            .collect();
        let annotations = |ty: &str| incoming.subjects(&type_iri, &Term::iri(ty)).count();

        let result = goal::record_result(store, goal, self.name())?;
        let relabel = store.merge(&incoming);
        for enhancement in &enhancements {
            let local = match enhancement {
                Term::Blank(label) => relabel.get(label).unwrap_or(enhancement),
                other => other,
            };
            let local = local.clone();
            goal::link_enhancement(store, &result, &local);
        }

        store.save(&bundle.sidecar_path)?;
        info!(
            facts = incoming.len(),
            enhancements = enhancements.len(),
            text_annotations = annotations(fise::TEXT_ANNOTATION),
            entity_annotations = annotations(fise::ENTITY_ANNOTATION),
            "remote enhancements merged"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhancer::TypeDetectionEnhancer;
    use globdef_shared::DEFAULT_SIDECAR_SUFFIX;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESPONSE: &str = r#"{
  "_:t1": {
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#type": [
      { "type": "uri", "value": "http://fise.iks-project.eu/ontology/Enhancement" },
      { "type": "uri", "value": "http://fise.iks-project.eu/ontology/TextAnnotation" }
    ],
    "http://fise.iks-project.eu/ontology/selected-text": [
      { "type": "literal", "value": "Paris", "lang": "en" }
    ]
  },
  "urn:enhancement:e2": {
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#type": [
      { "type": "uri", "value": "http://fise.iks-project.eu/ontology/Enhancement" },
      { "type": "uri", "value": "http://fise.iks-project.eu/ontology/EntityAnnotation" }
    ],
    "http://fise.iks-project.eu/ontology/entity-reference": [
      { "type": "uri", "value": "http://dbpedia.org/resource/Paris" }
    ],
    "http://purl.org/dc/terms/relation": [
      { "type": "bnode", "value": "_:t1" }
    ]
  },
  "http://dbpedia.org/resource/Paris": {
    "http://www.w3.org/2000/01/rdf-schema#label": [
      { "type": "literal", "value": "Paris", "lang": "en" }
    ]
  }
}"#;

    fn config(server: &MockServer) -> RemoteEnhancerConfig {
        RemoteEnhancerConfig {
            endpoint: url::Url::parse(&format!("{}/enhancer", server.uri())).unwrap(),
            language: "en".into(),
            timeout_secs: 5,
        }
    }

    /// Bootstrap and type-detect a bundle so it carries a known-type goal.
    async fn typed_bundle(
        dir: &std::path::Path,
        name: &str,
        content: &[u8],
    ) -> (Bundle, FactStore) {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        let bundle = Bundle::new(&path, DEFAULT_SIDECAR_SUFFIX);
        globdef_discovery::bootstrap(&bundle, false).unwrap();

        let mut store = FactStore::load(&bundle.sidecar_path).unwrap();
        let detector = TypeDetectionEnhancer::default();
        let initial = detector.match_goal(&store, &Taxonomy::builtin()).unwrap();
        detector.process(&bundle, &initial, &mut store).await.unwrap();
        (bundle, store)
    }

    #[tokio::test]
    async fn merges_response_and_links_enhancements() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enhancer"))
            .and(header("content-type", "text/plain"))
            .and(header("accept", RDF_JSON_MEDIA_TYPE))
            .and(query_param(LANGUAGE_PARAM, "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESPONSE))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (bundle, mut store) =
            typed_bundle(dir.path(), "paris.txt", b"Paris is lovely.\n").await;
        let taxonomy = Taxonomy::builtin();
        let enhancer = RemoteTextEnhancer::from_config(config(&server)).unwrap();

        let known = enhancer.match_goal(&store, &taxonomy).expect("known-type goal");
        enhancer.process(&bundle, &known, &mut store).await.unwrap();

        let saved = FactStore::load(&bundle.sidecar_path).unwrap();
        assert_eq!(saved, store);
        assert!(goal::is_satisfied(&saved, &known));

        let result = saved
            .objects(&known, &Iri::new(gsm::HAS_RESULT))
            .next()
            .unwrap()
            .clone();
        let linked: Vec<&Term> = saved
            .objects(&result, &Iri::new(gsm::HAS_ENHANCEMENT))
            .collect();
        assert_eq!(linked.len(), 2);
        assert!(linked.contains(&&Term::iri("urn:enhancement:e2")));
        let ty = Iri::new(rdf::TYPE);
        let enhancement_type = Term::iri(fise::ENHANCEMENT);
        for enhancement in &linked {
            assert!(saved.exists(Some(*enhancement), Some(&ty), Some(&enhancement_type)));
        }
        let text = Term::iri(fise::TEXT_ANNOTATION);
        let entity = Term::iri(fise::ENTITY_ANNOTATION);
        assert_eq!(saved.subjects(&ty, &text).count(), 1);
        let e2 = Term::iri("urn:enhancement:e2");
        assert!(saved.exists(Some(&e2), Some(&ty), Some(&entity)));

        // The response's blank node was relabelled but still connected.
        let relation = Iri::new("http://purl.org/dc/terms/relation");
        let target = saved
            .objects(&Term::iri("urn:enhancement:e2"), &relation)
            .next()
            .unwrap();
        assert!(target.is_blank());
        assert!(linked.contains(&target));

        assert_eq!(enhancer.match_goal(&saved, &taxonomy), None);
    }

    #[tokio::test]
    async fn server_error_leaves_sidecar_byte_identical() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (bundle, mut store) = typed_bundle(dir.path(), "a.txt", b"some text").await;
        let before = std::fs::read(&bundle.sidecar_path).unwrap();
        let facts_before = store.len();

        let enhancer = RemoteTextEnhancer::from_config(config(&server)).unwrap();
        let known = enhancer.match_goal(&store, &Taxonomy::builtin()).unwrap();
        let err = enhancer.process(&bundle, &known, &mut store).await.unwrap_err();

        assert!(matches!(err, GlobdefError::RemoteService(_)));
        assert_eq!(std::fs::read(&bundle.sidecar_path).unwrap(), before);
        assert_eq!(store.len(), facts_before);

        // Still outstanding, so a later run retries it.
        let reloaded = FactStore::load(&bundle.sidecar_path).unwrap();
        assert_eq!(
            enhancer.match_goal(&reloaded, &Taxonomy::builtin()),
            Some(known)
        );
    }

    #[tokio::test]
    async fn non_200_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (bundle, mut store) = typed_bundle(dir.path(), "a.txt", b"some text").await;
        let enhancer = RemoteTextEnhancer::from_config(config(&server)).unwrap();
        let known = enhancer.match_goal(&store, &Taxonomy::builtin()).unwrap();

        let err = enhancer.process(&bundle, &known, &mut store).await.unwrap_err();
        assert!(matches!(err, GlobdefError::RemoteService(_)));
    }

    #[tokio::test]
    async fn malformed_response_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (bundle, mut store) = typed_bundle(dir.path(), "a.txt", b"some text").await;
        let before = std::fs::read(&bundle.sidecar_path).unwrap();
        let enhancer = RemoteTextEnhancer::from_config(config(&server)).unwrap();
        let known = enhancer.match_goal(&store, &Taxonomy::builtin()).unwrap();

        let err = enhancer.process(&bundle, &known, &mut store).await.unwrap_err();
        assert!(matches!(err, GlobdefError::Parse { .. }));
        assert_eq!(std::fs::read(&bundle.sidecar_path).unwrap(), before);
    }

    #[tokio::test]
    async fn binary_content_is_not_matched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESPONSE))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (_bundle, store) = typed_bundle(dir.path(), "blob.bin", &[0, 159, 146, 150]).await;
        assert_eq!(
            goal::recorded_content_type(&store).as_deref(),
            Some("application/octet-stream")
        );

        let enhancer = RemoteTextEnhancer::from_config(config(&server)).unwrap();
        assert_eq!(enhancer.match_goal(&store, &Taxonomy::builtin()), None);
        assert_eq!(goal::outstanding_goals(&store, &Taxonomy::builtin()).len(), 1);
    }

    #[tokio::test]
    async fn timeout_fails_step_without_touching_sidecar() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(RESPONSE)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (bundle, mut store) = typed_bundle(dir.path(), "slow.txt", b"some text").await;
        let before = std::fs::read(&bundle.sidecar_path).unwrap();
        let facts_before = store.len();

        let config = RemoteEnhancerConfig {
            timeout_secs: 1,
            ..config(&server)
        };
        let enhancer = RemoteTextEnhancer::from_config(config).unwrap();
        let known = enhancer.match_goal(&store, &Taxonomy::builtin()).unwrap();

        let err = enhancer.process(&bundle, &known, &mut store).await.unwrap_err();
        assert!(matches!(err, GlobdefError::RemoteService(_)));
        assert_eq!(std::fs::read(&bundle.sidecar_path).unwrap(), before);
        assert_eq!(store.len(), facts_before);
        assert!(!goal::is_satisfied(&store, &known));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_step_without_touching_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let (bundle, mut store) = typed_bundle(dir.path(), "offline.txt", b"some text").await;
        let before = std::fs::read(&bundle.sidecar_path).unwrap();

        let config = RemoteEnhancerConfig {
            endpoint: url::Url::parse("http://127.0.0.1:1/enhancer").unwrap(),
            language: "en".into(),
            timeout_secs: 5,
        };
        let enhancer = RemoteTextEnhancer::from_config(config).unwrap();
        let known = enhancer.match_goal(&store, &Taxonomy::builtin()).unwrap();

        let err = enhancer.process(&bundle, &known, &mut store).await.unwrap_err();
        assert!(matches!(err, GlobdefError::RemoteService(_)));
        assert_eq!(std::fs::read(&bundle.sidecar_path).unwrap(), before);
    }

    #[test]
    fn text_family_check() {
        assert!(is_text("text/plain"));
        assert!(is_text("Text/HTML; charset=utf-8"));
        assert!(!is_text("application/json"));
        assert!(!is_text("text"));
    }
}

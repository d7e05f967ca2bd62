//! Well-known resource identifiers.

/// globdef meta ontology: goals, results, files.
pub mod gsm {
    pub const GOAL: &str = "https://globdef.github.io/ontology/globdef-meta.owl#Goal";
    pub const INITIAL_GOAL: &str =
        "https://globdef.github.io/ontology/globdef-meta.owl#InitialGoal";
    pub const KNOWN_TYPE_GOAL: &str =
        "https://globdef.github.io/ontology/globdef-meta.owl#KnownTypeGoal";
    pub const GOAL_RESULT: &str = "https://globdef.github.io/ontology/globdef-meta.owl#GoalResult";
    pub const ENHANCER: &str = "https://globdef.github.io/ontology/globdef-meta.owl#Enhancer";
    pub const FILE: &str = "https://globdef.github.io/ontology/globdef-meta.owl#File";
    pub const SIDECAR_FILE: &str =
        "https://globdef.github.io/ontology/globdef-meta.owl#SidecarFile";

    pub const HAS_RESULT: &str = "https://globdef.github.io/ontology/globdef-meta.owl#hasResult";
    pub const IS_CREATED_BY: &str =
        "https://globdef.github.io/ontology/globdef-meta.owl#isCreatedBy";
    pub const HAS_ENHANCEMENT: &str =
        "https://globdef.github.io/ontology/globdef-meta.owl#hasEnhancement";
    pub const HAS_FILE_NAME: &str =
        "https://globdef.github.io/ontology/globdef-meta.owl#hasFileName";
    pub const IS_DESCRIBED_BY: &str =
        "https://globdef.github.io/ontology/globdef-meta.owl#isDescribedBy";
    pub const IS_CREATED_ON: &str =
        "https://globdef.github.io/ontology/globdef-meta.owl#isCreatedOn";
    pub const IS_MODIFIED_ON: &str =
        "https://globdef.github.io/ontology/globdef-meta.owl#isModifiedOn";
}

pub mod rdf {
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

pub mod rdfs {
    pub const SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    pub const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
}

pub mod xsd {
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
}

pub mod foaf {
    pub const DOCUMENT: &str = "http://xmlns.com/foaf/0.1/Document";
}

pub mod dcterms {
    pub const FORMAT: &str = "http://purl.org/dc/terms/format";
}

/// Enhancement structure returned by the remote text service.
pub mod fise {
    pub const ENHANCEMENT: &str = "http://fise.iks-project.eu/ontology/Enhancement";
    pub const TEXT_ANNOTATION: &str = "http://fise.iks-project.eu/ontology/TextAnnotation";
    pub const ENTITY_ANNOTATION: &str = "http://fise.iks-project.eu/ontology/EntityAnnotation";
}

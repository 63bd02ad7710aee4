//! Endpoint paths, header names, media types and the RDF terms used to describe a
//! connection in the dotNetRDF configuration vocabulary.

use oxigraph::model::NamedNodeRef;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "kb";

/// Store-side query timeout, in milliseconds.
pub const QUERY_TIMEOUT_HEADER: &str = "X-BIGDATA-MAX-QUERY-MILLIS";

/// Queries at least this many characters long are sent as a form-encoded POST body instead of a GET parameter.
pub const MAX_GET_QUERY_LENGTH: usize = 2048;

// service paths
pub const SPARQL_PATH: &str = "/sparql";
pub const UPDATE_POST_PATH: &str = "/sparql?updatePost";
pub const BEGIN_TX_PATH: &str = "/tx?timestamp=-1";
pub const TX_PATH: &str = "/tx/";
pub const NAMESPACE_PATH: &str = "/namespace/";

// query parameters
pub const TIMESTAMP_PARAM: &str = "timestamp";
pub const QUERY_PARAM: &str = "query";
pub const CONTEXT_PARAM: &str = "c";

// media types
pub const ANY_MEDIA_TYPE: &str = "*/*";
pub const XML_MEDIA_TYPE: &str = "application/xml";
pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
pub const FORM_URL_ENCODED_UTF8: &str = "application/x-www-form-urlencoded;charset=utf-8";
pub const FORM_MULTIPART: &str = "multipart/form-data";

/// Results formats offered when a query may answer with either bindings or a graph.
pub const SPARQL_RESULTS_ACCEPT: &[&str] = &[
    "application/sparql-results+xml",
    "application/sparql-results+json",
    "text/tab-separated-values",
    "text/boolean",
];

/// RDF formats offered when a graph is expected.
pub const RDF_ACCEPT: &[&str] = &[
    "text/turtle",
    "application/n-triples",
    "application/rdf+xml",
    "application/trig",
    "application/n-quads",
    "text/n3",
];

pub const CONSTRUCT_ALL: &str = "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }";
pub const LIST_GRAPHS_QUERY: &str = "SELECT DISTINCT ?g WHERE { GRAPH ?g { ?s ?p ?o } }";

// configuration vocabulary
pub const RDF_TYPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
pub const RDFS_LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label");
pub const DNR_TYPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.dotnetrdf.org/configuration#type");
pub const DNR_STORAGE_PROVIDER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.dotnetrdf.org/configuration#StorageProvider");
pub const DNR_SERVER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.dotnetrdf.org/configuration#server");
pub const DNR_STORE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.dotnetrdf.org/configuration#storeID");

/// Type name recorded under `dnr:type` for this connector.
pub const CONNECTOR_TYPE_NAME: &str = "blazegraph::BlazegraphConnector";

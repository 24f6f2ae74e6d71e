//! Namespaces, media types and option names shared across the client.

use oxigraph::model::NamedNodeRef;

/// Namespace of the SPARQL Query Results XML Format.
pub const SPARQL_RESULTS_NS: &str = "http://www.w3.org/2005/sparql-results#";

pub const RDF_LANG_STRING: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#langString");

// media types
pub const SPARQL_RESULTS_XML: &str = "application/sparql-results+xml";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const TURTLE_UTF8: &str = "text/turtle; charset=utf-8";
pub const LEGACY_TURTLE: &str = "application/x-turtle";

// base URI options
pub const QUERY_URI_OPTION: &str = "query-uri";
pub const UPDATE_URI_OPTION: &str = "update-uri";
pub const DATA_URI_OPTION: &str = "data-uri";

/// Variables a model query must bind.
pub const MODEL_VARIABLES: [&str; 4] = ["g", "s", "p", "o"];

// request headers
pub const ACCEPT: &str = "Accept";
pub const CONTENT_TYPE: &str = "Content-Type";

pub const DEFAULT_USER_AGENT: &str = concat!("sparqlclient/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

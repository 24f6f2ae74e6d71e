//! Request bodies for SPARQL Update, `INSERT DATA` and the graph store
//! endpoints.

use crate::consts::LEGACY_TURTLE;
use crate::encode::{append_query_param, urlencode_into, urlencode_size};
use crate::errors::{Error, Result};
use crate::term;
use crate::util::Logger;
use log::Level;
use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::{Dataset, GraphNameRef, TripleRef};

/// `update=<statement>` form body.
pub fn update_body(statement: &[u8]) -> String {
    let mut body = String::with_capacity(7 + urlencode_size(statement));
    body.push_str("update=");
    urlencode_into(statement, &mut body);
    body
}

/// Wraps a block of triples in `INSERT DATA`, inside `GRAPH <graph>` when a
/// graph is given. The graph must be an absolute IRI.
pub fn insert_data(triples: &[u8], graph: Option<&str>) -> Result<Vec<u8>> {
    let mut statement = Vec::with_capacity(triples.len() + 32);
    statement.extend_from_slice(b"INSERT DATA { ");
    if let Some(graph) = graph {
        let graph = term::uri(graph)?;
        statement.extend_from_slice(format!("GRAPH {graph} {{ ").as_bytes());
    }
    statement.extend_from_slice(triples);
    if graph.is_some() {
        statement.extend_from_slice(b" }");
    }
    statement.extend_from_slice(b" }");
    Ok(statement)
}

pub fn clear_graph(graph: &str) -> Result<String> {
    Ok(format!("CLEAR SILENT GRAPH {}", term::uri(graph)?))
}

/// Target of a graph store PUT: `data_uri?graph=<encoded graph>`.
pub fn put_url(data_uri: &str, graph: &str) -> String {
    append_query_param(data_uri, "graph", graph.as_bytes())
}

/// Form body appending Turtle to a graph through the data endpoint.
pub fn datastore_post_body(graph: &str, triples: &[u8]) -> String {
    let mut body = String::with_capacity(
        48 + urlencode_size(graph.as_bytes()) + urlencode_size(triples),
    );
    body.push_str("mime-type=");
    body.push_str(LEGACY_TURTLE);
    body.push_str("&graph=");
    urlencode_into(graph.as_bytes(), &mut body);
    body.push_str("&data=");
    urlencode_into(triples, &mut body);
    body
}

/// Serializes triples as N-Triples.
pub fn ntriples<'a>(triples: impl IntoIterator<Item = TripleRef<'a>>) -> Result<Vec<u8>> {
    let mut serializer = RdfSerializer::from_format(RdfFormat::NTriples).for_writer(Vec::new());
    for triple in triples {
        serializer
            .serialize_triple(triple)
            .map_err(|e| Error::Serialize(e.to_string()))?;
    }
    serializer
        .finish()
        .map_err(|e| Error::Serialize(e.to_string()))
}

/// Splits a dataset into one N-Triples block per graph, the default graph
/// first. Graphs named by a blank node cannot be addressed remotely and are
/// skipped.
pub fn dataset_blocks(dataset: &Dataset, logger: &Logger) -> Result<Vec<(Option<String>, Vec<u8>)>> {
    let mut graphs: Vec<GraphNameRef<'_>> = Vec::new();
    for quad in dataset.iter() {
        if !graphs.contains(&quad.graph_name) {
            graphs.push(quad.graph_name);
        }
    }
    graphs.sort_by_key(|g| !g.is_default_graph());

    let mut blocks = Vec::with_capacity(graphs.len());
    for graph in graphs {
        let name = match graph {
            GraphNameRef::DefaultGraph => None,
            GraphNameRef::NamedNode(node) => Some(node.as_str().to_string()),
            GraphNameRef::BlankNode(node) => {
                sparql_log!(
                    logger,
                    Level::Warn,
                    "SPARQL: skipping graph {} which is named by a blank node",
                    node
                );
                continue;
            }
        };
        let payload = ntriples(dataset.graph(graph).iter())?;
        blocks.push((name, payload));
    }
    Ok(blocks)
}

//! Builds an RDF dataset from the results of a `SELECT ?g ?s ?p ?o` query.
//!
//! Each result row becomes one quad. `?g` is optional (the default graph is
//! used when it is unbound); `?s`, `?p` and `?o` must all be bound. Any other
//! variable, a boolean result, a literal outside `?o` or a blank-node
//! predicate fails the query.

use crate::consts::MODEL_VARIABLES;
use crate::errors::{Error, Result};
use crate::parser::ResultsSink;
use crate::term;
use oxigraph::model::{Dataset, GraphName, NamedNode, NamedOrBlankNode, Quad, Term};

#[derive(Default)]
pub struct DatasetBuilder {
    dataset: Dataset,
    graph: Option<GraphName>,
    subject: Option<NamedOrBlankNode>,
    predicate: Option<NamedNode>,
    object: Option<Term>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Dataset {
        self.dataset
    }

    fn unexpected(binding: &str) -> Error {
        Error::InvalidBinding(format!(
            "unexpected variable '{binding}' (expected one of ?g, ?s, ?p, ?o)"
        ))
    }
}

impl ResultsSink for DatasetBuilder {
    fn on_variable(&mut self, name: &str) -> Result<()> {
        if !MODEL_VARIABLES.contains(&name) {
            return Err(Self::unexpected(name));
        }
        Ok(())
    }

    fn on_begin_result(&mut self) -> Result<()> {
        self.graph = None;
        self.subject = None;
        self.predicate = None;
        self.object = None;
        Ok(())
    }

    fn on_end_result(&mut self) -> Result<()> {
        let (Some(subject), Some(predicate), Some(object)) = (
            self.subject.take(),
            self.predicate.take(),
            self.object.take(),
        ) else {
            return Err(Error::InvalidBinding(
                "result row does not contain a complete statement".to_string(),
            ));
        };
        let graph = self.graph.take().unwrap_or_default();
        self.dataset
            .insert(&Quad::new(subject, predicate, object, graph));
        Ok(())
    }

    fn on_uri(&mut self, binding: &str, uri: &str) -> Result<()> {
        let node = term::uri(uri)?;
        match binding {
            "g" => self.graph = Some(node.into()),
            "s" => self.subject = Some(node.into()),
            "p" => self.predicate = Some(node),
            "o" => self.object = Some(node.into()),
            other => return Err(Self::unexpected(other)),
        }
        Ok(())
    }

    fn on_bnode(&mut self, binding: &str, id: &str) -> Result<()> {
        let node = term::bnode(id)?;
        match binding {
            "g" => self.graph = Some(node.into()),
            "s" => self.subject = Some(node.into()),
            "p" => {
                return Err(Error::InvalidBinding(format!(
                    "blank node _:{id} cannot be used as a predicate"
                )))
            }
            "o" => self.object = Some(node.into()),
            other => return Err(Self::unexpected(other)),
        }
        Ok(())
    }

    fn on_literal(
        &mut self,
        binding: &str,
        value: &str,
        language: Option<&str>,
        datatype: Option<&str>,
    ) -> Result<()> {
        if binding != "o" {
            return Err(Error::InvalidBinding(format!(
                "unexpected literal value bound to '{binding}'"
            )));
        }
        self.object = Some(term::literal(value, language, datatype)?.into());
        Ok(())
    }

    fn on_boolean(&mut self, _value: bool) -> Result<()> {
        Err(Error::InvalidBinding(
            "unexpected boolean result from a model query".to_string(),
        ))
    }
}

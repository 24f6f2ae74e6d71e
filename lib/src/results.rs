//! In-memory result-sets built from a parsed results document.

use crate::errors::{Error, Result};
use crate::parser::ResultsSink;
use crate::term;
use crate::util::Logger;
use log::Level;
use oxigraph::model::Term;

/// One solution: an optional term per column, `None` when unbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    terms: Vec<Option<Term>>,
}

impl Row {
    fn new(width: usize) -> Self {
        Self {
            terms: vec![None; width],
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The term bound in column `index`, if any.
    pub fn binding(&self, index: usize) -> Result<Option<&Term>> {
        self.terms
            .get(index)
            .map(Option::as_ref)
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.terms.len(),
            })
    }

    /// The canonical (N-Triples) form of the term in column `index`.
    pub fn value(&self, index: usize) -> Result<Option<String>> {
        Ok(self.binding(index)?.map(Term::to_string))
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Term>> {
        self.terms.iter().map(Option::as_ref)
    }
}

/// The outcome of a query: either a boolean (`ASK`) or a table of rows.
///
/// Variables can only be declared while the table has no rows. The row
/// cursor is independent of random access through [`ResultSet::row`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    boolean: Option<bool>,
    variables: Vec<String>,
    widths: Vec<usize>,
    links: Vec<String>,
    rows: Vec<Row>,
    cursor: usize,
    needs_reset: bool,
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSet {
    pub fn new() -> Self {
        Self {
            boolean: None,
            variables: Vec::new(),
            widths: Vec::new(),
            links: Vec::new(),
            rows: Vec::new(),
            cursor: 0,
            needs_reset: true,
        }
    }

    /// Declares a column. Fails, leaving the set untouched, if the name is
    /// already declared or a row has been added.
    pub fn add_variable(&mut self, name: &str) -> Result<()> {
        if !self.rows.is_empty() || self.variable_index(name).is_some() {
            return Err(Error::DuplicateOrLateVariable(name.to_string()));
        }
        self.variables.push(name.to_string());
        self.widths.push(0);
        Ok(())
    }

    pub fn add_link(&mut self, href: &str) {
        self.links.push(href.to_string());
    }

    /// Appends an empty row with one unbound slot per variable.
    pub fn add_row(&mut self) {
        self.rows.push(Row::new(self.variables.len()));
    }

    /// Binds `value` to `variable` in the last row. Returns the previous
    /// binding of that slot, if any.
    pub fn bind(&mut self, variable: &str, value: Term) -> Result<Option<Term>> {
        let width = term::rendered_width(&value);
        self.bind_with_width(variable, value, width)
    }

    /// As [`ResultSet::bind`], widening the column to at least `width`.
    pub fn bind_with_width(
        &mut self,
        variable: &str,
        value: Term,
        width: usize,
    ) -> Result<Option<Term>> {
        let index = self
            .variable_index(variable)
            .ok_or_else(|| Error::UnknownVariable(variable.to_string()))?;
        let row = self.rows.last_mut().ok_or_else(|| {
            Error::InvalidBinding(format!("cannot bind '{variable}' outside of a result"))
        })?;
        if self.widths[index] < width {
            self.widths[index] = width;
        }
        Ok(row.terms[index].replace(value))
    }

    pub fn set_boolean(&mut self, value: bool) {
        self.boolean = Some(value);
    }

    pub fn is_boolean(&self) -> bool {
        self.boolean.is_some()
    }

    pub fn boolean(&self) -> Result<bool> {
        self.boolean.ok_or(Error::NotBooleanResultSet)
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn variable(&self, index: usize) -> Result<&str> {
        self.variables
            .get(index)
            .map(String::as_str)
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.variables.len(),
            })
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn link(&self, index: usize) -> Result<&str> {
        self.links
            .get(index)
            .map(String::as_str)
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.links.len(),
            })
    }

    /// Widest rendered term seen in column `index`.
    pub fn width(&self, index: usize) -> Result<usize> {
        self.widths
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.widths.len(),
            })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Result<&Row> {
        self.rows.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.rows.len(),
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Rewinds the cursor so the next [`ResultSet::advance`] yields row 0.
    pub fn reset(&mut self) -> Result<()> {
        if self.is_boolean() {
            return Err(Error::BooleanResultSet);
        }
        self.needs_reset = true;
        Ok(())
    }

    /// Moves the cursor forward and returns the row under it, or `None` once
    /// past the last row.
    pub fn advance(&mut self) -> Result<Option<&Row>> {
        if self.is_boolean() {
            return Err(Error::BooleanResultSet);
        }
        if self.needs_reset {
            self.cursor = 0;
            self.needs_reset = false;
        } else if self.cursor < self.rows.len() {
            self.cursor += 1;
        }
        Ok(self.rows.get(self.cursor))
    }
}

impl<'r> IntoIterator for &'r ResultSet {
    type Item = &'r Row;
    type IntoIter = std::slice::Iter<'r, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// A [`ResultsSink`] that materializes the document into a [`ResultSet`].
pub struct ResultSetBuilder<'a> {
    logger: &'a Logger,
    results: ResultSet,
    has_results: bool,
}

impl<'a> ResultSetBuilder<'a> {
    pub fn new(logger: &'a Logger) -> Self {
        Self {
            logger,
            results: ResultSet::new(),
            has_results: false,
        }
    }

    pub fn finish(self) -> ResultSet {
        self.results
    }

    fn bind(&mut self, variable: &str, value: Term) -> Result<()> {
        let width = term::rendered_width(&value);
        self.bind_with_width(variable, value, width)
    }

    fn bind_with_width(&mut self, variable: &str, value: Term, width: usize) -> Result<()> {
        if let Some(previous) = self.results.bind_with_width(variable, value, width)? {
            sparql_log!(
                self.logger,
                Level::Warn,
                "SPARQL: variable '{}' was already bound to {} in this result",
                variable,
                previous
            );
        }
        Ok(())
    }
}

impl ResultsSink for ResultSetBuilder<'_> {
    fn on_variable(&mut self, name: &str) -> Result<()> {
        self.results.add_variable(name)
    }

    fn on_link(&mut self, href: &str) -> Result<()> {
        self.results.add_link(href);
        Ok(())
    }

    fn on_begin_results(&mut self) -> Result<()> {
        if self.results.is_boolean() {
            return Err(Error::MixedResultForm);
        }
        self.has_results = true;
        Ok(())
    }

    fn on_begin_result(&mut self) -> Result<()> {
        self.results.add_row();
        Ok(())
    }

    fn on_literal(
        &mut self,
        binding: &str,
        value: &str,
        language: Option<&str>,
        datatype: Option<&str>,
    ) -> Result<()> {
        let literal = term::literal(value, language, datatype)?;
        let width = term::literal_width(value, language, datatype);
        self.bind_with_width(binding, literal.into(), width)
    }

    fn on_uri(&mut self, binding: &str, uri: &str) -> Result<()> {
        let node = term::uri(uri)?;
        self.bind(binding, node.into())
    }

    fn on_bnode(&mut self, binding: &str, id: &str) -> Result<()> {
        let node = term::bnode(id)?;
        self.bind(binding, node.into())
    }

    fn on_boolean(&mut self, value: bool) -> Result<()> {
        if self.has_results {
            return Err(Error::MixedResultForm);
        }
        self.results.set_boolean(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::NamedNode;

    fn table(rows: usize) -> ResultSet {
        let mut results = ResultSet::new();
        results.add_variable("x").unwrap();
        for i in 0..rows {
            results.add_row();
            results
                .bind("x", NamedNode::new(format!("http://e/{i}")).unwrap().into())
                .unwrap();
        }
        results
    }

    #[test]
    fn test_cursor_walk_and_reset() {
        let mut results = table(3);
        for i in 0..3 {
            let row = results.advance().unwrap().unwrap();
            assert_eq!(row.value(0).unwrap().unwrap(), format!("<http://e/{i}>"));
        }
        assert!(results.advance().unwrap().is_none());
        assert!(results.advance().unwrap().is_none());
        results.reset().unwrap();
        let row = results.advance().unwrap().unwrap();
        assert_eq!(row.value(0).unwrap().as_deref(), Some("<http://e/0>"));
    }

    #[test]
    fn test_empty_table_cursor() {
        let mut results = table(0);
        assert!(results.advance().unwrap().is_none());
        assert!(results.is_empty());
    }

    #[test]
    fn test_variable_freeze() {
        let mut results = table(1);
        assert!(matches!(
            results.add_variable("y"),
            Err(Error::DuplicateOrLateVariable(_))
        ));
        assert_eq!(results.variables(), ["x"]);
        assert_eq!(results.row(0).unwrap().len(), 1);

        let mut fresh = ResultSet::new();
        fresh.add_variable("a").unwrap();
        assert!(fresh.add_variable("a").is_err());
        assert_eq!(fresh.variables().len(), 1);
    }

    #[test]
    fn test_rebind_replaces() {
        let mut results = table(1);
        let previous = results
            .bind("x", NamedNode::new("http://e/other").unwrap().into())
            .unwrap();
        assert!(previous.is_some());
        assert_eq!(
            results.row(0).unwrap().value(0).unwrap().as_deref(),
            Some("<http://e/other>")
        );
        assert_eq!(results.width(0).unwrap(), "http://e/other".len() + 2);
    }

    #[test]
    fn test_unknown_variable() {
        let mut results = table(1);
        let err = results
            .bind("nope", NamedNode::new("http://e/").unwrap().into())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownVariable(_)));
    }

    #[test]
    fn test_index_errors() {
        let results = table(1);
        assert!(matches!(
            results.variable(1),
            Err(Error::IndexOutOfBounds { index: 1, len: 1 })
        ));
        assert!(results.link(0).is_err());
        assert!(results.width(5).is_err());
        assert!(results.row(1).is_err());
        assert!(results.row(0).unwrap().binding(1).is_err());
    }

    #[test]
    fn test_boolean_misuse() {
        let mut results = ResultSet::new();
        results.set_boolean(false);
        assert!(!results.boolean().unwrap());
        assert!(matches!(results.reset(), Err(Error::BooleanResultSet)));
        assert!(matches!(results.advance(), Err(Error::BooleanResultSet)));
        assert!(matches!(
            table(0).boolean(),
            Err(Error::NotBooleanResultSet)
        ));
    }

    #[test]
    fn test_mixed_form() {
        let logger = Logger::default();
        let mut builder = ResultSetBuilder::new(&logger);
        builder.on_boolean(true).unwrap();
        assert!(matches!(
            builder.on_begin_results(),
            Err(Error::MixedResultForm)
        ));

        let mut builder = ResultSetBuilder::new(&logger);
        builder.on_begin_results().unwrap();
        assert!(matches!(builder.on_boolean(true), Err(Error::MixedResultForm)));
    }

    #[test]
    fn test_builder_terms() {
        let logger = Logger::default();
        let mut builder = ResultSetBuilder::new(&logger);
        builder.on_variable("o").unwrap();
        builder.on_begin_results().unwrap();
        builder.on_begin_result().unwrap();
        builder.on_literal("o", "chat", Some("fr"), None).unwrap();
        builder.on_end_result().unwrap();
        builder.on_begin_result().unwrap();
        assert!(matches!(
            builder.on_uri("o", "not an iri"),
            Err(Error::InvalidUri { .. })
        ));
        let results = builder.finish();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results.row(0).unwrap().value(0).unwrap().as_deref(),
            Some("\"chat\"@fr")
        );
        assert_eq!(results.row(1).unwrap().binding(0).unwrap(), None);
        assert_eq!(results.width(0).unwrap(), 4 + 2 + 2 + 1);
    }

    #[test]
    fn test_builder_width_counts_datatype_attribute() {
        let string = "http://www.w3.org/2001/XMLSchema#string";
        let logger = Logger::default();
        let mut builder = ResultSetBuilder::new(&logger);
        builder.on_variable("o").unwrap();
        builder.on_begin_results().unwrap();
        builder.on_begin_result().unwrap();
        builder.on_literal("o", "chat", None, Some(string)).unwrap();
        let results = builder.finish();
        assert_eq!(
            results.row(0).unwrap().value(0).unwrap().as_deref(),
            Some("\"chat\"")
        );
        assert_eq!(results.width(0).unwrap(), 4 + 2 + string.len() + 2);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_result_set_is_send_sync() {
        assert_send_sync::<ResultSet>();
    }
}

//! Construction of RDF terms from the raw strings found in result documents.
//! Validation and canonical serialization are left to `oxigraph::model`.

use crate::consts::RDF_LANG_STRING;
use crate::errors::{Error, Result};
use oxigraph::model::vocab::xsd;
use oxigraph::model::{BlankNode, Literal, NamedNode, Term};

pub fn uri(value: &str) -> Result<NamedNode> {
    NamedNode::new(value).map_err(|e| Error::InvalidUri {
        value: value.to_string(),
        message: e.to_string(),
    })
}

pub fn bnode(id: &str) -> Result<BlankNode> {
    BlankNode::new(id).map_err(|e| Error::InvalidNode {
        value: id.to_string(),
        message: e.to_string(),
    })
}

/// Builds a literal. A language tag takes precedence over a datatype other
/// than `rdf:langString`, which is reported as an invalid node.
pub fn literal(value: &str, language: Option<&str>, datatype: Option<&str>) -> Result<Literal> {
    match (language, datatype) {
        (Some(language), datatype) => {
            if let Some(datatype) = datatype {
                if datatype != RDF_LANG_STRING.as_str() {
                    return Err(Error::InvalidNode {
                        value: value.to_string(),
                        message: format!(
                            "language tag '{language}' provided with the datatype <{datatype}>"
                        ),
                    });
                }
            }
            Literal::new_language_tagged_literal(value, language).map_err(|e| {
                Error::InvalidNode {
                    value: value.to_string(),
                    message: format!("invalid language tag '{language}': {e}"),
                }
            })
        }
        (None, Some(datatype)) => Ok(Literal::new_typed_literal(value, uri(datatype)?)),
        (None, None) => Ok(Literal::new_simple_literal(value)),
    }
}

/// Upper bound on the rendered length of a term, used to size display
/// columns: URI len+2, blank node len+3, literal as [`literal_width`].
pub fn rendered_width(term: &Term) -> usize {
    match term {
        Term::NamedNode(node) => node.as_str().len() + 2,
        Term::BlankNode(node) => node.as_str().len() + 3,
        Term::Literal(literal) => {
            let datatype = literal.datatype();
            let explicit = (literal.language().is_none() && datatype != xsd::STRING)
                .then(|| datatype.as_str());
            literal_width(literal.value(), literal.language(), explicit)
        }
        // only reachable through `Term::Triple` when oxigraph's `rdf-12` feature is on
        #[allow(unreachable_patterns)]
        other => other.to_string().len(),
    }
}

/// Width of a literal as written in a result document: value len+2, plus the
/// language tag (+1) and the datatype attribute (+2) whenever present.
pub fn literal_width(value: &str, language: Option<&str>, datatype: Option<&str>) -> usize {
    value.len()
        + 2
        + language.map_or(0, |language| language.len() + 1)
        + datatype.map_or(0, |datatype| datatype.len() + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_forms() {
        let plain = literal("hello", None, None).unwrap();
        assert_eq!(plain.to_string(), "\"hello\"");

        let tagged = literal("bonjour", Some("fr"), None).unwrap();
        assert_eq!(tagged.language(), Some("fr"));

        let typed = literal("42", None, Some("http://www.w3.org/2001/XMLSchema#integer")).unwrap();
        assert_eq!(
            typed.to_string(),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );

        assert!(literal("x", Some("en"), Some("http://www.w3.org/2001/XMLSchema#integer")).is_err());
        assert!(matches!(
            literal("x", None, Some("not an iri")),
            Err(Error::InvalidUri { .. })
        ));
    }

    #[test]
    fn test_rendered_width() {
        let node: Term = uri("http://e/x").unwrap().into();
        assert_eq!(rendered_width(&node), 12);
        let blank: Term = bnode("b0").unwrap().into();
        assert_eq!(rendered_width(&blank), 5);
        let tagged: Term = literal("abc", Some("en"), None).unwrap().into();
        assert_eq!(rendered_width(&tagged), 3 + 2 + 3);
        let plain: Term = literal("abc", None, None).unwrap().into();
        assert_eq!(rendered_width(&plain), 5);
        // the width always covers the canonical form
        for term in [node, blank, tagged, plain] {
            assert!(rendered_width(&term) >= term.to_string().len());
        }
    }

    #[test]
    fn test_literal_width_counts_datatype_attribute() {
        let string = xsd::STRING.as_str();
        assert_eq!(literal_width("abc", None, None), 5);
        assert_eq!(literal_width("abc", None, Some(string)), 5 + string.len() + 2);
        assert_eq!(
            literal_width("abc", Some("en"), Some(RDF_LANG_STRING.as_str())),
            5 + 3 + RDF_LANG_STRING.as_str().len() + 2
        );
        // the canonical form drops an xsd:string datatype
        let typed: Term = literal("abc", None, Some(string)).unwrap().into();
        assert_eq!(rendered_width(&typed), 5);
    }
}

//! Streaming parser for the [SPARQL Query Results XML Format](https://www.w3.org/TR/rdf-sparql-XMLres/).
//!
//! The parser reads the response body incrementally (chunks may split tags
//! or text anywhere) and walks an explicit state machine over the document
//! grammar:
//!
//! ```text
//! Root → Sparql → Head → {Link, Variable}
//!               → Results → Result → Binding → {Uri, Literal, Bnode}
//!               → Boolean
//! ```
//!
//! Each structural event is reported to a [`ResultsSink`]. Any element in
//! the wrong namespace or the wrong place stops the parse.

use crate::consts::SPARQL_RESULTS_NS;
use crate::errors::{Error, Result};
use crate::util::Logger;
use log::Level;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::io::BufRead;

/// Receives the events of one results document.
///
/// Every method has a no-op default so a consumer only implements what it
/// needs. Returning an error aborts the parse; the error is then passed to
/// [`ResultsSink::on_error`] and returned to the caller.
pub trait ResultsSink {
    fn on_variable(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn on_link(&mut self, _href: &str) -> Result<()> {
        Ok(())
    }

    fn on_begin_results(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_end_results(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_begin_result(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_end_result(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_literal(
        &mut self,
        _binding: &str,
        _value: &str,
        _language: Option<&str>,
        _datatype: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }

    fn on_uri(&mut self, _binding: &str, _uri: &str) -> Result<()> {
        Ok(())
    }

    fn on_bnode(&mut self, _binding: &str, _id: &str) -> Result<()> {
        Ok(())
    }

    fn on_boolean(&mut self, _value: bool) -> Result<()> {
        Ok(())
    }

    /// Called once the whole document has been parsed successfully.
    fn on_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once when the parse fails, for whatever reason.
    fn on_error(&mut self, _error: &Error) {}
}

/// Position of the parser in the document grammar.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseState {
    Root,
    Sparql,
    Head,
    Link,
    Variable,
    Results,
    Result,
    Binding,
    Uri,
    Literal,
    Bnode,
    Boolean,
    /// `</sparql>` has been seen.
    Done,
    Error,
}

impl ParseState {
    fn parent(self) -> ParseState {
        match self {
            ParseState::Sparql => ParseState::Done,
            ParseState::Head | ParseState::Results | ParseState::Boolean => ParseState::Sparql,
            ParseState::Link | ParseState::Variable => ParseState::Head,
            ParseState::Result => ParseState::Results,
            ParseState::Binding => ParseState::Result,
            ParseState::Uri | ParseState::Literal | ParseState::Bnode => ParseState::Binding,
            ParseState::Root | ParseState::Done | ParseState::Error => ParseState::Error,
        }
    }

    fn captures_text(self) -> bool {
        matches!(
            self,
            ParseState::Uri | ParseState::Literal | ParseState::Bnode | ParseState::Boolean
        )
    }

    fn expected(self) -> &'static str {
        match self {
            ParseState::Root => "expected <sparql>",
            ParseState::Sparql => "expected <head>, <results> or <boolean>",
            ParseState::Head => "expected <variable> or <link>",
            ParseState::Results => "expected <result>",
            ParseState::Result => "expected <binding>",
            ParseState::Binding => "expected <uri>, <literal> or <bnode>",
            ParseState::Done => "unexpected content after </sparql>",
            _ => "unexpected child element",
        }
    }
}

/// Incremental results parser. One parser handles one document at a time.
pub struct ResultsParser<'a> {
    logger: &'a Logger,
    state: ParseState,
    text: String,
    binding: String,
    bound: bool,
    language: Option<String>,
    datatype: Option<String>,
}

impl<'a> ResultsParser<'a> {
    pub fn new(logger: &'a Logger) -> Self {
        Self {
            logger,
            state: ParseState::Root,
            text: String::new(),
            binding: String::new(),
            bound: false,
            language: None,
            datatype: None,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Parses the whole document read from `source`, reporting to `sink`.
    /// On success `on_complete` is called; on failure `on_error` is called
    /// and the parser is left in [`ParseState::Error`].
    pub fn parse<R: BufRead, S: ResultsSink + ?Sized>(
        &mut self,
        source: R,
        sink: &mut S,
    ) -> Result<()> {
        self.state = ParseState::Root;
        self.text.clear();
        self.binding.clear();
        let outcome = self.run(source, sink).and_then(|()| sink.on_complete());
        if let Err(e) = &outcome {
            sparql_log!(self.logger, Level::Error, "SPARQL: {}", e);
            self.state = ParseState::Error;
            sink.on_error(e);
        }
        outcome
    }

    fn run<R: BufRead, S: ResultsSink + ?Sized>(&mut self, source: R, sink: &mut S) -> Result<()> {
        let mut reader = NsReader::from_reader(source);
        reader.config_mut().expand_empty_elements = true;
        let decoder = reader.decoder();
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            let (namespace, event) = reader.read_resolved_event_into(&mut buffer)?;
            match event {
                Event::Start(start) => {
                    let namespace = match namespace {
                        ResolveResult::Bound(Namespace(ns)) => {
                            Some(String::from_utf8_lossy(ns).into_owned())
                        }
                        _ => None,
                    };
                    if namespace.as_deref() != Some(SPARQL_RESULTS_NS) {
                        return Err(Error::Xml(format!(
                            "unexpected namespace <{}> on <{}>",
                            namespace.unwrap_or_default(),
                            String::from_utf8_lossy(start.local_name().as_ref())
                        )));
                    }
                    self.start_element(&start, decoder, sink)?;
                }
                Event::End(_) => self.end_element(sink)?,
                Event::Text(text) => {
                    let text = text.unescape()?;
                    self.characters(&text)?;
                }
                Event::CData(data) => {
                    let data = std::str::from_utf8(&data)
                        .map_err(|e| Error::Xml(format!("invalid UTF-8 in CDATA: {e}")))?;
                    self.characters(data)?;
                }
                Event::Eof => break,
                _ => (),
            }
        }
        if self.state != ParseState::Done {
            return Err(Error::Xml(format!(
                "document ended before </sparql> (in state {:?})",
                self.state
            )));
        }
        Ok(())
    }

    fn start_element<S: ResultsSink + ?Sized>(
        &mut self,
        start: &BytesStart<'_>,
        decoder: Decoder,
        sink: &mut S,
    ) -> Result<()> {
        let local = start.local_name();
        let name = local.as_ref();
        let next = match (self.state, name) {
            (ParseState::Root, b"sparql") => ParseState::Sparql,
            (ParseState::Sparql, b"head") => ParseState::Head,
            (ParseState::Sparql, b"results") => {
                sink.on_begin_results()?;
                ParseState::Results
            }
            (ParseState::Sparql, b"boolean") => ParseState::Boolean,
            (ParseState::Head, b"variable") => {
                match attribute(start, b"name", decoder)? {
                    Some(variable) => sink.on_variable(&variable)?,
                    None => sparql_log!(
                        self.logger,
                        Level::Warn,
                        "SPARQL: ignoring <variable> with no name attribute"
                    ),
                }
                ParseState::Variable
            }
            (ParseState::Head, b"link") => {
                match attribute(start, b"href", decoder)? {
                    Some(href) => sink.on_link(&href)?,
                    None => sparql_log!(
                        self.logger,
                        Level::Warn,
                        "SPARQL: ignoring <link> with no href attribute"
                    ),
                }
                ParseState::Link
            }
            (ParseState::Results, b"result") => {
                sink.on_begin_result()?;
                ParseState::Result
            }
            (ParseState::Result, b"binding") => {
                self.binding = attribute(start, b"name", decoder)?
                    .ok_or_else(|| Error::Xml("<binding> does not have a name".to_string()))?;
                self.bound = false;
                ParseState::Binding
            }
            (ParseState::Binding, _) if self.bound => {
                return Err(Error::Xml(format!(
                    "multiple values provided for binding to '{}'",
                    self.binding
                )));
            }
            (ParseState::Binding, b"uri") => ParseState::Uri,
            (ParseState::Binding, b"bnode") => ParseState::Bnode,
            (ParseState::Binding, b"literal") => {
                self.datatype = attribute(start, b"datatype", decoder)?;
                self.language = language_attribute(start, decoder)?;
                ParseState::Literal
            }
            (state, _) => {
                return Err(Error::Xml(format!(
                    "{}, found <{}>",
                    state.expected(),
                    String::from_utf8_lossy(name)
                )));
            }
        };
        self.state = next;
        Ok(())
    }

    fn end_element<S: ResultsSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let state = self.state;
        match state {
            ParseState::Uri => {
                sink.on_uri(&self.binding, &self.text)?;
                self.bound = true;
            }
            ParseState::Bnode => {
                sink.on_bnode(&self.binding, &self.text)?;
                self.bound = true;
            }
            ParseState::Literal => {
                let language = self.language.take();
                let datatype = self.datatype.take();
                sink.on_literal(
                    &self.binding,
                    &self.text,
                    language.as_deref(),
                    datatype.as_deref(),
                )?;
                self.bound = true;
            }
            ParseState::Boolean => {
                let value = match self.text.as_str() {
                    "true" => true,
                    "false" => false,
                    other => {
                        return Err(Error::Xml(format!(
                            "expected 'true' or 'false' within <boolean>, found '{other}'"
                        )))
                    }
                };
                sink.on_boolean(value)?;
            }
            ParseState::Binding => self.binding.clear(),
            ParseState::Result => sink.on_end_result()?,
            ParseState::Results => sink.on_end_results()?,
            ParseState::Root | ParseState::Done | ParseState::Error => {
                return Err(Error::Xml("unbalanced end tag".to_string()));
            }
            _ => (),
        }
        if state.captures_text() {
            self.text.clear();
        }
        self.state = state.parent();
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        if self.state.captures_text() {
            self.text.push_str(text);
        } else if !text.trim().is_empty() {
            if matches!(self.state, ParseState::Root | ParseState::Done) {
                return Err(Error::Xml("text outside the root element".to_string()));
            }
            sparql_log!(
                self.logger,
                Level::Warn,
                "SPARQL: ignored unexpected text in parser state {:?}",
                self.state
            );
        }
        Ok(())
    }
}

/// Value of the unprefixed attribute `key`, if present.
fn attribute(start: &BytesStart<'_>, key: &[u8], decoder: Decoder) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.decode_and_unescape_value(decoder)?.into_owned()));
        }
    }
    Ok(None)
}

/// Value of the `xml:lang` attribute.
fn language_attribute(start: &BytesStart<'_>, decoder: Decoder) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let key = attr.key;
        if key.local_name().as_ref() != b"lang" {
            continue;
        }
        if key.prefix().is_some_and(|prefix| prefix.as_ref() == b"xml") {
            return Ok(Some(attr.decode_and_unescape_value(decoder)?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        errors: usize,
        completed: bool,
    }

    impl ResultsSink for Recorder {
        fn on_variable(&mut self, name: &str) -> Result<()> {
            self.events.push(format!("var {name}"));
            Ok(())
        }
        fn on_link(&mut self, href: &str) -> Result<()> {
            self.events.push(format!("link {href}"));
            Ok(())
        }
        fn on_begin_results(&mut self) -> Result<()> {
            self.events.push("begin-results".into());
            Ok(())
        }
        fn on_end_results(&mut self) -> Result<()> {
            self.events.push("end-results".into());
            Ok(())
        }
        fn on_begin_result(&mut self) -> Result<()> {
            self.events.push("begin-result".into());
            Ok(())
        }
        fn on_end_result(&mut self) -> Result<()> {
            self.events.push("end-result".into());
            Ok(())
        }
        fn on_literal(
            &mut self,
            binding: &str,
            value: &str,
            language: Option<&str>,
            datatype: Option<&str>,
        ) -> Result<()> {
            self.events
                .push(format!("literal {binding}={value} {language:?} {datatype:?}"));
            Ok(())
        }
        fn on_uri(&mut self, binding: &str, uri: &str) -> Result<()> {
            self.events.push(format!("uri {binding}={uri}"));
            Ok(())
        }
        fn on_bnode(&mut self, binding: &str, id: &str) -> Result<()> {
            self.events.push(format!("bnode {binding}={id}"));
            Ok(())
        }
        fn on_boolean(&mut self, value: bool) -> Result<()> {
            self.events.push(format!("boolean {value}"));
            Ok(())
        }
        fn on_complete(&mut self) -> Result<()> {
            self.completed = true;
            Ok(())
        }
        fn on_error(&mut self, _error: &Error) {
            self.errors += 1;
        }
    }

    fn parse(doc: &str) -> (Result<()>, Recorder, ParseState) {
        let logger = Logger::default();
        let mut parser = ResultsParser::new(&logger);
        let mut recorder = Recorder::default();
        let result = parser.parse(doc.as_bytes(), &mut recorder);
        (result, recorder, parser.state())
    }

    const NS: &str = "http://www.w3.org/2005/sparql-results#";

    #[test]
    fn test_table_events() {
        let doc = format!(
            r#"<?xml version="1.0"?>
<sparql xmlns="{NS}">
  <head><variable name="s"/><variable name="o"/><link href="http://e/meta"/></head>
  <results>
    <result>
      <binding name="s"><uri>http://e/a</uri></binding>
      <binding name="o"><literal xml:lang="en">a &amp; b</literal></binding>
    </result>
    <result>
      <binding name="s"><bnode>b0</bnode></binding>
      <binding name="o"><literal datatype="http://www.w3.org/2001/XMLSchema#integer">7</literal></binding>
    </result>
  </results>
</sparql>"#
        );
        let (result, recorder, state) = parse(&doc);
        result.unwrap();
        assert_eq!(state, ParseState::Done);
        assert!(recorder.completed);
        assert_eq!(
            recorder.events,
            vec![
                "var s",
                "var o",
                "link http://e/meta",
                "begin-results",
                "begin-result",
                "uri s=http://e/a",
                "literal o=a & b Some(\"en\") None",
                "end-result",
                "begin-result",
                "bnode s=b0",
                "literal o=7 None Some(\"http://www.w3.org/2001/XMLSchema#integer\")",
                "end-result",
                "end-results",
            ]
        );
    }

    #[test]
    fn test_literal_whitespace_preserved() {
        let doc = format!(
            r#"<sparql xmlns="{NS}"><head><variable name="x"/></head><results><result><binding name="x"><literal> padded </literal></binding></result></results></sparql>"#
        );
        let (result, recorder, _) = parse(&doc);
        result.unwrap();
        assert!(recorder.events.contains(&"literal x= padded  None None".to_string()));
    }

    #[test]
    fn test_boolean() {
        let doc = format!(r#"<sparql xmlns="{NS}"><head/><boolean>true</boolean></sparql>"#);
        let (result, recorder, _) = parse(&doc);
        result.unwrap();
        assert_eq!(recorder.events, vec!["boolean true"]);

        let doc = format!(r#"<sparql xmlns="{NS}"><head/><boolean>TRUE</boolean></sparql>"#);
        let (result, recorder, state) = parse(&doc);
        assert!(matches!(result, Err(Error::Xml(_))));
        assert_eq!(recorder.errors, 1);
        assert_eq!(state, ParseState::Error);
    }

    #[test]
    fn test_binding_without_name() {
        let doc = format!(
            r#"<sparql xmlns="{NS}"><results><result><binding><uri>x</uri></binding></result></results></sparql>"#
        );
        let (result, recorder, state) = parse(&doc);
        assert!(matches!(result, Err(Error::Xml(_))));
        assert_eq!(recorder.errors, 1);
        assert!(!recorder.completed);
        assert_eq!(state, ParseState::Error);
    }

    #[test]
    fn test_wrong_namespace() {
        let (result, recorder, _) =
            parse(r#"<sparql xmlns="http://example.org/other#"><head/></sparql>"#);
        assert!(matches!(result, Err(Error::Xml(_))));
        assert_eq!(recorder.errors, 1);

        let (result, _, _) = parse("<sparql><head/></sparql>");
        assert!(result.is_err());
    }

    #[test]
    fn test_illegal_element() {
        let doc = format!(r#"<sparql xmlns="{NS}"><head><result/></head></sparql>"#);
        let (result, _, state) = parse(&doc);
        assert!(result.is_err());
        assert_eq!(state, ParseState::Error);
    }

    #[test]
    fn test_missing_attributes_are_not_fatal() {
        let doc = format!(
            r#"<sparql xmlns="{NS}"><head><variable/><link/><variable name="x"/></head><results/></sparql>"#
        );
        let (result, recorder, _) = parse(&doc);
        result.unwrap();
        assert_eq!(recorder.events, vec!["var x", "begin-results", "end-results"]);
    }

    #[test]
    fn test_stray_text_is_not_fatal() {
        let doc = format!(r#"<sparql xmlns="{NS}">stray<head/><results/></sparql>"#);
        let (result, _, _) = parse(&doc);
        result.unwrap();
    }

    #[test]
    fn test_text_before_root_is_fatal() {
        let doc = format!(
            r#"garbage<sparql xmlns="{NS}"><head/><boolean>true</boolean></sparql>"#
        );
        let (result, recorder, state) = parse(&doc);
        assert!(matches!(result, Err(Error::Xml(ref m)) if m == "text outside the root element"));
        assert_eq!(recorder.errors, 1);
        assert!(!recorder.completed);
        assert_eq!(state, ParseState::Error);
    }

    #[test]
    fn test_text_after_root_is_fatal() {
        let doc = format!(
            r#"<sparql xmlns="{NS}"><head/><boolean>true</boolean></sparql>trailing junk"#
        );
        let (result, recorder, _) = parse(&doc);
        assert!(matches!(result, Err(Error::Xml(_))));
        assert_eq!(recorder.errors, 1);
        assert!(!recorder.completed);

        // whitespace around the root element is fine
        let doc = format!(
            "\n  <sparql xmlns=\"{NS}\"><head/><boolean>true</boolean></sparql>\n"
        );
        let (result, recorder, _) = parse(&doc);
        result.unwrap();
        assert!(recorder.completed);
    }

    #[test]
    fn test_multiple_values_in_binding() {
        let doc = format!(
            r#"<sparql xmlns="{NS}"><head><variable name="x"/></head><results><result><binding name="x"><uri>http://a</uri><uri>http://b</uri></binding></result></results></sparql>"#
        );
        let (result, _, _) = parse(&doc);
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_truncated_and_malformed_documents() {
        let doc = format!(r#"<sparql xmlns="{NS}"><head/><results><result>"#);
        let (result, recorder, _) = parse(&doc);
        assert!(result.is_err());
        assert_eq!(recorder.errors, 1);

        let doc = format!(r#"<sparql xmlns="{NS}"><head></results></sparql>"#);
        let (result, _, _) = parse(&doc);
        assert!(result.is_err());

        let (result, _, _) = parse("");
        assert!(result.is_err());
    }

    #[test]
    fn test_sink_errors_abort() {
        struct Refuse;
        impl ResultsSink for Refuse {
            fn on_variable(&mut self, name: &str) -> Result<()> {
                Err(Error::UnknownVariable(name.to_string()))
            }
        }
        let logger = Logger::default();
        let mut parser = ResultsParser::new(&logger);
        let doc = format!(r#"<sparql xmlns="{NS}"><head><variable name="x"/></head></sparql>"#);
        let result = parser.parse(doc.as_bytes(), &mut Refuse);
        assert!(matches!(result, Err(Error::UnknownVariable(_))));
        assert_eq!(parser.state(), ParseState::Error);
    }
}

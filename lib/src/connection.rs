//! A handle on one remote SPARQL store.
//!
//! Every public operation returns a typed [`Result`] and also records its
//! outcome in the connection's [`ErrorState`]: `00000` on success, otherwise
//! the code of the error that was returned.

use crate::config::ConnectionConfig;
use crate::consts::{ACCEPT, CONTENT_TYPE, FORM_URLENCODED, SPARQL_RESULTS_XML, TURTLE_UTF8};
use crate::encode::append_query_param;
use crate::endpoint::Endpoints;
use crate::errors::{Error, ErrorState, Result, SparqlState};
use crate::model::DatasetBuilder;
use crate::parser::{ResultsParser, ResultsSink};
use crate::results::{ResultSet, ResultSetBuilder};
use crate::term;
use crate::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use crate::update;
use crate::util::Logger;
use log::Level;
use oxigraph::model::{Dataset, Graph};
use std::fmt;
use std::io::BufReader;
use std::sync::Arc;
use url::Url;

pub struct Connection {
    endpoints: Endpoints,
    logger: Logger,
    noput: bool,
    replace_on_put_fallback: bool,
    status: ErrorState,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoints", &self.endpoints)
            .field("logger", &self.logger)
            .field("noput", &self.noput)
            .field("replace_on_put_fallback", &self.replace_on_put_fallback)
            .field("status", &self.status)
            .finish()
    }
}

impl Connection {
    /// A connection with no endpoints, using the default HTTP client.
    pub fn new() -> Result<Self> {
        Self::from_config(&ConnectionConfig::default())
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            endpoints: Endpoints::default(),
            logger: Logger::default(),
            noput: false,
            replace_on_put_fallback: false,
            status: ErrorState::default(),
            transport: Box::new(transport),
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        let transport =
            ReqwestTransport::new(config.timeout(), &config.user_agent).map_err(Error::Transport)?;
        Self::from_config_with_transport(config, transport)
    }

    pub fn from_config_with_transport(
        config: &ConnectionConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self> {
        let mut connection = Self::with_transport(transport);
        connection.set_verbose(config.verbose);
        connection.replace_on_put_fallback = config.replace_on_put_fallback;
        if let Some(base) = &config.base_uri {
            connection.set_base_uri(base)?;
        }
        if let Some(uri) = &config.query_uri {
            connection.set_query_uri(uri)?;
        }
        if let Some(uri) = &config.update_uri {
            connection.set_update_uri(uri)?;
        }
        if let Some(uri) = &config.data_uri {
            connection.set_data_uri(uri)?;
        }
        Ok(connection)
    }

    /// Derives all three endpoints from `base`. On failure the previous
    /// endpoints are kept.
    pub fn set_base_uri(&mut self, base: &str) -> Result<()> {
        let result = Endpoints::from_base(base, &self.logger).map(|endpoints| {
            self.endpoints = endpoints;
        });
        self.track(result)
    }

    pub fn set_query_uri(&mut self, uri: &str) -> Result<()> {
        let result = absolute(uri).map(|uri| self.endpoints.query_uri = Some(uri));
        self.track(result)
    }

    pub fn set_update_uri(&mut self, uri: &str) -> Result<()> {
        let result = absolute(uri).map(|uri| self.endpoints.update_uri = Some(uri));
        self.track(result)
    }

    pub fn set_data_uri(&mut self, uri: &str) -> Result<()> {
        let result = absolute(uri).map(|uri| self.endpoints.data_uri = Some(uri));
        self.track(result)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.logger.set_verbose(verbose);
    }

    pub fn verbose(&self) -> bool {
        self.logger.verbose()
    }

    /// Sends every log record of this connection to `sink` instead of the
    /// `log` facade.
    pub fn set_logger<F>(&mut self, sink: F)
    where
        F: Fn(Level, &fmt::Arguments<'_>) + Send + Sync + 'static,
    {
        self.logger.set_sink(Some(Arc::new(sink)));
    }

    pub fn clear_logger(&mut self) {
        self.logger.set_sink(None);
    }

    pub fn set_replace_on_put_fallback(&mut self, replace: bool) {
        self.replace_on_put_fallback = replace;
    }

    /// Whether the server has rejected PUT; once set, [`Connection::put`]
    /// goes straight to `INSERT DATA`.
    pub fn noput(&self) -> bool {
        self.noput
    }

    pub fn error(&self) -> &ErrorState {
        &self.status
    }

    pub fn state(&self) -> SparqlState {
        self.status.state()
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Runs a query and buffers the whole result-set.
    pub fn query(&mut self, statement: &str) -> Result<ResultSet> {
        let result = {
            let mut builder = ResultSetBuilder::new(&self.logger);
            self.run_query(statement, &mut builder)
                .map(|()| builder.finish())
        };
        self.track(result)
    }

    /// Runs a query, streaming the parsed results into `sink`.
    pub fn query_with<S: ResultsSink + ?Sized>(&mut self, statement: &str, sink: &mut S) -> Result<()> {
        let result = self.run_query(statement, sink);
        self.track(result)
    }

    /// Runs a `SELECT ?g ?s ?p ?o` query and collects the rows as quads.
    pub fn query_model(&mut self, statement: &str) -> Result<Dataset> {
        let mut builder = DatasetBuilder::new();
        let result = self
            .run_query(statement, &mut builder)
            .map(|()| builder.finish());
        self.track(result)
    }

    pub fn update(&mut self, statement: impl AsRef<[u8]>) -> Result<()> {
        let result = self.run_update(statement.as_ref());
        self.track(result)
    }

    /// Inserts a block of triples, into `graph` when given. An empty block
    /// is a no-op.
    pub fn insert(&mut self, triples: &[u8], graph: Option<&str>) -> Result<()> {
        let result = self.run_insert(triples, graph);
        self.track(result)
    }

    pub fn insert_graph(&mut self, graph: &Graph, graph_uri: Option<&str>) -> Result<()> {
        let result = if graph.is_empty() {
            Ok(())
        } else {
            update::ntriples(graph.iter()).and_then(|payload| self.run_insert(&payload, graph_uri))
        };
        self.track(result)
    }

    /// Inserts every graph of `dataset`, one `INSERT DATA` per graph.
    pub fn insert_dataset(&mut self, dataset: &Dataset) -> Result<()> {
        let result = update::dataset_blocks(dataset, &self.logger).and_then(|blocks| {
            blocks
                .iter()
                .try_for_each(|(graph, payload)| self.run_insert(payload, graph.as_deref()))
        });
        self.track(result)
    }

    /// Replaces `graph` with the Turtle in `triples` through the data
    /// endpoint. Servers that answer 405 or 501 are remembered and get an
    /// `INSERT DATA` instead, now and on every later call.
    pub fn put(&mut self, graph: &str, triples: &[u8]) -> Result<()> {
        let result = self.run_put(graph, triples);
        self.track(result)
    }

    /// Appends the Turtle in `triples` to `graph` through the data endpoint.
    pub fn post(&mut self, graph: &str, triples: &[u8]) -> Result<()> {
        let result = self.run_post(graph, triples);
        self.track(result)
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.status.clear(),
            Err(e) => self.status.set(e),
        }
        result
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.transport.send(request).map_err(|e| {
            sparql_log!(
                self.logger,
                Level::Error,
                "SPARQL: {} {} failed: {}",
                method.as_str(),
                url,
                e
            );
            Error::Transport(e)
        })?;
        sparql_log!(
            self.logger,
            Level::Debug,
            "SPARQL: {} {} -> {} in {:?}",
            method.as_str(),
            url,
            response.status,
            response.elapsed
        );
        if !response.is_success() {
            let status = response.status;
            let message = response.text().trim().to_string();
            sparql_log!(
                self.logger,
                Level::Warn,
                "SPARQL: {} {} returned HTTP status {}",
                method.as_str(),
                url,
                status
            );
            return Err(Error::Http { status, message });
        }
        Ok(response)
    }

    fn run_query<S: ResultsSink + ?Sized>(&self, statement: &str, sink: &mut S) -> Result<()> {
        let query_uri = self
            .endpoints
            .query_uri
            .as_deref()
            .ok_or(Error::NoQueryEndpoint)?;
        sparql_log!(self.logger, Level::Debug, "SPARQL: {}", statement);
        let request = HttpRequest::new(
            Method::Get,
            append_query_param(query_uri, "query", statement.as_bytes()),
        )
        .header(ACCEPT, SPARQL_RESULTS_XML);
        let response = self.send(request)?;
        let mut parser = ResultsParser::new(&self.logger);
        parser.parse(BufReader::new(response.body), sink)
    }

    fn run_update(&self, statement: &[u8]) -> Result<()> {
        let update_uri = self
            .endpoints
            .update_uri
            .as_deref()
            .ok_or(Error::NoUpdateEndpoint)?;
        sparql_log!(
            self.logger,
            Level::Debug,
            "SPARQL: {}",
            String::from_utf8_lossy(statement)
        );
        let request = HttpRequest::new(Method::Post, update_uri)
            .header(CONTENT_TYPE, FORM_URLENCODED)
            .body(update::update_body(statement));
        self.send(request)?;
        Ok(())
    }

    fn run_insert(&self, triples: &[u8], graph: Option<&str>) -> Result<()> {
        if triples.is_empty() {
            return Ok(());
        }
        let statement = update::insert_data(triples, graph)?;
        self.run_update(&statement)
    }

    fn run_put(&mut self, graph: &str, triples: &[u8]) -> Result<()> {
        term::uri(graph)?;
        if self.noput {
            return self.put_fallback(graph, triples);
        }
        let data_uri = self
            .endpoints
            .data_uri
            .as_deref()
            .ok_or(Error::NoDatastoreEndpoint)?;
        let url = update::put_url(data_uri, graph);
        sparql_log!(self.logger, Level::Debug, "SPARQL: performing PUT to {}", url);
        let request = HttpRequest::new(Method::Put, url)
            .header(CONTENT_TYPE, TURTLE_UTF8)
            .body(triples);
        match self.send(request) {
            Ok(_) => Ok(()),
            Err(Error::Http {
                status: 405 | 501, ..
            }) => {
                self.noput = true;
                sparql_log!(
                    self.logger,
                    Level::Warn,
                    "SPARQL: server does not support PUT, using INSERT DATA from now on"
                );
                self.put_fallback(graph, triples)
            }
            Err(e) => Err(e),
        }
    }

    fn put_fallback(&self, graph: &str, triples: &[u8]) -> Result<()> {
        if self.replace_on_put_fallback {
            self.run_update(update::clear_graph(graph)?.as_bytes())?;
        } else {
            sparql_log!(
                self.logger,
                Level::Warn,
                "SPARQL: <{}> is appended to, not replaced, by INSERT DATA",
                graph
            );
        }
        self.run_insert(triples, Some(graph))
    }

    fn run_post(&self, graph: &str, triples: &[u8]) -> Result<()> {
        let data_uri = self
            .endpoints
            .data_uri
            .as_deref()
            .ok_or(Error::NoDatastoreEndpoint)?;
        sparql_log!(
            self.logger,
            Level::Debug,
            "SPARQL: performing POST to {} for {}",
            data_uri,
            graph
        );
        let request = HttpRequest::new(Method::Post, data_uri)
            .header(CONTENT_TYPE, FORM_URLENCODED)
            .body(update::datastore_post_body(graph, triples));
        self.send(request)?;
        Ok(())
    }
}

fn absolute(uri: &str) -> Result<String> {
    Url::parse(uri)
        .map(|_| uri.to_string())
        .map_err(|e| Error::UriParse(format!("<{uri}>: {e}")))
}

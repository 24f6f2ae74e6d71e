//! Client for the SPARQL 1.1 Protocol.
//!
//! A [`Connection`] derives its query, update and data endpoints from one
//! base URI, sends queries and updates over HTTP, and parses SPARQL Query
//! Results XML responses into a [`ResultSet`] (or into any
//! [`ResultsSink`]).
//!
//! ```no_run
//! use sparqlclient::Connection;
//!
//! # fn main() -> sparqlclient::Result<()> {
//! let mut conn = Connection::new()?;
//! conn.set_base_uri("4store://localhost:8080/")?;
//! let mut results = conn.query("SELECT * WHERE { ?s ?p ?o } LIMIT 10")?;
//! while let Some(row) = results.advance()? {
//!     println!("{:?}", row.value(0)?);
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
pub mod util;

pub mod config;
pub mod connection;
pub mod consts;
pub mod encode;
pub mod endpoint;
pub mod errors;
pub mod model;
pub mod parser;
pub mod results;
pub mod term;
pub mod transport;
pub mod update;

pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use connection::Connection;
pub use endpoint::Endpoints;
pub use errors::{Error, ErrorState, Result, SparqlState};
pub use parser::{ParseState, ResultsParser, ResultsSink};
pub use results::{ResultSet, ResultSetBuilder, Row};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
pub use util::{LogSink, Logger};

/// Initializes logging for the sparqlclient library.
///
/// If `SPARQLCLIENT_LOG` is set, `RUST_LOG` is set to its value, so it takes
/// precedence over `RUST_LOG`. The logger itself (e.g. `env_logger::init()`)
/// must be initialized after this call for the level to take effect.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("SPARQLCLIENT_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}

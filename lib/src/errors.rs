//! Error values returned by every fallible operation, and the five-character
//! status codes the connection records for the last operation.

use std::fmt;

/// A five-character status code, either a zero-padded HTTP status (`00404`)
/// or a letter-prefixed internal code (`U0001`, `X0009`, `W0001`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SparqlState([u8; 5]);

impl SparqlState {
    /// The "no error" sentinel.
    pub const OK: SparqlState = SparqlState(*b"00000");

    // URI resolution
    pub const URI_PARSE: SparqlState = SparqlState(*b"U0001");
    pub const URI_INFO: SparqlState = SparqlState(*b"U0002");
    pub const URI_DERIVE: SparqlState = SparqlState(*b"U0003");

    // internal and streaming failures
    pub const NO_DATASTORE: SparqlState = SparqlState(*b"X0001");
    pub const RS_NOTEMPTY: SparqlState = SparqlState(*b"X0002");
    pub const CREATE_URI: SparqlState = SparqlState(*b"X0004");
    pub const CREATE_NODE: SparqlState = SparqlState(*b"X0005");
    pub const BIND_INVALID: SparqlState = SparqlState(*b"X0007");
    pub const SERIALISE: SparqlState = SparqlState(*b"X0008");
    pub const XML_PARSE: SparqlState = SparqlState(*b"X0009");
    pub const MIXED_RESULT: SparqlState = SparqlState(*b"X0010");
    pub const TRANSPORT: SparqlState = SparqlState(*b"X0011");
    pub const NO_UPDATE: SparqlState = SparqlState(*b"X0012");
    pub const NO_QUERY: SparqlState = SparqlState(*b"X0013");

    // caller misuse
    pub const INDEX_BOUNDS: SparqlState = SparqlState(*b"W0001");
    pub const RESET_BOOL: SparqlState = SparqlState(*b"W0002");
    pub const FETCH_BOOL: SparqlState = SparqlState(*b"W0003");

    /// Builds the zero-padded code for an HTTP status, e.g. `404` → `00404`.
    pub fn from_status(status: u16) -> Self {
        let mut code = *b"00000";
        let mut value = status;
        for slot in code.iter_mut().rev() {
            *slot = b'0' + (value % 10) as u8;
            value /= 10;
        }
        SparqlState(code)
    }

    pub fn as_str(&self) -> &str {
        // only ever built from ASCII literals or digits
        std::str::from_utf8(&self.0).unwrap_or("?????")
    }

    pub fn is_ok(&self) -> bool {
        *self == SparqlState::OK
    }

    /// Returns the HTTP status carried by a numeric code.
    pub fn http_status(&self) -> Option<u16> {
        if self.is_ok() || !self.0.iter().all(u8::is_ascii_digit) {
            return None;
        }
        self.as_str().parse().ok()
    }
}

impl Default for SparqlState {
    fn default() -> Self {
        SparqlState::OK
    }
}

impl fmt::Display for SparqlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for SparqlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SparqlState({})", self.as_str())
    }
}

/// Errors raised while configuring a connection, talking to the remote
/// store, or reading a result-set.
#[derive(Debug)]
pub enum Error {
    /// The base URI could not be parsed.
    UriParse(String),
    /// The base URI's query string could not be decomposed into options.
    UriInfo(String),
    /// The query endpoint could not be derived from the base URI.
    UriDerive(String),
    /// No query endpoint is configured.
    NoQueryEndpoint,
    /// No update endpoint is configured.
    NoUpdateEndpoint,
    /// No RESTful data endpoint is configured.
    NoDatastoreEndpoint,
    /// The remote store answered with a non-success status.
    Http { status: u16, message: String },
    /// The request never produced a response (connection, TLS, timeout).
    Transport(anyhow::Error),
    /// The results document is malformed or violates the results grammar.
    Xml(String),
    /// A variable was declared twice, or after rows were added.
    DuplicateOrLateVariable(String),
    /// A binding names a variable that was never declared.
    UnknownVariable(String),
    /// A binding is not acceptable to the consumer of the results.
    InvalidBinding(String),
    /// A result-set contained both `<results>` and `<boolean>`.
    MixedResultForm,
    /// A URI (or literal datatype) was rejected by the term store.
    InvalidUri { value: String, message: String },
    /// A blank node or literal was rejected by the term store.
    InvalidNode { value: String, message: String },
    /// RDF data could not be serialized for transmission.
    Serialize(String),
    /// An index beyond the end of a variable, link, row or binding list.
    IndexOutOfBounds { index: usize, len: usize },
    /// A table operation was attempted on a boolean result-set.
    BooleanResultSet,
    /// The boolean of a table result-set was requested.
    NotBooleanResultSet,
}

impl Error {
    /// The status code recorded for this error.
    pub fn state(&self) -> SparqlState {
        match self {
            Error::UriParse(_) => SparqlState::URI_PARSE,
            Error::UriInfo(_) => SparqlState::URI_INFO,
            Error::UriDerive(_) => SparqlState::URI_DERIVE,
            Error::NoQueryEndpoint => SparqlState::NO_QUERY,
            Error::NoUpdateEndpoint => SparqlState::NO_UPDATE,
            Error::NoDatastoreEndpoint => SparqlState::NO_DATASTORE,
            Error::Http { status, .. } => SparqlState::from_status(*status),
            Error::Transport(_) => SparqlState::TRANSPORT,
            Error::Xml(_) => SparqlState::XML_PARSE,
            Error::DuplicateOrLateVariable(_) => SparqlState::RS_NOTEMPTY,
            Error::UnknownVariable(_) | Error::InvalidBinding(_) => SparqlState::BIND_INVALID,
            Error::MixedResultForm => SparqlState::MIXED_RESULT,
            Error::InvalidUri { .. } => SparqlState::CREATE_URI,
            Error::InvalidNode { .. } => SparqlState::CREATE_NODE,
            Error::Serialize(_) => SparqlState::SERIALISE,
            Error::IndexOutOfBounds { .. } => SparqlState::INDEX_BOUNDS,
            Error::BooleanResultSet => SparqlState::RESET_BOOL,
            Error::NotBooleanResultSet => SparqlState::FETCH_BOOL,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UriParse(m) => write!(f, "failed to parse base URI: {}", m),
            Error::UriInfo(m) => write!(f, "failed to decompose base URI query string: {}", m),
            Error::UriDerive(m) => write!(f, "failed to derive query endpoint: {}", m),
            Error::NoQueryEndpoint => write!(f, "no query endpoint has been configured"),
            Error::NoUpdateEndpoint => write!(f, "no update endpoint has been configured"),
            Error::NoDatastoreEndpoint => {
                write!(f, "cannot use a server without a RESTful data endpoint")
            }
            Error::Http { status, message } => write!(f, "HTTP status {}: {}", status, message),
            Error::Transport(e) => write!(f, "request failed: {}", e),
            Error::Xml(m) => write!(f, "invalid SPARQL results document: {}", m),
            Error::DuplicateOrLateVariable(name) => write!(
                f,
                "cannot add variable '{}': it already exists or rows have been added",
                name
            ),
            Error::UnknownVariable(name) => {
                write!(f, "cannot bind '{}' because the variable does not exist", name)
            }
            Error::InvalidBinding(m) => write!(f, "{}", m),
            Error::MixedResultForm => {
                write!(f, "result-set includes both <results> and <boolean>")
            }
            Error::InvalidUri { value, message } => {
                write!(f, "invalid URI <{}>: {}", value, message)
            }
            Error::InvalidNode { value, message } => {
                write!(f, "invalid RDF node '{}': {}", value, message)
            }
            Error::Serialize(m) => write!(f, "failed to serialize RDF: {}", m),
            Error::IndexOutOfBounds { index, len } => {
                write!(f, "index {} is out of bounds (length {})", index, len)
            }
            Error::BooleanResultSet => write!(f, "result-set is a boolean, not a table"),
            Error::NotBooleanResultSet => write!(f, "result-set is a table, not a boolean"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The status recorded on a connection after each operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    state: SparqlState,
    message: Option<String>,
}

impl ErrorState {
    pub fn state(&self) -> SparqlState {
        self.state
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_ok(&self) -> bool {
        self.state.is_ok()
    }

    pub(crate) fn clear(&mut self) {
        self.state = SparqlState::OK;
        self.message = None;
    }

    pub(crate) fn set(&mut self, error: &Error) {
        self.state = error.state();
        self.message = Some(error.to_string());
    }
}

impl fmt::Display for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(m) => write!(f, "[{}] {}", self.state, m),
            None => write!(f, "[{}]", self.state),
        }
    }
}

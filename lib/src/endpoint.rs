//! Derives the query, update and data endpoints of a store from one base URI.
//!
//! The scheme of the base URI selects a family of defaults:
//!
//! | prefix                           | query     | update    | data    |
//! |----------------------------------|-----------|-----------|---------|
//! | `http:`, `https:`                | `sparql/` | `sparql/` | (none)  |
//! | `sparql:`, `sparqls:`            | `sparql/` | `sparql/` | (none)  |
//! | `sparql+http:`, `sparql+https:`  | `sparql/` | `sparql/` | (none)  |
//! | `4store:`, `4stores:`            | `sparql/` | `update/` | `data/` |
//! | `4store+http:`, `4store+https:`  | `sparql/` | `update/` | `data/` |
//!
//! Any of the three can be overridden with the `query-uri`, `update-uri` and
//! `data-uri` options in the base URI's query string. Every value is resolved
//! against the base, which is treated as a directory.

use crate::consts::{DATA_URI_OPTION, QUERY_URI_OPTION, UPDATE_URI_OPTION};
use crate::errors::{Error, Result};
use crate::util::Logger;
use log::Level;
use serde::{Deserialize, Serialize};
use url::Url;

/// The default endpoints for a family of stores.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SchemeFamily {
    /// A generic SPARQL 1.1 Protocol server.
    Sparql,
    /// A 4store server, which uses separate `update/` and `data/` endpoints.
    FourStore,
}

impl SchemeFamily {
    fn default_query(self) -> Option<&'static str> {
        Some("sparql/")
    }

    fn default_update(self) -> Option<&'static str> {
        match self {
            SchemeFamily::Sparql => Some("sparql/"),
            SchemeFamily::FourStore => Some("update/"),
        }
    }

    fn default_data(self) -> Option<&'static str> {
        match self {
            SchemeFamily::Sparql => None,
            SchemeFamily::FourStore => Some("data/"),
        }
    }
}

// (prefix, replacement, family), most specific first
const SCHEME_REWRITES: [(&str, &str, SchemeFamily); 8] = [
    ("sparql+http:", "http:", SchemeFamily::Sparql),
    ("sparql+https:", "https:", SchemeFamily::Sparql),
    ("sparqls:", "https:", SchemeFamily::Sparql),
    ("sparql:", "http:", SchemeFamily::Sparql),
    ("4store+http:", "http:", SchemeFamily::FourStore),
    ("4store+https:", "https:", SchemeFamily::FourStore),
    ("4stores:", "https:", SchemeFamily::FourStore),
    ("4store:", "http:", SchemeFamily::FourStore),
];

/// Rewrites a tagged scheme to plain `http:`/`https:` and reports its family.
pub fn normalize_scheme(base: &str) -> (String, SchemeFamily) {
    for (prefix, replacement, family) in SCHEME_REWRITES {
        if let Some(rest) = base.strip_prefix(prefix) {
            return (format!("{replacement}{rest}"), family);
        }
    }
    (base.to_string(), SchemeFamily::Sparql)
}

/// The three endpoints of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub query_uri: Option<String>,
    pub update_uri: Option<String>,
    pub data_uri: Option<String>,
}

#[derive(Default)]
struct EndpointOptions {
    query: Option<String>,
    update: Option<String>,
    data: Option<String>,
}

fn set_option(slot: &mut Option<String>, key: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::UriInfo(format!("option '{key}' has an empty value")));
    }
    match slot {
        Some(existing) if existing.as_str() != value => Err(Error::UriInfo(format!(
            "option '{key}' is given more than once with different values"
        ))),
        _ => {
            *slot = Some(value.to_string());
            Ok(())
        }
    }
}

fn parse_options(url: &Url) -> Result<EndpointOptions> {
    let mut options = EndpointOptions::default();
    for (key, value) in url.query_pairs() {
        match &*key {
            QUERY_URI_OPTION => set_option(&mut options.query, &key, &value)?,
            UPDATE_URI_OPTION => set_option(&mut options.update, &key, &value)?,
            DATA_URI_OPTION => set_option(&mut options.data, &key, &value)?,
            _ => (),
        }
    }
    Ok(options)
}

/// The base with its query and fragment removed and a trailing `/` on the path.
fn directory_base(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

impl Endpoints {
    /// Derives all three endpoints from `base`. Nothing is returned unless
    /// every required derivation succeeds.
    pub fn from_base(base: &str, logger: &Logger) -> Result<Self> {
        let (normalized, family) = normalize_scheme(base);
        let url = Url::parse(&normalized).map_err(|e| Error::UriParse(format!("<{base}>: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(Error::UriParse(format!(
                "<{base}> cannot be used as a base URI"
            )));
        }
        let options = parse_options(&url)?;
        let dir = directory_base(&url);

        let query = options.query.as_deref().or(family.default_query());
        let query_uri = match query {
            Some(value) => Some(
                dir.join(value)
                    .map_err(|e| Error::UriDerive(format!("<{value}> against <{dir}>: {e}")))?
                    .to_string(),
            ),
            None => None,
        };
        let update_uri = resolve_optional(
            &dir,
            options.update.as_deref().or(family.default_update()),
            UPDATE_URI_OPTION,
            logger,
        );
        let data_uri = resolve_optional(
            &dir,
            options.data.as_deref().or(family.default_data()),
            DATA_URI_OPTION,
            logger,
        );
        sparql_log!(
            logger,
            Level::Debug,
            "endpoints for <{}>: query={:?} update={:?} data={:?}",
            base,
            query_uri,
            update_uri,
            data_uri
        );
        Ok(Self {
            query_uri,
            update_uri,
            data_uri,
        })
    }
}

fn resolve_optional(dir: &Url, value: Option<&str>, key: &str, logger: &Logger) -> Option<String> {
    let value = value?;
    match dir.join(value) {
        Ok(uri) => Some(uri.to_string()),
        Err(e) => {
            sparql_log!(
                logger,
                Level::Warn,
                "ignoring {} <{}>: cannot resolve against <{}>: {}",
                key,
                value,
                dir,
                e
            );
            None
        }
    }
}

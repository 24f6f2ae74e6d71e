use crate::consts::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use anyhow::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Duration;

/// Settings for a [`Connection`](crate::connection::Connection).
///
/// Explicit endpoint URIs are applied after the base URI, so they override
/// whatever the base derived.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Builder)]
#[serde(default)]
#[builder(default)]
pub struct ConnectionConfig {
    #[builder(setter(into, strip_option))]
    pub base_uri: Option<String>,
    #[builder(setter(into, strip_option))]
    pub query_uri: Option<String>,
    #[builder(setter(into, strip_option))]
    pub update_uri: Option<String>,
    #[builder(setter(into, strip_option))]
    pub data_uri: Option<String>,
    pub verbose: bool,
    pub timeout_secs: u64,
    #[builder(setter(into))]
    pub user_agent: String,
    /// Clear the target graph before falling back from PUT to `INSERT DATA`,
    /// so the fallback replaces the graph as PUT would.
    pub replace_on_put_fallback: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_uri: None,
            query_uri: None,
            update_uri: None,
            data_uri: None,
            verbose: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            replace_on_put_fallback: false,
        }
    }
}

impl ConnectionConfig {
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: ConnectionConfig = serde_json::from_reader(reader)?;
        Ok(config)
    }
}

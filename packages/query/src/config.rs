//! Source selection, from a TOML file or the environment.
//!
//! ```toml
//! [source]
//! type = "contract"
//! url = "http://localhost:1317/hotspot/query"
//! timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::contract::DEFAULT_TIMEOUT;
use crate::{AggregatedSource, ContractClient, FileSource, HotSpotSource, QueryError};

/// Smart-query endpoint of the contract.
pub const QUERY_URL_ENV: &str = "HOTSPOT_MAP_QUERY_URL";
/// Saved hot-spot answer to replay.
pub const SOURCE_FILE_ENV: &str = "HOTSPOT_MAP_SOURCE_FILE";
/// Location history export to rank locally.
pub const LOCATIONS_FILE_ENV: &str = "HOTSPOT_MAP_LOCATIONS_FILE";

/// Where hot-spots come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Query the contract over HTTP.
    Contract {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Replay a saved answer.
    File { path: PathBuf },
    /// Rank a location history export.
    Aggregated { path: PathBuf },
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

#[derive(Deserialize)]
struct ConfigFile {
    source: SourceConfig,
}

impl SourceConfig {
    /// Parses the `[source]` table of a TOML config.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Toml`] if the text is not a valid config.
    pub fn from_toml_str(text: &str) -> Result<Self, QueryError> {
        Ok(toml::from_str::<ConfigFile>(text)?.source)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, QueryError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Selects a source from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Config`] if no source variable is set.
    pub fn from_env() -> Result<Self, QueryError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Selects a source using `lookup` for variables. The contract URL
    /// wins over the file variables.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Config`] if no source variable is set.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, QueryError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(QUERY_URL_ENV) {
            return Ok(Self::Contract {
                url,
                timeout_secs: default_timeout_secs(),
            });
        }
        if let Some(path) = non_empty(SOURCE_FILE_ENV) {
            return Ok(Self::File { path: path.into() });
        }
        if let Some(path) = non_empty(LOCATIONS_FILE_ENV) {
            return Ok(Self::Aggregated { path: path.into() });
        }
        Err(QueryError::Config {
            message: format!(
                "no hot-spot source configured; set {QUERY_URL_ENV}, {SOURCE_FILE_ENV}, or {LOCATIONS_FILE_ENV}"
            ),
        })
    }

    /// Instantiates the configured source.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the HTTP client cannot be built or the
    /// location history cannot be loaded.
    pub async fn build(&self) -> Result<Arc<dyn HotSpotSource>, QueryError> {
        let source: Arc<dyn HotSpotSource> = match self {
            Self::Contract { url, timeout_secs } => Arc::new(ContractClient::new(
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?),
            Self::File { path } => Arc::new(FileSource::new(path)),
            Self::Aggregated { path } => Arc::new(AggregatedSource::load(path).await?),
        };
        log::info!("Using {} hot-spot source", source.id());
        Ok(source)
    }
}

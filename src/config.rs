//! Run configuration: YAML file, CLI overrides, and validation.
//!
//! Precedence is CLI flag, then config file, then built-in default.
//!
//! ```yaml
//! stores: ["589", "6177"]
//! categories: ["5yc1vZc3poZ21j", "5yc1vZc3poZgt7"]
//! page_size: 48
//! offset_ceiling: 720
//! max_in_flight: 16
//! timeout_secs: 30
//! output: homedepot_data.csv
//! ```

use crate::api::DEFAULT_ENDPOINT;
use crate::cli::Cli;
use crate::models::Pair;
use crate::orchestrator::{DEFAULT_TIMEOUT, FetchSettings};
use crate::pagination::{DEFAULT_OFFSET_CEILING, DEFAULT_PAGE_SIZE};
use itertools::iproduct;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

pub const DEFAULT_OUTPUT: &str = "homedepot_data.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Contents of the YAML config file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub stores: Vec<String>,
    pub store_names: Vec<String>,
    pub categories: Vec<String>,
    pub page_size: Option<u32>,
    pub offset_ceiling: Option<u32>,
    pub max_in_flight: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub endpoint: Option<String>,
    pub output: Option<String>,
    pub raw_json_dir: Option<String>,
}

impl FileConfig {
    #[instrument(level = "info")]
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!(path, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub stores: Vec<String>,
    /// Store names still to be resolved to IDs through the store sitemap.
    pub store_names: Vec<String>,
    pub categories: Vec<String>,
    pub fetch: FetchSettings,
    pub endpoint: String,
    pub output: String,
    pub raw_json_dir: Option<String>,
}

impl RunConfig {
    /// Merge CLI flags over the (optional) file config.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let pick = |cli_list: &Vec<String>, file_list: Vec<String>| {
            if cli_list.is_empty() {
                file_list
            } else {
                cli_list.clone()
            }
        };

        let timeout_secs = cli
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT.as_secs());

        let config = Self {
            stores: pick(&cli.stores, file.stores),
            store_names: pick(&cli.store_names, file.store_names),
            categories: pick(&cli.categories, file.categories),
            fetch: FetchSettings {
                page_size: cli.page_size.or(file.page_size).unwrap_or(DEFAULT_PAGE_SIZE),
                offset_ceiling: cli
                    .offset_ceiling
                    .or(file.offset_ceiling)
                    .unwrap_or(DEFAULT_OFFSET_CEILING),
                max_in_flight: cli.max_in_flight.or(file.max_in_flight),
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
            endpoint: cli
                .endpoint
                .clone()
                .or(file.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            output: cli
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| DEFAULT_OUTPUT.to_string()),
            raw_json_dir: cli.raw_json_dir.clone().or(file.raw_json_dir),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fetch = &self.fetch;
        if fetch.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be greater than 0".into()));
        }
        if fetch.offset_ceiling < fetch.page_size {
            return Err(ConfigError::Invalid(format!(
                "offset_ceiling ({}) must be at least page_size ({})",
                fetch.offset_ceiling, fetch.page_size
            )));
        }
        if fetch.max_in_flight == Some(0) {
            return Err(ConfigError::Invalid("max_in_flight must be greater than 0".into()));
        }
        Ok(())
    }

    /// Check there is something to scrape. Listing modes skip this.
    pub fn require_targets(&self) -> Result<(), ConfigError> {
        if self.stores.is_empty() && self.store_names.is_empty() {
            return Err(ConfigError::Invalid("no stores given".into()));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("no categories given".into()));
        }
        Ok(())
    }

    /// Cross product of stores and categories, stores outermost.
    pub fn pairs(&self) -> Vec<Pair> {
        iproduct!(&self.stores, &self.categories)
            .map(|(store, category)| Pair::new(store.as_str(), category.as_str()))
            .collect()
    }
}

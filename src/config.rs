//! Configuration of the search component.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ElasticQueryError, Result};
use crate::request::KeepAlive;

/// Highlighting defaults applied to the main request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightDefaults {
    /// Fragment size in characters.
    pub fragment_size: u32,
    /// Number of fragments per field.
    pub number_of_fragments: u32,
}

impl Default for HighlightDefaults {
    fn default() -> Self {
        Self {
            fragment_size: 100,
            number_of_fragments: 5,
        }
    }
}

/// Deep pagination defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepPaginationDefaults {
    /// Keep-alive of scroll contexts and point-in-time leases.
    pub keep_alive: KeepAlive,
    /// Cursor limit used when a request sets none.
    pub limit: Option<usize>,
}

/// Configuration of [`crate::component::ElasticSearchComponent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticQueryConfig {
    /// Highlighting defaults.
    pub highlight: HighlightDefaults,
    /// Deep pagination defaults.
    pub deep_pagination: DeepPaginationDefaults,
    /// Dispatch the requests of a batch concurrently.
    pub parallel_dispatch: bool,
    /// Thread pool size for concurrent dispatch (defaults to the CPU count).
    pub dispatch_threads: Option<usize>,
    /// Warn about sort orders that are slow for the deep pagination strategy.
    pub warn_on_slow_sort: bool,
}

impl Default for ElasticQueryConfig {
    fn default() -> Self {
        Self {
            highlight: HighlightDefaults::default(),
            deep_pagination: DeepPaginationDefaults::default(),
            parallel_dispatch: false,
            dispatch_threads: None,
            warn_on_slow_sort: true,
        }
    }
}

impl ElasticQueryConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: ElasticQueryConfig = serde_json::from_str(&content).map_err(|e| {
            ElasticQueryError::invalid_config(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch_threads == Some(0) {
            return Err(ElasticQueryError::invalid_config(
                "dispatch_threads must be greater than zero",
            ));
        }
        if self.highlight.number_of_fragments == 0 && self.highlight.fragment_size == 0 {
            return Err(ElasticQueryError::invalid_config(
                "highlight defaults must not both be zero",
            ));
        }
        Ok(())
    }
}

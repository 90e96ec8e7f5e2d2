use anyhow::Result;
use log::error;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::error_bail;
use crate::tool::DEFAULT_REFRESH_INTERVAL_NS;

fn default_refresh_interval_ns() -> u64 {
    DEFAULT_REFRESH_INTERVAL_NS
}

/// Configuration of a table.
///
/// Example:
///
/// format = "*proc.name,Sproc.count,evt.type"
/// refresh_interval_ns = 2000000000
/// sorting_col = 2
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Format string of the fields.
    pub format: String,

    /// Length of a window in nanoseconds.
    #[serde(default = "default_refresh_interval_ns")]
    pub refresh_interval_ns: u64,

    /// Sorting column, counted from `1` without the key.
    #[serde(default)]
    pub sorting_col: Option<u32>,
}

impl TableConfig {
    /// Create a new `TableConfig` with the default refresh interval.
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
            refresh_interval_ns: DEFAULT_REFRESH_INTERVAL_NS,
            sorting_col: None,
        }
    }

    /// Parse from a toml string.
    pub fn from_config_str(content: &str) -> Result<Self> {
        let config: TableConfig = toml::from_str(content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.format.trim().is_empty() {
            error_bail!(ConfigError::EmptyFormat);
        }

        if self.refresh_interval_ns == 0 {
            error_bail!(ConfigError::InvalidRefreshInterval);
        }

        Ok(())
    }
}

//! Node configuration
//! 
//! Loaded from an optional JSON file; every field has a default.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use crate::constants::{DEFAULT_CHANNEL_CAPACITY, GENESIS_RELEASE_DELAY_SECS, RELEASE_DELAY_FACTOR};
use crate::mining::MiningMode;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(&'static str),
}

/// Runtime configuration of a node
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// When to start mining tasks
    pub mining_mode: MiningMode,

    /// Depth of the consensus request queue
    pub channel_capacity: usize,

    /// Release delay for blocks mined on genesis, in seconds
    pub genesis_release_delay_secs: u64,

    /// Release delay for other blocks, as a multiple of their mining time
    pub release_delay_factor: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            mining_mode: MiningMode::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            genesis_release_delay_secs: GENESIS_RELEASE_DELAY_SECS,
            release_delay_factor: RELEASE_DELAY_FACTOR,
        }
    }
}

impl NodeConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be positive"));
        }
        Ok(())
    }

    /// Delay before a locally mined block may be announced
    ///
    /// Fixed for children of genesis, otherwise proportional to the time the
    /// block took to mine.
    pub fn release_delay(&self, extends_genesis: bool, mining_time: Duration) -> Duration {
        if extends_genesis {
            Duration::from_secs(self.genesis_release_delay_secs)
        } else {
            mining_time.saturating_mul(self.release_delay_factor)
        }
    }
}

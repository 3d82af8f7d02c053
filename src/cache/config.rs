//! Configuration for the engine cache.

use serde::{Deserialize, Serialize};

use super::types::{KeyMode, Precision};
use crate::error::AudiobookError;

/// Configuration for the engine cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of engines kept resident (default: 3).
    ///
    /// Each engine holds a full set of model weights, so on a 16 GB machine
    /// two or three is the practical ceiling.
    #[serde(default = "default_max_models")]
    pub max_models: usize,

    /// How cache keys are derived from weight paths (default: file name).
    #[serde(default)]
    pub key_mode: KeyMode,

    /// Precision hint passed to every engine build (default: half).
    #[serde(default)]
    pub precision: Precision,

    /// Initial compute device: `"cpu"`, `"auto"`, or an accelerator id such as `"cuda:0"`.
    #[serde(default = "default_device")]
    pub device: String,
}

fn default_max_models() -> usize {
    3
}

fn default_device() -> String {
    "cpu".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_models: default_max_models(),
            key_mode: KeyMode::default(),
            precision: Precision::default(),
            device: default_device(),
        }
    }
}

impl CacheConfig {
    /// Config with the given capacity and defaults for everything else.
    pub fn with_capacity(max_models: usize) -> Self {
        Self {
            max_models,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AudiobookError> {
        if self.max_models == 0 {
            return Err(AudiobookError::InvalidConfig(
                "cache.max_models must be greater than 0".to_string(),
            ));
        }
        if self.device.trim().is_empty() {
            return Err(AudiobookError::InvalidConfig(
                "cache.device must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

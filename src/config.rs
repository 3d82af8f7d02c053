//! Application configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial (or
//! empty) file is valid.
//!
//! ```json
//! {
//!   "cache": { "max_models": 2, "device": "auto" },
//!   "text": { "batch_size": 3000, "split_method": "cut5" },
//!   "output": { "output_dir": "books_out" }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::error::AudiobookError;
use crate::text::SegmenterConfig;

/// Where generated audio goes and how it is merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Root for per-book output directories (default: `output_audio`).
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for preview clips (default: `preview_audio`).
    #[serde(default = "default_preview_dir")]
    pub preview_dir: PathBuf,

    /// Sample rate written for the merged book file (default: 48000).
    #[serde(default = "default_merge_sample_rate")]
    pub merge_sample_rate: u32,

    /// Suffix of the merged file name, `<book>_<suffix>.wav` (default: `full`).
    #[serde(default = "default_merged_suffix")]
    pub merged_suffix: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output_audio")
}

fn default_preview_dir() -> PathBuf {
    PathBuf::from("preview_audio")
}

fn default_merge_sample_rate() -> u32 {
    48_000
}

fn default_merged_suffix() -> String {
    "full".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            preview_dir: default_preview_dir(),
            merge_sample_rate: default_merge_sample_rate(),
            merged_suffix: default_merged_suffix(),
        }
    }
}

impl OutputConfig {
    /// Defaults rooted under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            output_dir: dir.join(default_output_dir()),
            preview_dir: dir.join(default_preview_dir()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AudiobookError> {
        if self.merge_sample_rate == 0 {
            return Err(AudiobookError::InvalidConfig(
                "output.merge_sample_rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AudiobookConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub text: SegmenterConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AudiobookConfig {
    /// Load and validate a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, AudiobookError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AudiobookError> {
        self.cache.validate()?;
        self.text.validate()?;
        self.output.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::SplitMethod;

    #[test]
    fn empty_object_gives_defaults() {
        let config: AudiobookConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AudiobookConfig::default());
        assert_eq!(config.cache.max_models, 3);
        assert_eq!(config.text.batch_size, 5000);
        assert!(!config.text.strip_latin);
        assert_eq!(config.output.merge_sample_rate, 48_000);
    }

    #[test]
    fn from_file_reads_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "cache": { "max_models": 2, "device": "cuda:0" },
                "text": { "batch_size": 3000, "split_method": "cut5" },
                "output": { "output_dir": "books_out" }
            }"#,
        )
        .unwrap();

        let config = AudiobookConfig::from_file(&path).unwrap();
        assert_eq!(config.cache.max_models, 2);
        assert_eq!(config.cache.device, "cuda:0");
        assert_eq!(config.text.split_method, Some(SplitMethod::Punctuation));
        assert_eq!(config.output.output_dir, PathBuf::from("books_out"));
        assert_eq!(config.output.preview_dir, PathBuf::from("preview_audio"));
    }

    #[test]
    fn from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "cache": { "max_models": 0 } }"#).unwrap();

        assert!(matches!(
            AudiobookConfig::from_file(&path),
            Err(AudiobookError::InvalidConfig(_))
        ));
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            AudiobookConfig::from_file(&path),
            Err(AudiobookError::Json(_))
        ));
    }
}

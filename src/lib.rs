//! # audiobook-rs
//!
//! A Rust library for turning book text into narrated audio with a pluggable,
//! reference-voice text-to-speech engine.
//!
//! ## Features
//!
//! - **Model Cache**: bounded LRU cache of heavyweight engines keyed by weight-file pair
//! - **Text Segmentation**: table-of-contents filtering, CJK-aware normalization and
//!   boundary-preferring chunking, plus the fixed `cut0`..`cut5` split methods
//! - **Narration**: voice presets with per-emotion reference audio, per-chunk synthesis
//!   and WAV merging
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! audiobook-rs = "2026.10"
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use audiobook_rs::{cache::{CacheConfig, ModelCache}, synthesis::{Narrator, VoicePreset}};
//!
//! let cache = Arc::new(ModelCache::new(MyLoader::default(), CacheConfig::default())?);
//! let mut narrator = Narrator::new(Arc::clone(&cache), Default::default());
//! narrator.set_preset(VoicePreset::from_json_file("presets/alice/settings.json".as_ref())?)?;
//!
//! let chunks = audiobook_rs::text::segment(&book_text, 5000, None);
//! narrator.generate_book(&chunks, "books/alice.txt".as_ref())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod synthesis;
pub mod text;

use std::path::Path;

pub use cache::{Device, Precision};
pub use error::{AudiobookError, BoxError, ModelLoadError};
pub use synthesis::SynthesisParams;

/// One waveform produced by a synthesis engine.
///
/// Contains raw f32 audio samples and the sample rate they were generated at.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// Raw mono audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for reference-voice text-to-speech engines.
///
/// Engines are opaque and expensive to build; instances are produced by an
/// [`EngineLoader`] and normally shared through the [`cache::ModelCache`].
pub trait SynthesisEngine {
    /// Synthesize speech for `params.text`.
    ///
    /// Returns a lazy sequence of waveforms. Engines that fragment long input
    /// may yield several; callers that want a single file take the first.
    fn synthesize(
        &mut self,
        params: &SynthesisParams,
    ) -> Result<Box<dyn Iterator<Item = SynthesisResult> + '_>, BoxError>;

    /// Synthesize speech and write the first produced waveform to a WAV file.
    ///
    /// Returns `Ok(false)` when the engine yielded no audio at all.
    fn synthesize_to_file(
        &mut self,
        params: &SynthesisParams,
        wav_path: &Path,
    ) -> Result<bool, BoxError> {
        match self.synthesize(params)?.next() {
            Some(result) => {
                result.write_wav(wav_path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Everything an [`EngineLoader`] needs to construct one engine.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Text-to-semantic (GPT) weights.
    pub t2s_weights: &'a Path,
    /// Acoustic (SoVITS) weights.
    pub acoustic_weights: &'a Path,
    pub device: &'a Device,
    pub precision: Precision,
}

/// Constructs engines from a pair of weight files.
///
/// This is the seam to the external TTS runtime. Building is assumed to be
/// slow and memory-hungry, which is why the cache exists.
pub trait EngineLoader {
    type Engine: SynthesisEngine;

    /// Build a new engine. The weight files have already been checked to exist.
    fn build(&self, request: &LoadRequest<'_>) -> Result<Self::Engine, BoxError>;

    /// Accelerator to use when the caller asks for the `"auto"` device.
    ///
    /// `None` means no accelerator is available and `"auto"` resolves to CPU.
    fn preferred_accelerator(&self) -> Option<Device> {
        None
    }
}

//! Drives a cached engine over book chunks.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};

use once_cell::sync::Lazy;
use regex::Regex;

use super::audio::merge_wav_files;
use super::params::SynthesisParams;
use super::preset::VoicePreset;
use crate::cache::{CacheKey, CacheStats, EngineHandle, ModelCache};
use crate::config::OutputConfig;
use crate::error::{AudiobookError, ModelLoadError};
use crate::{EngineLoader, SynthesisEngine};

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-\.]").expect("name pattern is valid"));

/// Book name used for output paths.
///
/// The file stem up to its first `_`, with characters other than word
/// characters, `-` and `.` removed. Falls back to `"book"` when nothing remains.
pub fn book_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let head = stem.split('_').next().unwrap_or_default();
    let name = UNSAFE_NAME_CHARS.replace_all(head, "");
    if name.is_empty() {
        "book".to_string()
    } else {
        name.into_owned()
    }
}

/// Files produced by [`Narrator::generate_book`].
#[derive(Debug, Clone, PartialEq)]
pub struct BookAudio {
    /// Per-chunk files in chunk order. Blank chunks have no file.
    pub segments: Vec<PathBuf>,
    /// All segments concatenated.
    pub merged: PathBuf,
}

/// Audiobook generator for one active voice preset.
///
/// The engine cache is shared; several narrators may use the same cache.
pub struct Narrator<L: EngineLoader> {
    cache: Arc<ModelCache<L>>,
    output: OutputConfig,
    preset: Option<VoicePreset>,
    engine: Option<EngineHandle<L::Engine>>,
    active_key: Option<CacheKey>,
    latest_ref_audio: Option<PathBuf>,
}

impl<L: EngineLoader> Narrator<L> {
    pub fn new(cache: Arc<ModelCache<L>>, output: OutputConfig) -> Self {
        Self {
            cache,
            output,
            preset: None,
            engine: None,
            active_key: None,
            latest_ref_audio: None,
        }
    }

    /// Activate a preset, loading its engine through the cache.
    ///
    /// The reference clip and both weight files must exist. If the preset
    /// uses the engine that is already active, the cache is not consulted.
    /// On failure the previous preset stays active.
    pub fn set_preset(&mut self, preset: VoicePreset) -> Result<(), AudiobookError> {
        if !preset.ref_audio.exists() {
            return Err(AudiobookError::MissingReferenceAudio(preset.ref_audio));
        }
        for weights in [&preset.t2s_weights, &preset.acoustic_weights] {
            if !weights.exists() {
                return Err(ModelLoadError::MissingWeights(weights.clone()).into());
            }
        }

        let key = self.cache.key(&preset.t2s_weights, &preset.acoustic_weights);
        if self.engine.is_some() && self.active_key.as_ref() == Some(&key) {
            log::info!("Engine {key} already active, skipping reload");
        } else {
            let engine = self
                .cache
                .get_model(&preset.t2s_weights, &preset.acoustic_weights)?;
            let stats = self.cache.stats();
            log::info!(
                "Engine {key} ready (hit rate {:.1}%, {}/{} cached)",
                stats.hit_rate * 100.0,
                stats.count,
                stats.capacity
            );
            self.engine = Some(engine);
            self.active_key = Some(key);
        }

        log::info!("Preset '{}' active", preset.name);
        self.latest_ref_audio = Some(preset.ref_audio.clone());
        self.preset = Some(preset);
        Ok(())
    }

    pub fn preset(&self) -> Option<&VoicePreset> {
        self.preset.as_ref()
    }

    /// Primary reference clip of the most recently activated preset.
    pub fn latest_ref_audio(&self) -> Option<&Path> {
        self.latest_ref_audio.as_deref()
    }

    /// Emotion labels offered by the active preset.
    pub fn emotions(&self) -> Vec<&str> {
        self.preset
            .as_ref()
            .map(VoicePreset::emotion_names)
            .unwrap_or_default()
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Request parameters for `text` under the active preset.
    pub fn synthesis_params(
        &self,
        text: &str,
        emotion: Option<&str>,
    ) -> Result<SynthesisParams, AudiobookError> {
        let preset = self.preset.as_ref().ok_or(AudiobookError::NoPreset)?;
        Ok(preset.synthesis_params(text, emotion))
    }

    /// Synthesize `text` and write the first produced waveform to `output_path`.
    pub fn generate_audio(
        &self,
        text: &str,
        output_path: &Path,
        emotion: Option<&str>,
    ) -> Result<(), AudiobookError> {
        self.synthesize_chunk(0, text, output_path, emotion)
    }

    /// Synthesize a short clip to `<preview_dir>/preview.wav`, replacing any previous preview.
    pub fn generate_preview(
        &self,
        text: &str,
        emotion: Option<&str>,
    ) -> Result<PathBuf, AudiobookError> {
        std::fs::create_dir_all(&self.output.preview_dir)?;
        let path = self.output.preview_dir.join("preview.wav");
        self.synthesize_chunk(0, text, &path, emotion)?;
        log::info!("Preview written to {}", path.display());
        Ok(path)
    }

    /// Narrate a whole book into `<output_dir>/<book>/`.
    ///
    /// Writes `segment_NNN.wav` per non-blank chunk (numbered by chunk
    /// position, from 001) and merges them into `<book>_<suffix>.wav`.
    pub fn generate_book(
        &self,
        chunks: &[String],
        source: &Path,
    ) -> Result<BookAudio, AudiobookError> {
        self.generate_book_with_progress(chunks, source, |_, _| {})
    }

    /// [`generate_book`](Self::generate_book) reporting `(chunks done, total)`
    /// after every chunk.
    ///
    /// Stops at the first failing chunk; its index is in the returned error.
    /// Segments already written are left on disk.
    pub fn generate_book_with_progress(
        &self,
        chunks: &[String],
        source: &Path,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<BookAudio, AudiobookError> {
        if chunks.is_empty() {
            return Err(AudiobookError::EmptyBook);
        }
        if self.engine.is_none() {
            return Err(AudiobookError::NoPreset);
        }

        let book = book_name(source);
        let book_dir = self.output.output_dir.join(&book);
        std::fs::create_dir_all(&book_dir)?;
        log::info!(
            "Narrating '{book}': {} chunks into {}",
            chunks.len(),
            book_dir.display()
        );

        let mut segments = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if !chunk.trim().is_empty() {
                let path = book_dir.join(format!("segment_{:03}.wav", i + 1));
                if let Err(e) = self.synthesize_chunk(i, chunk, &path, None) {
                    log::error!("Chunk {} of '{book}' failed: {e}", i + 1);
                    return Err(e);
                }
                segments.push(path);
            }
            progress(i + 1, chunks.len());
        }

        let merged = book_dir.join(format!("{book}_{}.wav", self.output.merged_suffix));
        merge_wav_files(&segments, &merged, self.output.merge_sample_rate)?;
        log::info!("Audiobook written to {}", merged.display());

        Ok(BookAudio { segments, merged })
    }

    /// Warm the cache with the engines of `presets`. Returns how many were loaded.
    pub fn preload_presets(&self, presets: &[VoicePreset]) -> usize {
        let pairs: Vec<_> = presets
            .iter()
            .map(|p| (p.t2s_weights.as_path(), p.acoustic_weights.as_path()))
            .collect();
        self.cache.preload(&pairs)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Empty the shared cache and release the active engine.
    ///
    /// The preset stays selected; call [`set_preset`](Self::set_preset) again
    /// before generating.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.engine = None;
        self.active_key = None;
    }

    /// Device for future engine loads. See [`ModelCache::set_device`].
    pub fn set_device(&self, device: &str) {
        self.cache.set_device(device);
    }

    fn synthesize_chunk(
        &self,
        index: usize,
        text: &str,
        output_path: &Path,
        emotion: Option<&str>,
    ) -> Result<(), AudiobookError> {
        let params = self.synthesis_params(text, emotion)?;
        let handle = self.engine.as_ref().ok_or(AudiobookError::NoPreset)?;
        let mut engine = handle.lock().unwrap_or_else(PoisonError::into_inner);

        log::debug!(
            "Synthesizing chunk {index} ({} chars, method {})",
            text.chars().count(),
            params.text_split_method
        );
        let written = engine
            .synthesize_to_file(&params, output_path)
            .map_err(|source| AudiobookError::Synthesis {
                chunk: index,
                source,
            })?;
        if !written {
            return Err(AudiobookError::NoAudio { chunk: index });
        }

        log::info!("Wrote {}", output_path.display());
        Ok(())
    }
}

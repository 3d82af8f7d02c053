//! Voice presets: a weight-file pair plus reference clips per emotion.
//!
//! Presets are stored as `settings.json` files. `ref_audio` may be a single
//! path or a list whose first element is the primary reference:
//!
//! ```json
//! {
//!   "gpt_path": "models/alice-e15.ckpt",
//!   "sovits_path": "models/alice_e8_s400.pth",
//!   "ref_audio": ["presets/alice/neutral_0412.wav"],
//!   "ref_text": "今天天气很好。",
//!   "ref_language": "zh",
//!   "all_audio_info": [
//!     { "emotion": "neutral", "path": "presets/alice/neutral_0412.wav", "text": "今天天气很好。" },
//!     { "emotion": "happy", "path": "presets/alice/happy_0533.wav", "text": "太好了！" }
//!   ],
//!   "speed_factor": 1.1
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use super::params::SynthesisParams;
use crate::error::AudiobookError;
use crate::text::SplitMethod;

/// One labelled reference clip. Missing fields fall back to the preset's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionReference {
    pub emotion: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Reference voice resolved for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceVoice {
    pub audio: PathBuf,
    pub text: String,
    pub language: String,
}

/// Synthesis defaults carried by a preset. Keys missing from the file take the
/// same values as [`SynthesisParams::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetDefaults {
    #[serde(default = "default_language")]
    pub text_language: String,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_one")]
    pub top_p: f32,
    #[serde(default = "default_one")]
    pub temperature: f32,
    #[serde(default = "default_one")]
    pub speed_factor: f32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    #[serde(default)]
    pub text_split_method: SplitMethod,
    #[serde(default = "default_sample_steps")]
    pub sample_steps: u32,
    #[serde(default, rename = "if_sr")]
    pub super_sampling: bool,
    #[serde(default)]
    pub aux_ref_audio_paths: Vec<PathBuf>,
    #[serde(default = "default_fragment_interval")]
    pub fragment_interval: f32,
    #[serde(default)]
    pub parallel_infer: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_seed")]
    pub seed: i64,
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_top_k() -> u32 {
    15
}

fn default_one() -> f32 {
    1.0
}

fn default_repetition_penalty() -> f32 {
    1.35
}

fn default_sample_steps() -> u32 {
    16
}

fn default_fragment_interval() -> f32 {
    0.3
}

fn default_batch_size() -> usize {
    1
}

fn default_seed() -> i64 {
    -1
}

impl Default for PresetDefaults {
    fn default() -> Self {
        let params = SynthesisParams::default();
        Self {
            text_language: params.text_language,
            top_k: params.top_k,
            top_p: params.top_p,
            temperature: params.temperature,
            speed_factor: params.speed_factor,
            repetition_penalty: params.repetition_penalty,
            text_split_method: params.text_split_method,
            sample_steps: params.sample_steps,
            super_sampling: params.super_sampling,
            aux_ref_audio_paths: params.aux_ref_audio_paths,
            fragment_interval: params.fragment_interval,
            parallel_infer: params.parallel_infer,
            batch_size: params.batch_size,
            seed: params.seed,
        }
    }
}

/// A named voice: which engine to use and how it should sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePreset {
    /// Display name. Filled from the preset directory when loading from disk.
    #[serde(default)]
    pub name: String,
    /// Text-to-semantic weights.
    #[serde(rename = "gpt_path")]
    pub t2s_weights: PathBuf,
    /// Acoustic weights.
    #[serde(rename = "sovits_path")]
    pub acoustic_weights: PathBuf,
    /// Primary reference clip.
    #[serde(deserialize_with = "path_or_first")]
    pub ref_audio: PathBuf,
    pub ref_text: String,
    pub ref_language: String,
    /// Per-emotion reference clips.
    #[serde(default, rename = "all_audio_info")]
    pub emotions: Vec<EmotionReference>,
    #[serde(flatten)]
    pub defaults: PresetDefaults,
}

fn path_or_first<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(PathBuf),
        Many(Vec<PathBuf>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => Ok(path),
        OneOrMany::Many(paths) => paths
            .into_iter()
            .next()
            .ok_or_else(|| serde::de::Error::custom("ref_audio list is empty")),
    }
}

impl VoicePreset {
    /// Minimal preset with default synthesis settings.
    pub fn new(
        name: impl Into<String>,
        t2s_weights: impl Into<PathBuf>,
        acoustic_weights: impl Into<PathBuf>,
        ref_audio: impl Into<PathBuf>,
        ref_text: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            t2s_weights: t2s_weights.into(),
            acoustic_weights: acoustic_weights.into(),
            ref_audio: ref_audio.into(),
            ref_text: ref_text.into(),
            ref_language: default_language(),
            emotions: Vec::new(),
            defaults: PresetDefaults::default(),
        }
    }

    /// Load a preset from a `settings.json` file.
    ///
    /// Without an explicit `name`, the parent directory name is used.
    pub fn from_json_file(path: &Path) -> Result<Self, AudiobookError> {
        let content = std::fs::read_to_string(path)?;
        let mut preset: Self = serde_json::from_str(&content)?;
        if preset.name.is_empty() {
            preset.name = path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        log::debug!("Loaded preset '{}' from {}", preset.name, path.display());
        Ok(preset)
    }

    pub fn with_emotion(
        mut self,
        emotion: impl Into<String>,
        path: impl Into<PathBuf>,
        text: impl Into<String>,
    ) -> Self {
        self.emotions.push(EmotionReference {
            emotion: emotion.into(),
            path: Some(path.into()),
            text: Some(text.into()),
        });
        self
    }

    /// First reference labelled `emotion`.
    pub fn find_emotion(&self, emotion: &str) -> Option<&EmotionReference> {
        self.emotions.iter().find(|e| e.emotion == emotion)
    }

    /// Emotion labels in file order.
    pub fn emotion_names(&self) -> Vec<&str> {
        self.emotions.iter().map(|e| e.emotion.as_str()).collect()
    }

    /// Reference clip and transcript for a request.
    ///
    /// An unknown emotion logs a warning and falls back to the primary reference.
    pub fn resolve_reference(&self, emotion: Option<&str>) -> ReferenceVoice {
        let mut voice = ReferenceVoice {
            audio: self.ref_audio.clone(),
            text: self.ref_text.clone(),
            language: self.ref_language.clone(),
        };

        if let Some(emotion) = emotion {
            match self.find_emotion(emotion) {
                Some(reference) => {
                    if let Some(path) = &reference.path {
                        voice.audio = path.clone();
                    }
                    if let Some(text) = &reference.text {
                        voice.text = text.clone();
                    }
                }
                None => log::warn!(
                    "No reference audio for emotion '{emotion}' in preset '{}', using the default",
                    self.name
                ),
            }
        }

        log::info!("Reference audio: {}", voice.audio.display());
        voice
    }

    /// Full request parameters for `text`.
    pub fn synthesis_params(&self, text: &str, emotion: Option<&str>) -> SynthesisParams {
        let reference = self.resolve_reference(emotion);
        let defaults = &self.defaults;

        SynthesisParams {
            text: text.to_string(),
            text_language: defaults.text_language.clone(),
            ref_audio_path: reference.audio,
            aux_ref_audio_paths: defaults.aux_ref_audio_paths.clone(),
            prompt_text: reference.text,
            prompt_language: reference.language,
            top_k: defaults.top_k,
            top_p: defaults.top_p,
            temperature: defaults.temperature,
            repetition_penalty: defaults.repetition_penalty,
            speed_factor: defaults.speed_factor,
            text_split_method: defaults.text_split_method,
            batch_size: defaults.batch_size,
            sample_steps: defaults.sample_steps,
            super_sampling: defaults.super_sampling,
            fragment_interval: defaults.fragment_interval,
            seed: defaults.seed,
            parallel_infer: defaults.parallel_infer,
        }
    }
}

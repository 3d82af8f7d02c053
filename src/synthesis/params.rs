use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::text::SplitMethod;

/// Parameters for one synthesis request.
///
/// Build with [`SynthesisParamsBuilder`]; every field not set keeps its
/// [`Default`] value.
///
/// ```rust
/// use audiobook_rs::synthesis::SynthesisParamsBuilder;
///
/// let params = SynthesisParamsBuilder::default()
///     .text("天亮了。")
///     .ref_audio_path("voices/alice/neutral.wav")
///     .speed_factor(1.1)
///     .build()
///     .unwrap();
/// assert_eq!(params.top_k, 15);
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, setter(into))]
pub struct SynthesisParams {
    /// Text to speak.
    pub text: String,
    /// Language code of `text` (default `"zh"`).
    pub text_language: String,
    /// Reference clip whose voice and prosody are imitated.
    pub ref_audio_path: PathBuf,
    /// Extra reference clips blended into the voice.
    pub aux_ref_audio_paths: Vec<PathBuf>,
    /// Transcript of the reference clip.
    pub prompt_text: String,
    /// Language code of `prompt_text`.
    pub prompt_language: String,
    /// Sampling parameters. Defaults: 15 / 1.0 / 1.0.
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
    /// Default 1.35.
    pub repetition_penalty: f32,
    /// Playback speed multiplier, default 1.0.
    pub speed_factor: f32,
    /// How the engine fragments `text` internally (default `cut1`).
    pub text_split_method: SplitMethod,
    pub batch_size: usize,
    /// Diffusion steps for acoustic models that use them (default 16).
    pub sample_steps: u32,
    /// Upsample the output with the engine's super-resolution stage.
    pub super_sampling: bool,
    /// Silence inserted between internal fragments, in seconds (default 0.3).
    pub fragment_interval: f32,
    /// Random seed; `-1` picks one per call.
    pub seed: i64,
    pub parallel_infer: bool,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            text: String::new(),
            text_language: "zh".to_string(),
            ref_audio_path: PathBuf::new(),
            aux_ref_audio_paths: Vec::new(),
            prompt_text: String::new(),
            prompt_language: "zh".to_string(),
            top_k: 15,
            top_p: 1.0,
            temperature: 1.0,
            repetition_penalty: 1.35,
            speed_factor: 1.0,
            text_split_method: SplitMethod::FourSentences,
            batch_size: 1,
            sample_steps: 16,
            super_sampling: false,
            fragment_interval: 0.3,
            seed: -1,
            parallel_infer: false,
        }
    }
}

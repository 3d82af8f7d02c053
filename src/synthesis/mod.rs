//! Narration: turning chunks into audio with a cached engine.
//!
//! A [`Narrator`] holds the active [`VoicePreset`] and borrows engines from
//! a shared [`ModelCache`](crate::cache::ModelCache). Each chunk is one
//! engine call; book generation writes one WAV per chunk and then merges
//! them with [`merge_wav_files`].

pub mod audio;
pub mod narrator;
pub mod params;
pub mod preset;

pub use audio::{concat, merge_wav_files, read_wav};
pub use narrator::{book_name, BookAudio, Narrator};
pub use params::{SynthesisParams, SynthesisParamsBuilder};
pub use preset::{EmotionReference, PresetDefaults, ReferenceVoice, VoicePreset};

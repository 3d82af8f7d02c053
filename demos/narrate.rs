//! Narrate a book with a synthetic tone engine.
//!
//! ```text
//! cargo run --example narrate -- book.txt [presets/alice/settings.json] [config.json]
//! ```
//!
//! Without a preset, a scratch one is created in a temporary directory.

use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use audiobook_rs::{
    cache::ModelCache,
    config::AudiobookConfig,
    document::decode_document,
    synthesis::{Narrator, SynthesisParams, VoicePreset},
    text::Segmenter,
    BoxError, Device, EngineLoader, LoadRequest, SynthesisEngine, SynthesisResult,
};

const SAMPLE_RATE: u32 = 48_000;

/// Emits a short beep per character, pitched by the speed factor.
struct ToneEngine {
    device: Device,
}

impl SynthesisEngine for ToneEngine {
    fn synthesize(
        &mut self,
        params: &SynthesisParams,
    ) -> Result<Box<dyn Iterator<Item = SynthesisResult> + '_>, BoxError> {
        let per_char = (SAMPLE_RATE as f32 * 0.02 / params.speed_factor) as usize;
        let frequency = 220.0 * params.speed_factor;
        let samples = (0..params.text.chars().count() * per_char)
            .map(|i| 0.2 * (TAU * frequency * i as f32 / SAMPLE_RATE as f32).sin())
            .collect();
        log::debug!("Tone engine on {} rendered {} chars", self.device, params.text.len());

        Ok(Box::new(std::iter::once(SynthesisResult {
            samples,
            sample_rate: SAMPLE_RATE,
        })))
    }
}

struct ToneLoader;

impl EngineLoader for ToneLoader {
    type Engine = ToneEngine;

    fn build(&self, request: &LoadRequest<'_>) -> Result<ToneEngine, BoxError> {
        println!(
            "Loading {} + {} on {} ({:?})",
            request.t2s_weights.display(),
            request.acoustic_weights.display(),
            request.device,
            request.precision
        );
        Ok(ToneEngine {
            device: request.device.clone(),
        })
    }
}

fn scratch_preset(dir: &Path) -> Result<VoicePreset, Box<dyn std::error::Error>> {
    let preset = VoicePreset::new(
        "scratch",
        dir.join("scratch-e15.ckpt"),
        dir.join("scratch_e8_s400.pth"),
        dir.join("neutral.wav"),
        "你好。",
    );
    std::fs::write(&preset.t2s_weights, b"")?;
    std::fs::write(&preset.acoustic_weights, b"")?;
    SynthesisResult {
        samples: vec![0.0; 4_800],
        sample_rate: SAMPLE_RATE,
    }
    .write_wav(&preset.ref_audio)?;
    Ok(preset)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let book_path = PathBuf::from(args.next().ok_or("usage: narrate <book> [preset] [config]")?);
    let preset_path = args.next().map(PathBuf::from);
    let config = match args.next() {
        Some(path) => AudiobookConfig::from_file(Path::new(&path))?,
        None => AudiobookConfig::default(),
    };

    let scratch = tempfile::tempdir()?;
    let preset = match preset_path {
        Some(path) => VoicePreset::from_json_file(&path)?,
        None => scratch_preset(scratch.path())?,
    };

    let text = decode_document(&book_path)?;
    let segmenter = Segmenter::new(config.text.clone());
    let chunks = segmenter.prepare_chunks(&text, |p| log::debug!("Segmenting: {p}%"));
    println!("{} chunks from {}", chunks.len(), book_path.display());

    let cache = Arc::new(ModelCache::new(ToneLoader, config.cache.clone())?);
    let mut narrator = Narrator::new(Arc::clone(&cache), config.output.clone());
    narrator.set_preset(preset)?;

    let start = Instant::now();
    let book = narrator.generate_book_with_progress(&chunks, &book_path, |done, total| {
        println!("[{done}/{total}]");
    })?;
    println!(
        "Wrote {} segments and {} in {:.2?}",
        book.segments.len(),
        book.merged.display(),
        start.elapsed()
    );

    println!("{}", serde_json::to_string_pretty(&narrator.cache_stats())?);
    Ok(())
}

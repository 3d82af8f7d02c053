//! WAV loading and concatenation for segment merging.

use std::path::Path;

use crate::error::AudiobookError;
use crate::SynthesisResult;

/// Load a WAV file as mono f32 samples.
///
/// Integer formats are scaled to `[-1.0, 1.0)`; multi-channel audio is
/// averaged down to one channel.
pub fn read_wav(path: &Path) -> Result<SynthesisResult, AudiobookError> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        samples
    };

    Ok(SynthesisResult {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Join waveforms end to end in the given order.
pub fn concat(waveforms: &[SynthesisResult]) -> Vec<f32> {
    let total = waveforms.iter().map(|w| w.samples.len()).sum();
    let mut samples = Vec::with_capacity(total);
    for waveform in waveforms {
        samples.extend_from_slice(&waveform.samples);
    }
    samples
}

/// Concatenate WAV files into one file written at `sample_rate`.
///
/// Inputs are not resampled; a file whose rate differs from `sample_rate`
/// is logged and appended as-is.
pub fn merge_wav_files<P: AsRef<Path>>(
    files: &[P],
    output: &Path,
    sample_rate: u32,
) -> Result<SynthesisResult, AudiobookError> {
    if files.is_empty() {
        return Err(AudiobookError::NothingToMerge);
    }

    let mut waveforms = Vec::with_capacity(files.len());
    for file in files {
        let file = file.as_ref();
        let waveform = read_wav(file)?;
        if waveform.sample_rate != sample_rate {
            log::warn!(
                "{} is {} Hz, merged output is written at {} Hz without resampling",
                file.display(),
                waveform.sample_rate,
                sample_rate
            );
        }
        waveforms.push(waveform);
    }

    let merged = SynthesisResult {
        samples: concat(&waveforms),
        sample_rate,
    };
    merged.write_wav(output)?;
    log::info!(
        "Merged {} files into {} ({:.1}s)",
        files.len(),
        output.display(),
        merged.duration_secs()
    );
    Ok(merged)
}

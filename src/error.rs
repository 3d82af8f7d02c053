use std::path::PathBuf;

/// Boxed error returned by external collaborators (engines, loaders, decoders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to produce a ready synthesis engine for a weight-file pair.
///
/// The cache never inserts a partial entry when this is returned.
#[derive(thiserror::Error, Debug)]
pub enum ModelLoadError {
    #[error("Weight file not found: {}", .0.display())]
    MissingWeights(PathBuf),
    #[error("Failed to build engine for '{key}': {source}")]
    Build {
        key: String,
        #[source]
        source: BoxError,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum AudiobookError {
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    #[error("Unsupported document format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Unsupported split method '{0}'. Expected one of cut0..cut5.")]
    UnsupportedMethod(String),
    #[error("Synthesis failed for chunk {chunk}: {source}")]
    Synthesis {
        chunk: usize,
        #[source]
        source: BoxError,
    },
    #[error("Engine produced no audio for chunk {chunk}")]
    NoAudio { chunk: usize },
    #[error("No text chunks to narrate")]
    EmptyBook,
    #[error("No audio files to merge")]
    NothingToMerge,
    #[error("No voice preset is active. Call set_preset() first.")]
    NoPreset,
    #[error("Reference audio not found: {}", .0.display())]
    MissingReferenceAudio(PathBuf),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Book text segmentation.
//!
//! Turns decoded book text into an ordered list of bounded chunks, each the
//! unit of work for one synthesis call:
//!
//! 1. table-of-contents lines are dropped ([`toc`])
//! 2. whitespace is normalized, CJK-aware ([`normalize`])
//! 3. the passage is chunked, either by running length with sentence-boundary
//!    preference ([`chunker`]) or by one of the fixed `cut0`..`cut5` methods ([`split`])
//!
//! Chunks are plain `String`s. Dialogue attribution ([`speakers`]) is an
//! optional pass over individual chunks.
//!
//! # Example
//!
//! ```rust
//! use audiobook_rs::text::{segment, split, SplitMethod};
//!
//! let chunks = segment("目录\n第一章 开端 12\n天亮了。鸟叫了。", 5000, None);
//! assert_eq!(chunks, vec!["天亮了。鸟叫了。"]);
//!
//! let windows = split(&"x".repeat(120), SplitMethod::FixedWindow);
//! assert_eq!(windows.len(), 3);
//! ```

pub mod chunker;
pub mod normalize;
pub mod segmenter;
pub mod speakers;
pub mod split;
pub mod toc;

pub use chunker::chunk_by_length;
pub use normalize::{normalize, strip_latin, SENTENCE_ENDS};
pub use segmenter::{Segmenter, SegmenterConfig};
pub use speakers::{extract_speakers, Speaker, SpeakerLine, NARRATOR};
pub use split::{split, split_by_name, SplitMethod};
pub use toc::{is_toc_line, strip_toc};

/// Drop table-of-contents lines and normalize what remains into one passage.
pub fn prepare(text: &str) -> String {
    normalize(&strip_toc(text))
}

/// Prepare `text` and split it into chunks.
///
/// `method: None` uses running-length chunking bounded by `batch_size`; a
/// fixed method ignores `batch_size`.
pub fn segment(text: &str, batch_size: usize, method: Option<SplitMethod>) -> Vec<String> {
    segment_with_progress(text, batch_size, method, |_| {})
}

/// [`segment`] with chunking progress reported as non-decreasing percentages in `0..=99`.
pub fn segment_with_progress(
    text: &str,
    batch_size: usize,
    method: Option<SplitMethod>,
    mut progress: impl FnMut(u8),
) -> Vec<String> {
    let prepared = prepare(text);
    match method {
        None => chunk_by_length(&prepared, batch_size, progress),
        Some(method) => {
            let chunks = split(&prepared, method);
            progress(99);
            chunks
        }
    }
}

//! Running-length chunking with sentence-boundary preference.

use super::normalize::SENTENCE_ENDS;

/// CJK full stop.
const FULL_STOP: char = '。';

/// Closing quotation marks that may directly follow a full stop.
const CLOSING_QUOTES: &[char] = &['\u{201d}', '」', '』'];

/// Split prepared text into chunks of at most `batch_size` characters.
///
/// Each chunk ends, in order of preference, after a full stop followed by a
/// closing quote, after a bare full stop, or after any sentence-ending
/// character found in the last `batch_size` characters. When none is found
/// the chunk is cut hard at `batch_size` characters. Chunks concatenate back
/// to the input exactly.
///
/// `progress` receives non-decreasing percentages in `0..=99`, one per chunk.
pub fn chunk_by_length(
    text: &str,
    batch_size: usize,
    mut progress: impl FnMut(u8),
) -> Vec<String> {
    let batch_size = batch_size.max(1);
    let chars: Vec<char> = text.chars().collect();

    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() <= batch_size {
        progress(99);
        return vec![text.to_string()];
    }

    let estimated = (chars.len() / batch_size).max(1);
    let mut chunks = Vec::with_capacity(estimated + 1);
    let mut start = 0;

    while start < chars.len() {
        progress((chunks.len() * 99 / estimated).min(99) as u8);

        let ideal_end = start + batch_size;
        if ideal_end >= chars.len() {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        let last = find_break(&chars, start, ideal_end).unwrap_or(ideal_end - 1);
        chunks.push(chars[start..=last].iter().collect());
        start = last + 1;
    }

    log::debug!(
        "Chunked {} chars into {} chunks (batch size {batch_size})",
        chars.len(),
        chunks.len()
    );
    chunks
}

/// Index of the last character of the chunk starting at `start`, searching
/// backwards from `ideal_end - 1` down to (not including) `start`.
fn find_break(chars: &[char], start: usize, ideal_end: usize) -> Option<usize> {
    let window = || (start + 1..ideal_end).rev();

    window()
        .find(|&i| {
            chars[i] == FULL_STOP && i + 1 < ideal_end && CLOSING_QUOTES.contains(&chars[i + 1])
        })
        .map(|i| i + 1)
        .or_else(|| window().find(|&i| chars[i] == FULL_STOP))
        .or_else(|| window().find(|&i| SENTENCE_ENDS.contains(&chars[i])))
}

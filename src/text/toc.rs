//! Table-of-contents filtering.
//!
//! Front matter such as "Contents", chapter listings with page numbers and
//! blank lines would otherwise be read aloud, so those lines are dropped
//! before chunking.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lines shorter than this that end in a page number are treated as TOC entries.
const MAX_TOC_LABEL_CHARS: usize = 50;

static PAGE_NUMBER_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".+\s+\d+\s*$").expect("page number pattern is valid"));

static TOC_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^目\s*录\s*$|^contents\s*$|^catalog\s*$|^index\s*$|第.{1,10}章.*?\d+\s*$|chapter.*?\d+\s*$|第.{1,10}节.*?\d+\s*$|section.*?\d+\s*$",
    )
    .expect("toc marker pattern is valid")
});

/// Whether a line looks like table-of-contents material.
pub fn is_toc_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return true;
    }

    if line.chars().count() < MAX_TOC_LABEL_CHARS && PAGE_NUMBER_SUFFIX.is_match(line) {
        return true;
    }

    TOC_MARKERS.is_match(line)
}

/// Drop TOC lines, keeping the remaining lines trimmed and newline-separated.
pub fn strip_toc(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !is_toc_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

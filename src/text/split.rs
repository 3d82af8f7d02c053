//! Fixed split methods (`cut0`..`cut5`).
//!
//! These mirror the split method names understood by the synthesis engine,
//! so the same identifier can be used both to pre-split book text and as the
//! engine's own chunking hint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AudiobookError;

/// Sentence delimiters used when grouping sentences (`cut1`).
const GROUP_DELIMITERS: &[char] = &['。', '！', '？', '；', '.', '!', '?', ';'];

/// Full punctuation set used by `cut5`.
pub const ALL_PUNCTUATION: &[char] = &[
    '，', '。', '！', '？', '；', '：', '、', '…', ',', '.', '!', '?', ';', ':',
];

/// Sentences per chunk for `cut1`.
const SENTENCES_PER_GROUP: usize = 4;

/// Window size for `cut2`.
const FIXED_WINDOW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitMethod {
    /// `cut0`: no split.
    #[serde(rename = "cut0")]
    NoSplit,
    /// `cut1`: every four sentences.
    #[default]
    #[serde(rename = "cut1")]
    FourSentences,
    /// `cut2`: fixed 50-character windows.
    #[serde(rename = "cut2")]
    FixedWindow,
    /// `cut3`: on CJK full stops.
    #[serde(rename = "cut3")]
    CjkFullStop,
    /// `cut4`: on ASCII full stops.
    #[serde(rename = "cut4")]
    AsciiFullStop,
    /// `cut5`: on any punctuation.
    #[serde(rename = "cut5")]
    Punctuation,
}

impl SplitMethod {
    pub const ALL: [SplitMethod; 6] = [
        SplitMethod::NoSplit,
        SplitMethod::FourSentences,
        SplitMethod::FixedWindow,
        SplitMethod::CjkFullStop,
        SplitMethod::AsciiFullStop,
        SplitMethod::Punctuation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMethod::NoSplit => "cut0",
            SplitMethod::FourSentences => "cut1",
            SplitMethod::FixedWindow => "cut2",
            SplitMethod::CjkFullStop => "cut3",
            SplitMethod::AsciiFullStop => "cut4",
            SplitMethod::Punctuation => "cut5",
        }
    }
}

impl FromStr for SplitMethod {
    type Err = AudiobookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        SplitMethod::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| AudiobookError::UnsupportedMethod(s.to_string()))
    }
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `text` with a fixed method.
pub fn split(text: &str, method: SplitMethod) -> Vec<String> {
    match method {
        SplitMethod::NoSplit => vec![text.to_string()],
        SplitMethod::FourSentences => {
            let sentences: Vec<&str> = text
                .split(GROUP_DELIMITERS)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            sentences
                .chunks(SENTENCES_PER_GROUP)
                .map(|group| format!("{}。", group.join("。")))
                .collect()
        }
        SplitMethod::FixedWindow => {
            let chars: Vec<char> = text.chars().collect();
            chars
                .chunks(FIXED_WINDOW_CHARS)
                .map(|window| window.iter().collect())
                .collect()
        }
        SplitMethod::CjkFullStop => terminated_pieces(text, &['。'], '。'),
        SplitMethod::AsciiFullStop => terminated_pieces(text, &['.'], '.'),
        SplitMethod::Punctuation => terminated_pieces(text, ALL_PUNCTUATION, '。'),
    }
}

/// Split by method name, failing on unknown identifiers.
pub fn split_by_name(text: &str, method: &str) -> Result<Vec<String>, AudiobookError> {
    Ok(split(text, method.parse()?))
}

fn terminated_pieces(text: &str, delimiters: &[char], terminator: char) -> Vec<String> {
    text.split(delimiters)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| format!("{piece}{terminator}"))
        .collect()
}

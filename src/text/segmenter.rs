//! Configured end-to-end text preparation.

use serde::{Deserialize, Serialize};

use super::chunker::chunk_by_length;
use super::normalize::{normalize, strip_latin};
use super::speakers::{extract_speakers, SpeakerLine};
use super::split::{split, SplitMethod};
use super::prepare;
use super::toc::strip_toc;
use crate::error::AudiobookError;

/// Smallest batch size honoured; anything lower falls back to the default.
pub const MIN_BATCH_SIZE: usize = 100;

/// Parameters for turning decoded book text into chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmenterConfig {
    /// Target chunk length in characters (default: 5000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Fixed split method. `None` (default) uses running-length chunking.
    #[serde(default)]
    pub split_method: Option<SplitMethod>,

    /// Remove Latin-script words and annotations before chunking (default: false).
    ///
    /// Off by default so mixed-language books keep their English. Turn it on
    /// for voices that can only read Chinese, where stripping was historically
    /// the default.
    #[serde(default)]
    pub strip_latin: bool,

    /// Inputs with fewer non-whitespace characters produce no chunks (default: 10).
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

fn default_batch_size() -> usize {
    5000
}

fn default_min_text_chars() -> usize {
    10
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            split_method: None,
            strip_latin: false,
            min_text_chars: default_min_text_chars(),
        }
    }
}

impl SegmenterConfig {
    /// Batch size actually used for chunking.
    pub fn effective_batch_size(&self) -> usize {
        if self.batch_size < MIN_BATCH_SIZE {
            default_batch_size()
        } else {
            self.batch_size
        }
    }

    pub fn validate(&self) -> Result<(), AudiobookError> {
        if self.batch_size == 0 {
            return Err(AudiobookError::InvalidConfig(
                "text.batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Text segmenter holding a [`SegmenterConfig`].
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Prepare and chunk a whole book.
    ///
    /// Table-of-contents lines are dropped first, then Latin text is
    /// optionally stripped and the result normalized. Progress runs 0..=100:
    /// 30 once the text is prepared, the chunking phase maps onto 30..=99,
    /// and 100 on return.
    pub fn prepare_chunks(&self, text: &str, mut progress: impl FnMut(u8)) -> Vec<String> {
        if significant_chars(text) < self.config.min_text_chars {
            log::warn!(
                "Input has fewer than {} characters, nothing to narrate",
                self.config.min_text_chars
            );
            progress(100);
            return Vec::new();
        }

        let body = strip_toc(text);
        let prepared = if self.config.strip_latin {
            let stripped = strip_latin(&body);
            if significant_chars(&stripped) < self.config.min_text_chars {
                log::warn!("Stripping Latin text left too little content, keeping it");
                normalize(&body)
            } else {
                stripped
            }
        } else {
            normalize(&body)
        };
        progress(30);

        let batch_size = self.config.effective_batch_size();
        let chunks = match self.config.split_method {
            None => chunk_by_length(&prepared, batch_size, |p| {
                progress(30 + (u16::from(p) * 69 / 99) as u8)
            }),
            Some(method) => split(&prepared, method),
        };

        log::info!(
            "Prepared {} chunks ({} method, batch size {batch_size})",
            chunks.len(),
            self.config
                .split_method
                .map_or("running-length", |m| m.as_str()),
        );
        progress(100);
        chunks
    }

    /// Chunk already-prepared text without TOC filtering or normalization.
    pub fn chunk(&self, prepared: &str) -> Vec<String> {
        match self.config.split_method {
            None => chunk_by_length(prepared, self.config.effective_batch_size(), |_| {}),
            Some(method) => split(prepared, method),
        }
    }

    /// Prepare text, chunk it, and attribute each chunk's lines to speakers.
    pub fn speaker_lines(&self, text: &str) -> Vec<SpeakerLine> {
        self.chunk(&prepare(text))
            .iter()
            .flat_map(|chunk| extract_speakers(chunk))
            .collect()
    }
}

fn significant_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Speaker;

    #[test]
    fn tiny_batch_sizes_fall_back_to_default() {
        let config = SegmenterConfig {
            batch_size: 20,
            ..SegmenterConfig::default()
        };
        assert_eq!(config.effective_batch_size(), 5000);
        assert!(config.validate().is_ok());

        let zero = SegmenterConfig {
            batch_size: 0,
            ..SegmenterConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn short_input_yields_no_chunks() {
        let segmenter = Segmenter::default();
        let mut last = 0;
        assert!(segmenter.prepare_chunks("太短了", |p| last = p).is_empty());
        assert_eq!(last, 100);
    }

    #[test]
    fn prepare_chunks_filters_toc_and_respects_batch_size() {
        let segmenter = Segmenter::new(SegmenterConfig {
            batch_size: 100,
            ..SegmenterConfig::default()
        });
        let body = "风从山谷里吹过来，带着潮湿的气息。".repeat(20);
        let text = format!("目录\n第一章 开端 1\n{body}");

        let mut progress = Vec::new();
        let chunks = segmenter.prepare_chunks(&text, |p| progress.push(p));

        assert_eq!(chunks.concat(), body);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert!(chunks.iter().all(|c| c.ends_with('。')));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.first(), Some(&30));
        assert_eq!(progress.last(), Some(&100));
    }

    #[test]
    fn strip_latin_keeps_original_when_nothing_would_remain() {
        let segmenter = Segmenter::new(SegmenterConfig {
            strip_latin: true,
            ..SegmenterConfig::default()
        });
        let chunks = segmenter.prepare_chunks("An English only paragraph.", |_| {});
        assert_eq!(chunks, vec!["An English only paragraph."]);

        let chunks = segmenter.prepare_chunks("他打开了电脑（computer），开始工作了很久。", |_| {});
        assert_eq!(chunks, vec!["他打开了电脑，开始工作了很久。"]);
    }

    #[test]
    fn strip_latin_runs_after_toc_filtering() {
        let text = "目录\n第一章 开端 12\n第二章 远行 15\n天亮了，鸟儿（birds）在窗外歌唱，他推开门走了出去。";
        let plain = Segmenter::default();
        let stripping = Segmenter::new(SegmenterConfig {
            strip_latin: true,
            ..SegmenterConfig::default()
        });

        assert_eq!(
            stripping.prepare_chunks(text, |_| {}),
            vec!["天亮了，鸟儿在窗外歌唱，他推开门走了出去。"]
        );
        assert_eq!(plain.prepare_chunks(text, |_| {}).len(), 1);
    }

    #[test]
    fn strip_latin_keeps_book_ending_in_digits() {
        let text = "第一章 开端\n清晨，他一路数着台阶，从山脚一直数到山顶，风吹过松林，鸟在头顶盘旋，天色渐渐暗了下来，最后他数到了 100";
        let stripping = Segmenter::new(SegmenterConfig {
            strip_latin: true,
            ..SegmenterConfig::default()
        });

        let chunks = stripping.prepare_chunks(text, |_| {});
        assert_eq!(chunks, Segmenter::default().prepare_chunks(text, |_| {}));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("第一章开端清晨"));
        assert!(chunks[0].ends_with("100"));
    }

    #[test]
    fn fixed_method_is_used_when_configured() {
        let segmenter = Segmenter::new(SegmenterConfig {
            split_method: Some(SplitMethod::CjkFullStop),
            ..SegmenterConfig::default()
        });
        assert_eq!(
            segmenter.prepare_chunks("第一句话在这里。第二句话在那里。", |_| {}),
            vec!["第一句话在这里。", "第二句话在那里。"]
        );
    }

    #[test]
    fn speaker_lines_cover_every_chunk() {
        let segmenter = Segmenter::default();
        let lines = segmenter.speaker_lines("夜深了。\n张三：“睡吧。”\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].speaker, Speaker::Narrator);
        assert_eq!(lines[1].speaker, Speaker::Named("张三".to_string()));
    }
}

//! Multi-speaker attribution for dialogue-heavy chunks.
//!
//! Recognizes `label：“dialogue”` (and the ASCII `label: "dialogue"` form),
//! attributing everything else to the narrator. Malformed or unbalanced
//! quoting simply stays with the narrator.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Name used for narration in rendered output.
pub const NARRATOR: &str = "narrator";

static DIALOGUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)([^\s：:“”"「」『』。！？!?，,；;]{1,16}?)(?:说道)?[：:]\s*[“"「『](.*?)[”"」』]"#,
    )
    .expect("dialogue pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Speaker {
    Narrator,
    Named(String),
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Narrator => f.write_str(NARRATOR),
            Speaker::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerLine {
    pub speaker: Speaker,
    pub text: String,
}

impl SpeakerLine {
    fn narrator(text: &str) -> Option<Self> {
        let text = text.trim();
        (!text.is_empty()).then(|| Self {
            speaker: Speaker::Narrator,
            text: text.to_string(),
        })
    }
}

/// Split a chunk into ordered (speaker, text) lines.
pub fn extract_speakers(text: &str) -> Vec<SpeakerLine> {
    let mut lines = Vec::new();
    let mut last_end = 0;

    for caps in DIALOGUE.captures_iter(text) {
        let (Some(whole), Some(label), Some(content)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };

        lines.extend(SpeakerLine::narrator(&text[last_end..whole.start()]));

        let (speaker, content) = (label.as_str().trim(), content.as_str().trim());
        if !speaker.is_empty() && !content.is_empty() {
            lines.push(SpeakerLine {
                speaker: Speaker::Named(speaker.to_string()),
                text: content.to_string(),
            });
        }
        last_end = whole.end();
    }

    lines.extend(SpeakerLine::narrator(&text[last_end..]));
    lines
}

//! Whitespace and punctuation cleanup for decoded book text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that end a sentence for chunking purposes.
pub const SENTENCE_ENDS: &[char] = &['。', '！', '？', '…', '.', '!', '?', ';', '；'];

/// CJK punctuation that never carries surrounding spaces.
pub const CJK_PUNCTUATION: &[char] = &['，', '。', '！', '？', '；', '：', '、'];

static QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(["“”'‘’])\s+(.+?)\s+(["“”'‘’])"#).expect("quote pattern is valid")
});

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([（(])\s+(.+?)\s+([）)])").expect("bracket pattern is valid"));

static LATIN_IN_BRACKETS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[(（]([^）)]*[a-zA-Z]+[^）)]*)[）)]").expect("bracket pattern is valid")
});

static LATIN_IN_QUOTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[“"《]([^”"》]*[a-zA-Z]+[^”"》]*)[”"》]"#).expect("quote pattern is valid")
});

static LATIN_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z]+").expect("latin pattern is valid"));

/// CJK Unified Ideographs block.
pub fn is_cjk(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&ch)
}

pub fn is_cjk_punctuation(ch: char) -> bool {
    CJK_PUNCTUATION.contains(&ch)
}

/// Normalize whitespace so the text reads as one continuous passage.
///
/// - runs of whitespace (newlines included) collapse to one space
/// - spaces between two CJK characters are removed
/// - spaces next to CJK punctuation are removed
/// - spaces just inside quotation marks and brackets are removed
pub fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = collapsed.chars().collect();

    let mut joined = String::with_capacity(collapsed.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch == ' ' {
            let prev = chars[..i].last().copied();
            let next = chars.get(i + 1).copied();
            if drop_space(prev, next) {
                continue;
            }
        }
        joined.push(ch);
    }

    let unquoted = QUOTED.replace_all(&joined, "$1$2$3");
    let unbracketed = BRACKETED.replace_all(&unquoted, "$1$2$3");
    unbracketed.trim().to_string()
}

fn drop_space(prev: Option<char>, next: Option<char>) -> bool {
    match (prev, next) {
        (Some(p), Some(n)) if is_cjk(p) && is_cjk(n) => true,
        (Some(p), _) if is_cjk_punctuation(p) => true,
        (_, Some(n)) if is_cjk_punctuation(n) => true,
        _ => false,
    }
}

/// Remove Latin-script content: bracketed or quoted spans containing Latin
/// letters first, then any remaining Latin letters. Digits are kept.
pub fn strip_latin(text: &str) -> String {
    let text = LATIN_IN_BRACKETS.replace_all(text, "");
    let text = LATIN_IN_QUOTES.replace_all(&text, "");
    let text = LATIN_WORD.replace_all(&text, "");
    normalize(&text)
}

//! Book file decoding.
//!
//! Plain text is passed through untouched. EPUB support is behind the `epub`
//! feature: spine items are read in order, converted from HTML to text and
//! normalized one by one.

use std::path::Path;

use crate::error::AudiobookError;

/// Turns a book file into plain text.
pub trait DocumentDecoder {
    /// Lowercase file extensions handled, without the dot.
    fn extensions(&self) -> &[&str];

    fn decode(&self, path: &Path) -> Result<String, AudiobookError>;

    fn handles(&self, path: &Path) -> bool {
        extension(path).is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }
}

/// `.txt` files, read as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextDecoder;

impl DocumentDecoder for PlainTextDecoder {
    fn extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn decode(&self, path: &Path) -> Result<String, AudiobookError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(feature = "epub")]
pub use self::epub_decoder::EpubDecoder;

#[cfg(feature = "epub")]
mod epub_decoder {
    use std::path::Path;

    use epub::doc::EpubDoc;

    use super::DocumentDecoder;
    use crate::error::AudiobookError;
    use crate::text::normalize;

    /// Line width handed to the HTML renderer; lines are re-joined by normalization.
    const HTML_WRAP_WIDTH: usize = 120;

    /// `.epub` files, read in spine order.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct EpubDecoder;

    impl DocumentDecoder for EpubDecoder {
        fn extensions(&self) -> &[&str] {
            &["epub"]
        }

        fn decode(&self, path: &Path) -> Result<String, AudiobookError> {
            let mut doc = EpubDoc::new(path).map_err(|e| AudiobookError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

            let mut items = Vec::new();
            loop {
                if let Some((html, _mime)) = doc.get_current_str() {
                    let text = normalize(&html2text::from_read(html.as_bytes(), HTML_WRAP_WIDTH));
                    if !text.is_empty() {
                        items.push(text);
                    }
                }
                if !doc.go_next() {
                    break;
                }
            }

            if items.is_empty() {
                return Err(AudiobookError::Decode {
                    path: path.to_path_buf(),
                    reason: "no text content".to_string(),
                });
            }
            log::info!("Decoded {} items from {}", items.len(), path.display());
            Ok(items.join("\n"))
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Decode a book file with the built-in decoders.
pub fn decode_document(path: &Path) -> Result<String, AudiobookError> {
    decode_document_with(path, &[])
}

/// Decode a book file, trying `decoders` before the built-in ones.
///
/// Fails with [`AudiobookError::UnsupportedFormat`] before touching the file
/// when no decoder handles its extension.
pub fn decode_document_with(
    path: &Path,
    decoders: &[&dyn DocumentDecoder],
) -> Result<String, AudiobookError> {
    #[allow(unused_mut)]
    let mut builtin: Vec<&dyn DocumentDecoder> = vec![&PlainTextDecoder];
    #[cfg(feature = "epub")]
    builtin.push(&EpubDecoder);

    let decoder = decoders
        .iter()
        .chain(builtin.iter())
        .find(|d| d.handles(path))
        .ok_or_else(|| AudiobookError::UnsupportedFormat(path.to_path_buf()))?;

    log::debug!("Decoding {}", path.display());
    decoder.decode(path)
}

//! Plain text sources

use ojt_core::{ExtractionMethod, ExtractionResult};
use tracing::debug;

use crate::{ExtractError, Result};

/// Decode raw bytes to text, returning the encoding that was used.
///
/// A byte order mark wins, then UTF-8, then Windows-1252 as a lossy last
/// resort.
pub fn decode_text(content: &[u8]) -> (String, &'static str) {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(content) {
        let (decoded, _) = encoding.decode_without_bom_handling(&content[bom_len..]);
        return (decoded.into_owned(), encoding.name());
    }

    match std::str::from_utf8(content) {
        Ok(s) => (s.to_string(), "UTF-8"),
        Err(_) => {
            let (decoded, actual_encoding, had_errors) = encoding_rs::WINDOWS_1252.decode(content);
            if had_errors {
                (decoded.into_owned(), "windows-1252-lossy")
            } else {
                (decoded.into_owned(), actual_encoding.name())
            }
        }
    }
}

/// Normalize free text supplied by the caller. Line structure is kept so the
/// splitter can still see paragraphs.
pub fn extract_plain(text: &str) -> Result<ExtractionResult> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = normalized.trim();

    if trimmed.is_empty() {
        return Err(ExtractError::InvalidInput("text source is empty".to_string()));
    }

    debug!(chars = trimmed.chars().count(), "Accepted plain text");
    Ok(ExtractionResult::truncated(
        trimmed,
        usize::MAX,
        ExtractionMethod::Plain,
    ))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker carried by the question text of every placeholder quiz item.
pub const PLACEHOLDER_MARKER: &str = "[auto]";

/// Title of the single section held by a fallback document.
pub const FALLBACK_SECTION_TITLE: &str = "Original content";

/// A source handed to the ingestor. Consumed once per ingestion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawSource {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Url {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Pdf {
        #[serde(skip)]
        file: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

impl RawSource {
    pub fn text(text: impl Into<String>) -> Self {
        RawSource::Text {
            text: text.into(),
            title: None,
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        RawSource::Url {
            url: url.into(),
            title: None,
        }
    }

    pub fn pdf(file: Vec<u8>, filename: Option<String>) -> Self {
        RawSource::Pdf {
            file,
            filename,
            mime: None,
            title: None,
        }
    }

    pub fn with_title(mut self, new_title: impl Into<String>) -> Self {
        match &mut self {
            RawSource::Text { title, .. }
            | RawSource::Url { title, .. }
            | RawSource::Pdf { title, .. } => *title = Some(new_title.into()),
        }
        self
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            RawSource::Text { title, .. }
            | RawSource::Url { title, .. }
            | RawSource::Pdf { title, .. } => title.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RawSource::Text { .. } => "text",
            RawSource::Url { .. } => "url",
            RawSource::Pdf { .. } => "pdf",
        }
    }
}

/// How the text of an [`ExtractionResult`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Free text supplied directly by the caller
    Plain,
    /// Markup stripped from a fetched web page
    Html,
    /// Text embedded in the PDF content streams
    TextLayer,
    /// Optical character recognition over rendered pages (lower confidence)
    Ocr,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Plain => "plain",
            ExtractionMethod::Html => "html",
            ExtractionMethod::TextLayer => "text-layer",
            ExtractionMethod::Ocr => "ocr",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page-level metadata scraped from `<title>` and Open Graph tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.site_name.is_none()
    }
}

/// Normalized text produced by one of the extractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub text: String,
    pub original_length: usize,
    pub extracted_length: usize,
    pub was_truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
    pub method: ExtractionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    /// Builds a result from full text, truncating it to `max_chars`.
    ///
    /// Lengths are counted in chars, so multi-byte scripts such as Hangul are
    /// never split mid-character.
    pub fn truncated(text: &str, max_chars: usize, method: ExtractionMethod) -> Self {
        let original_length = text.chars().count();
        let was_truncated = original_length > max_chars;
        let text: String = if was_truncated {
            text.chars().take(max_chars).collect()
        } else {
            text.to_string()
        };

        Self {
            extracted_length: original_length.min(max_chars),
            original_length,
            was_truncated,
            text,
            metadata: None,
            method,
            page_count: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: PageMetadata) -> Self {
        if !metadata.is_empty() {
            self.metadata = Some(metadata);
        }
        self
    }

    pub fn with_page_count(mut self, pages: usize) -> Self {
        self.page_count = Some(pages);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// One titled block of a generated document. `content` holds sanitized markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
}

impl Section {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A multiple-choice question.
///
/// After normalization `options` has exactly four pairwise distinct entries
/// and `correct_index` points into it. Pools read back from storage may break
/// that, which is what the validator reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    /// `options[correct_index]`, for consumers that compare answers by value
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub is_placeholder: bool,
}

impl QuizItem {
    pub fn new(question: impl Into<String>, options: Vec<String>, correct_index: usize) -> Self {
        let answer = options.get(correct_index).cloned().unwrap_or_default();
        Self {
            question: question.into(),
            options,
            correct_index,
            answer,
            is_placeholder: false,
        }
    }

    /// True when the item was inserted only to reach the pool size.
    pub fn is_placeholder_item(&self) -> bool {
        self.is_placeholder || self.question.trim_start().starts_with(PLACEHOLDER_MARKER)
    }
}

/// Ordered quiz items of one document.
pub type QuizPool = Vec<QuizItem>;

/// The document produced for one step of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    pub title: String,
    pub team: String,
    pub sections: Vec<Section>,
    pub quiz: QuizPool,
    /// 1-based step number within the source
    pub step: usize,
    /// False iff this is the raw-content fallback
    pub ai_processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_error: Option<String>,
    /// Set when the fallback was produced by an explicit user abort
    #[serde(default)]
    pub user_initiated: bool,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedDocument {
    pub fn is_fallback(&self) -> bool {
        !self.ai_processed
    }
}

/// Counters of a [`QuizValidationReport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub total: usize,
    pub placeholders: usize,
    pub short_questions: usize,
    pub duplicates: usize,
    pub valid_count: usize,
}

/// Quality report derived from a quiz pool. Recomputed on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizValidationReport {
    pub valid: bool,
    pub issues: Vec<String>,
    pub stats: QuizStats,
    /// Non-placeholder items with at least one issue
    #[serde(default)]
    pub flagged_indices: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncation_law() {
        let result = ExtractionResult::truncated("가나다라마바사", 3, ExtractionMethod::Html);
        assert_eq!(result.text, "가나다");
        assert_eq!(result.original_length, 7);
        assert_eq!(result.extracted_length, 3);
        assert!(result.was_truncated);

        let result = ExtractionResult::truncated("short", 10, ExtractionMethod::Plain);
        assert_eq!(result.text, "short");
        assert_eq!(result.extracted_length, 5);
        assert!(!result.was_truncated);

        let result = ExtractionResult::truncated("exact", 5, ExtractionMethod::Plain);
        assert!(!result.was_truncated);
        assert_eq!(result.extracted_length, 5);
    }

    #[test]
    fn test_extraction_method_serializes_kebab_case() {
        let json = serde_json::to_string(&ExtractionMethod::TextLayer).unwrap();
        assert_eq!(json, "\"text-layer\"");
        assert_eq!(ExtractionMethod::Ocr.to_string(), "ocr");
    }

    #[test]
    fn test_empty_metadata_is_dropped() {
        let result = ExtractionResult::truncated("x", 10, ExtractionMethod::Html)
            .with_metadata(PageMetadata::default());
        assert!(result.metadata.is_none());
    }

    #[test]
    fn test_raw_source_title() {
        let source = RawSource::url("https://example.com").with_title("Onboarding");
        assert_eq!(source.title(), Some("Onboarding"));
        assert_eq!(source.kind(), "url");
    }

    #[test]
    fn test_raw_source_deserializes_by_kind() {
        let source: RawSource =
            serde_json::from_str(r#"{"kind":"text","text":"hello"}"#).unwrap();
        assert_eq!(source, RawSource::text("hello"));
    }

    #[test]
    fn test_placeholder_detected_by_marker() {
        let item = QuizItem::new("[auto] filler", vec!["a".into()], 0);
        assert!(!item.is_placeholder);
        assert!(item.is_placeholder_item());
    }

    #[test]
    fn test_quiz_item_serializes_camel_case() {
        let item = QuizItem::new("Q?", vec!["a".into(), "b".into()], 1);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["correctIndex"], 1);
        assert_eq!(value["answer"], "b");
        assert_eq!(value["isPlaceholder"], false);
    }
}

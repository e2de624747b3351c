//! HTML to plain text
//!
//! Script, style and noscript blocks are removed before the document is
//! parsed, so their contents never count as page text.

use ojt_core::{ExtractionConfig, ExtractionMethod, ExtractionResult, PageMetadata};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use crate::proxy::ProxyChain;
use crate::url_guard::check_url;
use crate::{ExtractError, Result};

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static NOSCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<noscript\b[^>]*>.*?</noscript\s*>").expect("valid regex"));
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip markup from `html` and truncate the text to `max_chars`.
pub fn extract_html(html: &str, max_chars: usize) -> ExtractionResult {
    let text = html_to_text(html);
    let metadata = extract_metadata(html);

    debug!(chars = text.chars().count(), max_chars, "Extracted page text");

    ExtractionResult::truncated(&text, max_chars, ExtractionMethod::Html).with_metadata(metadata)
}

/// Visible body text with entities decoded and whitespace collapsed
pub fn html_to_text(html: &str) -> String {
    let cleaned = SCRIPT_BLOCK.replace_all(html, " ");
    let cleaned = STYLE_BLOCK.replace_all(&cleaned, " ");
    let cleaned = NOSCRIPT_BLOCK.replace_all(&cleaned, " ");
    let cleaned = COMMENT.replace_all(&cleaned, " ");

    let document = Html::parse_document(&cleaned);
    let raw = match first_element(&document, "body") {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => document.root_element().text().collect::<Vec<_>>().join(" "),
    };

    WHITESPACE.replace_all(&raw, " ").trim().to_string()
}

/// Title, description, image and site name; Open Graph wins over plain tags
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let title = meta_property(&document, "og:title").or_else(|| {
        first_element(&document, "title")
            .map(|el| collapse(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    });

    let description = meta_property(&document, "og:description")
        .or_else(|| first_attr(&document, "meta[name=\"description\"]", "content"));

    PageMetadata {
        title,
        description,
        image: meta_property(&document, "og:image"),
        site_name: meta_property(&document, "og:site_name"),
    }
}

fn meta_property(document: &Html, property: &str) -> Option<String> {
    first_attr(
        document,
        &format!("meta[property=\"{}\"]", property),
        "content",
    )
}

fn first_element<'a>(document: &'a Html, selector: &str) -> Option<scraper::ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let value = first_element(document, selector)?.value().attr(attr)?;
    let value = collapse(value);
    (!value.is_empty()).then_some(value)
}

fn collapse(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Fetches a guarded URL through the relay chain and extracts its text
pub struct UrlTextExtractor {
    relays: ProxyChain,
    max_chars: usize,
}

impl UrlTextExtractor {
    pub fn new(relays: ProxyChain, max_chars: usize) -> Self {
        Self { relays, max_chars }
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self::new(
            ProxyChain::from_config(config)?,
            config.url_max_chars,
        ))
    }

    #[instrument(skip(self))]
    pub async fn extract(&self, raw_url: &str) -> Result<ExtractionResult> {
        let url = check_url(raw_url)?;
        let (body, relay) = self.relays.fetch(&url).await?;

        let result = extract_html(&body, self.max_chars);
        if result.text.is_empty() {
            return Err(ExtractError::ExtractionFailed(format!(
                "page at {} contains no readable text",
                url
            )));
        }

        debug!(relay = %relay, chars = result.extracted_length, "URL extracted");
        Ok(result)
    }
}

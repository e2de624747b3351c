//! PDF text extraction
//!
//! The embedded text layer is tried first. When it is missing or too short
//! (scanned documents) the pages are rendered and run through OCR, and the OCR
//! output is only accepted when it does not look like noise.

use async_trait::async_trait;
use lopdf::Document;
use ojt_core::{ExtractionMethod, ExtractionResult, OcrConfig, PdfConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::ocr::{OcrHandle, PageRasterizer, PdftoppmRasterizer};
use crate::strategy::{Strategy, StrategyChain};
use crate::{ExtractError, Result};

const PDF_MIME: &str = "application/pdf";

/// Message reported when neither the text layer nor OCR produced usable text
pub const LOW_QUALITY_MESSAGE: &str =
    "could not extract text — low quality or unsupported format";

static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\f\v]+").expect("valid regex"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Reject inputs that are not a PDF or are too large, before any parsing.
pub fn validate_pdf(
    file: &[u8],
    filename: Option<&str>,
    mime: Option<&str>,
    max_bytes: usize,
) -> Result<()> {
    if file.is_empty() {
        return Err(ExtractError::InvalidInput("PDF file is empty".to_string()));
    }

    if file.len() > max_bytes {
        return Err(ExtractError::InvalidInput(format!(
            "PDF file too large: {} bytes (max {})",
            file.len(),
            max_bytes
        )));
    }

    let declared = mime.map(|m| m.trim().eq_ignore_ascii_case(PDF_MIME));
    let guessed = filename.map(|name| {
        mime_guess::from_path(name)
            .first()
            .map(|m| m.essence_str() == PDF_MIME)
            .unwrap_or(false)
    });

    let is_pdf = match (declared, guessed) {
        (Some(true), _) | (_, Some(true)) => true,
        (None, None) => file.starts_with(b"%PDF-"),
        _ => false,
    };

    if !is_pdf {
        return Err(ExtractError::InvalidInput(format!(
            "not a PDF file: {}",
            filename.or(mime).unwrap_or("unnamed upload")
        )));
    }

    Ok(())
}

/// Text embedded in the page content streams
pub struct TextLayerStrategy {
    config: PdfConfig,
}

impl TextLayerStrategy {
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Strategy<[u8], ExtractionResult> for TextLayerStrategy {
    fn name(&self) -> &str {
        "text-layer"
    }

    async fn attempt(&self, pdf: &[u8]) -> Result<ExtractionResult> {
        let bytes = pdf.to_vec();
        let max_pages = self.config.max_pages;

        let (text, page_count, failed_pages) =
            tokio::task::spawn_blocking(move || read_text_layer(&bytes, max_pages))
                .await
                .map_err(|e| ExtractError::Pdf(format!("text layer task failed: {}", e)))??;

        let chars = text.chars().count();
        debug!(chars, page_count, failed_pages, "Read PDF text layer");

        if chars < self.config.min_text_chars {
            return Err(ExtractError::ExtractionFailed(format!(
                "text layer has {} chars, fewer than {}",
                chars, self.config.min_text_chars
            )));
        }

        let mut result =
            ExtractionResult::truncated(&text, self.config.max_chars, ExtractionMethod::TextLayer)
                .with_page_count(page_count);
        if failed_pages > 0 {
            result = result.with_warning(format!("{} page(s) had unreadable text", failed_pages));
        }
        if page_count > max_pages {
            result = result.with_warning(format!("only the first {} pages were read", max_pages));
        }
        Ok(result)
    }
}

/// Returns the page texts joined by blank lines, the document's page count
/// and how many pages failed to decode.
fn read_text_layer(bytes: &[u8], max_pages: usize) -> Result<(String, usize, usize)> {
    let document =
        Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(format!("failed to load PDF: {}", e)))?;
    let pages = document.get_pages();

    let mut texts = Vec::new();
    let mut failed = 0;

    for page_number in pages.keys().take(max_pages) {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                let page_text = page_text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !page_text.is_empty() {
                    texts.push(page_text);
                }
            }
            Err(_) => failed += 1,
        }
    }

    Ok((texts.join("\n\n"), pages.len(), failed))
}

/// Rendered pages run through OCR
pub struct OcrStrategy {
    config: OcrConfig,
    max_chars: usize,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<OcrHandle>,
}

impl OcrStrategy {
    pub fn new(
        config: OcrConfig,
        max_chars: usize,
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<OcrHandle>,
    ) -> Self {
        Self {
            config,
            max_chars,
            rasterizer,
            ocr,
        }
    }
}

#[async_trait]
impl Strategy<[u8], ExtractionResult> for OcrStrategy {
    fn name(&self) -> &str {
        "ocr"
    }

    async fn attempt(&self, pdf: &[u8]) -> Result<ExtractionResult> {
        let images = self
            .rasterizer
            .render_pages(pdf, self.config.max_pages, self.config.render_dpi())
            .await?;

        let mut pages = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let text = self.ocr.recognize(image).await?;
            debug!(page = index + 1, chars = text.chars().count(), "Recognized page");
            pages.push(text);
        }

        let text = normalize_ocr_text(&pages.join("\n\n"));
        if !passes_noise_filter(&text, self.config.min_chars, self.config.min_alnum_ratio) {
            return Err(ExtractError::ExtractionFailed(LOW_QUALITY_MESSAGE.to_string()));
        }

        Ok(
            ExtractionResult::truncated(&text, self.max_chars, ExtractionMethod::Ocr)
                .with_page_count(images.len())
                .with_warning("text recognized by OCR; accuracy may be lower"),
        )
    }
}

/// Collapse horizontal whitespace, trim lines and squeeze blank-line runs.
pub fn normalize_ocr_text(text: &str) -> String {
    let lines: Vec<String> = text
        .replace("\r\n", "\n")
        .lines()
        .map(|line| HORIZONTAL_SPACE.replace_all(line, " ").trim().to_string())
        .collect();

    BLANK_RUN.replace_all(&lines.join("\n"), "\n\n").trim().to_string()
}

/// Long enough, and enough letters or digits (Hangul counts) to be real text
pub fn passes_noise_filter(text: &str, min_chars: usize, min_ratio: f64) -> bool {
    let total = text.chars().count();
    if total == 0 || total < min_chars {
        return false;
    }

    let meaningful = text.chars().filter(|c| c.is_alphanumeric()).count();
    (meaningful as f64 / total as f64) > min_ratio
}

/// Text layer first, then OCR
pub struct PdfTextExtractor {
    max_file_bytes: usize,
    chain: StrategyChain<[u8], ExtractionResult>,
}

impl PdfTextExtractor {
    pub fn new(
        pdf: PdfConfig,
        ocr_config: OcrConfig,
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<OcrHandle>,
    ) -> Self {
        let max_file_bytes = pdf.max_file_bytes;
        let max_chars = pdf.max_chars;
        let chain = StrategyChain::new()
            .add(Arc::new(TextLayerStrategy::new(pdf)))
            .add(Arc::new(OcrStrategy::new(ocr_config, max_chars, rasterizer, ocr)));

        Self {
            max_file_bytes,
            chain,
        }
    }

    /// Extractor using `pdftoppm` for rendering and the shared OCR handle
    pub fn from_config(pdf: &PdfConfig, ocr_config: &OcrConfig, ocr: Arc<OcrHandle>) -> Self {
        Self::new(
            pdf.clone(),
            ocr_config.clone(),
            Arc::new(PdftoppmRasterizer::from_config(ocr_config)),
            ocr,
        )
    }

    #[instrument(skip(self, file), fields(bytes = file.len()))]
    pub async fn extract(
        &self,
        file: &[u8],
        filename: Option<&str>,
        mime: Option<&str>,
    ) -> Result<ExtractionResult> {
        validate_pdf(file, filename, mime, self.max_file_bytes)?;

        match self.chain.run(file).await {
            Ok((result, strategy)) => {
                debug!(strategy = %strategy, chars = result.extracted_length, "PDF extracted");
                Ok(result)
            }
            Err(ExtractError::Exhausted { last_error, .. }) => {
                warn!(error = %last_error, "No usable text in PDF");
                Err(ExtractError::ExtractionFailed(LOW_QUALITY_MESSAGE.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

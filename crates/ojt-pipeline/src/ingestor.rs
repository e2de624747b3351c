//! Source Ingestor
//!
//! Orchestrates one ingestion: validate, extract, plan and split, then
//! generate every step. Errors before generation are returned to the caller;
//! from generation on, problems are recorded on the documents instead.

use futures::stream::{self, StreamExt};
use ojt_core::{
    silent, ExtractionResult, GeneratedDocument, PipelineConfig, QuizValidationReport, RawSource,
    SharedProgress,
};
use ojt_extract::{
    check_url, extract_plain, plan_steps, split, validate_pdf, OcrEngineProvider, OcrHandle,
    PageRasterizer, PdfTextExtractor, PdftoppmRasterizer, UrlTextExtractor,
};
use ojt_generation::{
    engine_from_config, validate_pool, AiContentGenerator, GenerationEngine, GenerationRequest,
    GenerationState, QuizRegenerator,
};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::{IngestError, Result};

const UNTITLED: &str = "Untitled";
const MAX_DERIVED_TITLE_CHARS: usize = 60;

/// Per-call ingestion options
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Overrides the step count planned from the reading budget
    pub steps: Option<usize>,
    pub team: String,
    /// Overrides any title found on the source
    pub title: Option<String>,
    /// Cancels in-flight generation; cancelled steps come back as fallbacks
    pub cancel: CancellationToken,
}

impl IngestOptions {
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// One generated step with its quiz report
#[derive(Debug, Clone)]
pub struct StepReport {
    pub document: GeneratedDocument,
    pub validation: QuizValidationReport,
    /// True when a regeneration pass changed the quiz
    pub regenerated: bool,
}

/// Full outcome of an ingestion
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub title: String,
    pub extraction: ExtractionResult,
    /// In step order. Blank steps are skipped.
    pub steps: Vec<StepReport>,
}

impl IngestReport {
    pub fn documents(&self) -> impl Iterator<Item = &GeneratedDocument> {
        self.steps.iter().map(|step| &step.document)
    }

    pub fn into_documents(self) -> Vec<GeneratedDocument> {
        self.steps.into_iter().map(|step| step.document).collect()
    }

    pub fn fallback_count(&self) -> usize {
        self.documents().filter(|doc| doc.is_fallback()).count()
    }
}

/// Turns raw sources into generated OJT documents
pub struct SourceIngestor {
    config: PipelineConfig,
    urls: UrlTextExtractor,
    pdfs: PdfTextExtractor,
    ocr: Arc<OcrHandle>,
    generator: Arc<AiContentGenerator>,
    regenerator: QuizRegenerator,
    progress: SharedProgress,
}

impl SourceIngestor {
    pub fn builder(config: PipelineConfig) -> SourceIngestorBuilder {
        SourceIngestorBuilder::new(config)
    }

    /// Ingestor with the configured engine, Tesseract and `pdftoppm`
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &str {
        self.generator.engine_name()
    }

    /// Reject sources that can never be ingested. Performs no I/O.
    pub fn validate(&self, source: &RawSource) -> Result<()> {
        match source {
            RawSource::Text { text, .. } => {
                if text.trim().is_empty() {
                    return Err(IngestError::InputValidation(
                        "text source is empty".to_string(),
                    ));
                }
            }
            RawSource::Url { url, .. } => {
                check_url(url)?;
            }
            RawSource::Pdf {
                file,
                filename,
                mime,
                ..
            } => validate_pdf(
                file,
                filename.as_deref(),
                mime.as_deref(),
                self.config.pdf.max_file_bytes,
            )?,
        }
        Ok(())
    }

    /// Extract the text of `source` without generating anything
    pub async fn extract(&self, source: &RawSource) -> Result<ExtractionResult> {
        let result = match source {
            RawSource::Text { text, .. } => extract_plain(text)?,
            RawSource::Url { url, .. } => self.urls.extract(url).await?,
            RawSource::Pdf {
                file,
                filename,
                mime,
                ..
            } => {
                self.pdfs
                    .extract(file, filename.as_deref(), mime.as_deref())
                    .await?
            }
        };
        Ok(result)
    }

    /// Ingest `source` into one document per non-blank step, in step order
    pub async fn ingest(
        &self,
        source: RawSource,
        options: IngestOptions,
    ) -> Result<Vec<GeneratedDocument>> {
        Ok(self.ingest_report(source, options).await?.into_documents())
    }

    /// Like [`ingest`](Self::ingest), keeping extraction details and quiz reports
    #[instrument(skip(self, source, options), fields(kind = source.kind()))]
    pub async fn ingest_report(
        &self,
        source: RawSource,
        options: IngestOptions,
    ) -> Result<IngestReport> {
        self.validate(&source)?;

        debug!(state = %GenerationState::Extracting, "Extracting source");
        self.progress
            .on_progress(&format!("Extracting text from {} source", source.kind()));
        let extraction = self.extract(&source).await?;
        let title = resolve_title(&source, &options, &extraction);

        let char_count = extraction.text.chars().count();
        let planned = options
            .steps
            .filter(|&steps| steps > 0)
            .unwrap_or_else(|| plan_steps(char_count, &self.config.reading));

        // Short texts can yield fewer paragraphs than planned steps; number
        // only the segments that carry text.
        let segments: Vec<String> = split(&extraction.text, planned)
            .into_iter()
            .filter(|text| !text.trim().is_empty())
            .collect();
        if segments.len() < planned {
            warn!(planned, kept = segments.len(), "Skipping blank steps");
        }

        let total = segments.len();
        let requests: Vec<GenerationRequest> = segments
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let step = index + 1;
                GenerationRequest::new(text, step_title(&title, step, total))
                    .with_team(options.team.clone())
                    .with_step(step, total)
                    .with_quiz_size(self.config.quiz.pool_size)
            })
            .collect();

        info!(
            title = %title,
            method = %extraction.method,
            chars = char_count,
            truncated = extraction.was_truncated,
            steps = requests.len(),
            "Source extracted"
        );

        let cancel = &options.cancel;
        let steps: Vec<StepReport> = stream::iter(requests)
            .map(|request| async move { self.generate_step(request, cancel).await })
            .buffered(self.config.generation.max_parallel_steps.max(1))
            .collect()
            .await;

        let report = IngestReport {
            title,
            extraction,
            steps,
        };
        info!(
            documents = report.steps.len(),
            fallbacks = report.fallback_count(),
            "Ingestion finished"
        );
        Ok(report)
    }

    async fn generate_step(&self, request: GenerationRequest, cancel: &CancellationToken) -> StepReport {
        let min_chars = self.config.quiz.min_question_chars;
        let mut document = self.generator.generate(&request, cancel).await;
        let mut validation = validate_pool(&document.quiz, min_chars);
        let mut regenerated = false;

        if document.ai_processed
            && self.config.quiz.auto_regenerate
            && !validation.flagged_indices.is_empty()
            && !cancel.is_cancelled()
        {
            debug!(
                step = request.step,
                flagged = validation.flagged_indices.len(),
                "Regenerating flagged quiz items"
            );
            let quiz = self
                .regenerator
                .regenerate(
                    &request.text,
                    &document.title,
                    &validation.flagged_indices,
                    &document.quiz,
                    cancel,
                )
                .await;
            regenerated = quiz != document.quiz;
            document.quiz = quiz;
            validation = validate_pool(&document.quiz, min_chars);
        }

        if !validation.flagged_indices.is_empty() {
            debug!(
                step = request.step,
                issues = validation.issues.len(),
                "Quiz still has flagged items"
            );
        }

        StepReport {
            document,
            validation,
            regenerated,
        }
    }

    /// Release the OCR engine. A later PDF ingestion starts a new one.
    pub async fn shutdown(&self) -> Result<()> {
        self.ocr.release().await?;
        Ok(())
    }
}

/// Builder for [`SourceIngestor`]
pub struct SourceIngestorBuilder {
    config: PipelineConfig,
    engine: Option<Arc<dyn GenerationEngine>>,
    ocr_provider: Option<Arc<dyn OcrEngineProvider>>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    progress: SharedProgress,
}

impl SourceIngestorBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            engine: None,
            ocr_provider: None,
            rasterizer: None,
            progress: silent(),
        }
    }

    /// Use `engine` instead of the one selected by `generation.engine`
    pub fn engine(mut self, engine: Arc<dyn GenerationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn ocr_provider(mut self, provider: Arc<dyn OcrEngineProvider>) -> Self {
        self.ocr_provider = Some(provider);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn progress(mut self, progress: SharedProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn build(self) -> Result<SourceIngestor> {
        let config = self.config;
        config.validate()?;

        let engine = match self.engine {
            Some(engine) => engine,
            None => engine_from_config(&config.generation)?,
        };
        let ocr = Arc::new(match self.ocr_provider {
            Some(provider) => OcrHandle::new(provider),
            None => OcrHandle::from_config(&config.ocr),
        });
        let rasterizer: Arc<dyn PageRasterizer> = match self.rasterizer {
            Some(rasterizer) => rasterizer,
            None => Arc::new(PdftoppmRasterizer::from_config(&config.ocr)),
        };

        let urls = UrlTextExtractor::from_config(&config.extraction)?;
        let pdfs = PdfTextExtractor::new(
            config.pdf.clone(),
            config.ocr.clone(),
            rasterizer,
            ocr.clone(),
        );
        let generator = Arc::new(
            AiContentGenerator::from_config(engine, &config.generation, &config.quiz)
                .with_progress(self.progress.clone()),
        );
        let regenerator = QuizRegenerator::new(generator.clone());

        info!(
            engine = %generator.engine_name(),
            pool_size = config.quiz.pool_size,
            parallel_steps = config.generation.max_parallel_steps,
            "Source ingestor ready"
        );

        Ok(SourceIngestor {
            config,
            urls,
            pdfs,
            ocr,
            generator,
            regenerator,
            progress: self.progress,
        })
    }
}

/// Title from, in order: the options, the source, page metadata, the file
/// name, the URL host, the first line of text.
fn resolve_title(source: &RawSource, options: &IngestOptions, extraction: &ExtractionResult) -> String {
    let non_blank = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    options
        .title
        .as_deref()
        .and_then(non_blank)
        .or_else(|| source.title().and_then(non_blank))
        .or_else(|| {
            extraction
                .metadata
                .as_ref()
                .and_then(|m| m.title.as_deref())
                .and_then(non_blank)
        })
        .or_else(|| match source {
            RawSource::Pdf {
                filename: Some(name),
                ..
            } => Path::new(name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(non_blank),
            RawSource::Url { url, .. } => Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string)),
            _ => None,
        })
        .or_else(|| {
            extraction
                .text
                .lines()
                .find_map(non_blank)
                .map(|line| line.chars().take(MAX_DERIVED_TITLE_CHARS).collect())
        })
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn step_title(title: &str, step: usize, total: usize) -> String {
    if total > 1 {
        format!("{} ({}/{})", title, step, total)
    } else {
        title.to_string()
    }
}

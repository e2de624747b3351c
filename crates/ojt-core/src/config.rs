use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub reading: ReadingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_env("OJT")
    }

    /// Load configuration from environment with custom prefix
    pub fn load_from_env(prefix: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Load configuration from file with environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("OJT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Message(msg.to_string()));

        if self.quiz.pool_size == 0 {
            return fail("quiz.pool_size must be greater than 0");
        }
        if self.reading.chars_per_minute == 0 || self.reading.minutes_per_step == 0 {
            return fail("reading.chars_per_minute and reading.minutes_per_step must be greater than 0");
        }
        if self.reading.max_steps == 0 {
            return fail("reading.max_steps must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.ocr.min_alnum_ratio) {
            return fail("ocr.min_alnum_ratio must be within 0.0..=1.0");
        }
        if self.ocr.render_scale <= 0.0 {
            return fail("ocr.render_scale must be positive");
        }
        if self.generation.max_parallel_steps == 0 {
            return fail("generation.max_parallel_steps must be at least 1");
        }
        if let Some(relay) = self
            .extraction
            .relays
            .iter()
            .find(|r| !r.template.contains("{url}") && !r.template.contains("{raw_url}"))
        {
            return Err(ConfigError::Message(format!(
                "relay '{}' template must contain {{url}} or {{raw_url}}",
                relay.name
            )));
        }
        Ok(())
    }
}

/// URL fetching and HTML extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_url_max_chars")]
    pub url_max_chars: usize,
    #[serde(default = "default_relay_timeout_secs")]
    pub relay_timeout_secs: u64,
    /// Tried in order; the first entry is the primary relay
    #[serde(default = "default_relays")]
    pub relays: Vec<RelayConfig>,
}

impl ExtractionConfig {
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    pub fn with_relays(mut self, relays: Vec<RelayConfig>) -> Self {
        self.relays = relays;
        self
    }

    pub fn with_url_max_chars(mut self, max: usize) -> Self {
        self.url_max_chars = max;
        self
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            url_max_chars: default_url_max_chars(),
            relay_timeout_secs: default_relay_timeout_secs(),
            relays: default_relays(),
        }
    }
}

fn default_url_max_chars() -> usize {
    15_000
}

fn default_relay_timeout_secs() -> u64 {
    10
}

fn default_relays() -> Vec<RelayConfig> {
    vec![
        RelayConfig::new("direct", "{raw_url}"),
        RelayConfig::new("allorigins", "https://api.allorigins.win/raw?url={url}"),
        RelayConfig::new("corsproxy", "https://corsproxy.io/?url={url}"),
        RelayConfig::new("codetabs", "https://api.codetabs.com/v1/proxy?quest={url}"),
    ]
}

/// One network relay. `{url}` is replaced by the percent-encoded target,
/// `{raw_url}` by the target verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub name: String,
    pub template: String,
}

impl RelayConfig {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }
}

/// PDF text-layer extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    #[serde(default = "default_pdf_max_file_bytes")]
    pub max_file_bytes: usize,
    #[serde(default = "default_pdf_max_pages")]
    pub max_pages: usize,
    /// Below this many chars the text layer is treated as missing
    #[serde(default = "default_pdf_min_text_chars")]
    pub min_text_chars: usize,
    #[serde(default = "default_pdf_max_chars")]
    pub max_chars: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_pdf_max_file_bytes(),
            max_pages: default_pdf_max_pages(),
            min_text_chars: default_pdf_min_text_chars(),
            max_chars: default_pdf_max_chars(),
        }
    }
}

fn default_pdf_max_file_bytes() -> usize {
    50 * 1024 * 1024 // 50MB
}

fn default_pdf_max_pages() -> usize {
    100
}

fn default_pdf_min_text_chars() -> usize {
    100
}

fn default_pdf_max_chars() -> usize {
    100_000
}

/// OCR fallback for image-only PDFs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_max_pages")]
    pub max_pages: usize,
    /// 1.0 renders at 72 dpi
    #[serde(default = "default_ocr_render_scale")]
    pub render_scale: f32,
    #[serde(default = "default_ocr_min_chars")]
    pub min_chars: usize,
    /// Minimum share of alphanumeric/Hangul chars for output to count as text
    #[serde(default = "default_ocr_min_alnum_ratio")]
    pub min_alnum_ratio: f64,
    #[serde(default = "default_ocr_languages")]
    pub languages: String,
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
    #[serde(default = "default_pdftoppm_path")]
    pub pdftoppm_path: String,
}

impl OcrConfig {
    pub fn render_dpi(&self) -> u32 {
        (72.0 * self.render_scale).round().max(1.0) as u32
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_pages: default_ocr_max_pages(),
            render_scale: default_ocr_render_scale(),
            min_chars: default_ocr_min_chars(),
            min_alnum_ratio: default_ocr_min_alnum_ratio(),
            languages: default_ocr_languages(),
            tesseract_path: default_tesseract_path(),
            pdftoppm_path: default_pdftoppm_path(),
        }
    }
}

fn default_ocr_max_pages() -> usize {
    10
}

fn default_ocr_render_scale() -> f32 {
    2.0
}

fn default_ocr_min_chars() -> usize {
    100
}

fn default_ocr_min_alnum_ratio() -> f64 {
    0.3
}

fn default_ocr_languages() -> String {
    "kor+eng".to_string()
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

fn default_pdftoppm_path() -> String {
    "pdftoppm".to_string()
}

/// Quiz pool shape and quality checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_min_question_chars")]
    pub min_question_chars: usize,
    /// Run one regeneration pass for flagged items after generation
    #[serde(default)]
    pub auto_regenerate: bool,
}

impl QuizConfig {
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            min_question_chars: default_min_question_chars(),
            auto_regenerate: false,
        }
    }
}

fn default_pool_size() -> usize {
    20
}

fn default_min_question_chars() -> usize {
    10
}

/// Reading-time budget used to decide how many steps a source becomes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingConfig {
    #[serde(default = "default_chars_per_minute")]
    pub chars_per_minute: usize,
    #[serde(default = "default_minutes_per_step")]
    pub minutes_per_step: usize,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl ReadingConfig {
    pub fn chars_per_step(&self) -> usize {
        self.chars_per_minute.saturating_mul(self.minutes_per_step).max(1)
    }
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            chars_per_minute: default_chars_per_minute(),
            minutes_per_step: default_minutes_per_step(),
            max_steps: default_max_steps(),
        }
    }
}

fn default_chars_per_minute() -> usize {
    500
}

fn default_minutes_per_step() -> usize {
    10
}

fn default_max_steps() -> usize {
    10
}

/// Which generation engine backs the AI step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Hosted model API
    #[default]
    Cloud,
    /// Model served on the local machine
    Local,
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cloud" => Ok(EngineKind::Cloud),
            "local" | "offline" => Ok(EngineKind::Local),
            _ => Err(format!("Unknown engine: {}", s)),
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub engine: EngineKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_parallel_steps")]
    pub max_parallel_steps: usize,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            model: default_model(),
            api_key: String::new(),
            base_url: None,
            timeout_secs: default_generation_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_parallel_steps: default_max_parallel_steps(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_max_parallel_steps() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();

        assert_eq!(config.extraction.relays[0].name, "direct");
        assert_eq!(config.pdf.max_file_bytes, 50 * 1024 * 1024);
        assert_eq!(config.pdf.max_pages, 100);
        assert_eq!(config.ocr.max_pages, 10);
        assert_eq!(config.quiz.pool_size, 20);
        assert_eq!(config.generation.engine, EngineKind::Cloud);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_render_dpi() {
        let config = OcrConfig::default();
        assert_eq!(config.render_dpi(), 144);
    }

    #[test]
    fn test_chars_per_step() {
        let reading = ReadingConfig {
            chars_per_minute: 300,
            minutes_per_step: 5,
            max_steps: 4,
        };
        assert_eq!(reading.chars_per_step(), 1500);
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let mut config = PipelineConfig::default();
        config.quiz.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relay_without_placeholder() {
        let mut config = PipelineConfig::default();
        config.extraction.relays = vec![RelayConfig::new("broken", "https://relay.example/")];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_engine_kind_from_str() {
        assert_eq!("Local".parse::<EngineKind>().unwrap(), EngineKind::Local);
        assert_eq!("offline".parse::<EngineKind>().unwrap(), EngineKind::Local);
        assert!("gpu".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile_toml();
        writeln!(
            file,
            "[quiz]\npool_size = 12\n\n[generation]\nengine = \"local\"\nmodel = \"llama3\"\n\n[[extraction.relays]]\nname = \"only\"\ntemplate = \"https://relay.example/?u={{url}}\""
        )
        .unwrap();

        let config = PipelineConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.quiz.pool_size, 12);
        assert_eq!(config.generation.engine, EngineKind::Local);
        assert_eq!(config.generation.model, "llama3");
        assert_eq!(config.extraction.relays.len(), 1);
        assert_eq!(config.pdf.max_pages, 100);
    }

    fn tempfile_toml() -> tempfile::NamedTempFile {
        tempfile::Builder::new().suffix(".toml").tempfile().unwrap()
    }
}

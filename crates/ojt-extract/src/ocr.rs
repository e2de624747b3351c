//! OCR for image-only PDFs
//!
//! Pages are rendered to PNG by a [`PageRasterizer`] and recognized by an
//! [`OcrEngine`]. The engine is expensive to start, so it lives behind an
//! [`OcrHandle`] that initializes it on first use, keeps it for later calls
//! and serializes recognitions. [`OcrHandle::release`] tears it down; the next
//! recognition starts a fresh one.

use async_trait::async_trait;
use ojt_core::OcrConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::{ExtractError, Result};

/// Renders PDF pages to images
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render pages `1..=max_pages` of `pdf` as PNG images, in page order.
    async fn render_pages(&self, pdf: &[u8], max_pages: usize, dpi: u32) -> Result<Vec<Vec<u8>>>;
}

/// Recognizes text in a single image
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String>;

    /// Free whatever the engine holds. Called once by [`OcrHandle::release`].
    async fn terminate(&self) -> Result<()> {
        Ok(())
    }
}

/// Creates engines for an [`OcrHandle`]
#[async_trait]
pub trait OcrEngineProvider: Send + Sync {
    async fn initialize(&self) -> Result<Box<dyn OcrEngine>>;
}

/// Lazily initialized, shared OCR engine
pub struct OcrHandle {
    provider: Arc<dyn OcrEngineProvider>,
    engine: Mutex<Option<Box<dyn OcrEngine>>>,
}

impl OcrHandle {
    pub fn new(provider: Arc<dyn OcrEngineProvider>) -> Self {
        Self {
            provider,
            engine: Mutex::new(None),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(Arc::new(TesseractProvider::from_config(config)))
    }

    /// Recognize `image`, starting the engine if needed. Concurrent callers
    /// wait for each other.
    pub async fn recognize(&self, image: &[u8]) -> Result<String> {
        let mut guard = self.engine.lock().await;

        if guard.is_none() {
            info!("Initializing OCR engine");
            *guard = Some(self.provider.initialize().await?);
        }

        let engine = guard
            .as_ref()
            .ok_or_else(|| ExtractError::Ocr("OCR engine unavailable".to_string()))?;
        engine.recognize(image).await
    }

    /// Tear the engine down. A no-op when it was never started.
    pub async fn release(&self) -> Result<()> {
        let engine = self.engine.lock().await.take();
        if let Some(engine) = engine {
            info!("Releasing OCR engine");
            engine.terminate().await?;
        }
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.engine.lock().await.is_some()
    }
}

/// Tesseract command line engine
pub struct TesseractEngine {
    binary: String,
    languages: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>, languages: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        let file = tempfile::Builder::new()
            .prefix("ojt-ocr-")
            .suffix(".png")
            .tempfile()?;
        tokio::fs::write(file.path(), image).await?;

        // tesseract input.png stdout -l kor+eng
        let output = Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .output()
            .await
            .map_err(|e| {
                ExtractError::Ocr(format!(
                    "failed to run tesseract (path='{}'): {}",
                    self.binary, e
                ))
            })?;

        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "tesseract exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Starts [`TesseractEngine`]s after checking the binary is present
pub struct TesseractProvider {
    binary: String,
    languages: String,
}

impl TesseractProvider {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            languages: config.languages.clone(),
        }
    }
}

#[async_trait]
impl OcrEngineProvider for TesseractProvider {
    async fn initialize(&self) -> Result<Box<dyn OcrEngine>> {
        let status = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                ExtractError::Ocr(format!(
                    "tesseract is not available (path='{}'): {}",
                    self.binary, e
                ))
            })?
            .status;

        if !status.success() {
            return Err(ExtractError::Ocr(format!(
                "'{} --version' failed",
                self.binary
            )));
        }

        Ok(Box::new(TesseractEngine::new(
            self.binary.clone(),
            self.languages.clone(),
        )))
    }
}

/// Poppler `pdftoppm` rasterizer
pub struct PdftoppmRasterizer {
    binary: String,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.pdftoppm_path.clone())
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    #[instrument(skip(self, pdf), fields(bytes = pdf.len()))]
    async fn render_pages(&self, pdf: &[u8], max_pages: usize, dpi: u32) -> Result<Vec<Vec<u8>>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.pdf");
        let prefix = dir.path().join("page");
        tokio::fs::write(&input, pdf).await?;

        // pdftoppm -png -r 144 -f 1 -l 10 input.pdf page
        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(max_pages.max(1).to_string())
            .arg(&input)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| {
                ExtractError::Ocr(format!(
                    "failed to run pdftoppm (path='{}'): {}",
                    self.binary, e
                ))
            })?;

        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "pdftoppm exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let pages = rendered_pages(dir.path()).await?;
        let mut images = Vec::with_capacity(pages.len());
        for (_, path) in pages.into_iter().take(max_pages) {
            images.push(tokio::fs::read(&path).await?);
        }

        debug!(pages = images.len(), dpi, "Rendered PDF pages");
        Ok(images)
    }
}

/// `page-01.png`, `page-02.png`, ... sorted by page number
async fn rendered_pages(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let number = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.strip_prefix("page-"))
            .and_then(|n| n.parse::<usize>().ok());

        if let (Some(number), Some("png")) = (number, path.extension().and_then(|e| e.to_str())) {
            pages.push((number, path));
        }
    }

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        initialized: Arc<AtomicUsize>,
        terminated: Arc<AtomicUsize>,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
    }

    struct CountingEngine {
        terminated: Arc<AtomicUsize>,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl OcrEngineProvider for CountingProvider {
        async fn initialize(&self) -> Result<Box<dyn OcrEngine>> {
            self.initialized.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingEngine {
                terminated: self.terminated.clone(),
                active: self.active.clone(),
                max_active: self.max_active.clone(),
            }))
        }
    }

    #[async_trait]
    impl OcrEngine for CountingEngine {
        async fn recognize(&self, image: &[u8]) -> Result<String> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("{} bytes", image.len()))
        }

        async fn terminate(&self) -> Result<()> {
            self.terminated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting() -> (Arc<CountingProvider>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let initialized = Arc::new(AtomicUsize::new(0));
        let terminated = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(CountingProvider {
            initialized: initialized.clone(),
            terminated: terminated.clone(),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        });
        (provider, initialized, terminated)
    }

    #[tokio::test]
    async fn test_lazy_init_and_reuse() {
        let (provider, initialized, _) = counting();
        let handle = OcrHandle::new(provider);

        assert!(!handle.is_initialized().await);
        assert_eq!(handle.recognize(b"abc").await.unwrap(), "3 bytes");
        assert_eq!(handle.recognize(b"abcd").await.unwrap(), "4 bytes");

        assert!(handle.is_initialized().await);
        assert_eq!(initialized.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_and_reinitialize() {
        let (provider, initialized, terminated) = counting();
        let handle = OcrHandle::new(provider);

        handle.release().await.unwrap();
        assert_eq!(terminated.load(Ordering::SeqCst), 0);

        handle.recognize(b"x").await.unwrap();
        handle.release().await.unwrap();
        assert!(!handle.is_initialized().await);
        assert_eq!(terminated.load(Ordering::SeqCst), 1);

        handle.recognize(b"y").await.unwrap();
        assert_eq!(initialized.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_recognitions_are_serialized() {
        let (provider, _, _) = counting();
        let max_active = provider.max_active.clone();
        let handle = Arc::new(OcrHandle::new(provider));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.recognize(b"page").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_tesseract_binary() {
        let config = OcrConfig {
            tesseract_path: "/nonexistent/tesseract-ojt".to_string(),
            ..OcrConfig::default()
        };
        let handle = OcrHandle::from_config(&config);

        let err = handle.recognize(b"png").await.unwrap_err();
        assert!(matches!(err, ExtractError::Ocr(_)));
        assert!(!handle.is_initialized().await);
    }

    #[tokio::test]
    async fn test_rendered_pages_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "input.pdf", "page-3.ppm"] {
            tokio::fs::write(dir.path().join(name), name).await.unwrap();
        }

        let pages = rendered_pages(dir.path()).await.unwrap();
        let numbers: Vec<usize> = pages.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
    }
}

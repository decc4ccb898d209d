//! Document-to-text sources. Every failure collapses to `ExtractionFailed`.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::IngestError;

/// Produces ordered page text for a document.
pub trait TextSource: Send + Sync {
    fn extract_pages(
        &self,
        document: &Path,
        password: Option<&str>,
    ) -> Result<Vec<String>, IngestError>;
}

/// Already-extracted text; pages are separated by form feeds.
#[derive(Debug, Clone, Default)]
pub struct PlainTextSource;

impl TextSource for PlainTextSource {
    fn extract_pages(
        &self,
        document: &Path,
        _password: Option<&str>,
    ) -> Result<Vec<String>, IngestError> {
        let text = std::fs::read_to_string(document)
            .map_err(|e| IngestError::extraction(document, e.to_string()))?;
        Ok(split_pages(&text))
    }
}

fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\x0c').map(str::to_string).collect();
    // pdftotext ends the last page with a form feed too.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Shells out to poppler's `pdftotext -layout`, which keeps column positions.
#[derive(Debug, Clone)]
pub struct PdfToTextSource {
    command: String,
}

impl Default for PdfToTextSource {
    fn default() -> Self {
        Self {
            command: "pdftotext".to_string(),
        }
    }
}

impl PdfToTextSource {
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl TextSource for PdfToTextSource {
    fn extract_pages(
        &self,
        document: &Path,
        password: Option<&str>,
    ) -> Result<Vec<String>, IngestError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-layout");
        if let Some(pw) = password {
            cmd.arg("-upw").arg(pw);
        }
        cmd.arg(document).arg("-");

        debug!(document = %document.display(), command = %self.command, "extracting text");
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| IngestError::extraction(document, format!("spawning {}: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::extraction(
                document,
                format!("{} exited with {}: {}", self.command, output.status, stderr.trim()),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let pages = split_pages(&text);
        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(IngestError::extraction(document, "no text layer (scanned document?)"));
        }
        Ok(pages)
    }
}

/// Tries `primary`, then `fallback` (e.g. an OCR or model-assisted extractor).
pub struct FallbackSource {
    primary: Box<dyn TextSource>,
    fallback: Box<dyn TextSource>,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn TextSource>, fallback: Box<dyn TextSource>) -> Self {
        Self { primary, fallback }
    }
}

impl TextSource for FallbackSource {
    fn extract_pages(
        &self,
        document: &Path,
        password: Option<&str>,
    ) -> Result<Vec<String>, IngestError> {
        match self.primary.extract_pages(document, password) {
            Ok(pages) => Ok(pages),
            Err(e) => {
                warn!(document = %document.display(), error = %e, "primary extraction failed, trying fallback");
                self.fallback.extract_pages(document, password)
            }
        }
    }
}

/// `.pdf` goes through `pdftotext`; anything else is read as text.
pub fn source_for(document: &Path) -> Box<dyn TextSource> {
    if is_pdf(document) {
        Box::new(PdfToTextSource::default())
    } else {
        Box::new(PlainTextSource)
    }
}

fn is_pdf(document: &Path) -> bool {
    document
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Wrong password, corrupt file, unsupported format: the caller cannot tell them apart.
    #[error("extraction failed for {document}: {message}")]
    ExtractionFailed { document: String, message: String },
}

impl IngestError {
    pub(crate) fn extraction(document: &std::path::Path, message: impl Into<String>) -> Self {
        IngestError::ExtractionFailed {
            document: document.display().to_string(),
            message: message.into(),
        }
    }
}

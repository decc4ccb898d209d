use passbook_core::ParsedStatement;
use thiserror::Error;

/// Failure modes of a ledger sink call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The ledger already holds this record.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    /// Nothing for the document was committed; `preserved` can be retried as-is.
    #[error("posting {document} to {account} aborted: {source}")]
    ReconciliationUnavailable {
        document: String,
        account: String,
        preserved: Box<ParsedStatement>,
        #[source]
        source: SinkError,
    },
}

impl ImportError {
    pub fn preserved(&self) -> &ParsedStatement {
        match self {
            ImportError::ReconciliationUnavailable { preserved, .. } => preserved,
        }
    }
}

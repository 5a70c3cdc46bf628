//! Remote translation service contract.

/// reqwest-backed implementation of [`RemoteClient`].
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::jobs::{SourceFile, TranslateOptions};

/// Failures reported by the remote service or the transport beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Connection, timeout or decode failure.
    #[error("network error: {0}")]
    Network(String),
    /// The service refused the request (bad input, size limits, server fault).
    #[error("server rejected request ({status}): {detail}")]
    ServerRejected { status: u16, detail: String },
    /// The service no longer knows the job.
    #[error("job not found: {0}")]
    JobNotFound(String),
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    /// Server-assigned job id.
    pub job_id: String,
    /// Snippet of the extracted text.
    pub text_preview: String,
}

/// Result of a successful translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    /// Snippet of the translated text.
    pub text_preview: String,
}

/// Downloaded translation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// File name suggested by the server.
    pub filename: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

/// Calls the orchestrator makes against the remote service.
///
/// Implementations are stateless. Retrying a call with identical arguments
/// after a [`RemoteError::Network`] must be safe.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Supported target languages, in display order.
    async fn fetch_languages(&self) -> Result<Vec<String>, RemoteError>;

    /// Upload the document and extract its text.
    async fn upload(&self, file: &SourceFile, target_language: &str)
    -> Result<Uploaded, RemoteError>;

    /// Translate a previously uploaded job.
    async fn translate(
        &self,
        job_id: &str,
        target_language: &str,
        options: TranslateOptions,
    ) -> Result<Translated, RemoteError>;

    /// Fetch the translated file for a job.
    async fn download(&self, job_id: &str, target_language: &str)
    -> Result<Download, RemoteError>;
}

//! Document job model and its validated lifecycle transitions.

use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, sync::Arc};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::api::RemoteError;

/// The only content type the service accepts.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// User-supplied input document.
#[derive(Clone)]
pub struct SourceFile {
    name: String,
    content_type: String,
    content: Arc<[u8]>,
}

impl SourceFile {
    /// Wrap in-memory content.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk and guess its content type.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = guess_content_type(path, &content);
        Ok(Self::new(name, content_type, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Byte size of the content.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_CONTENT_TYPE
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Content is omitted; documents can be large.
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.size())
            .finish()
    }
}

/// PDF by extension or by magic bytes, octet-stream otherwise.
pub fn guess_content_type(path: &Path, content: &[u8]) -> &'static str {
    let pdf_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if pdf_ext || content.starts_with(b"%PDF-") {
        PDF_CONTENT_TYPE
    } else {
        "application/octet-stream"
    }
}

/// Translation options passed verbatim to the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateOptions {
    /// Keep the document layout where possible.
    pub preserve_formatting: bool,
    /// Interleave the original text in the output.
    pub include_original: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            preserve_formatting: true,
            include_original: false,
        }
    }
}

/// Lifecycle state of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// File accepted, nothing sent yet.
    Idle,
    /// Upload and text extraction in flight.
    Uploading,
    /// Text extracted; the job has a server id.
    Extracted,
    /// Translation in flight.
    Translating,
    /// Translation available.
    Translated,
}

impl JobStatus {
    /// True while a remote call is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, JobStatus::Uploading | JobStatus::Translating)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Idle => "Idle",
            JobStatus::Uploading => "Uploading",
            JobStatus::Extracted => "Extracted",
            JobStatus::Translating => "Translating",
            JobStatus::Translated => "Translated",
        };
        f.write_str(s)
    }
}

/// Remote step a failure or progress value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Upload,
    Translate,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Upload => f.write_str("upload"),
            Step::Translate => f.write_str("translate"),
        }
    }
}

/// Most recent failed step of a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobFailure {
    pub step: Step,
    pub error: RemoteError,
}

/// A transition was requested from a state that does not allow it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid transition: {op} from {from}")]
pub struct InvalidTransition {
    /// Transition that was attempted.
    pub op: &'static str,
    /// State the job was in.
    pub from: JobStatus,
}

/// One document's progress through upload, extraction and translation.
///
/// Transitions consume the job and return the next one, leaving the caller's
/// copy untouched on error.
#[derive(Clone, Debug)]
pub struct Job {
    generation: Uuid,
    id: Option<String>,
    source_file: Option<SourceFile>,
    target_language: String,
    options: TranslateOptions,
    original_preview: String,
    translated_preview: String,
    status: JobStatus,
    last_error: Option<JobFailure>,
}

impl Job {
    /// New idle job for an accepted file.
    pub fn create(file: SourceFile) -> Self {
        Self {
            source_file: Some(file),
            ..Self::reset()
        }
    }

    /// Fresh empty job.
    pub fn reset() -> Self {
        Self {
            generation: Uuid::new_v4(),
            id: None,
            source_file: None,
            target_language: String::new(),
            options: TranslateOptions::default(),
            original_preview: String::new(),
            translated_preview: String::new(),
            status: JobStatus::Idle,
            last_error: None,
        }
    }

    /// Client-side identity, renewed on create and reset.
    pub fn generation(&self) -> Uuid {
        self.generation
    }

    /// Server-assigned job id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn options(&self) -> TranslateOptions {
        self.options
    }

    pub fn original_preview(&self) -> &str {
        &self.original_preview
    }

    pub fn translated_preview(&self) -> &str {
        &self.translated_preview
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&JobFailure> {
        self.last_error.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.status.is_busy()
    }

    fn require(&self, op: &'static str, allowed: &[JobStatus]) -> Result<(), InvalidTransition> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(InvalidTransition {
                op,
                from: self.status,
            })
        }
    }

    /// Idle → Uploading.
    pub fn mark_uploading(mut self) -> Result<Self, InvalidTransition> {
        self.require("mark_uploading", &[JobStatus::Idle])?;
        self.status = JobStatus::Uploading;
        self.last_error = None;
        Ok(self)
    }

    /// Uploading → Extracted, recording the server id and text preview.
    pub fn mark_extracted(
        mut self,
        id: impl Into<String>,
        preview: impl Into<String>,
    ) -> Result<Self, InvalidTransition> {
        self.require("mark_extracted", &[JobStatus::Uploading])?;
        self.id = Some(id.into());
        self.original_preview = preview.into();
        self.status = JobStatus::Extracted;
        self.last_error = None;
        Ok(self)
    }

    /// Extracted or Translated → Translating.
    pub fn mark_translating(mut self) -> Result<Self, InvalidTransition> {
        self.require(
            "mark_translating",
            &[JobStatus::Extracted, JobStatus::Translated],
        )?;
        // A translated preview only exists in Translated.
        self.translated_preview.clear();
        self.status = JobStatus::Translating;
        self.last_error = None;
        Ok(self)
    }

    /// Translating → Translated.
    pub fn mark_translated(mut self, preview: impl Into<String>) -> Result<Self, InvalidTransition> {
        self.require("mark_translated", &[JobStatus::Translating])?;
        self.translated_preview = preview.into();
        self.status = JobStatus::Translated;
        self.last_error = None;
        Ok(self)
    }

    /// Record a remote failure and fall back to the state before the call.
    pub fn mark_failed(mut self, error: RemoteError) -> Result<Self, InvalidTransition> {
        let (step, fallback) = match self.status {
            JobStatus::Uploading => (Step::Upload, JobStatus::Idle),
            JobStatus::Translating => (Step::Translate, JobStatus::Extracted),
            from => {
                return Err(InvalidTransition {
                    op: "mark_failed",
                    from,
                });
            }
        };
        self.status = fallback;
        self.last_error = Some(JobFailure { step, error });
        Ok(self)
    }

    /// Change the target language before the first translation.
    pub fn with_target_language(
        mut self,
        language: impl Into<String>,
    ) -> Result<Self, InvalidTransition> {
        self.require(
            "with_target_language",
            &[JobStatus::Idle, JobStatus::Extracted],
        )?;
        self.target_language = language.into();
        Ok(self)
    }

    /// Change translation options while no call is in flight.
    pub fn with_options(mut self, options: TranslateOptions) -> Result<Self, InvalidTransition> {
        self.require(
            "with_options",
            &[JobStatus::Idle, JobStatus::Extracted, JobStatus::Translated],
        )?;
        self.options = options;
        Ok(self)
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf() -> SourceFile {
        SourceFile::new("doc.pdf", PDF_CONTENT_TYPE, b"%PDF-1.7".to_vec())
    }

    fn extracted() -> Job {
        Job::create(pdf())
            .mark_uploading()
            .unwrap()
            .mark_extracted("J1", "Hello...")
            .unwrap()
    }

    #[test]
    fn test_create_is_idle_without_id() {
        let job = Job::create(pdf());
        assert_eq!(job.status(), JobStatus::Idle);
        assert!(job.id().is_none());
        assert_eq!(job.source_file().unwrap().name(), "doc.pdf");
        assert_eq!(job.source_file().unwrap().size(), 8);
    }

    #[test]
    fn test_full_forward_path() {
        let job = extracted()
            .mark_translating()
            .unwrap()
            .mark_translated("Bonjour le monde")
            .unwrap();
        assert_eq!(job.status(), JobStatus::Translated);
        assert_eq!(job.id(), Some("J1"));
        assert_eq!(job.original_preview(), "Hello...");
        assert_eq!(job.translated_preview(), "Bonjour le monde");
    }

    #[test]
    fn test_mark_extracted_requires_uploading() {
        let err = Job::create(pdf()).mark_extracted("J1", "x").unwrap_err();
        assert_eq!(err.from, JobStatus::Idle);
        assert_eq!(err.op, "mark_extracted");
    }

    #[test]
    fn test_mark_translating_rejected_from_idle() {
        assert!(Job::create(pdf()).mark_translating().is_err());
    }

    #[test]
    fn test_upload_failure_reverts_to_idle() {
        let job = Job::create(pdf())
            .mark_uploading()
            .unwrap()
            .mark_failed(RemoteError::Network("down".into()))
            .unwrap();
        assert_eq!(job.status(), JobStatus::Idle);
        assert!(job.id().is_none());
        assert_eq!(job.last_error().unwrap().step, Step::Upload);
    }

    #[test]
    fn test_translate_failure_keeps_extraction() {
        let job = extracted()
            .mark_translating()
            .unwrap()
            .mark_failed(RemoteError::JobNotFound("J1".into()))
            .unwrap();
        assert_eq!(job.status(), JobStatus::Extracted);
        assert_eq!(job.id(), Some("J1"));
        assert_eq!(job.original_preview(), "Hello...");
        assert_eq!(job.last_error().unwrap().step, Step::Translate);

        // The next successful transition clears the error.
        let job = job.mark_translating().unwrap();
        assert!(job.last_error().is_none());
    }

    #[test]
    fn test_mark_failed_rejected_when_not_busy() {
        let err = extracted()
            .mark_failed(RemoteError::Network("x".into()))
            .unwrap_err();
        assert_eq!(err.from, JobStatus::Extracted);
    }

    #[test]
    fn test_retranslation_clears_translated_preview_while_busy() {
        let job = extracted()
            .mark_translating()
            .unwrap()
            .mark_translated("first")
            .unwrap()
            .mark_translating()
            .unwrap();
        assert!(job.translated_preview().is_empty());
        assert_eq!(job.original_preview(), "Hello...");
    }

    #[test]
    fn test_target_language_locked_after_translation() {
        let job = extracted().with_target_language("French").unwrap();
        assert_eq!(job.target_language(), "French");

        let translated = job
            .mark_translating()
            .unwrap()
            .mark_translated("Bonjour")
            .unwrap();
        assert!(translated.with_target_language("German").is_err());
    }

    #[test]
    fn test_options_rejected_while_busy() {
        let opts = TranslateOptions {
            preserve_formatting: false,
            include_original: true,
        };
        let busy = Job::create(pdf()).mark_uploading().unwrap();
        assert!(busy.with_options(opts).is_err());

        let job = extracted().with_options(opts).unwrap();
        assert_eq!(job.options(), opts);
    }

    #[test]
    fn test_reset_mints_new_generation() {
        let job = extracted();
        let fresh = Job::reset();
        assert_ne!(job.generation(), fresh.generation());
        assert!(fresh.source_file().is_none());
        assert!(fresh.original_preview().is_empty());
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a/Report.PDF"), b""), PDF_CONTENT_TYPE);
        assert_eq!(guess_content_type(Path::new("scan.bin"), b"%PDF-1.4\n"), PDF_CONTENT_TYPE);
        assert_eq!(
            guess_content_type(Path::new("notes.txt"), b"hello"),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_source_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7 body").unwrap();

        let file = SourceFile::from_path(&path).await.unwrap();
        assert_eq!(file.name(), "doc.pdf");
        assert!(file.is_pdf());
        assert_eq!(file.size(), 13);
    }
}

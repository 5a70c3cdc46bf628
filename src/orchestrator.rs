//! Job orchestration state machine.
//!
//! Owns the single [`Job`], drives its transitions through the remote client
//! and publishes every change to subscribers. Commands issued while a remote
//! call is in flight are rejected, never queued.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    api::{Download, RemoteClient, RemoteError},
    config::ProgressCfg,
    jobs::{InvalidTransition, Job, JobStatus, SourceFile, Step, TranslateOptions},
    progress::{ProgressEmitter, ProgressSink},
};

/// Reasons an orchestrator command did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// Only PDFs are accepted.
    #[error("unsupported file type: {0} (expected a PDF)")]
    UnsupportedFileType(String),
    /// The caller issued a command the current state does not allow.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// A remote call is already in flight.
    #[error("operation in progress ({0})")]
    OperationInProgress(JobStatus),
    #[error("no file selected")]
    NoFileSelected,
    /// Download requested before extraction produced a job id.
    #[error("nothing to download: the document has not been extracted yet")]
    NotExtracted,
    #[error("unsupported target language: {0}")]
    UnknownLanguage(String),
    /// The job was replaced while the call was in flight; its result was dropped.
    #[error("job was replaced before the request finished")]
    Superseded,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Observable change of the orchestrated job.
#[derive(Clone, Debug)]
pub enum JobEvent {
    /// New job snapshot after any state change.
    StateChanged(Job),
    /// Cosmetic progress of the running step.
    Progress { step: Step, percent: u8 },
    /// A remote call failed; the job has already reverted.
    Failed { step: Step, error: RemoteError },
}

/// Subscriber list shared with progress sinks.
#[derive(Clone, Default)]
struct Subscribers(Arc<Mutex<Vec<mpsc::UnboundedSender<JobEvent>>>>);

impl Subscribers {
    fn add(&self) -> mpsc::UnboundedReceiver<JobEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.0).push(tx);
        rx
    }

    fn notify(&self, ev: JobEvent) {
        // Drop subscribers whose receiver is gone.
        lock(&self.0).retain(|tx| tx.send(ev.clone()).is_ok());
    }
}

/// State guarded by the orchestrator lock. Never held across an await.
struct Inner {
    job: Job,
    languages: Vec<String>,
    /// Progress of the in-flight call, if any.
    emitter: Option<ProgressEmitter>,
}

/// Drives a single document job through upload, translation and download.
#[derive(Clone)]
pub struct JobOrchestrator {
    remote: Arc<dyn RemoteClient>,
    inner: Arc<Mutex<Inner>>,
    subscribers: Subscribers,
    progress: ProgressCfg,
}

impl JobOrchestrator {
    pub fn new(remote: Arc<dyn RemoteClient>, progress: ProgressCfg) -> Self {
        Self {
            remote,
            inner: Arc::new(Mutex::new(Inner {
                job: Job::reset(),
                languages: Vec::new(),
                emitter: None,
            })),
            subscribers: Subscribers::default(),
            progress,
        }
    }

    /// Receive every subsequent [`JobEvent`].
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<JobEvent> {
        self.subscribers.add()
    }

    /// Copy of the current job.
    pub fn current_snapshot(&self) -> Job {
        self.lock().job.clone()
    }

    /// Languages loaded by [`Self::load_languages`], empty until then.
    pub fn languages(&self) -> Vec<String> {
        self.lock().languages.clone()
    }

    /// Fetch and cache the supported target languages.
    pub async fn load_languages(&self) -> Result<Vec<String>, JobError> {
        let languages = self.remote.fetch_languages().await.inspect_err(|e| {
            tracing::warn!("fetch languages failed: {e}");
        })?;
        tracing::info!("loaded {} languages", languages.len());
        self.lock().languages = languages.clone();
        Ok(languages)
    }

    /// Accept a new document, discarding the current job wholesale.
    pub fn select_file(&self, file: SourceFile) -> Result<Job, JobError> {
        if !file.is_pdf() {
            tracing::warn!(
                "rejected file {} ({})",
                file.name(),
                file.content_type()
            );
            return Err(JobError::UnsupportedFileType(file.content_type().to_string()));
        }
        tracing::info!("file selected: {} ({} bytes)", file.name(), file.size());
        Ok(self.replace_job(Job::create(file)))
    }

    /// Drop the current document. Any in-flight call is abandoned.
    pub fn remove_file(&self) -> Job {
        tracing::info!("file removed");
        self.replace_job(Job::reset())
    }

    /// Change the target language (Idle or Extracted only).
    pub fn set_target_language(&self, language: &str) -> Result<Job, JobError> {
        let mut inner = self.lock();
        ensure_idle(&inner.job)?;
        ensure_known_language(&inner.languages, language)?;
        let job = contract(inner.job.clone().with_target_language(language))?;
        Ok(self.commit(&mut inner, job))
    }

    /// Change the options used by the next translation.
    pub fn set_options(&self, options: TranslateOptions) -> Result<Job, JobError> {
        let mut inner = self.lock();
        ensure_idle(&inner.job)?;
        let job = contract(inner.job.clone().with_options(options))?;
        Ok(self.commit(&mut inner, job))
    }

    /// Upload the document and extract its text.
    pub async fn extract(&self, target_language: &str) -> Result<Job, JobError> {
        let (generation, file) = {
            let mut inner = self.lock();
            ensure_idle(&inner.job)?;
            let file = inner
                .job
                .source_file()
                .cloned()
                .ok_or(JobError::NoFileSelected)?;
            ensure_known_language(&inner.languages, target_language)?;
            let job = contract(
                inner
                    .job
                    .clone()
                    .with_target_language(target_language)
                    .and_then(Job::mark_uploading),
            )?;
            let generation = job.generation();
            self.start_progress(&mut inner, Step::Upload);
            self.commit(&mut inner, job);
            (generation, file)
        };
        tracing::info!("extract start: {} -> {}", file.name(), target_language);

        let guard = InFlight::new(self, generation, Step::Upload);
        let result = self.remote.upload(&file, target_language).await;
        // Disarm before locking; the guard's drop takes the same lock.
        guard.disarm();

        let mut inner = self.lock();
        ensure_current(&inner.job, generation)?;
        match result {
            Ok(up) => {
                tracing::info!("extract done: job {}", up.job_id);
                let job = contract(inner.job.clone().mark_extracted(up.job_id, up.text_preview))?;
                finish_progress(&mut inner);
                Ok(self.commit(&mut inner, job))
            }
            Err(e) => Err(self.fail(&mut inner, Step::Upload, e)),
        }
    }

    /// Translate the extracted text with the job's language and options.
    pub async fn translate(&self) -> Result<Job, JobError> {
        let (generation, job_id, language, options) = {
            let mut inner = self.lock();
            ensure_idle(&inner.job)?;
            let job = contract(inner.job.clone().mark_translating())?;
            let job_id = job.id().map(str::to_string).ok_or(JobError::NotExtracted)?;
            let request = (
                job.generation(),
                job_id,
                job.target_language().to_string(),
                job.options(),
            );
            self.start_progress(&mut inner, Step::Translate);
            self.commit(&mut inner, job);
            request
        };
        tracing::info!("translate start: job {job_id} -> {language} {options:?}");

        let guard = InFlight::new(self, generation, Step::Translate);
        let result = self.remote.translate(&job_id, &language, options).await;
        guard.disarm();

        let mut inner = self.lock();
        ensure_current(&inner.job, generation)?;
        match result {
            Ok(tr) => {
                tracing::info!("translate done: job {job_id}");
                let job = contract(inner.job.clone().mark_translated(tr.text_preview))?;
                finish_progress(&mut inner);
                Ok(self.commit(&mut inner, job))
            }
            Err(e) => Err(self.fail(&mut inner, Step::Translate, e)),
        }
    }

    /// Fetch the translated file. The job itself is left untouched.
    pub async fn download(&self) -> Result<Download, JobError> {
        let (job_id, language) = {
            let inner = self.lock();
            ensure_idle(&inner.job)?;
            let job_id = inner.job.id().ok_or(JobError::NotExtracted)?.to_string();
            (job_id, inner.job.target_language().to_string())
        };
        tracing::info!("download start: job {job_id} ({language})");
        let download = self
            .remote
            .download(&job_id, &language)
            .await
            .inspect_err(|e| tracing::warn!("download failed: job {job_id}: {e}"))?;
        tracing::info!(
            "download done: {} ({} bytes)",
            download.filename,
            download.bytes.len()
        );
        Ok(download)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }

    /// Swap in a new job, abandoning whatever the old one had in flight.
    fn replace_job(&self, job: Job) -> Job {
        let mut inner = self.lock();
        if inner.job.is_busy() {
            tracing::info!("abandoning in-flight {} call", inner.job.status());
        }
        cancel_progress(&mut inner);
        self.commit(&mut inner, job)
    }

    /// Store the job and publish it.
    fn commit(&self, inner: &mut Inner, job: Job) -> Job {
        inner.job = job.clone();
        self.subscribers.notify(JobEvent::StateChanged(job.clone()));
        job
    }

    /// Point the emitter at `step` and start a run with that step's cadence.
    fn start_progress(&self, inner: &mut Inner, step: Step) {
        let increment = match step {
            Step::Upload => self.progress.upload_step,
            Step::Translate => self.progress.translate_step,
        };
        // Replacing the emitter drops, and so cancels, the previous one.
        let mut emitter = ProgressEmitter::new(
            Duration::from_millis(self.progress.tick_ms),
            progress_sink(self.subscribers.clone(), step),
        );
        emitter.start(increment, self.progress.cap);
        inner.emitter = Some(emitter);
    }

    /// Revert the job after a remote failure and surface the error.
    fn fail(&self, inner: &mut Inner, step: Step, error: RemoteError) -> JobError {
        tracing::warn!("{step} failed: {error}");
        cancel_progress(inner);
        match inner.job.clone().mark_failed(error.clone()) {
            Ok(job) => {
                self.commit(inner, job);
                self.subscribers.notify(JobEvent::Failed {
                    step,
                    error: error.clone(),
                });
                JobError::Remote(error)
            }
            Err(e) => contract_violation(e),
        }
    }
}

/// Reverts a busy job when its command future is dropped before the remote
/// call resolves, e.g. by a timeout wrapped around `extract`/`translate`.
struct InFlight<'a> {
    orch: &'a JobOrchestrator,
    generation: Uuid,
    step: Step,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(orch: &'a JobOrchestrator, generation: Uuid, step: Step) -> Self {
        Self {
            orch,
            generation,
            step,
            armed: true,
        }
    }

    /// The call resolved; its result is applied by the command itself.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.orch.lock();
        // A replaced job already abandoned this call.
        if inner.job.generation() != self.generation || !inner.job.is_busy() {
            return;
        }
        tracing::warn!("{} call dropped before completing", self.step);
        let _ = self.orch.fail(
            &mut inner,
            self.step,
            RemoteError::Network("cancelled".into()),
        );
    }
}

fn finish_progress(inner: &mut Inner) {
    if let Some(mut emitter) = inner.emitter.take() {
        emitter.complete();
    }
}

fn cancel_progress(inner: &mut Inner) {
    if let Some(mut emitter) = inner.emitter.take() {
        emitter.cancel();
    }
}

fn progress_sink(subscribers: Subscribers, step: Step) -> ProgressSink {
    Arc::new(move |percent| subscribers.notify(JobEvent::Progress { step, percent }))
}

fn ensure_idle(job: &Job) -> Result<(), JobError> {
    if job.is_busy() {
        tracing::warn!("command rejected: job is {}", job.status());
        return Err(JobError::OperationInProgress(job.status()));
    }
    Ok(())
}

/// Unknown languages are only rejected once a list has been loaded.
fn ensure_known_language(languages: &[String], language: &str) -> Result<(), JobError> {
    if languages.is_empty() || languages.iter().any(|l| l == language) {
        Ok(())
    } else {
        Err(JobError::UnknownLanguage(language.to_string()))
    }
}

/// A result arriving for a replaced job is dropped.
fn ensure_current(job: &Job, generation: Uuid) -> Result<(), JobError> {
    if job.generation() != generation {
        tracing::debug!("discarding result for replaced job {generation}");
        return Err(JobError::Superseded);
    }
    Ok(())
}

fn contract<T>(r: Result<T, InvalidTransition>) -> Result<T, JobError> {
    r.map_err(contract_violation)
}

fn contract_violation(e: InvalidTransition) -> JobError {
    tracing::error!("contract violation: {e}");
    JobError::InvalidTransition(e)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

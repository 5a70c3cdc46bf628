//! Background worker running orchestrator commands for the UI.

use anyhow::Result;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, sync::mpsc};

use crate::{
    api::{Download, http::HttpRemoteClient},
    config::Config,
    jobs::{SourceFile, TranslateOptions},
    orchestrator::{JobError, JobEvent, JobOrchestrator},
};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Fetch the supported target languages.
    LoadLanguages,
    /// Read a document from disk and make it the current job.
    SelectFile {
        path: PathBuf,
        language: String,
        options: TranslateOptions,
    },
    /// Drop the current document.
    RemoveFile,
    /// Change the target language of the current job.
    SetLanguage(String),
    /// Change the translation options of the current job.
    SetOptions(TranslateOptions),
    /// Upload and extract text in the given language.
    Extract(String),
    /// Translate the extracted text.
    Translate,
    /// Download the translation into the output directory.
    Download,
    /// Apply updated settings.
    SaveSettings(Config),
}

/// Events emitted by the worker for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// Change published by the orchestrator.
    Job(JobEvent),
    /// Supported languages fetched from the service.
    LanguagesLoaded(Vec<String>),
    /// Translation written to disk.
    Downloaded(PathBuf),
    /// Informational log message.
    Log(String),
    /// User-visible error message.
    Error(String),
}

/// Main worker loop: build the client, then handle commands in order.
///
/// Remote calls run on their own tasks so a busy job never blocks the loop;
/// the orchestrator itself rejects overlapping calls.
pub async fn run(mut rx: mpsc::Receiver<WorkerCmd>, tx: mpsc::Sender<WorkerEvent>, mut cfg: Config) {
    let remote = match HttpRemoteClient::new(&cfg.server) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("HTTP client init failed: {e}");
            let _ = tx
                .send(WorkerEvent::Error(format!("HTTP client init failed: {e}")))
                .await;
            return;
        }
    };
    let orch = JobOrchestrator::new(Arc::new(remote), cfg.progress);
    tracing::info!("worker started ({})", cfg.server.base_url);

    // Forward orchestrator events to the UI.
    let mut job_rx = orch.subscribe();
    let forward_tx = tx.clone();
    tokio::spawn(async move {
        while let Some(ev) = job_rx.recv().await {
            if forward_tx.send(WorkerEvent::Job(ev)).await.is_err() {
                break;
            }
        }
    });

    while let Some(cmd) = rx.recv().await {
        match cmd {
            WorkerCmd::SaveSettings(new_cfg) => {
                tracing::info!("settings updated");
                cfg = new_cfg;
                let _ = tx.send(WorkerEvent::Log("settings updated".into())).await;
            }

            WorkerCmd::SelectFile {
                path,
                language,
                options,
            } => {
                let r = select_file(&orch, &path, &language, options).await;
                report(&tx, "open file", r.map(|name| format!("opened {name}"))).await;
            }

            WorkerCmd::RemoveFile => {
                orch.remove_file();
                let _ = tx.send(WorkerEvent::Log("file removed".into())).await;
            }

            WorkerCmd::SetLanguage(language) => {
                if let Err(e) = orch.set_target_language(&language) {
                    report_err(&tx, "set language", e.into()).await;
                }
            }

            WorkerCmd::SetOptions(options) => {
                if let Err(e) = orch.set_options(options) {
                    report_err(&tx, "set options", e.into()).await;
                }
            }

            WorkerCmd::LoadLanguages => {
                let (orch, tx) = (orch.clone(), tx.clone());
                tokio::spawn(async move {
                    match orch.load_languages().await {
                        Ok(languages) => {
                            let _ = tx.send(WorkerEvent::LanguagesLoaded(languages)).await;
                        }
                        Err(e) => report_err(&tx, "load languages", e.into()).await,
                    }
                });
            }

            WorkerCmd::Extract(language) => {
                let (orch, tx) = (orch.clone(), tx.clone());
                tokio::spawn(async move {
                    let r = orch.extract(&language).await;
                    report_job(&tx, "extract", r.map(|_| "text extracted".to_string())).await;
                });
            }

            WorkerCmd::Translate => {
                let (orch, tx) = (orch.clone(), tx.clone());
                tokio::spawn(async move {
                    let r = orch.translate().await;
                    report_job(&tx, "translate", r.map(|_| "translation completed".to_string()))
                        .await;
                });
            }

            WorkerCmd::Download => {
                let (orch, tx) = (orch.clone(), tx.clone());
                let dir = PathBuf::from(&cfg.download.output_dir);
                tokio::spawn(async move {
                    let download = match orch.download().await {
                        Ok(d) => d,
                        Err(e) => return report_err(&tx, "download", e.into()).await,
                    };
                    match save_download(&dir, &download).await {
                        Ok(path) => {
                            tracing::info!("saved {}", path.display());
                            let _ = tx.send(WorkerEvent::Downloaded(path)).await;
                        }
                        Err(e) => report_err(&tx, "save download", e).await,
                    }
                });
            }
        }
    }
    tracing::info!("worker stopped");
}

/// Load a document and apply the UI's current language and options to it.
async fn select_file(
    orch: &JobOrchestrator,
    path: &Path,
    language: &str,
    options: TranslateOptions,
) -> Result<String> {
    let file = SourceFile::from_path(path).await?;
    let name = file.name().to_string();
    orch.select_file(file)?;
    if !language.is_empty() {
        orch.set_target_language(language)?;
    }
    orch.set_options(options)?;
    Ok(name)
}

/// Write a download into `dir`, creating it if needed.
async fn save_download(dir: &Path, download: &Download) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(&download.filename);
    fs::write(&path, &download.bytes).await?;
    Ok(path)
}

/// Report the outcome of a job command; abandoned calls are only logged.
async fn report_job(tx: &mpsc::Sender<WorkerEvent>, what: &str, r: Result<String, JobError>) {
    match r {
        Err(JobError::Superseded) => {
            let _ = tx
                .send(WorkerEvent::Log(format!("{what} result discarded (file changed)")))
                .await;
        }
        r => report(tx, what, r.map_err(anyhow::Error::from)).await,
    }
}

async fn report(tx: &mpsc::Sender<WorkerEvent>, what: &str, r: Result<String>) {
    match r {
        Ok(msg) => {
            let _ = tx.send(WorkerEvent::Log(msg)).await;
        }
        Err(e) => report_err(tx, what, e).await,
    }
}

async fn report_err(tx: &mpsc::Sender<WorkerEvent>, what: &str, e: anyhow::Error) {
    tracing::warn!("{what} failed: {e}");
    let _ = tx
        .send(WorkerEvent::Error(format!("{what} failed: {e}")))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_download_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/downloads");
        let download = Download {
            filename: "translation_French.txt".into(),
            bytes: b"Bonjour le monde".to_vec(),
        };

        let path = save_download(&out, &download).await.unwrap();
        assert_eq!(path, out.join("translation_French.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"Bonjour le monde");
    }

    #[tokio::test]
    async fn test_superseded_is_logged_not_raised() {
        let (tx, mut rx) = mpsc::channel(4);
        report_job(&tx, "extract", Err(JobError::Superseded)).await;
        assert!(matches!(rx.recv().await, Some(WorkerEvent::Log(_))));

        report_job(&tx, "extract", Err(JobError::NoFileSelected)).await;
        match rx.recv().await {
            Some(WorkerEvent::Error(msg)) => assert_eq!(msg, "extract failed: no file selected"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

//! TUI event loop and app state.

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, time::Duration};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    events::UiState,
    input::InputBoxState,
    jobs::{Job, Step, TranslateOptions},
    orchestrator::JobEvent,
    shortcuts::Shortcuts,
    ui::Tui,
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// App state shared by input handling and rendering.
pub struct App {
    /// Path of the persisted config file.
    pub cfg_path: PathBuf,
    /// Config currently in effect.
    pub cfg: Config,
    /// Screen, status and log.
    pub ui: UiState,
    /// Last job snapshot published by the orchestrator.
    pub job: Job,
    /// Progress of the running step, if any.
    pub progress: Option<(Step, u8)>,
    /// Supported target languages.
    pub languages: Vec<String>,
    /// Index of the selected language in `languages`.
    pub language_idx: usize,
    /// Options applied to the current and next documents.
    pub options: TranslateOptions,
    /// Command channel to the worker.
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    /// Event channel from the worker.
    pub worker_rx: mpsc::Receiver<WorkerEvent>,

    /// Settings screen buffer for the download directory.
    pub output_dir: String,
    /// Settings screen buffer for the default language.
    pub default_language: String,

    /// Open text input, if any.
    pub input_box: Option<InputBoxState>,
    /// Key bindings.
    pub shortcuts: Shortcuts,
}

impl App {
    /// Selected target language, or the configured default before the list loads.
    pub fn selected_language(&self) -> &str {
        self.languages
            .get(self.language_idx)
            .map(String::as_str)
            .unwrap_or(self.cfg.translate.default_language.as_str())
    }
}

/// Run the UI loop until the user quits.
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    let cfg_path = PathBuf::from("config.toml");
    let cfg = Config::load_or_default(&cfg_path)?;
    let shortcuts = Shortcuts::load_or_default("shortcut.toml")?;

    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);
    tokio::spawn(worker::run(rx_cmd, tx_ev, cfg.clone()));

    let mut app = App {
        cfg_path,
        options: cfg.translate.options(),
        output_dir: cfg.download.output_dir.clone(),
        default_language: cfg.translate.default_language.clone(),
        cfg,
        ui: UiState::new(),
        job: Job::reset(),
        progress: None,
        languages: vec![],
        language_idx: 0,
        worker_tx: tx_cmd,
        worker_rx: rx_ev,
        input_box: None,
        shortcuts,
    };

    app.worker_tx.send(WorkerCmd::LoadLanguages).await?;
    app.ui.status = "Loading languages...".into();

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Drain worker events before polling input.
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev);
        }

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}

/// Apply a worker event to the app state.
fn handle_worker_event(app: &mut App, ev: WorkerEvent) {
    match ev {
        WorkerEvent::Job(JobEvent::StateChanged(job)) => {
            // A different generation means the document was replaced.
            if job.generation() != app.job.generation() {
                app.progress = None;
            }
            app.ui.status = format!("Job: {}", job.status());
            app.job = job;
        }
        WorkerEvent::Job(JobEvent::Progress { step, percent }) => {
            app.progress = Some((step, percent));
        }
        WorkerEvent::Job(JobEvent::Failed { step, error }) => {
            app.progress = None;
            app.ui.push_log(format!("{step} failed: {error}"));
        }
        WorkerEvent::LanguagesLoaded(languages) => {
            app.language_idx = languages
                .iter()
                .position(|l| *l == app.cfg.translate.default_language)
                .unwrap_or(0);
            app.ui.push_log(format!("{} languages available", languages.len()));
            app.ui.status = "Ready".into();
            app.languages = languages;
        }
        WorkerEvent::Downloaded(path) => {
            app.ui.push_log(format!("saved {}", path.display()));
            app.ui.status = format!("Downloaded to {}", path.display());
        }
        WorkerEvent::Log(s) => {
            app.ui.push_log(s);
        }
        WorkerEvent::Error(s) => {
            app.ui.push_log(&s);
            app.ui.error = Some(s);
        }
    }
}

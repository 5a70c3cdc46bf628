//! Key handlers.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::{io::Write, path::PathBuf};

use crate::{
    events::Screen,
    input::{InputBoxState, InputCallbackId},
    jobs::JobStatus,
    shortcuts, ui,
    worker::WorkerCmd,
};

use super::App;

/// Handle one key press; returns true when the app should exit.
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // An open input box takes every key.
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }

    match app.ui.screen {
        Screen::Main => handle_main_key(app, k).await,
        Screen::Settings => handle_settings_key(app, k).await,
    }
}

pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// Send a command to the worker, clearing the previous error.
async fn send(app: &mut App, cmd: WorkerCmd, status: &str) -> Result<()> {
    tracing::info!("ui command: {cmd:?}");
    app.ui.error = None;
    app.ui.status = status.into();
    app.worker_tx.send(cmd).await?;
    Ok(())
}

async fn handle_main_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.main;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.settings) {
        reload_settings_buffers(app);
        app.ui.screen = Screen::Settings;
        app.ui.status = "Settings".into();
    } else if shortcuts::matches_shortcut(&k, &sc.open_file) {
        app.input_box = Some(InputBoxState::new(
            "PDF file path:",
            "",
            InputCallbackId::OpenFile,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.remove_file) {
        if app.job.source_file().is_some() {
            send(app, WorkerCmd::RemoveFile, "Removing file...").await?;
        } else {
            app.ui.status = "No file to remove".into();
        }
    } else if shortcuts::matches_shortcut(&k, &sc.extract) {
        request_extract(app).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.translate) {
        request_translate(app).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.download) {
        if app.job.id().is_some() {
            send(app, WorkerCmd::Download, "Downloading...").await?;
        } else {
            app.ui.status = "Nothing to download yet".into();
        }
    } else if shortcuts::matches_shortcut(&k, &sc.copy_translation) {
        copy_translation(app, &mut std::io::stdout())?;
    } else if shortcuts::matches_shortcut(&k, &sc.next_language) {
        cycle_language(app, 1).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.prev_language) {
        cycle_language(app, -1).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.toggle_formatting) {
        toggle_option(app, |o| o.preserve_formatting = !o.preserve_formatting).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.toggle_original) {
        toggle_option(app, |o| o.include_original = !o.include_original).await?;
    }

    Ok(false)
}

/// Extract is only offered for an idle document; busy states go through so
/// the orchestrator can reject them.
async fn request_extract(app: &mut App) -> Result<()> {
    if app.job.source_file().is_none() {
        app.ui.status = "Open a PDF first".into();
        return Ok(());
    }
    match app.job.status() {
        JobStatus::Extracted | JobStatus::Translated => {
            app.ui.status = "Text already extracted".into();
        }
        _ => {
            let language = app.selected_language().to_string();
            send(app, WorkerCmd::Extract(language), "Extracting text...").await?;
        }
    }
    Ok(())
}

async fn request_translate(app: &mut App) -> Result<()> {
    if app.job.status() == JobStatus::Idle {
        app.ui.status = "Extract the text first".into();
        return Ok(());
    }
    send(app, WorkerCmd::Translate, "Translating...").await
}

/// Copy the translated preview to the clipboard.
fn copy_translation(app: &mut App, out: &mut impl Write) -> Result<()> {
    let text = app.job.translated_preview();
    if text.is_empty() {
        app.ui.status = "Nothing to copy yet".into();
        return Ok(());
    }
    let chars = text.chars().count();
    ui::copy_to_clipboard(out, text)?;
    app.ui.push_log(format!("copied {chars} characters"));
    app.ui.status = "Translation copied to clipboard".into();
    Ok(())
}

/// Move the language selection; the job's language is fixed once translated.
async fn cycle_language(app: &mut App, delta: isize) -> Result<()> {
    if app.languages.is_empty() {
        app.ui.status = "Languages not loaded".into();
        return Ok(());
    }
    match app.job.status() {
        JobStatus::Idle | JobStatus::Extracted => {}
        JobStatus::Translated => {
            app.ui.status = "Language is fixed after translation; remove the file to start over".into();
            return Ok(());
        }
        busy => {
            app.ui.status = format!("Busy ({busy})");
            return Ok(());
        }
    }

    let n = app.languages.len() as isize;
    app.language_idx = (app.language_idx as isize + delta).rem_euclid(n) as usize;
    let language = app.selected_language().to_string();
    if app.job.source_file().is_some() {
        send(app, WorkerCmd::SetLanguage(language.clone()), "").await?;
    }
    app.ui.status = format!("Target language: {language}");
    Ok(())
}

async fn toggle_option(
    app: &mut App,
    f: impl FnOnce(&mut crate::jobs::TranslateOptions),
) -> Result<()> {
    if app.job.is_busy() {
        app.ui.status = format!("Busy ({})", app.job.status());
        return Ok(());
    }
    f(&mut app.options);
    let options = app.options;
    send(app, WorkerCmd::SetOptions(options), "Options updated").await
}

async fn handle_settings_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.settings;

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        reload_settings_buffers(app);
        app.ui.screen = Screen::Main;
    } else if shortcuts::matches_shortcut(&k, &sc.save) {
        app.cfg.download.output_dir = app.output_dir.clone();
        app.cfg.translate.default_language = app.default_language.clone();
        // Current toggles become the defaults.
        app.cfg.translate.preserve_formatting = app.options.preserve_formatting;
        app.cfg.translate.include_original = app.options.include_original;
        app.cfg.save(&app.cfg_path)?;

        app.worker_tx
            .send(WorkerCmd::SaveSettings(app.cfg.clone()))
            .await?;
        app.ui.screen = Screen::Main;
        app.ui.status = "Saved settings".into();
    } else if shortcuts::matches_shortcut(&k, &sc.output_dir) {
        app.input_box = Some(InputBoxState::new(
            "Download directory:",
            app.output_dir.clone(),
            InputCallbackId::SettingsOutputDir,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.default_language) {
        app.input_box = Some(InputBoxState::new(
            "Default language:",
            app.default_language.clone(),
            InputCallbackId::SettingsDefaultLanguage,
        ));
    }

    Ok(false)
}

async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };
    let sc = &app.shortcuts.input_box;

    if is_ctrl_c(&k) {
        return Ok(true);
    }

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id.clone();
        app.input_box = None;
        apply_input_callback(app, callback_id, value).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        input_state.insert_char(c);
    }

    Ok(false)
}

async fn apply_input_callback(
    app: &mut App,
    callback_id: InputCallbackId,
    value: String,
) -> Result<()> {
    match callback_id {
        InputCallbackId::OpenFile => {
            let path = value.trim();
            if path.is_empty() {
                return Ok(());
            }
            let cmd = WorkerCmd::SelectFile {
                path: PathBuf::from(path),
                language: app.selected_language().to_string(),
                options: app.options,
            };
            send(app, cmd, "Opening file...").await?;
        }
        InputCallbackId::SettingsOutputDir => app.output_dir = value,
        InputCallbackId::SettingsDefaultLanguage => app.default_language = value,
    }
    Ok(())
}

/// Refill the settings buffers from the config in effect.
fn reload_settings_buffers(app: &mut App) {
    app.output_dir = app.cfg.download.output_dir.clone();
    app.default_language = app.cfg.translate.default_language.clone();
}

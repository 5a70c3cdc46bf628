//! Drawing.

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

use crate::{
    events::Screen,
    input,
    jobs::{Job, JobStatus},
    layout,
    shortcuts::Shortcuts,
};

use super::App;

/// Log lines shown in the info panel.
const LOG_TAIL: usize = 6;

pub fn draw(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());

    match app.ui.screen {
        Screen::Main => draw_main_body(f, app, main_layout.body),
        Screen::Settings => draw_settings_body(f, app, main_layout.body),
    }

    let help_bar = Paragraph::new(help_text(app.ui.screen, &app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);
    f.render_widget(status_bar(app), main_layout.status_bar);

    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

fn draw_main_body(f: &mut Frame, app: &App, area: Rect) {
    let body = layout::create_body_layout(area);

    let document = Paragraph::new(document_text(&app.job))
        .block(Block::default().borders(Borders::ALL).title("DOCUMENT"))
        .wrap(Wrap { trim: true });
    f.render_widget(document, body.document);

    let (label, percent) = match app.progress {
        Some((step, percent)) => (format!("{step} {percent}%"), percent),
        None => ("idle".to_string(), 0),
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("PROGRESS"))
        .gauge_style(Style::default().fg(Color::Rgb(255, 140, 0)))
        .percent(u16::from(percent.min(100)))
        .label(label);
    f.render_widget(gauge, body.progress);

    f.render_widget(
        preview("ORIGINAL", app.job.original_preview()),
        body.original,
    );
    f.render_widget(
        preview("TRANSLATED", app.job.translated_preview()),
        body.translated,
    );

    let info = Paragraph::new(info_text(app))
        .block(Block::default().borders(Borders::ALL).title("INFO"))
        .wrap(Wrap { trim: true });
    f.render_widget(info, body.info);
}

fn preview<'a>(title: &'a str, text: &'a str) -> Paragraph<'a> {
    let p = if text.is_empty() {
        Paragraph::new("-").style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(text)
    };
    p.block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
}

fn document_text(job: &Job) -> String {
    let Some(file) = job.source_file() else {
        return "No document. Press the open key to choose a PDF.".into();
    };
    let options = job.options();
    let mut lines = vec![
        format!("File: {} ({})", file.name(), human_size(file.size())),
        format!("State: {}", job.status()),
        format!("Job ID: {}", job.id().unwrap_or("-")),
        format!("Target: {}", job.target_language()),
        format!(
            "Formatting: {} | Original: {}",
            on_off(options.preserve_formatting),
            on_off(options.include_original)
        ),
    ];
    if let Some(failure) = job.last_error() {
        lines.push(format!("Last {} failed: {}", failure.step, failure.error));
    }
    lines.join("\n")
}

fn info_text(app: &App) -> String {
    let language = if app.languages.is_empty() {
        format!("{} (list not loaded)", app.selected_language())
    } else {
        format!(
            "{} ({}/{})",
            app.selected_language(),
            app.language_idx + 1,
            app.languages.len()
        )
    };
    let log_start = app.ui.log.len().saturating_sub(LOG_TAIL);
    format!(
        "Language: {}\nNext options: formatting {}, original {}\nDownloads: {}\n\nLog:\n{}",
        language,
        on_off(app.options.preserve_formatting),
        on_off(app.options.include_original),
        app.cfg.download.output_dir,
        app.ui.log[log_start..].join("\n"),
    )
}

fn draw_settings_body(f: &mut Frame, app: &App, area: Rect) {
    let text = format!(
        "Server: {}\n\nDownload directory: {}\nDefault language: {}\n\nSaved toggles: formatting {}, original {}",
        app.cfg.server.base_url,
        app.output_dir,
        app.default_language,
        on_off(app.options.preserve_formatting),
        on_off(app.options.include_original),
    );
    let settings = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("SETTINGS"))
        .wrap(Wrap { trim: true });
    f.render_widget(settings, area);
}

fn status_bar(app: &App) -> Paragraph<'static> {
    let screen = match app.ui.screen {
        Screen::Main => "Main",
        Screen::Settings => "Settings",
    };
    let busy = if app.job.is_busy() { " *" } else { "" };

    let text = match &app.ui.error {
        Some(err) => format!("[{screen}]{busy} ERROR: {err}"),
        None => format!("[{screen}]{busy} {}", app.ui.status),
    };
    let mut bar = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });
    if app.ui.error.is_some() {
        bar = bar.style(Style::default().fg(Color::Red));
    }
    bar
}

fn help_text(screen: Screen, shortcuts: &Shortcuts) -> String {
    match screen {
        Screen::Main => {
            let m = &shortcuts.main;
            format!(
                "{}: open | {}: remove | {}: extract | {}: translate | {}: download | {}: copy | {}/{}: language | {}: formatting | {}: original | {}: settings | {}: quit",
                keys(&m.open_file),
                keys(&m.remove_file),
                keys(&m.extract),
                keys(&m.translate),
                keys(&m.download),
                keys(&m.copy_translation),
                keys(&m.prev_language),
                keys(&m.next_language),
                keys(&m.toggle_formatting),
                keys(&m.toggle_original),
                keys(&m.settings),
                keys(&m.quit),
            )
        }
        Screen::Settings => {
            let s = &shortcuts.settings;
            format!(
                "{}: download dir | {}: default language | {}: save | {}: cancel",
                keys(&s.output_dir),
                keys(&s.default_language),
                keys(&s.save),
                keys(&s.cancel),
            )
        }
    }
}

fn keys(bindings: &[String]) -> String {
    bindings.join("/")
}

fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}

fn human_size(bytes: u64) -> String {
    match bytes {
        b if b >= 1 << 20 => format!("{:.1} MiB", b as f64 / (1 << 20) as f64),
        b if b >= 1 << 10 => format!("{:.1} KiB", b as f64 / (1 << 10) as f64),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{PDF_CONTENT_TYPE, SourceFile};

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_document_text_shows_state() {
        assert!(document_text(&Job::reset()).starts_with("No document"));

        let job = Job::create(SourceFile::new("doc.pdf", PDF_CONTENT_TYPE, vec![0; 10]))
            .mark_uploading()
            .and_then(|j| j.mark_extracted("J1", "Hello"))
            .unwrap();
        let text = document_text(&job);
        assert!(text.contains("File: doc.pdf (10 B)"));
        assert!(text.contains(&format!("State: {}", JobStatus::Extracted)));
        assert!(text.contains("Job ID: J1"));
    }

    #[test]
    fn test_help_uses_configured_keys() {
        let mut shortcuts = Shortcuts::default();
        shortcuts.main.extract = vec!["Ctrl+e".into()];
        assert!(help_text(Screen::Main, &shortcuts).contains("Ctrl+e: extract"));
    }
}

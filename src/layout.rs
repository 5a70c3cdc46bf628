//! Screen area calculations.

use ratatui::prelude::*;

/// Top-level split of the main screen.
pub struct MainLayout {
    /// Document and translation panels.
    pub body: Rect,
    /// Key binding hints.
    pub help_bar: Rect,
    /// Status or error line.
    pub status_bar: Rect,
}

/// Panels inside the body.
pub struct BodyLayout {
    /// File, state and job id.
    pub document: Rect,
    /// Progress gauge of the running step.
    pub progress: Rect,
    /// Extracted text preview.
    pub original: Rect,
    /// Translated text preview.
    pub translated: Rect,
    /// Options and log.
    pub info: Rect,
}

pub fn create_main_layout(area: Rect) -> MainLayout {
    let [body, help_bar, status_bar] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .areas(area);

    MainLayout {
        body,
        help_bar,
        status_bar,
    }
}

/// Left column: document, progress, original text. Right column: translation over info.
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
    let [document, progress, original] = Layout::vertical([
        Constraint::Length(8),
        Constraint::Length(3),
        Constraint::Min(3),
    ])
    .areas(left);
    let [translated, info] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(12)]).areas(right);

    BodyLayout {
        document,
        progress,
        original,
        translated,
        info,
    }
}

//! Terminal setup and teardown.

use anyhow::Result;
use crossterm::{
    clipboard::CopyToClipboard,
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout, Write};

/// Terminal type used across the app.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Enter raw mode on the alternate screen.
///
/// Also installs a panic hook that restores the terminal first, so a panic
/// message is not swallowed by the alternate screen.
pub fn init_terminal() -> Result<Tui> {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        default_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Leave the alternate screen and raw mode.
pub fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Put `text` on the system clipboard through the terminal (OSC 52).
///
/// Works over SSH; terminals without OSC 52 support ignore it.
pub fn copy_to_clipboard(out: &mut impl Write, text: &str) -> Result<()> {
    execute!(out, CopyToClipboard::to_clipboard_from(text))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_writes_osc52_sequence() {
        let mut out = Vec::new();
        copy_to_clipboard(&mut out, "Bonjour").unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.starts_with("\x1b]52;"));
        // base64 of "Bonjour"
        assert!(written.contains("Qm9uam91cg=="));
    }
}

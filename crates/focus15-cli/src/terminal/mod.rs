//! Terminal plumbing for the interactive timer.

pub mod input;
pub mod view;

use std::io;

use crossterm::{cursor, event, execute, terminal};

/// Raw mode, alternate screen, mouse capture, bracketed paste and focus
/// reporting for as long as the value lives.
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    /// # Errors
    ///
    /// Returns an error if raw mode or any capture mode cannot be enabled.
    /// Whatever was enabled before the failure is undone.
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let session = Self { _private: () };
        execute!(
            io::stdout(),
            terminal::EnterAlternateScreen,
            event::EnableMouseCapture,
            event::EnableBracketedPaste,
            event::EnableFocusChange,
            cursor::Hide
        )?;
        Ok(session)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = execute!(
            stdout,
            event::DisableFocusChange,
            event::DisableBracketedPaste,
            event::DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

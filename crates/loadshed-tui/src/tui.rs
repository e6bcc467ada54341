//! Terminal session: raw mode and the alternate screen for as long as a
//! [`Session`] lives, restored on drop, on a failed start and on panic.

use std::io::{Stdout, stdout};

use color_eyre::eyre::Result;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};
use tracing::error;

pub struct Session {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Session {
    /// Take over the terminal.
    pub fn start() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Self::enter_screen().inspect_err(|_| restore_terminal())
    }

    fn enter_screen() -> Result<Self> {
        execute!(stdout(), EnterAlternateScreen, cursor::Hide)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        terminal.clear()?;
        Ok(Self { terminal })
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = execute!(stdout(), cursor::Show, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

/// Install color-eyre reporting. A panic is written to the log file,
/// then the terminal is restored before the report is printed.
///
/// Call before [`Session::start`].
pub fn install_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .into_hooks();
    eyre_hook.install()?;

    let panic_hook = panic_hook.into_panic_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!(panic = %info, "loadshed panicked");
        restore_terminal();
        panic_hook(info);
    }));
    Ok(())
}

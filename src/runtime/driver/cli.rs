use std::io::{self, Write};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
    EnableFocusChange, EnableMouseCapture,
};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};

use crate::error::DriverError;
use crate::geometry::Size;
use crate::render::QuietPanicHook;
use crate::runtime::DashboardRuntime;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Owns a `DashboardRuntime` and manages raw mode, the alternate screen, and
/// mouse capture around its loop. The terminal is restored even when the
/// loop fails. Panic output goes to the logger while the loop runs.
pub struct CliDriver {
    runtime: DashboardRuntime,
}

impl CliDriver {
    pub fn new(runtime: DashboardRuntime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &DashboardRuntime {
        &self.runtime
    }

    pub fn run(mut self) -> DriverResult<DashboardRuntime> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let quiet = QuietPanicHook::install(self.runtime.dashboard().logger().cloned());
        let result = self.run_inner(&mut stdout);
        drop(quiet);
        self.exit(&mut stdout);
        result.map(|()| self.runtime)
    }

    fn run_inner(&mut self, stdout: &mut impl Write) -> DriverResult<()> {
        let (width, height) = terminal::size()?;
        self.runtime.resize(Size::new(width, height));
        self.runtime.run(stdout)?;
        Ok(())
    }

    fn enter(&self, stdout: &mut impl Write) -> DriverResult<()> {
        terminal::enable_raw_mode().map_err(|err| DriverError::Terminal(err.to_string()))?;
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableBracketedPaste,
            EnableFocusChange,
            Hide,
            Clear(ClearType::All)
        )?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(
            stdout,
            DisableFocusChange,
            DisableBracketedPaste,
            DisableMouseCapture,
            Show,
            LeaveAlternateScreen
        )
        .ok();
        terminal::disable_raw_mode().ok();
    }
}

use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tracing::{debug, warn};

/// Single-key commands driving the two state machines and the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleRecording,
    ToggleTracking,
    ToggleDebug,
}

/// Map a key code to its command, if any
pub fn command_for_key(code: KeyCode) -> Option<Command> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char('r') => Some(Command::ToggleRecording),
        KeyCode::Char('t') => Some(Command::ToggleTracking),
        KeyCode::Char('d') => Some(Command::ToggleDebug),
        _ => None,
    }
}

/// Non-blocking source of at most one pending command per tick.
pub trait CommandSource: Send {
    fn poll(&mut self) -> Result<Option<Command>>;
}

/// Restores the terminal's raw-mode state on every exit path.
struct RawModeGuard;

impl RawModeGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        debug!("Raw mode enabled for keyboard input");
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to disable raw mode: {}", e);
        } else {
            debug!("Raw mode disabled");
        }
    }
}

/// Keyboard-backed command source. Enables terminal raw mode for its
/// lifetime so individual key presses arrive without a newline.
pub struct KeyboardCommands {
    _guard: RawModeGuard,
}

impl KeyboardCommands {
    pub fn new() -> Result<Self> {
        Ok(Self {
            _guard: RawModeGuard::new()?,
        })
    }
}

impl CommandSource for KeyboardCommands {
    fn poll(&mut self) -> Result<Option<Command>> {
        if event::poll(Duration::ZERO)? {
            if let Event::Key(key_event) = event::read()? {
                // Only key presses, not releases or repeats
                if key_event.kind == KeyEventKind::Press {
                    let command = command_for_key(key_event.code);
                    if let Some(cmd) = command {
                        debug!("Key {:?} -> {:?}", key_event.code, cmd);
                    }
                    return Ok(command);
                }
            }
        }
        Ok(None)
    }
}

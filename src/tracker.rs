use crate::error::Result;
use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Interval currently open: the rising-edge instant and its formatted
/// wall-clock strings, captured at the moment motion started.
struct OpenInterval {
    started: Instant,
    date: String,
    time: String,
}

/// Open log sink plus the in-flight interval, present only while tracking
/// is enabled.
struct IntervalSession {
    path: PathBuf,
    sink: Box<dyn Write + Send>,
    open: Option<OpenInterval>,
}

/// Logs one line per completed motion interval.
///
/// An interval opens on a rising edge of the motion flag and closes on the
/// falling edge, at which point a single line
/// `"<MM-DD-YYYY> <HH:MM:SS>, <duration>"` is appended: the rising-edge
/// date and time, and the elapsed seconds to 10 decimal places. Durations
/// are measured on the monotonic clock.
pub struct IntervalTracker {
    session: Option<IntervalSession>,
    was_motion: bool,
}

impl IntervalTracker {
    pub fn new() -> Self {
        Self {
            session: None,
            was_motion: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    /// Enable tracking with a freshly opened log sink. The edge detector is
    /// reset: no interval is open, and motion already present counts as a new
    /// rising edge on the next tick. A no-op when already enabled.
    pub fn enable(&mut self, path: PathBuf, sink: Box<dyn Write + Send>) {
        if self.session.is_some() {
            debug!("Tracking already enabled, ignoring enable");
            return;
        }

        info!("Interval tracking enabled, logging to {}", path.display());
        self.session = Some(IntervalSession {
            path,
            sink,
            open: None,
        });
        self.was_motion = false;
    }

    /// Disable tracking and close the log sink. An interval still open is
    /// dropped unlogged (no falling edge occurred). A no-op when disabled.
    pub fn disable(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => {
                if session.open.is_some() {
                    debug!("Dropping in-flight interval on disable");
                }
                info!("Interval tracking disabled: {}", session.path.display());
                session.sink.flush()?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Feed this tick's motion flag through the edge detector. `now` is the
    /// monotonic timestamp of the tick.
    pub fn observe(&mut self, is_motion: bool, now: Instant) -> Result<()> {
        if let Some(session) = self.session.as_mut() {
            if is_motion && !self.was_motion {
                let wall = Local::now();
                debug!("Motion interval opened");
                session.open = Some(OpenInterval {
                    started: now,
                    date: wall.format("%m-%d-%Y").to_string(),
                    time: wall.format("%H:%M:%S").to_string(),
                });
            } else if !is_motion && self.was_motion {
                if let Some(open) = session.open.take() {
                    write_interval_line(&mut session.sink, &open, now)?;
                }
            }
        }

        self.was_motion = is_motion;
        Ok(())
    }

    /// Write the line for a still-open interval using `now` as the falling
    /// edge, without closing the sink. Called at shutdown so an in-progress
    /// interval is never lost.
    pub fn flush_open(&mut self, now: Instant) -> Result<()> {
        if let Some(session) = self.session.as_mut() {
            if let Some(open) = session.open.take() {
                debug!("Flushing in-flight interval at shutdown");
                write_interval_line(&mut session.sink, &open, now)?;
            }
        }
        Ok(())
    }
}

impl Default for IntervalTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn write_interval_line(
    sink: &mut Box<dyn Write + Send>,
    open: &OpenInterval,
    now: Instant,
) -> Result<()> {
    let duration = now.duration_since(open.started).as_secs_f64();
    debug!("Motion interval closed after {:.3}s", duration);
    writeln!(sink, "{} {}, {:.10}", open.date, open.time, duration)?;
    sink.flush()?;
    Ok(())
}

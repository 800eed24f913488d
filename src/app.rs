use crate::commands::{Command, CommandSource};
use crate::config::McamConfig;
use crate::detector::overlay;
use crate::detector::MotionDetector;
use crate::display::FrameDisplay;
use crate::encode::{default_sink_factory, VideoSinkFactory};
use crate::error::Result;
use crate::naming;
use crate::recording::RecordingController;
use crate::source::FrameSource;
use crate::tracker::IntervalTracker;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// Factory that opens the text sink for a new interval log.
pub type LogSinkFactory = Box<dyn Fn(&Path) -> Result<Box<dyn Write + Send>> + Send>;

/// Default log sink: a buffered file in the output directory.
pub fn default_log_sink_factory() -> LogSinkFactory {
    Box::new(|path| {
        let file = std::fs::File::create(path)?;
        Ok(Box::new(std::io::BufWriter::new(file)) as Box<dyn Write + Send>)
    })
}

/// The application: one tick per captured frame through detect, record,
/// track, display and command dispatch, plus the guarded shutdown sequence
/// that runs on every exit path.
pub struct App {
    config: McamConfig,
    source: Box<dyn FrameSource>,
    display: Box<dyn FrameDisplay>,
    commands: Box<dyn CommandSource>,
    detector: MotionDetector,
    recorder: RecordingController,
    tracker: IntervalTracker,
    debug: bool,
    video_sink_factory: VideoSinkFactory,
    log_sink_factory: LogSinkFactory,
}

impl App {
    pub fn new(
        config: McamConfig,
        source: Box<dyn FrameSource>,
        display: Box<dyn FrameDisplay>,
        commands: Box<dyn CommandSource>,
    ) -> Self {
        let video_sink_factory = default_sink_factory(&config.recording);
        Self::with_factories(
            config,
            source,
            display,
            commands,
            video_sink_factory,
            default_log_sink_factory(),
        )
    }

    pub fn with_factories(
        config: McamConfig,
        source: Box<dyn FrameSource>,
        display: Box<dyn FrameDisplay>,
        commands: Box<dyn CommandSource>,
        video_sink_factory: VideoSinkFactory,
        log_sink_factory: LogSinkFactory,
    ) -> Self {
        let detector = MotionDetector::new(config.detector.clone());
        let recorder = RecordingController::new(config.recording.preroll_frames);

        Self {
            config,
            source,
            display,
            commands,
            detector,
            recorder,
            tracker: IntervalTracker::new(),
            debug: false,
            video_sink_factory,
            log_sink_factory,
        }
    }

    /// Run the capture loop until quit or an unrecoverable failure. The
    /// shutdown sequence runs on both paths before the result is returned.
    pub async fn run(&mut self) -> Result<()> {
        info!("Capture loop starting");
        let result = self.run_loop().await;
        self.shutdown();
        result
    }

    async fn run_loop(&mut self) -> Result<()> {
        loop {
            let frame = self.source.next_frame().await?;

            let reading =
                self.detector
                    .detect(&frame, self.debug, self.tracker.is_enabled());

            self.recorder.observe(&reading.annotated, reading.is_motion)?;
            self.tracker.observe(reading.is_motion, Instant::now())?;

            // Indicators go on a display copy, never into the recording
            let mut display_frame = reading.annotated.clone();
            if self.recorder.is_recording() {
                self.detector.overlay().draw_label(
                    &mut display_frame,
                    "Recording",
                    10,
                    25,
                    overlay::RED,
                );
            }
            if self.debug {
                let x = display_frame.width().saturating_sub(190) as i32;
                self.detector.overlay().draw_label(
                    &mut display_frame,
                    "Debugging",
                    x,
                    25,
                    overlay::WHITE,
                );
                self.display.show_mask(&reading.mask)?;
            }
            self.display.show_live(&display_frame)?;

            // Closing the live window is equivalent to quitting
            if !self.display.is_open() {
                info!("Live window closed, quitting");
                return Ok(());
            }

            match self.commands.poll()? {
                Some(Command::Quit) => {
                    info!("Quit requested");
                    return Ok(());
                }
                Some(Command::ToggleRecording) => self.toggle_recording(),
                Some(Command::ToggleTracking) => self.toggle_tracking(),
                Some(Command::ToggleDebug) => self.toggle_debug(),
                None => {}
            }
        }
    }

    fn toggle_recording(&mut self) {
        if self.recorder.is_recording() {
            if let Err(e) = self.recorder.stop() {
                warn!("Error closing recording sink: {}", e);
            }
            return;
        }

        let out_dir = PathBuf::from(&self.config.recording.output_dir);
        let path = naming::next_save_path(&out_dir, "avi");
        match (self.video_sink_factory)(&path) {
            Ok(sink) => self.recorder.start(path, sink),
            Err(e) => error!("Failed to open recording sink {}: {}", path.display(), e),
        }
    }

    fn toggle_tracking(&mut self) {
        if self.tracker.is_enabled() {
            if let Err(e) = self.tracker.disable() {
                warn!("Error closing interval log: {}", e);
            }
            return;
        }

        let out_dir = PathBuf::from(&self.config.recording.output_dir);
        let path = naming::next_save_path(&out_dir, "txt");
        match (self.log_sink_factory)(&path) {
            Ok(sink) => self.tracker.enable(path, sink),
            Err(e) => error!("Failed to open interval log {}: {}", path.display(), e),
        }
    }

    fn toggle_debug(&mut self) {
        if self.debug {
            self.display.close_mask();
        }
        self.debug = !self.debug;
        info!("Debug overlay {}", if self.debug { "on" } else { "off" });
    }

    /// Release every owned resource in a fixed order, each step guarded so a
    /// failure never skips the remaining releases: flush the in-flight
    /// interval, then camera, display surfaces, recording sink, log sink.
    fn shutdown(&mut self) {
        info!("Shutting down");

        if let Err(e) = self.tracker.flush_open(Instant::now()) {
            warn!("Failed to flush in-flight interval: {}", e);
        }

        self.source.close();
        self.display.close();

        if let Err(e) = self.recorder.stop() {
            warn!("Error closing recording sink: {}", e);
        }
        if let Err(e) = self.tracker.disable() {
            warn!("Error closing interval log: {}", e);
        }

        info!("Shutdown complete");
    }
}

use crate::error::Result;
use crate::frame::Frame;
use crate::preroll::PrerollBuffer;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output destination for recorded video frames.
///
/// Implementations own the underlying file or encoder pipeline; `close` must
/// be safe to call more than once.
pub trait VideoSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Live recording state: the open sink and the pre-roll buffer it owns.
struct RecordingSession {
    path: PathBuf,
    sink: Box<dyn VideoSink>,
    buffer: PrerollBuffer,
}

/// State machine deciding, per frame, whether to buffer or to write.
///
/// `Idle` holds no session; `Armed` owns a [`RecordingSession`]. While armed
/// and quiet, frames accumulate in the pre-roll buffer; on a motion frame the
/// buffered frames are flushed to the sink oldest-first, followed by the
/// current frame, so written frames always preserve acquisition order.
pub struct RecordingController {
    session: Option<RecordingSession>,
    preroll_capacity: usize,
}

impl RecordingController {
    pub fn new(preroll_capacity: usize) -> Self {
        Self {
            session: None,
            preroll_capacity,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    /// Arm recording with a freshly opened sink. A no-op when already armed.
    pub fn start(&mut self, path: PathBuf, sink: Box<dyn VideoSink>) {
        if self.session.is_some() {
            debug!("Recording already armed, ignoring start");
            return;
        }

        info!("Recording armed, writing to {}", path.display());
        self.session = Some(RecordingSession {
            path,
            sink,
            buffer: PrerollBuffer::new(self.preroll_capacity),
        });
    }

    /// Disarm recording and close the sink. Frames still sitting in the
    /// pre-roll buffer are discarded: only motion-adjacent footage persists.
    /// A no-op when already idle.
    pub fn stop(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => {
                let discarded = session.buffer.len();
                if discarded > 0 {
                    debug!("Discarding {} buffered quiet frame(s)", discarded);
                }
                info!("Recording stopped: {}", session.path.display());
                session.sink.close()
            }
            None => Ok(()),
        }
    }

    /// Feed one classified frame into the state machine.
    pub fn observe(&mut self, frame: &Frame, is_motion: bool) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        if is_motion {
            for buffered in session.buffer.flush() {
                session.sink.write_frame(&buffered)?;
            }
            session.sink.write_frame(frame)?;
        } else {
            session.buffer.push(frame.clone());
        }

        Ok(())
    }

    /// Number of frames currently buffered, for diagnostics and tests
    pub fn buffered_len(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::{Arc, Mutex};

    fn tagged_frame(id: u8) -> Frame {
        Frame::new(RgbImage::from_pixel(2, 2, Rgb([id, 0, 0])))
    }

    fn tag(frame: &Frame) -> u8 {
        frame.image.get_pixel(0, 0).0[0]
    }

    /// Records written frame tags and close calls
    struct FakeSink {
        written: Arc<Mutex<Vec<u8>>>,
        closes: Arc<Mutex<u32>>,
    }

    impl VideoSink for FakeSink {
        fn write_frame(&mut self, frame: &Frame) -> Result<()> {
            self.written.lock().unwrap().push(tag(frame));
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            *self.closes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn armed_controller() -> (RecordingController, Arc<Mutex<Vec<u8>>>, Arc<Mutex<u32>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let closes = Arc::new(Mutex::new(0));
        let sink = FakeSink {
            written: Arc::clone(&written),
            closes: Arc::clone(&closes),
        };

        let mut controller = RecordingController::new(8);
        controller.start(PathBuf::from("test.avi"), Box::new(sink));
        (controller, written, closes)
    }

    #[test]
    fn test_idle_controller_ignores_frames() {
        let mut controller = RecordingController::new(8);
        controller.observe(&tagged_frame(1), true).unwrap();
        controller.observe(&tagged_frame(2), false).unwrap();
        assert!(!controller.is_recording());
        assert_eq!(controller.buffered_len(), 0);
    }

    #[test]
    fn test_quiet_frames_buffer_then_motion_flushes_in_order() {
        let (mut controller, written, _) = armed_controller();

        // Frames 1-5 quiet: buffered, nothing written
        for i in 1..=5 {
            controller.observe(&tagged_frame(i), false).unwrap();
            assert_eq!(controller.buffered_len(), i as usize);
        }
        assert!(written.lock().unwrap().is_empty());

        // Frame 6 motion: sink receives 1..=6 in order, buffer drains
        controller.observe(&tagged_frame(6), true).unwrap();
        assert_eq!(*written.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(controller.buffered_len(), 0);
    }

    #[test]
    fn test_sustained_motion_writes_directly() {
        let (mut controller, written, _) = armed_controller();

        controller.observe(&tagged_frame(1), true).unwrap();
        controller.observe(&tagged_frame(2), true).unwrap();
        assert_eq!(*written.lock().unwrap(), vec![1, 2]);
        assert_eq!(controller.buffered_len(), 0);
    }

    #[test]
    fn test_buffer_eviction_while_armed() {
        let (mut controller, written, _) = armed_controller();

        for i in 1..=9 {
            controller.observe(&tagged_frame(i), false).unwrap();
        }
        assert_eq!(controller.buffered_len(), 8);

        controller.observe(&tagged_frame(10), true).unwrap();
        assert_eq!(
            *written.lock().unwrap(),
            vec![2, 3, 4, 5, 6, 7, 8, 9, 10]
        );
    }

    #[test]
    fn test_stop_discards_buffered_frames_and_closes() {
        let (mut controller, written, closes) = armed_controller();

        for i in 1..=3 {
            controller.observe(&tagged_frame(i), false).unwrap();
        }

        controller.stop().unwrap();
        assert!(written.lock().unwrap().is_empty());
        assert_eq!(*closes.lock().unwrap(), 1);
        assert!(!controller.is_recording());
    }

    #[test]
    fn test_double_stop_is_noop() {
        let (mut controller, _, closes) = armed_controller();
        controller.stop().unwrap();
        controller.stop().unwrap();
        assert_eq!(*closes.lock().unwrap(), 1);
    }

    #[test]
    fn test_start_while_armed_is_ignored() {
        let (mut controller, written, _) = armed_controller();
        let other = FakeSink {
            written: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(Mutex::new(0)),
        };
        controller.start(PathBuf::from("other.avi"), Box::new(other));

        controller.observe(&tagged_frame(1), true).unwrap();
        assert_eq!(*written.lock().unwrap(), vec![1]);
        assert_eq!(controller.current_path().unwrap(), Path::new("test.avi"));
    }
}

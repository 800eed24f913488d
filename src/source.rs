use crate::config::SourceConfig;
use crate::error::Result;
use crate::frame::Frame;
use async_trait::async_trait;
use tracing::info;

#[cfg(all(feature = "camera", target_os = "linux"))]
use crate::error::McamError;

/// Live source of captured frames.
///
/// `next_frame` is the only point the tick loop may wait; a source failure is
/// fatal to the caller. `close` releases the capture device and must be safe
/// to call more than once.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Result<Frame>;
    fn close(&mut self);
}

/// Which capture backend to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceBackend {
    /// Default V4L2 webcam
    V4l2,
    /// Alternate libcamera (Pi module) source
    Libcamera,
}

impl SourceBackend {
    pub fn from_config(config: &SourceConfig) -> Self {
        if config.alternate_source {
            SourceBackend::Libcamera
        } else {
            SourceBackend::V4l2
        }
    }
}

/// Open the configured capture backend. Without the `camera` feature a
/// synthetic test-pattern source is used so the application runs headless.
pub async fn create_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    let backend = SourceBackend::from_config(config);

    #[cfg(all(feature = "camera", target_os = "linux"))]
    {
        let source = GstFrameSource::open(backend, config.resolution, config.fps)?;
        Ok(Box::new(source))
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    {
        info!(
            "Camera feature disabled, using synthetic {:?} source at {}x{}",
            backend, config.resolution.0, config.resolution.1
        );
        Ok(Box::new(SyntheticSource::new(
            config.resolution,
            config.fps,
        )))
    }
}

/// GStreamer-backed camera source
#[cfg(all(feature = "camera", target_os = "linux"))]
pub struct GstFrameSource {
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    resolution: (u32, u32),
    closed: bool,
}

#[cfg(all(feature = "camera", target_os = "linux"))]
impl GstFrameSource {
    pub fn open(backend: SourceBackend, resolution: (u32, u32), fps: u32) -> Result<Self> {
        use gstreamer::prelude::*;

        gstreamer::init()
            .map_err(|e| McamError::camera(format!("Failed to initialize GStreamer: {}", e)))?;

        let element = match backend {
            SourceBackend::V4l2 => "v4l2src",
            SourceBackend::Libcamera => "libcamerasrc",
        };

        let pipeline_desc = format!(
            "{} ! videoconvert ! videoscale ! \
             video/x-raw,format=RGB,width={},height={},framerate={}/1 ! \
             appsink name=sink sync=false max-buffers=1 drop=true",
            element, resolution.0, resolution.1, fps
        );

        info!("Opening capture pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| McamError::camera(format!("Failed to create pipeline: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| McamError::camera("Failed to downcast to Pipeline"))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| McamError::camera("Failed to get appsink element"))?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| McamError::camera("Failed to downcast to AppSink"))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| McamError::camera(format!("Failed to start capture pipeline: {}", e)))?;

        Ok(Self {
            pipeline,
            appsink,
            resolution,
            closed: false,
        })
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
#[async_trait]
impl FrameSource for GstFrameSource {
    async fn next_frame(&mut self) -> Result<Frame> {
        let timeout = gstreamer::ClockTime::from_seconds(5);
        let sample = self
            .appsink
            .try_pull_sample(timeout)
            .ok_or_else(|| McamError::camera("Camera stopped delivering frames"))?;

        let buffer = sample
            .buffer()
            .ok_or_else(|| McamError::camera("No buffer in captured sample"))?;

        let map = buffer
            .map_readable()
            .map_err(|e| McamError::camera(format!("Failed to map captured buffer: {}", e)))?;

        Frame::from_raw(self.resolution.0, self.resolution.1, map.as_slice().to_vec())
            .ok_or_else(|| McamError::camera("Captured buffer has unexpected size"))
    }

    fn close(&mut self) {
        use gstreamer::prelude::*;

        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            tracing::warn!("Failed to stop capture pipeline cleanly: {}", e);
        }
    }
}

/// Synthetic test-pattern source: a flat scene with a bright block drifting
/// through it in bursts, so motion detection has something to find.
pub struct SyntheticSource {
    resolution: (u32, u32),
    frame_interval: std::time::Duration,
    tick: u64,
}

impl SyntheticSource {
    pub fn new(resolution: (u32, u32), fps: u32) -> Self {
        Self {
            resolution,
            frame_interval: std::time::Duration::from_secs(1) / fps.max(1),
            tick: 0,
        }
    }

    fn render(&self) -> Frame {
        use image::{Rgb, RgbImage};

        let (width, height) = self.resolution;
        let mut image = RgbImage::from_pixel(width, height, Rgb([60, 60, 60]));

        // Bursts of movement: visible for 40 ticks out of every 80
        if (self.tick / 40) % 2 == 1 {
            let size = (width.min(height) / 6).max(8);
            let x0 = ((self.tick * 5) % (width - size) as u64) as u32;
            let y0 = height / 3;
            for y in y0..(y0 + size).min(height) {
                for x in x0..x0 + size {
                    image.put_pixel(x, y, Rgb([240, 240, 240]));
                }
            }
        }

        Frame::new(image)
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<Frame> {
        tokio::time::sleep(self.frame_interval).await;
        let frame = self.render();
        self.tick += 1;
        Ok(frame)
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        let mut config = SourceConfig::default();
        assert_eq!(SourceBackend::from_config(&config), SourceBackend::V4l2);

        config.alternate_source = true;
        assert_eq!(
            SourceBackend::from_config(&config),
            SourceBackend::Libcamera
        );
    }

    #[tokio::test]
    async fn test_synthetic_source_delivers_frames() {
        let mut source = SyntheticSource::new((64, 48), 1000);
        let frame = source.next_frame().await.unwrap();
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        source.close();
    }

    #[tokio::test]
    async fn test_synthetic_source_eventually_moves() {
        let mut source = SyntheticSource::new((64, 48), 10_000);
        let mut saw_bright = false;
        for _ in 0..90 {
            let frame = source.next_frame().await.unwrap();
            if frame.image.pixels().any(|p| p.0[0] > 200) {
                saw_bright = true;
                break;
            }
        }
        assert!(saw_bright);
    }
}

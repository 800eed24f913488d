use crate::config::RecordingConfig;
use crate::error::Result;
use crate::recording::VideoSink;
use std::path::Path;

#[cfg(all(feature = "video_encoding", target_os = "linux"))]
use crate::error::McamError;
#[cfg(all(feature = "video_encoding", target_os = "linux"))]
use crate::frame::Frame;
#[cfg(all(feature = "video_encoding", target_os = "linux"))]
use tracing::{debug, info, warn};

/// Factory that opens a [`VideoSink`] for a new recording session.
pub type VideoSinkFactory = Box<dyn Fn(&Path) -> Result<Box<dyn VideoSink>> + Send>;

/// Default sink factory for the configured recording format. Without the
/// `video_encoding` feature every open attempt fails, which leaves the
/// recording toggle inert rather than crashing the loop.
pub fn default_sink_factory(config: &RecordingConfig) -> VideoSinkFactory {
    #[cfg(all(feature = "video_encoding", target_os = "linux"))]
    {
        let fps = config.fps;
        Box::new(move |path| {
            let sink = XvidAviSink::create(path, fps)?;
            Ok(Box::new(sink) as Box<dyn VideoSink>)
        })
    }

    #[cfg(not(all(feature = "video_encoding", target_os = "linux")))]
    {
        let _ = config;
        Box::new(|_path| {
            Err(crate::error::McamError::component(
                "video_encoding",
                "Video encoding is not available in this build",
            ))
        })
    }
}

/// MPEG-4 part 2 ("XVID") AVI writer at a fixed frame rate, backed by a
/// GStreamer appsrc pipeline. Frame dimensions are taken from the first
/// written frame.
#[cfg(all(feature = "video_encoding", target_os = "linux"))]
pub struct XvidAviSink {
    location: std::path::PathBuf,
    fps: f64,
    pipeline: Option<EncodePipeline>,
    frame_index: u64,
    closed: bool,
}

#[cfg(all(feature = "video_encoding", target_os = "linux"))]
struct EncodePipeline {
    pipeline: gstreamer::Pipeline,
    appsrc: gstreamer_app::AppSrc,
}

#[cfg(all(feature = "video_encoding", target_os = "linux"))]
impl XvidAviSink {
    pub fn create(path: &Path, fps: f64) -> Result<Self> {
        gstreamer::init().map_err(|e| {
            McamError::component(
                "video_encoding",
                &format!("Failed to initialize GStreamer: {}", e),
            )
        })?;

        info!("Recording sink created: {} at {} fps", path.display(), fps);

        Ok(Self {
            location: path.to_path_buf(),
            fps,
            pipeline: None,
            frame_index: 0,
            closed: false,
        })
    }

    fn open_pipeline(&mut self, width: u32, height: u32) -> Result<()> {
        use gstreamer::prelude::*;

        let fps_n = (self.fps * 1000.0).round() as i32;
        let pipeline_desc = format!(
            "appsrc name=src is-live=false format=time \
             caps=video/x-raw,format=RGB,width={},height={},framerate={}/1000 ! \
             videoconvert ! \
             avenc_mpeg4 bitrate=4000000 ! \
             avimux ! \
             filesink location={}",
            width,
            height,
            fps_n,
            self.location.to_string_lossy()
        );

        debug!("Creating encoding pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| {
                McamError::component(
                    "video_encoding",
                    &format!("Failed to create pipeline: {}", e),
                )
            })?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| McamError::component("video_encoding", "Failed to downcast to Pipeline"))?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| McamError::component("video_encoding", "Failed to get appsrc element"))?
            .downcast::<gstreamer_app::AppSrc>()
            .map_err(|_| McamError::component("video_encoding", "Failed to downcast to AppSrc"))?;

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            McamError::component(
                "video_encoding",
                &format!("Failed to start pipeline: {}", e),
            )
        })?;

        self.pipeline = Some(EncodePipeline { pipeline, appsrc });
        Ok(())
    }
}

#[cfg(all(feature = "video_encoding", target_os = "linux"))]
impl VideoSink for XvidAviSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.pipeline.is_none() {
            self.open_pipeline(frame.width(), frame.height())?;
        }
        let encode = self.pipeline.as_mut().unwrap();

        let data = frame.image.as_raw();
        let mut buffer = gstreamer::Buffer::with_size(data.len()).map_err(|e| {
            McamError::component("video_encoding", &format!("Failed to create buffer: {}", e))
        })?;

        {
            let buffer_ref = buffer.get_mut().unwrap();
            let mut map = buffer_ref.map_writable().map_err(|e| {
                McamError::component("video_encoding", &format!("Failed to map buffer: {}", e))
            })?;
            map.copy_from_slice(data);
        }

        let frame_ns = (self.frame_index as f64 / self.fps * 1e9) as u64;
        let duration_ns = (1e9 / self.fps) as u64;
        buffer
            .get_mut()
            .unwrap()
            .set_pts(gstreamer::ClockTime::from_nseconds(frame_ns));
        buffer
            .get_mut()
            .unwrap()
            .set_duration(gstreamer::ClockTime::from_nseconds(duration_ns));

        encode.appsrc.push_buffer(buffer).map_err(|e| {
            McamError::component("video_encoding", &format!("Failed to push buffer: {:?}", e))
        })?;

        self.frame_index += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        use gstreamer::prelude::*;

        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let Some(encode) = self.pipeline.take() else {
            // No frame was ever written, nothing to finalize
            return Ok(());
        };

        encode.appsrc.end_of_stream().map_err(|e| {
            McamError::component("video_encoding", &format!("Failed to signal EOS: {:?}", e))
        })?;

        if let Some(bus) = encode.pipeline.bus() {
            for msg in bus.iter_timed(gstreamer::ClockTime::from_seconds(30)) {
                match msg.view() {
                    gstreamer::MessageView::Eos(..) => {
                        info!(
                            "Video file finalized: {} ({} frames)",
                            self.location.display(),
                            self.frame_index
                        );
                        break;
                    }
                    gstreamer::MessageView::Error(err) => {
                        let _ = encode.pipeline.set_state(gstreamer::State::Null);
                        return Err(McamError::component(
                            "video_encoding",
                            &format!("Encoding error: {}", err.error()),
                        ));
                    }
                    _ => {}
                }
            }
        }

        encode
            .pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| {
                McamError::component(
                    "video_encoding",
                    &format!("Failed to stop pipeline: {}", e),
                )
            })?;

        Ok(())
    }
}

#[cfg(all(feature = "video_encoding", target_os = "linux"))]
impl Drop for XvidAviSink {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!("Failed to finalize recording on drop: {}", e);
            }
        }
    }
}

use crate::error::Result;
use crate::frame::Frame;
use image::GrayImage;
use tracing::info;

#[cfg(all(feature = "display", target_os = "linux"))]
use crate::error::McamError;

/// Display surfaces: the "Live Feed" window plus an optional "Mask" window
/// shown while the debug overlay is on.
///
/// `is_open` reports whether the live window is still up; the operator
/// closing it is equivalent to a quit command. `close` releases every
/// surface and must be safe to call more than once.
pub trait FrameDisplay: Send {
    fn show_live(&mut self, frame: &Frame) -> Result<()>;
    fn show_mask(&mut self, mask: &GrayImage) -> Result<()>;
    /// Tear down the mask window when the debug overlay is switched off
    fn close_mask(&mut self);
    fn is_open(&self) -> bool;
    fn close(&mut self);
}

/// Open the display backend. Without the `display` feature a no-op display
/// is used so the application runs headless.
pub fn create_display(resolution: (u32, u32)) -> Result<Box<dyn FrameDisplay>> {
    #[cfg(all(feature = "display", target_os = "linux"))]
    {
        Ok(Box::new(GstDisplay::open(resolution)?))
    }

    #[cfg(not(all(feature = "display", target_os = "linux")))]
    {
        let _ = resolution;
        info!("Display feature disabled, frames will not be shown");
        Ok(Box::new(NullDisplay))
    }
}

/// No-op display for headless operation and tests
pub struct NullDisplay;

impl FrameDisplay for NullDisplay {
    fn show_live(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    fn show_mask(&mut self, _mask: &GrayImage) -> Result<()> {
        Ok(())
    }

    fn close_mask(&mut self) {}

    fn is_open(&self) -> bool {
        true
    }

    fn close(&mut self) {}
}

/// GStreamer window display
#[cfg(all(feature = "display", target_os = "linux"))]
pub struct GstDisplay {
    resolution: (u32, u32),
    live: DisplayWindow,
    mask: Option<DisplayWindow>,
    closed: bool,
}

#[cfg(all(feature = "display", target_os = "linux"))]
struct DisplayWindow {
    pipeline: gstreamer::Pipeline,
    appsrc: gstreamer_app::AppSrc,
}

#[cfg(all(feature = "display", target_os = "linux"))]
impl DisplayWindow {
    fn open(name: &str, resolution: (u32, u32), format: &str) -> Result<Self> {
        use gstreamer::prelude::*;

        let pipeline_desc = format!(
            "appsrc name=src is-live=true format=time \
             caps=video/x-raw,format={},width={},height={},framerate=0/1 ! \
             videoconvert ! autovideosink sync=false",
            format, resolution.0, resolution.1
        );

        info!("Opening display window '{}': {}", name, pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| McamError::component("display", &format!("Failed to create pipeline: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| McamError::component("display", "Failed to downcast to Pipeline"))?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| McamError::component("display", "Failed to get appsrc element"))?
            .downcast::<gstreamer_app::AppSrc>()
            .map_err(|_| McamError::component("display", "Failed to downcast to AppSrc"))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| McamError::component("display", &format!("Failed to start pipeline: {}", e)))?;

        Ok(Self { pipeline, appsrc })
    }

    fn push(&mut self, data: &[u8]) -> Result<()> {
        let mut buffer = gstreamer::Buffer::with_size(data.len())
            .map_err(|e| McamError::component("display", &format!("Failed to create buffer: {}", e)))?;

        {
            let buffer_ref = buffer.get_mut().unwrap();
            let mut map = buffer_ref
                .map_writable()
                .map_err(|e| McamError::component("display", &format!("Failed to map buffer: {}", e)))?;
            map.copy_from_slice(data);
        }

        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| McamError::component("display", &format!("Failed to push buffer: {:?}", e)))?;
        Ok(())
    }

    /// True when the pipeline bus reported an error or end-of-stream,
    /// which is what closing the window produces.
    fn has_terminated(&self) -> bool {
        use gstreamer::prelude::*;

        if let Some(bus) = self.pipeline.bus() {
            while let Some(msg) = bus.pop() {
                match msg.view() {
                    gstreamer::MessageView::Error(_) | gstreamer::MessageView::Eos(_) => {
                        return true;
                    }
                    _ => {}
                }
            }
        }
        false
    }

    fn close(&mut self) {
        use gstreamer::prelude::*;

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            tracing::warn!("Failed to stop display pipeline cleanly: {}", e);
        }
    }
}

#[cfg(all(feature = "display", target_os = "linux"))]
impl GstDisplay {
    pub fn open(resolution: (u32, u32)) -> Result<Self> {
        gstreamer::init().map_err(|e| {
            McamError::component("display", format!("Failed to initialize GStreamer: {}", e))
        })?;

        Ok(Self {
            resolution,
            live: DisplayWindow::open("Live Feed", resolution, "RGB")?,
            mask: None,
            closed: false,
        })
    }
}

#[cfg(all(feature = "display", target_os = "linux"))]
impl FrameDisplay for GstDisplay {
    fn show_live(&mut self, frame: &Frame) -> Result<()> {
        self.live.push(frame.image.as_raw())
    }

    fn show_mask(&mut self, mask: &GrayImage) -> Result<()> {
        if self.mask.is_none() {
            self.mask = Some(DisplayWindow::open("Mask", self.resolution, "GRAY8")?);
        }
        self.mask.as_mut().unwrap().push(mask.as_raw())
    }

    fn close_mask(&mut self) {
        if let Some(mut window) = self.mask.take() {
            window.close();
        }
    }

    fn is_open(&self) -> bool {
        !self.live.has_terminated()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.close_mask();
        self.live.close();
    }
}

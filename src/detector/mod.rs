pub mod background;
pub mod morphology;
pub mod overlay;
pub mod regions;

use crate::config::DetectorConfig;
use crate::frame::Frame;
use background::BackgroundModel;
use image::GrayImage;
use overlay::Overlay;
use regions::Region;
use tracing::{debug, trace};

/// Result of classifying a single frame.
#[derive(Debug)]
pub struct MotionReading {
    /// Rotated frame with annotations burned in
    pub annotated: Frame,
    /// Cleaned binary foreground mask (0 or 255)
    pub mask: GrayImage,
    /// True when at least one region larger than the area threshold survived
    pub is_motion: bool,
    /// Bounding boxes of the surviving regions
    pub regions: Vec<Region>,
}

/// Per-frame motion classification pipeline.
///
/// Stages run in a fixed order: rotation, background subtraction,
/// morphological cleanup and binarization, region extraction, then the
/// cosmetic overlay. The background model lives for the lifetime of the
/// detector and is never reset.
pub struct MotionDetector {
    config: DetectorConfig,
    background: BackgroundModel,
    overlay: Overlay,
}

impl MotionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let background = BackgroundModel::new(config.var_threshold, config.history);
        let overlay = Overlay::from_config(&config);
        Self {
            config,
            background,
            overlay,
        }
    }

    /// Classify one raw frame. `debug` controls whether bounding boxes are
    /// drawn; `tracking` only selects the timestamp color. Neither flag
    /// influences the motion flag.
    pub fn detect(&mut self, frame: &Frame, debug: bool, tracking: bool) -> MotionReading {
        let mut annotated = frame.rotated(self.config.rotation_angle);

        let gray = annotated.to_gray();
        let raw_mask = self.background.apply(&gray);
        let mask = morphology::clean_mask(
            &raw_mask,
            self.config.kernel_radius,
            self.config.mask_threshold,
        );

        let regions = regions::extract_regions(&mask, self.config.min_region_area);
        let is_motion = !regions.is_empty();

        if is_motion {
            debug!(
                "Motion detected: {} region(s), largest area {} px",
                regions.len(),
                regions.iter().map(|r| r.area).max().unwrap_or(0)
            );
        } else {
            trace!("No motion in frame");
        }

        if debug {
            overlay::draw_regions(&mut annotated, &regions);
        }
        self.overlay.draw_timestamp(&mut annotated, tracking);

        MotionReading {
            annotated,
            mask,
            is_motion,
            regions,
        }
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

use crate::config::DetectorConfig;
use crate::detector::regions::Region;
use crate::frame::Frame;
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use std::fs;
use tracing::warn;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Draws burned-in annotations: the wall-clock timestamp, debug bounding
/// rectangles and status labels.
///
/// The timestamp font is loaded once at construction. A missing or unparsable
/// font disables text burn-in with a warning rather than failing the pipeline;
/// classification never depends on the overlay.
pub struct Overlay {
    font: Option<Font<'static>>,
    font_size: f32,
}

impl Overlay {
    pub fn from_config(config: &DetectorConfig) -> Self {
        let font = if config.font_path.is_empty() {
            None
        } else {
            match fs::read(&config.font_path) {
                Ok(data) => {
                    let font = Font::try_from_vec(data);
                    if font.is_none() {
                        warn!(
                            "Failed to parse font file '{}', text burn-in disabled",
                            config.font_path
                        );
                    }
                    font
                }
                Err(e) => {
                    warn!(
                        "Failed to read font file '{}': {}, text burn-in disabled",
                        config.font_path, e
                    );
                    None
                }
            }
        };

        Self {
            font,
            font_size: config.font_size,
        }
    }

    /// Overlay without text support, for headless tests
    pub fn disabled() -> Self {
        Self {
            font: None,
            font_size: 0.0,
        }
    }

    /// Burn the frame's `HH:MM:SS` timestamp near the bottom-left corner.
    /// Green while interval tracking is enabled, white otherwise.
    pub fn draw_timestamp(&self, frame: &mut Frame, tracking: bool) {
        let color = if tracking { GREEN } else { WHITE };
        let text = frame.captured_at.format("%H:%M:%S").to_string();
        let y = frame.height().saturating_sub(30) as i32;
        self.draw_text(frame, &text, 10, y, color);
    }

    /// Draw a status label such as "Recording" or "Debugging"
    pub fn draw_label(&self, frame: &mut Frame, text: &str, x: i32, y: i32, color: Rgb<u8>) {
        self.draw_text(frame, text, x, y, color);
    }

    fn draw_text(&self, frame: &mut Frame, text: &str, x: i32, y: i32, color: Rgb<u8>) {
        if let Some(font) = &self.font {
            let scale = Scale::uniform(self.font_size);
            draw_text_mut(&mut frame.image, color, x, y, scale, font, text);
        }
    }
}

/// Draw hollow bounding rectangles around the detected regions
pub fn draw_regions(frame: &mut Frame, regions: &[Region]) {
    for region in regions {
        let rect = Rect::at(region.x as i32, region.y as i32)
            .of_size(region.width.max(1), region.height.max(1));
        draw_hollow_rect_mut(&mut frame.image, rect, GREEN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::new(RgbImage::new(width, height))
    }

    #[test]
    fn test_disabled_overlay_leaves_frame_untouched() {
        let overlay = Overlay::disabled();
        let mut frame = black_frame(64, 64);
        let before = frame.image.clone();

        overlay.draw_timestamp(&mut frame, false);
        overlay.draw_label(&mut frame, "Recording", 10, 25, RED);
        assert_eq!(frame.image, before);
    }

    #[test]
    fn test_missing_font_is_not_fatal() {
        let config = DetectorConfig {
            font_path: "/nonexistent/font.ttf".to_string(),
            ..DetectorConfig::default()
        };
        let overlay = Overlay::from_config(&config);
        let mut frame = black_frame(32, 32);
        overlay.draw_timestamp(&mut frame, true);
    }

    #[test]
    fn test_draw_regions_marks_box_edges() {
        let mut frame = black_frame(64, 64);
        let region = Region {
            x: 10,
            y: 12,
            width: 20,
            height: 15,
            area: 300,
        };

        draw_regions(&mut frame, &[region]);
        assert_eq!(frame.image.get_pixel(10, 12).0, [0, 255, 0]);
        // Interior stays untouched
        assert_eq!(frame.image.get_pixel(20, 20).0, [0, 0, 0]);
    }
}

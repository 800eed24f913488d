use chrono::{DateTime, Local};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

/// A single captured video frame with its capture timestamp.
///
/// The pixel buffer is owned; cloning a frame performs a deep copy so a
/// retained frame (e.g. in the pre-roll buffer) is never aliased by a
/// stage that draws on its own copy.
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGB pixel data
    pub image: RgbImage,
    /// Wall-clock time at capture
    pub captured_at: DateTime<Local>,
}

impl Frame {
    /// Create a frame captured now
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Local::now(),
        }
    }

    /// Create a frame from raw packed RGB bytes
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Rotate the frame by `angle_degrees` about its center. The output keeps
    /// the original dimensions; uncovered corners are filled black. An angle
    /// of 0 is a no-op clone.
    pub fn rotated(&self, angle_degrees: f32) -> Frame {
        if angle_degrees == 0.0 {
            return self.clone();
        }

        let rotated = rotate_about_center(
            &self.image,
            angle_degrees.to_radians(),
            Interpolation::Bilinear,
            Rgb([0u8, 0u8, 0u8]),
        );

        Frame {
            image: rotated,
            captured_at: self.captured_at,
        }
    }

    /// Grayscale copy of the frame for analysis
    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(RgbImage::from_pixel(width, height, Rgb([value; 3])))
    }

    #[test]
    fn test_from_raw() {
        let frame = Frame::from_raw(4, 2, vec![10u8; 4 * 2 * 3]).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);

        // Wrong buffer length is rejected
        assert!(Frame::from_raw(4, 2, vec![0u8; 5]).is_none());
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        let frame = solid_frame(8, 8, 77);
        let rotated = frame.rotated(0.0);
        assert_eq!(rotated.image, frame.image);
        assert_eq!(rotated.captured_at, frame.captured_at);
    }

    #[test]
    fn test_rotation_preserves_dimensions() {
        let frame = solid_frame(16, 8, 50);
        let rotated = frame.rotated(37.5);
        assert_eq!(rotated.width(), 16);
        assert_eq!(rotated.height(), 8);
    }

    #[test]
    fn test_to_gray() {
        let frame = solid_frame(4, 4, 100);
        let gray = frame.to_gray();
        assert_eq!(gray.dimensions(), (4, 4));
        assert_eq!(gray.get_pixel(0, 0).0[0], 100);
    }

    #[test]
    fn test_clone_is_deep() {
        let frame = solid_frame(4, 4, 0);
        let mut copy = frame.clone();
        copy.image.put_pixel(0, 0, Rgb([255, 0, 0]));
        assert_eq!(frame.image.get_pixel(0, 0).0, [0, 0, 0]);
    }
}

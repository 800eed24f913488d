use image::GrayImage;
use tracing::debug;

/// Mask value for confident foreground pixels
pub const FOREGROUND: u8 = 255;
/// Mask value for shadow candidates; removed by the downstream binarization
pub const SHADOW: u8 = 127;
/// Mask value for background pixels
pub const BACKGROUND: u8 = 0;

const INITIAL_VARIANCE: f32 = 100.0;
const MIN_VARIANCE: f32 = 4.0;
const MAX_VARIANCE: f32 = 5000.0;
/// Shadow candidates are darker than the model but retain at least this
/// fraction of its brightness.
const SHADOW_RATIO: f32 = 0.5;

/// Adaptive per-pixel background model.
///
/// Each pixel keeps a running Gaussian (mean and variance). A pixel whose
/// squared distance from the mean exceeds `var_threshold` times the variance
/// is foreground; darkened-but-similar pixels are marked as shadow candidates
/// instead so the fixed binarization threshold drops them.
///
/// The model is seeded from the first frame it sees and never reset for the
/// lifetime of the detector.
pub struct BackgroundModel {
    mean: Vec<f32>,
    variance: Vec<f32>,
    width: u32,
    height: u32,
    var_threshold: f32,
    learning_rate: f32,
}

impl BackgroundModel {
    pub fn new(var_threshold: f32, history: u32) -> Self {
        Self {
            mean: Vec::new(),
            variance: Vec::new(),
            width: 0,
            height: 0,
            var_threshold,
            learning_rate: 1.0 / history.max(1) as f32,
        }
    }

    /// Classify every pixel of `gray` against the model and fold the frame
    /// into the model. Returns the raw foreground mask (0 / 127 / 255).
    pub fn apply(&mut self, gray: &GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();

        if self.mean.is_empty() || self.width != width || self.height != height {
            self.seed(gray);
            // First frame defines the scene, nothing is foreground yet
            return GrayImage::from_pixel(width, height, image::Luma([BACKGROUND]));
        }

        let mut mask = GrayImage::new(width, height);
        let alpha = self.learning_rate;

        for (i, pixel) in gray.pixels().enumerate() {
            let value = pixel.0[0] as f32;
            let mean = self.mean[i];
            let variance = self.variance[i];

            let delta = value - mean;
            let dist_sq = delta * delta;

            let label = if dist_sq > self.var_threshold * variance {
                if value < mean && value > mean * SHADOW_RATIO {
                    SHADOW
                } else {
                    FOREGROUND
                }
            } else {
                BACKGROUND
            };
            mask.put_pixel(
                (i as u32) % width,
                (i as u32) / width,
                image::Luma([label]),
            );

            self.mean[i] = mean + alpha * delta;
            self.variance[i] =
                (variance + alpha * (dist_sq - variance)).clamp(MIN_VARIANCE, MAX_VARIANCE);
        }

        mask
    }

    fn seed(&mut self, gray: &GrayImage) {
        let (width, height) = gray.dimensions();
        debug!("Seeding background model at {}x{}", width, height);

        self.width = width;
        self.height = height;
        self.mean = gray.pixels().map(|p| p.0[0] as f32).collect();
        self.variance = vec![INITIAL_VARIANCE; (width * height) as usize];
    }

    pub fn var_threshold(&self) -> f32 {
        self.var_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn solid(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    #[test]
    fn test_first_frame_is_all_background() {
        let mut model = BackgroundModel::new(25.0, 500);
        let mask = model.apply(&solid(16, 16, 90));
        assert!(mask.pixels().all(|p| p.0[0] == BACKGROUND));
    }

    #[test]
    fn test_static_scene_stays_background() {
        let mut model = BackgroundModel::new(25.0, 500);
        for _ in 0..20 {
            let mask = model.apply(&solid(16, 16, 90));
            assert!(mask.pixels().all(|p| p.0[0] == BACKGROUND));
        }
    }

    #[test]
    fn test_bright_intruder_is_foreground() {
        let mut model = BackgroundModel::new(25.0, 500);
        for _ in 0..5 {
            model.apply(&solid(16, 16, 40));
        }

        let mut scene = solid(16, 16, 40);
        for y in 4..12 {
            for x in 4..12 {
                scene.put_pixel(x, y, Luma([250]));
            }
        }

        let mask = model.apply(&scene);
        assert_eq!(mask.get_pixel(8, 8).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(0, 0).0[0], BACKGROUND);
    }

    #[test]
    fn test_moderate_darkening_marked_as_shadow() {
        let mut model = BackgroundModel::new(25.0, 500);
        for _ in 0..5 {
            model.apply(&solid(16, 16, 200));
        }

        // 140 is well outside 5 sigma but above half the modeled brightness
        let mask = model.apply(&solid(16, 16, 140));
        assert!(mask.pixels().all(|p| p.0[0] == SHADOW));
    }

    #[test]
    fn test_resolution_change_reseeds() {
        let mut model = BackgroundModel::new(25.0, 500);
        model.apply(&solid(16, 16, 90));
        // Different dimensions must reseed instead of indexing out of bounds
        let mask = model.apply(&solid(8, 8, 250));
        assert_eq!(mask.dimensions(), (8, 8));
        assert!(mask.pixels().all(|p| p.0[0] == BACKGROUND));
    }
}

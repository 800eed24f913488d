use crate::error::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct McamConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    /// Use the alternate (libcamera/Pi module) capture backend
    #[serde(default)]
    pub alternate_source: bool,

    /// Capture resolution (width, height)
    #[serde(default = "default_resolution")]
    pub resolution: (u32, u32),

    /// Capture frame rate
    #[serde(default = "default_source_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectorConfig {
    /// Angle to rotate incoming frames, in degrees (0 = no rotation)
    #[serde(default)]
    pub rotation_angle: f32,

    /// Variance threshold for the background subtractor
    #[serde(default = "default_var_threshold")]
    pub var_threshold: f32,

    /// Number of frames over which the background model adapts
    #[serde(default = "default_history")]
    pub history: u32,

    /// Binarization threshold applied to the cleaned foreground mask
    #[serde(default = "default_mask_threshold")]
    pub mask_threshold: u8,

    /// Structuring element radius for morphological cleanup (2 = 5x5)
    #[serde(default = "default_kernel_radius")]
    pub kernel_radius: u8,

    /// Minimum region area in pixels to count as motion
    #[serde(default = "default_min_region_area")]
    pub min_region_area: u32,

    /// Path to a TrueType font for the timestamp burn-in (empty disables it)
    #[serde(default = "default_font_path")]
    pub font_path: String,

    /// Font size for burned-in text
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordingConfig {
    /// Directory where recordings and interval logs are written
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Frame rate of the output video file
    #[serde(default = "default_recording_fps")]
    pub fps: f64,

    /// Four character code of the output video container
    #[serde(default = "default_fourcc")]
    pub fourcc: String,

    /// Number of quiet frames retained ahead of a motion event
    #[serde(default = "default_preroll_frames")]
    pub preroll_frames: usize,
}

fn default_resolution() -> (u32, u32) {
    (640, 480)
}

fn default_source_fps() -> u32 {
    8
}

fn default_var_threshold() -> f32 {
    25.0
}

fn default_history() -> u32 {
    500
}

fn default_mask_threshold() -> u8 {
    200
}

fn default_kernel_radius() -> u8 {
    2
}

fn default_min_region_area() -> u32 {
    600
}

fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}

fn default_font_size() -> f32 {
    28.0
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_recording_fps() -> f64 {
    8.0
}

fn default_fourcc() -> String {
    "XVID".to_string()
}

fn default_preroll_frames() -> usize {
    8
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            alternate_source: false,
            resolution: default_resolution(),
            fps: default_source_fps(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            rotation_angle: 0.0,
            var_threshold: default_var_threshold(),
            history: default_history(),
            mask_threshold: default_mask_threshold(),
            kernel_radius: default_kernel_radius(),
            min_region_area: default_min_region_area(),
            font_path: default_font_path(),
            font_size: default_font_size(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            fps: default_recording_fps(),
            fourcc: default_fourcc(),
            preroll_frames: default_preroll_frames(),
        }
    }
}

impl McamConfig {
    /// Load configuration from an optional TOML file with MCAM_* environment
    /// variable overrides. A missing file yields the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut builder = Config::builder();

        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path));
        } else {
            debug!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
        }

        let settings = builder
            .add_source(Environment::with_prefix("MCAM").separator("__"))
            .build()?;

        let config: McamConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.source.resolution.0 == 0 || self.source.resolution.1 == 0 {
            return Err(config_error("source resolution must be non-zero"));
        }
        if self.source.fps == 0 {
            return Err(config_error("source fps must be greater than 0"));
        }
        if self.recording.fps <= 0.0 {
            return Err(config_error("recording fps must be greater than 0"));
        }
        if self.recording.preroll_frames == 0 {
            return Err(config_error("preroll_frames must be at least 1"));
        }
        if self.recording.fourcc.len() != 4 {
            return Err(config_error("fourcc must be exactly four characters"));
        }
        if self.detector.min_region_area == 0 {
            return Err(config_error("min_region_area must be greater than 0"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> crate::error::McamError {
    crate::error::McamError::Config(config::ConfigError::Message(message.to_string()))
}

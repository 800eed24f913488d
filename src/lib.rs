//! Motion-triggered camera recorder.
//!
//! Captures frames from a camera, classifies each one for motion against a
//! running background model, and on operator command records motion footage
//! (with a short pre-roll of the frames leading up to it) to XVID AVI files
//! and logs motion intervals to a text file. All output files are named
//! `<MM-DD-YYYY>_<N>` with the smallest unused index for the day.

pub mod app;
pub mod commands;
pub mod config;
pub mod detector;
pub mod display;
pub mod encode;
pub mod error;
pub mod frame;
pub mod naming;
pub mod preroll;
pub mod recording;
pub mod source;
pub mod tracker;

pub use app::App;
pub use config::McamConfig;
pub use error::{McamError, Result};
pub use frame::Frame;

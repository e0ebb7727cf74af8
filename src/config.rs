//! Stage configuration.
//!
//! Every knob of the three stages lives here with defaults matching the
//! classic capture/calibrate scripts, so nothing needs a source edit to
//! reconfigure. Configs load from JSON; absent fields keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::ChessboardConfig;
use crate::error::Result;
use crate::io::object_from_json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device indices probed in order.
    pub device_indices: Vec<u32>,
    /// Minimum time between two saved frames, in seconds.
    pub save_interval_secs: f64,
    pub output_dir: PathBuf,
    /// How long each live frame stays on screen while polling for the cancel key.
    pub poll_interval_ms: u64,
    pub window_title: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_indices: (0..6).collect(),
            save_interval_secs: 5.0,
            output_dir: PathBuf::from("images"),
            poll_interval_ms: 1,
            window_title: "Img".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs_f64(self.save_interval_secs.max(0.0))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Termination criteria of the sub-pixel corner refinement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubPixConfig {
    /// Half side of the search window; 5 gives an 11x11 window.
    pub half_window: u32,
    pub max_iterations: usize,
    pub epsilon: f32,
}

impl Default for SubPixConfig {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iterations: 30,
            epsilon: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub input_glob: String,
    pub board: ChessboardConfig,
    /// Nominal resolution of the calibration frames.
    pub frame_size: (u32, u32),
    pub subpix: SubPixConfig,
    /// Directory receiving `calibration.json` and the text report.
    pub output_dir: PathBuf,
    /// Directory receiving the undistorted test-image results.
    pub result_dir: PathBuf,
    pub test_image: PathBuf,
    pub preview_duration_ms: u64,
    /// Free scaling of the new camera matrix: 0 keeps only valid pixels,
    /// 1 keeps every source pixel.
    pub alpha: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            input_glob: "images/*.png".to_string(),
            board: ChessboardConfig::default(),
            frame_size: (640, 480),
            subpix: SubPixConfig::default(),
            output_dir: PathBuf::from("camera_calib_pkl"),
            result_dir: PathBuf::from("cali_result"),
            test_image: PathBuf::from("cali_result/test_img.png"),
            preview_duration_ms: 1000,
            alpha: 1.0,
        }
    }
}

impl CalibrationConfig {
    pub fn preview_duration(&self) -> Duration {
        Duration::from_millis(self.preview_duration_ms)
    }

    pub fn calibration_path(&self) -> PathBuf {
        self.output_dir.join("calibration.json")
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("report.txt")
    }
}

/// Loads a config from `path`, or the defaults when no path is given.
pub fn load_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: Default + serde::de::DeserializeOwned,
{
    match path {
        Some(p) => object_from_json(p),
        None => Ok(T::default()),
    }
}

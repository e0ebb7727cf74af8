use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the capture, estimation and viewing stages.
#[derive(Debug, Error)]
pub enum CalibError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),
    #[error("recording error: {0}")]
    Recording(#[from] rerun::RecordingStreamError),
    #[error("camera {index} is not available: {reason}")]
    DeviceUnavailable { index: u32, reason: String },
    #[error("failed to read frame: {0}")]
    FrameRead(String),
    #[error("preview window error: {0}")]
    Display(String),
    #[error("no pattern observations were collected, calibration is underdetermined")]
    NoObservations,
    #[error("degenerate calibration input: {0}")]
    Degenerate(String),
    #[error("calibration solver did not converge")]
    SolverFailed,
    #[error("test image is missing or unreadable: {}", .0.display())]
    MissingTestImage(PathBuf),
    #[error("undistorted image has an empty valid region")]
    EmptyRegionOfInterest,
}

pub type Result<T> = std::result::Result<T, CalibError>;

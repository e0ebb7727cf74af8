pub mod board;
pub mod camera_model;
pub mod capture;
pub mod chessboard;
pub mod config;
pub mod data_loader;
pub mod detected_points;
#[cfg(feature = "device")]
pub mod device;
pub mod display;
pub mod error;
pub mod estimator;
pub mod io;
pub mod optimization;
pub mod synthetic;
pub mod types;
pub mod util;
pub mod visualization;

pub use error::{CalibError, Result};

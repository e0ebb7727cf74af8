use std::fmt::Write as _;
use std::path::Path;

use nalgebra as na;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::camera_model::OpenCVModel5;
use crate::error::Result;

/// Serializes an object to a JSON file, creating parent directories.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// The persisted calibration: intrinsic matrix and distortion vector.
///
/// This is the only artifact of the estimation stage; the individual matrix
/// and coefficient views are derived from it on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Row-major 3x3 intrinsic matrix.
    pub camera_matrix: [[f64; 3]; 3],
    /// `[k1, k2, p1, p2, k3]`.
    pub dist_coeffs: [f64; 5],
    pub image_size: (u32, u32),
    pub rms: f64,
    pub created_at: String,
}

impl CalibrationRecord {
    pub fn from_model(model: &OpenCVModel5<f64>, rms: f64) -> CalibrationRecord {
        let k = model.camera_matrix();
        CalibrationRecord {
            camera_matrix: [
                [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
                [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
                [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
            ],
            dist_coeffs: model.distortion(),
            image_size: (model.width, model.height),
            rms,
            created_at: timestamp(),
        }
    }

    pub fn camera_matrix(&self) -> na::Matrix3<f64> {
        let m = &self.camera_matrix;
        na::Matrix3::new(
            m[0][0], m[0][1], m[0][2], //
            m[1][0], m[1][1], m[1][2], //
            m[2][0], m[2][1], m[2][2],
        )
    }

    pub fn distortion(&self) -> [f64; 5] {
        self.dist_coeffs
    }

    pub fn model(&self) -> OpenCVModel5<f64> {
        OpenCVModel5::from_matrix(
            &self.camera_matrix(),
            &self.dist_coeffs,
            self.image_size.0,
            self.image_size.1,
        )
    }
}

pub fn save_calibration(path: &Path, record: &CalibrationRecord) -> Result<()> {
    object_to_json(path, record)
}

pub fn load_calibration(path: &Path) -> Result<CalibrationRecord> {
    object_from_json(path)
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&Rfc3339).unwrap_or_default()
}

/// Plain text summary of a calibration run.
pub fn write_report(
    output_path: &Path,
    record: &CalibrationRecord,
    per_view: &[(String, f64)],
    mean_error: f64,
    median_error: f64,
) -> Result<()> {
    let mut s = String::new();
    let _ = writeln!(s, "Calibration {}", record.created_at);
    let _ = writeln!(s, "image size: {} x {}\n", record.image_size.0, record.image_size.1);
    let _ = writeln!(s, "camera matrix:");
    for row in &record.camera_matrix {
        let _ = writeln!(s, "    [{:12.5} {:12.5} {:12.5}]", row[0], row[1], row[2]);
    }
    let _ = writeln!(s, "distortion [k1 k2 p1 p2 k3]:");
    let _ = writeln!(s, "    {:?}\n", record.dist_coeffs);
    let _ = writeln!(s, "rms reprojection error: {:.5} px", record.rms);
    let _ = writeln!(s, "mean reprojection error: {:.5}", mean_error);
    let _ = writeln!(s, "median view error: {:.5}\n", median_error);
    let _ = writeln!(s, "per view:");
    for (name, e) in per_view {
        let _ = writeln!(s, "    {name}: {e:.5}");
    }
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output_path, s)?;
    Ok(())
}

use nalgebra as na;
use tempfile::TempDir;
use webcam_calibration::camera_model::OpenCVModel5;
use webcam_calibration::error::CalibError;
use webcam_calibration::io::{
    CalibrationRecord, load_calibration, save_calibration, write_report,
};

fn sample_record() -> CalibrationRecord {
    let model = OpenCVModel5::new(
        &na::dvector![
            601.123456789012,
            599.987654321098,
            320.1,
            239.7,
            -0.081234567,
            0.0212345,
            1.0e-4,
            -2.5e-4,
            0.00123
        ],
        640,
        480,
    );
    CalibrationRecord::from_model(&model, 0.0421)
}

#[test]
fn test_calibration_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("camera_calib_pkl").join("calibration.json");
    let record = sample_record();
    save_calibration(&path, &record).unwrap();
    let loaded = load_calibration(&path).unwrap();

    // bit identical
    assert_eq!(loaded, record);
    assert_eq!(loaded.camera_matrix(), record.camera_matrix());
    assert_eq!(loaded.distortion(), record.distortion());
    assert_eq!(loaded.model(), record.model());
    assert_eq!(loaded.camera_matrix()[(2, 2)], 1.0);
}

#[test]
fn test_malformed_calibration_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("calibration.json");
    std::fs::write(&path, "{ \"camera_matrix\": [1, 2").unwrap();
    let err = load_calibration(&path).unwrap_err();
    assert!(matches!(err, CalibError::Json(_)));
}

#[test]
fn test_missing_calibration_file() {
    let dir = TempDir::new().unwrap();
    let err = load_calibration(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, CalibError::Io(_)));
}

#[test]
fn test_write_report() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out").join("report.txt");
    let per_view = vec![("img0.png".to_string(), 0.03), ("img1.png".to_string(), 0.05)];
    write_report(&path, &sample_record(), &per_view, 0.04, 0.04).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("img0.png"));
    assert!(content.contains("img1.png"));
    assert!(content.contains("mean reprojection error: 0.04000"));
}

use std::cell::Cell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use tempfile::TempDir;
use webcam_calibration::capture::{CameraProvider, Clock, FrameSource, run_capture};
use webcam_calibration::config::CaptureConfig;
use webcam_calibration::display::{Preview, PreviewEvent};
use webcam_calibration::error::{CalibError, Result};

/// Yields `frames` frames, then fails.
struct FakeSource {
    frames: usize,
}

impl FrameSource for FakeSource {
    fn read_frame(&mut self) -> Result<RgbImage> {
        if self.frames == 0 {
            return Err(CalibError::FrameRead("stream ended".to_string()));
        }
        self.frames -= 1;
        Ok(RgbImage::from_pixel(8, 6, Rgb([10, 20, 30])))
    }
}

struct FakeProvider {
    devices: HashMap<u32, usize>,
    opened: Vec<u32>,
}

impl FakeProvider {
    fn new(devices: &[(u32, usize)]) -> Self {
        Self {
            devices: devices.iter().cloned().collect(),
            opened: Vec::new(),
        }
    }
}

impl CameraProvider for FakeProvider {
    type Source = FakeSource;

    fn open(&mut self, index: u32) -> Result<FakeSource> {
        self.opened.push(index);
        match self.devices.get(&index) {
            Some(&frames) => Ok(FakeSource { frames }),
            None => Err(CalibError::DeviceUnavailable {
                index,
                reason: "no such device".to_string(),
            }),
        }
    }
}

/// Advances by a fixed step on every query.
struct StepClock {
    now: Cell<Instant>,
    step: Duration,
}

impl StepClock {
    fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Instant::now()),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        let t = self.now.get();
        self.now.set(t + self.step);
        t
    }
}

/// Cancels once `cancel_after` frames were shown; the `fail_on`-th show errors.
#[derive(Default)]
struct FakePreview {
    shown: usize,
    cancel_after: Option<usize>,
    fail_on: Option<usize>,
    closed: bool,
}

impl Preview for FakePreview {
    fn show(&mut self, _title: &str, _img: &RgbImage, _wait: Duration) -> Result<PreviewEvent> {
        self.shown += 1;
        if self.fail_on == Some(self.shown) {
            return Err(CalibError::Display("window lost".to_string()));
        }
        match self.cancel_after {
            Some(n) if self.shown >= n => Ok(PreviewEvent::Cancel),
            _ => Ok(PreviewEvent::Continue),
        }
    }

    fn close_all(&mut self) {
        self.closed = true;
    }
}

fn config_in(dir: &TempDir, devices: &[u32]) -> CaptureConfig {
    CaptureConfig {
        device_indices: devices.to_vec(),
        save_interval_secs: 5.0,
        output_dir: dir.path().join("images"),
        poll_interval_ms: 0,
        ..Default::default()
    }
}

#[test]
fn test_saves_on_interval_with_shared_counter() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, &[0, 1, 2]);
    let mut provider = FakeProvider::new(&[(0, 12), (2, 6)]);
    let mut preview = FakePreview::default();
    let clock = StepClock::new(Duration::from_secs(1));

    let summary = run_capture(&config, &mut provider, &mut preview, &clock).unwrap();

    assert_eq!(provider.opened, vec![0, 1, 2]);
    assert_eq!(summary.opened, vec![0, 2]);
    assert_eq!(summary.unavailable, vec![1]);
    // clock reads at 1..=12 on camera 0 and 13..=18 on camera 2
    let names: Vec<String> = summary
        .saved
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["img0.png", "img1.png", "img2.png"]);
    for p in &summary.saved {
        let img = image::open(p).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (8, 6));
        assert_eq!(img.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }
    assert_eq!(preview.shown, 18);
    assert!(preview.closed);
}

#[test]
fn test_cancel_ends_current_camera_only() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, &[0, 1]);
    let mut provider = FakeProvider::new(&[(0, 100), (1, 3)]);
    let mut preview = FakePreview {
        cancel_after: Some(7),
        ..Default::default()
    };
    let clock = StepClock::new(Duration::from_secs(1));

    let summary = run_capture(&config, &mut provider, &mut preview, &clock).unwrap();
    assert_eq!(summary.opened, vec![0, 1]);
    // camera 0 stops after 7 frames, camera 1 after its first shown frame
    assert_eq!(preview.shown, 8);
    assert_eq!(summary.saved.len(), 1);
}

#[test]
fn test_no_camera_available() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, &[0, 1, 2, 3, 4, 5]);
    let mut provider = FakeProvider::new(&[]);
    let mut preview = FakePreview::default();
    let clock = StepClock::new(Duration::from_secs(1));

    let summary = run_capture(&config, &mut provider, &mut preview, &clock).unwrap();
    assert!(summary.opened.is_empty());
    assert_eq!(summary.unavailable.len(), 6);
    assert!(summary.saved.is_empty());
    assert_eq!(preview.shown, 0);
    assert!(config.output_dir.is_dir());
}

#[test]
fn test_fast_frames_are_not_saved() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, &[0]);
    let mut provider = FakeProvider::new(&[(0, 50)]);
    let mut preview = FakePreview::default();
    let clock = StepClock::new(Duration::from_millis(10));

    let summary = run_capture(&config, &mut provider, &mut preview, &clock).unwrap();
    assert_eq!(preview.shown, 50);
    assert!(summary.saved.is_empty());
}

#[test]
fn test_preview_failure_moves_to_next_camera() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, &[0, 1]);
    let mut provider = FakeProvider::new(&[(0, 100), (1, 3)]);
    let mut preview = FakePreview {
        fail_on: Some(4),
        ..Default::default()
    };
    let clock = StepClock::new(Duration::from_secs(1));

    let summary = run_capture(&config, &mut provider, &mut preview, &clock).unwrap();
    assert_eq!(summary.opened, vec![0, 1]);
    // four frames on camera 0, then all three of camera 1
    assert_eq!(preview.shown, 7);
    assert_eq!(summary.saved.len(), 1);
    assert!(preview.closed);
}

#[test]
fn test_failed_save_keeps_counter_and_windows_closed() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, &[0]);
    // a directory in the way makes every write of img0.png fail
    std::fs::create_dir_all(config.output_dir.join("img0.png")).unwrap();
    let mut provider = FakeProvider::new(&[(0, 12)]);
    let mut preview = FakePreview::default();
    let clock = StepClock::new(Duration::from_secs(1));

    let summary = run_capture(&config, &mut provider, &mut preview, &clock).unwrap();
    assert!(summary.saved.is_empty());
    assert!(!config.output_dir.join("img1.png").exists());
    assert_eq!(preview.shown, 12);
    assert!(preview.closed);
}

//! Image acquisition: probe a list of camera indices, preview each live feed
//! and save a frame whenever the save interval has elapsed.

use std::path::PathBuf;
use std::time::Instant;

use image::RgbImage;
use log::{info, warn};

use crate::config::CaptureConfig;
use crate::display::{Preview, PreviewEvent};
use crate::error::Result;

pub trait FrameSource {
    fn read_frame(&mut self) -> Result<RgbImage>;
}

pub trait CameraProvider {
    type Source: FrameSource;
    fn open(&mut self, index: u32) -> Result<Self::Source>;
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    pub opened: Vec<u32>,
    pub unavailable: Vec<u32>,
    /// Saved files in save order.
    pub saved: Vec<PathBuf>,
}

/// Runs the acquisition stage over every configured device, one after another.
///
/// A device that cannot be opened is skipped. A failed read, a failed
/// preview or the cancel key ends the current device; a failed save is
/// logged and capture goes on. Saved frames are named `img<N>.png` with one
/// counter shared by all devices, and the save timer is likewise shared.
pub fn run_capture<P, V, C>(
    config: &CaptureConfig,
    provider: &mut P,
    preview: &mut V,
    clock: &C,
) -> Result<CaptureSummary>
where
    P: CameraProvider,
    V: Preview,
    C: Clock,
{
    std::fs::create_dir_all(&config.output_dir)?;
    let interval = config.save_interval();
    let wait = config.poll_interval();
    let mut summary = CaptureSummary::default();
    let mut counter = 0usize;
    let mut last_save = clock.now();

    for &index in &config.device_indices {
        let mut source = match provider.open(index) {
            Ok(s) => s,
            Err(e) => {
                warn!("Camera not found at index {index}: {e}");
                summary.unavailable.push(index);
                continue;
            }
        };
        info!("Camera found at index {index}");
        summary.opened.push(index);

        loop {
            let frame = match source.read_frame() {
                Ok(f) => f,
                Err(e) => {
                    warn!("Failed to read frame from camera {index}: {e}");
                    break;
                }
            };

            let now = clock.now();
            if now.saturating_duration_since(last_save) >= interval {
                let path = config.output_dir.join(format!("img{counter}.png"));
                match frame.save(&path) {
                    Ok(()) => {
                        info!("Image saved as {}", path.display());
                        summary.saved.push(path);
                        counter += 1;
                    }
                    Err(e) => warn!("Failed to save {}: {e}", path.display()),
                }
                // a failed save waits a full interval before the next attempt
                last_save = now;
            }

            match preview.show(&config.window_title, &frame, wait) {
                Ok(PreviewEvent::Cancel) => {
                    info!("capture on camera {index} cancelled");
                    break;
                }
                Ok(PreviewEvent::Continue) => {}
                Err(e) => {
                    warn!("preview failed for camera {index}: {e}");
                    break;
                }
            }
        }
    }
    preview.close_all();
    Ok(summary)
}

//! Real camera and window backends.

use std::collections::HashMap;
use std::time::Duration;

use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};

use crate::capture::{CameraProvider, FrameSource};
use crate::display::{Preview, PreviewEvent};
use crate::error::{CalibError, Result};

pub struct WebcamSource {
    camera: Camera,
}

impl FrameSource for WebcamSource {
    fn read_frame(&mut self) -> Result<RgbImage> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CalibError::FrameRead(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CalibError::FrameRead(e.to_string()))?;
        let (w, h) = (decoded.width(), decoded.height());
        RgbImage::from_raw(w, h, decoded.into_raw())
            .ok_or_else(|| CalibError::FrameRead("frame buffer size mismatch".to_string()))
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::debug!("stopping camera stream: {e}");
        }
    }
}

#[derive(Debug, Default)]
pub struct WebcamProvider;

impl CameraProvider for WebcamProvider {
    type Source = WebcamSource;

    fn open(&mut self, index: u32) -> Result<WebcamSource> {
        let unavailable = |e: nokhwa::NokhwaError| CalibError::DeviceUnavailable {
            index,
            reason: e.to_string(),
        };
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(unavailable)?;
        camera.open_stream().map_err(unavailable)?;
        Ok(WebcamSource { camera })
    }
}

fn cancel_requested(pressed: &[Key]) -> bool {
    pressed.contains(&Key::Escape)
}

/// Desktop preview windows; Escape is the cancel key.
#[derive(Default)]
pub struct WindowPreview {
    windows: HashMap<String, (Window, usize, usize)>,
    buffer: Vec<u32>,
}

impl Preview for WindowPreview {
    fn show(&mut self, title: &str, img: &RgbImage, wait: Duration) -> Result<PreviewEvent> {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stale = self
            .windows
            .get(title)
            .is_some_and(|(win, ww, hh)| (*ww, *hh) != (w, h) || !win.is_open());
        if stale {
            self.windows.remove(title);
        }
        if !self.windows.contains_key(title) {
            let window = Window::new(title, w, h, WindowOptions::default())
                .map_err(|e| CalibError::Display(e.to_string()))?;
            self.windows.insert(title.to_string(), (window, w, h));
        }

        self.buffer.clear();
        self.buffer.extend(
            img.pixels()
                .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32),
        );
        let Some((window, _, _)) = self.windows.get_mut(title) else {
            return Ok(PreviewEvent::Continue);
        };
        window
            .update_with_buffer(&self.buffer, w, h)
            .map_err(|e| CalibError::Display(e.to_string()))?;
        std::thread::sleep(wait);
        window.update();
        // edge-triggered: a held key must not also cancel the next device
        if cancel_requested(&window.get_keys_pressed(KeyRepeat::No)) {
            Ok(PreviewEvent::Cancel)
        } else {
            Ok(PreviewEvent::Continue)
        }
    }

    fn close_all(&mut self) {
        self.windows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_a_fresh_escape_press_cancels() {
        assert!(cancel_requested(&[Key::Escape]));
        assert!(cancel_requested(&[Key::Space, Key::Escape]));
        // a key that is merely held shows up in no pressed list
        assert!(!cancel_requested(&[]));
        assert!(!cancel_requested(&[Key::Enter]));
    }
}

use std::time::Duration;

use image::RgbImage;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewEvent {
    Continue,
    /// The operator pressed the cancel key.
    Cancel,
}

/// A window that shows frames and reports the operator's key presses.
pub trait Preview {
    /// Shows `img` under `title` and waits up to `wait` for a key press.
    fn show(&mut self, title: &str, img: &RgbImage, wait: Duration) -> Result<PreviewEvent>;
    fn close_all(&mut self);
}

/// Preview that displays nothing and never cancels.
#[derive(Debug, Default)]
pub struct HeadlessPreview {
    pub shown: usize,
}

impl Preview for HeadlessPreview {
    fn show(&mut self, title: &str, img: &RgbImage, _wait: Duration) -> Result<PreviewEvent> {
        self.shown += 1;
        log::trace!("{title}: {}x{} frame", img.width(), img.height());
        Ok(PreviewEvent::Continue)
    }

    fn close_all(&mut self) {}
}

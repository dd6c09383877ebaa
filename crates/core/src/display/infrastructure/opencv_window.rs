use opencv::core::Mat;
use opencv::highgui;
use opencv::prelude::*;

use crate::display::domain::frame_display::FrameDisplay;
use crate::shared::constants::KEY_POLL_MS;
use crate::shared::frame::Frame;

/// Native preview window backed by OpenCV highgui.
///
/// The window is created lazily on the first shown frame.
pub struct OpencvWindow {
    title: String,
    open: bool,
}

impl OpencvWindow {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            open: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl FrameDisplay for OpencvWindow {
    fn show(&mut self, frame: &Frame) -> Result<Option<i32>, Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("Cannot display {}-channel frame", frame.channels()).into());
        }
        if !self.open {
            highgui::named_window(&self.title, highgui::WINDOW_AUTOSIZE)?;
            self.open = true;
        }

        let bgr = rgb_to_bgr(frame.data());
        let mat: Mat = Mat::from_slice(&bgr)?
            .reshape(3, frame.height() as i32)?
            .try_clone()?;
        highgui::imshow(&self.title, &mat)?;

        let key = highgui::wait_key(KEY_POLL_MS)?;
        Ok((key >= 0).then_some(key))
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = highgui::destroy_window(&self.title) {
            log::warn!("Failed to close window '{}': {e}", self.title);
        }
    }
}

impl Drop for OpencvWindow {
    fn drop(&mut self) {
        self.close();
    }
}

/// Swaps R and B in a packed 3-channel buffer.
fn rgb_to_bgr(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_bgr_swaps_red_and_blue() {
        assert_eq!(rgb_to_bgr(&[1, 2, 3, 4, 5, 6]), vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_close_before_show_is_noop() {
        let mut window = OpencvWindow::new("test");
        window.close();
        window.close();
        assert_eq!(window.title(), "test");
    }
}

use crate::display::domain::frame_display::FrameDisplay;
use crate::shared::frame::Frame;

/// Display for headless runs: shows nothing and never reports a key.
#[derive(Debug, Default)]
pub struct NullDisplay {
    shown: usize,
}

impl NullDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames passed to [`FrameDisplay::show`].
    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl FrameDisplay for NullDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<Option<i32>, Box<dyn std::error::Error>> {
        self.shown += 1;
        Ok(None)
    }

    fn close(&mut self) {}
}

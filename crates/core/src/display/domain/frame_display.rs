use crate::shared::frame::Frame;

/// Shows frames to the user and reports key presses.
pub trait FrameDisplay: Send {
    /// Renders `frame`, then polls for a key press.
    ///
    /// Returns the key code when one was pressed during the poll.
    fn show(&mut self, frame: &Frame) -> Result<Option<i32>, Box<dyn std::error::Error>>;

    /// Destroys any window. Safe to call more than once.
    fn close(&mut self);
}

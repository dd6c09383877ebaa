use crate::shared::frame::Frame;
use crate::shared::landmark::Hand;

/// Domain interface for hand landmark detection.
///
/// An empty result means no hand was found; it is not an error. Hands are
/// ordered by the implementation's preference and callers that only want one
/// take the first.
///
/// Implementations may track hands across frames, hence `&mut self`.
pub trait HandDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Hand>, Box<dyn std::error::Error>>;
}

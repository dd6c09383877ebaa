use crate::capture::domain::capture_metadata::CaptureMetadata;
use crate::shared::frame::Frame;

/// Produces frames from a live device or other video source.
///
/// The pipeline calls `open` once, `read` once per iteration, and `close`
/// on every exit path.
pub trait FrameSource: Send {
    /// Acquires the device and reports what it actually granted.
    fn open(&mut self) -> Result<CaptureMetadata, Box<dyn std::error::Error>>;

    /// Reads the next frame.
    ///
    /// `Ok(None)` means the source has ended; `Err` is a failed acquisition
    /// that the caller may choose to skip.
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device. Safe to call more than once.
    fn close(&mut self);
}

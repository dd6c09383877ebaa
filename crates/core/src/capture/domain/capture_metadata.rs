/// What the capture device actually delivers, which may differ from what
/// was requested.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Native pixel format before conversion to RGB, e.g. `yuyv422`.
    pub pixel_format: String,
    pub device: String,
}

impl CaptureMetadata {
    pub fn matches_resolution(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(width: u32, height: u32) -> CaptureMetadata {
        CaptureMetadata {
            width,
            height,
            fps: 30.0,
            pixel_format: "yuyv422".to_string(),
            device: "/dev/video0".to_string(),
        }
    }

    #[test]
    fn test_matches_requested_resolution() {
        assert!(metadata(1280, 720).matches_resolution(1280, 720));
    }

    #[test]
    fn test_detects_granted_resolution_mismatch() {
        assert!(!metadata(640, 480).matches_resolution(1280, 720));
    }
}

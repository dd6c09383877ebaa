pub const PALM_MODEL_NAME: &str = "palm_detection.onnx";
pub const LANDMARK_MODEL_NAME: &str = "hand_landmark.onnx";

/// Directory name under the platform cache dir where models are looked up.
pub const APP_DIR_NAME: &str = "handstream";

pub const DEFAULT_CAMERA_INDEX: u32 = 0;
pub const DEFAULT_CAPTURE_WIDTH: u32 = 1280;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 720;

pub const DEFAULT_DEST_HOST: &str = "127.0.0.1";
pub const DEFAULT_DEST_PORT: u16 = 5053;

pub const DEFAULT_DETECTION_CONFIDENCE: f32 = 0.8;
pub const DEFAULT_TRACKING_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_MAX_HANDS: usize = 1;

pub const DEFAULT_WINDOW_TITLE: &str = "Image";
pub const DEFAULT_DISPLAY_SCALE: f64 = 0.5;

/// Key poll timeout after each shown frame.
pub const KEY_POLL_MS: i32 = 1;

/// Consecutive failed reads tolerated before the stream is aborted (~1 second at 30 fps).
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: usize = 30;

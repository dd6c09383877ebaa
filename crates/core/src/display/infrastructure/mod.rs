pub mod null_display;
#[cfg(feature = "window")]
pub mod opencv_window;

pub mod frame_display;
pub mod hand_annotator;

pub mod capture_metadata;
pub mod frame_source;

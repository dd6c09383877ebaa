pub mod pipeline_logger;
pub mod stream_error;
pub mod stream_hands_use_case;

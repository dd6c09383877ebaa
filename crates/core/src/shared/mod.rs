pub mod constants;
pub mod frame;
pub mod landmark;
pub mod model_resolver;

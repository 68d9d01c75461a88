//! Audit logging: per-session streaming buffers and structured events.

pub mod inference_log;
pub mod stream_log;

pub use inference_log::InferenceLogger;
pub use stream_log::StreamLogger;

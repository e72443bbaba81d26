//! Pipeline error types

use crate::device::DeviceError;

/// Error type for pipeline operations
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// The configuration cannot be run with (zero capacity, zero fps).
    InvalidConfig(String),
    /// The camera could not be acquired when starting a session.
    CaptureInit(DeviceError),
    /// The encoder could not be acquired when starting a session.
    EncoderInit(DeviceError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::InvalidConfig(msg) => write!(f, "invalid pipeline config: {}", msg),
            PipelineError::CaptureInit(e) => write!(f, "failed to initialize camera: {}", e),
            PipelineError::EncoderInit(e) => write!(f, "failed to initialize encoder: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

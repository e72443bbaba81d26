//! Device error types

/// Error type for device operations
#[derive(Debug, Clone)]
pub enum DeviceError {
    /// Device acquisition or format negotiation failed.
    Init(String),
    /// An I/O error during a poll; transient, the pipeline keeps going.
    Io(String),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::Init(msg) => write!(f, "device init failed: {}", msg),
            DeviceError::Io(msg) => write!(f, "device I/O error: {}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}

impl From<std::io::Error> for DeviceError {
    fn from(e: std::io::Error) -> Self {
        DeviceError::Io(e.to_string())
    }
}

//! Hardware capability contracts
//!
//! The pipeline never touches hardware directly. A platform adapter
//! implements [`CaptureDevice`] and [`EncodeDevice`] (on Linux these wrap
//! the V4L2 capture and memory-to-memory encoder devices) and hands them
//! out through a [`DeviceProvider`]. The pipeline core stays
//! platform-independent and drives the devices through non-blocking polls
//! only.
//!
//! # Buffer ownership
//!
//! Capture and encoder buffers belong to the device that produced them.
//! Every successful `try_capture` must be balanced by exactly one
//! `return_buffer`, and every successful `try_retrieve` by exactly one
//! `return_output`. The [`BufferHandle`] carried alongside the data
//! identifies the buffer to recycle.

pub mod capture;
pub mod encode;
pub mod error;

pub use capture::{CaptureDevice, CapturedFrame};
pub use encode::{EncodeDevice, EncodedChunk};
pub use error::DeviceError;

/// Identifies a device-owned buffer to be recycled after use.
///
/// Opaque to the pipeline; a V4L2 adapter would store the buffer index
/// here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Video format negotiated with the devices at acquisition time.
///
/// Forwarded opaquely from the pipeline configuration; the core never
/// interprets these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Target frame rate.
    pub fps: u32,
}

impl std::fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} @ {} fps", self.width, self.height, self.fps)
    }
}

/// Factory for session-scoped device acquisition.
///
/// The pipeline acquires both devices when the first sink is added and
/// releases them (by dropping the boxes) when the last sink is removed.
/// Acquisition failure is fatal to that `add_sink` call only.
pub trait DeviceProvider: Send + Sync {
    /// Open the camera for the given format.
    fn open_capture(&self, format: &VideoFormat) -> Result<Box<dyn CaptureDevice>, DeviceError>;

    /// Open the H.264 encoder for the given format.
    fn open_encoder(&self, format: &VideoFormat) -> Result<Box<dyn EncodeDevice>, DeviceError>;
}

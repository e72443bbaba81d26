//! Camera capture contract

use bytes::Bytes;

use super::error::DeviceError;
use super::BufferHandle;

/// A raw frame dequeued from the camera.
///
/// `data` is a view into a device-owned buffer; the buffer must be handed
/// back via [`CaptureDevice::return_buffer`] once the frame has been
/// submitted (or skipped).
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Buffer to recycle after use.
    pub handle: BufferHandle,
    /// Raw frame bytes (typically YUV420 for the encoder input).
    pub data: Bytes,
}

/// Non-blocking camera source.
///
/// Implementations wrap the platform capture device (V4L2 MMAP buffers on
/// Linux). All methods are polled from the capture task and must never
/// block.
pub trait CaptureDevice: Send {
    /// Dequeue the next frame if one is ready.
    ///
    /// Returns `Ok(None)` when no frame is available yet. Errors are
    /// transient from the pipeline's point of view; the loop logs and
    /// keeps polling.
    fn try_capture(&mut self) -> Result<Option<CapturedFrame>, DeviceError>;

    /// Hand a buffer back to the device.
    ///
    /// Must be called exactly once per successful
    /// [`try_capture`](Self::try_capture), whether or not the frame was
    /// submitted to the encoder.
    fn return_buffer(&mut self, handle: BufferHandle) -> Result<(), DeviceError>;
}

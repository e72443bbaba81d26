//! Hardware H.264 encoder contract

use bytes::Bytes;

use super::error::DeviceError;
use super::BufferHandle;

/// One encoded bitstream chunk dequeued from the encoder.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// Output buffer to recycle after the bytes have been copied out.
    pub handle: BufferHandle,
    /// Encoded H.264 bitstream.
    pub data: Bytes,
    /// Whether the chunk is a self-contained keyframe (IDR).
    pub is_keyframe: bool,
}

/// Non-blocking hardware encoder.
///
/// The encoder pipelines work internally: frames go in through
/// [`try_submit`](Self::try_submit) and come out, some time later, through
/// [`try_retrieve`](Self::try_retrieve). The pipeline bounds the number of
/// frames in flight; the device only reports input saturation.
pub trait EncodeDevice: Send {
    /// Submit one raw frame for encoding.
    ///
    /// Returns `Ok(false)` when the encoder input is saturated and the
    /// frame was not accepted.
    fn try_submit(&mut self, data: &[u8]) -> Result<bool, DeviceError>;

    /// Dequeue the next encoded chunk if one is ready.
    fn try_retrieve(&mut self) -> Result<Option<EncodedChunk>, DeviceError>;

    /// Hand an output buffer back to the device.
    ///
    /// Must be called exactly once per successful
    /// [`try_retrieve`](Self::try_retrieve).
    fn return_output(&mut self, handle: BufferHandle) -> Result<(), DeviceError>;

    /// Ask the encoder to emit a keyframe on the next submitted frame.
    ///
    /// Default is a no-op for encoders without that control.
    fn force_keyframe(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

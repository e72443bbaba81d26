//! Encoded frame types
//!
//! One [`Frame`] is one unit of encoder output plus its timing metadata.
//! Frames are created by the capture task on encoder retrieval, move
//! through the bounded queue, and are dropped by the transmit task after
//! fan-out. `Bytes` makes the payload cheap to hand to several sinks.

use std::time::Duration;

use bytes::Bytes;

/// Timing and keyframe metadata attached to an encoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Presentation timestamp relative to the session epoch.
    ///
    /// The epoch is the instant the first frame of the session leaves the
    /// encoder, so timestamps start at zero and are non-decreasing until
    /// the pipeline stops.
    pub timestamp: Duration,
    /// Whether the frame is a self-contained keyframe (IDR).
    pub is_keyframe: bool,
}

/// One encoded video frame
///
/// FIFO order through the queue is the implicit sequence number; there is
/// no explicit counter on the frame itself.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded H.264 bitstream.
    pub data: Bytes,
    /// Timing and keyframe metadata.
    pub info: FrameInfo,
}

impl Frame {
    /// Create a frame from encoder output.
    pub fn new(data: Bytes, timestamp: Duration, is_keyframe: bool) -> Self {
        Self {
            data,
            info: FrameInfo {
                timestamp,
                is_keyframe,
            },
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

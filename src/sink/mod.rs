//! Frame sink contract
//!
//! A sink is one destination for encoded frames. In the surrounding
//! system that is a WebRTC track wrapped in its RTP packetizer, but the
//! pipeline only sees this trait. Sinks are shared (`Arc`) between the caller and
//! the transmit task, so `send` takes `&self`; a sink's own transport
//! handles pacing and congestion.

use async_trait::async_trait;

use crate::pipeline::frame::FrameInfo;

/// Error type for sink delivery
#[derive(Debug, Clone)]
pub enum SinkError {
    /// The sink's transport is no longer open.
    Closed,
    /// The underlying transport reported a failure.
    Transport(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Closed => write!(f, "sink is closed"),
            SinkError::Transport(msg) => write!(f, "sink transport error: {}", msg),
        }
    }
}

impl std::error::Error for SinkError {}

/// One destination for encoded frames.
///
/// A failing or slow sink never affects delivery to the others: the
/// transmit loop isolates per-sink errors and only logs them.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Whether the sink can currently accept frames.
    ///
    /// Queried before every send; closed sinks are skipped.
    fn is_open(&self) -> bool;

    /// Deliver one encoded frame.
    async fn send(&self, data: &[u8], info: &FrameInfo) -> Result<(), SinkError>;
}

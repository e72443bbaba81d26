//! Live camera → H.264 → multi-sink streaming pipeline
//!
//! `campipe` streams live video from a hardware camera, through a
//! hardware H.264 encoder, to a dynamically changing set of network
//! sinks, in real time and with bounded memory. Hardware access and
//! network transport stay outside the crate behind capability traits;
//! the crate owns the concurrency coordination and the buffering bounds.
//!
//! - [`device`]: camera/encoder contracts implemented per platform
//! - [`sink`]: the destination contract (a WebRTC track wrapped in its
//!   RTP packetizer, a file writer, ...)
//! - [`pipeline`]: the loop tasks, the bounded queue, the lifecycle
//!   controller
//! - [`stats`]: session counters for observability
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use campipe::{PipelineConfig, VideoPipeline};
//! # use campipe::device::DeviceProvider;
//! # async fn example(
//! #     provider: Box<dyn DeviceProvider>,
//! #     track: Arc<dyn campipe::FrameSink>,
//! # ) -> Result<(), campipe::PipelineError> {
//! let config = PipelineConfig::with_resolution(1280, 720).fps(25);
//! let pipeline = VideoPipeline::new(provider, config)?;
//!
//! // The first sink starts the camera and encoder…
//! pipeline.add_sink("viewer-1", track).await?;
//!
//! // …and removing the last one stops them again.
//! pipeline.remove_sink("viewer-1").await;
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod pipeline;
pub mod sink;
pub mod stats;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use device::{CaptureDevice, DeviceError, DeviceProvider, EncodeDevice, VideoFormat};
pub use pipeline::{Frame, FrameInfo, PipelineConfig, PipelineError, PipelineState, VideoPipeline};
pub use sink::{FrameSink, SinkError};
pub use stats::PipelineStats;

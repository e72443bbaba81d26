//! The capture→encode→queue→transmit pipeline
//!
//! Two long-lived tasks synchronized through one bounded queue:
//!
//! ```text
//!                       VideoPipeline
//!              ┌──────────────────────────────┐
//!              │ registry: RwLock<HashMap<    │
//!              │   id, Arc<dyn FrameSink>>>   │
//!              │ lifecycle: Idle ⇄ Running    │
//!              └──────┬───────────────┬───────┘
//!      add_sink ──────┘               │ snapshot per frame
//!      remove_sink                    │
//!                                     ▼
//!  [CaptureEncodeLoop]          [TransmitLoop]
//!  camera ─► encoder ─► FrameQueue ─► fan-out ─► {sinks…}
//!            depth ≤ E    len ≤ N
//! ```
//!
//! # Overload behavior
//!
//! The producer checks queue occupancy *before* submitting a captured
//! frame to the encoder; past the skip watermark the frame is dropped and
//! the capture buffer returned immediately. Memory stays bounded by the
//! queue capacity plus the encoder's in-flight budget, and the transmit
//! side can fall behind without ever stalling capture.

pub(crate) mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod queue;
pub(crate) mod transmit;

pub use config::PipelineConfig;
pub use controller::{PipelineState, VideoPipeline};
pub use error::PipelineError;
pub use frame::{Frame, FrameInfo};
pub use queue::FrameQueue;

//! Pipeline controller
//!
//! [`VideoPipeline`] owns the sink registry and the lifecycle of the two
//! loop tasks. The pipeline runs exactly while at least one sink is
//! registered: the first `add_sink` acquires the devices and spawns the
//! loops, the last `remove_sink` tears everything back down. Callers on
//! any task may add and remove sinks concurrently; the operations
//! serialize on an internal lifecycle lock.
//!
//! ```text
//!  Idle ──(first sink, devices acquired)──► Starting ──► Running
//!   ▲                                                       │
//!   └── Stopping ◄──────────────(last sink removed)─────────┘
//!       (loops joined, devices released, queue drained)
//! ```
//!
//! A failed device acquisition reverts straight to Idle and leaves the
//! registry untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::device::DeviceProvider;
use crate::sink::FrameSink;
use crate::stats::{PipelineMetrics, PipelineStats};

use super::capture::CaptureEncodeLoop;
use super::config::PipelineConfig;
use super::error::PipelineError;
use super::queue::FrameQueue;
use super::transmit::TransmitLoop;

/// Lifecycle state of the pipeline
///
/// `Starting` and `Stopping` are transient: they only exist inside an
/// `add_sink`/`remove_sink` call; every other observer sees `Idle` or
/// `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No sinks, no devices held, no tasks running.
    Idle,
    /// First sink being added; devices acquired, loops spawning.
    Starting,
    /// Both loops running, registry non-empty.
    Running,
    /// Last sink removed; loops joining, devices releasing.
    Stopping,
}

/// Everything that exists only while streaming.
struct Session {
    running: Arc<AtomicBool>,
    queue: Arc<FrameQueue>,
    capture_task: JoinHandle<()>,
    transmit_task: JoinHandle<()>,
    started_at: Instant,
}

struct Lifecycle {
    state: PipelineState,
    session: Option<Session>,
}

/// Controller for the capture→encode→queue→transmit pipeline.
///
/// Drop only after the last sink has been removed (or after
/// [`shutdown`](Self::shutdown)); otherwise the loop tasks are detached
/// and the devices stay held until they exit on their own.
pub struct VideoPipeline {
    provider: Box<dyn DeviceProvider>,
    config: PipelineConfig,
    registry: Arc<RwLock<HashMap<String, Arc<dyn FrameSink>>>>,
    metrics: Arc<PipelineMetrics>,
    keyframe_request: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
}

impl VideoPipeline {
    /// Create an idle pipeline.
    ///
    /// No device is touched until the first sink is added.
    pub fn new(
        provider: Box<dyn DeviceProvider>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::InvalidConfig)?;

        Ok(Self {
            provider,
            config,
            registry: Arc::new(RwLock::new(HashMap::new())),
            metrics: Arc::new(PipelineMetrics::new()),
            keyframe_request: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(Lifecycle {
                state: PipelineState::Idle,
                session: None,
            }),
        })
    }

    /// Register a sink, starting the pipeline if it was idle.
    ///
    /// On device-acquisition failure the registry is left untouched and
    /// the pipeline stays idle. Re-adding an existing `id` replaces the
    /// prior entry. Adding to an already-running pipeline requests a
    /// keyframe so the new subscriber can start decoding promptly.
    pub async fn add_sink(
        &self,
        id: impl Into<String>,
        sink: Arc<dyn FrameSink>,
    ) -> Result<(), PipelineError> {
        let id = id.into();
        let mut lifecycle = self.lifecycle.lock().await;

        if lifecycle.state == PipelineState::Idle {
            lifecycle.state = PipelineState::Starting;
            match self.start_session().await {
                Ok(session) => {
                    lifecycle.session = Some(session);
                    lifecycle.state = PipelineState::Running;
                }
                Err(e) => {
                    lifecycle.state = PipelineState::Idle;
                    return Err(e);
                }
            }
        } else {
            self.keyframe_request.store(true, Ordering::SeqCst);
        }

        let (replaced, total) = {
            let mut registry = self.registry.write().await;
            let replaced = registry.insert(id.clone(), sink).is_some();
            (replaced, registry.len())
        };

        info!(sink = %id, total, replaced, "sink added");
        Ok(())
    }

    /// Remove a sink, stopping the pipeline if it was the last one.
    ///
    /// When the registry becomes empty this waits for both loops to exit,
    /// releases the devices, and discards whatever the queue still holds;
    /// the removed sink is guaranteed to see no frame produced after this
    /// call returns.
    pub async fn remove_sink(&self, id: &str) {
        let mut lifecycle = self.lifecycle.lock().await;

        let (removed, now_empty) = {
            let mut registry = self.registry.write().await;
            let removed = registry.remove(id).is_some();
            (removed, registry.is_empty())
        };

        if !removed {
            debug!(sink = %id, "remove for unknown sink");
            return;
        }
        info!(sink = %id, "sink removed");

        if now_empty {
            if let Some(session) = lifecycle.session.take() {
                lifecycle.state = PipelineState::Stopping;
                self.stop_session(session).await;
                lifecycle.state = PipelineState::Idle;
            }
        }
    }

    /// Remove every sink and stop the pipeline.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        let count = {
            let mut registry = self.registry.write().await;
            let count = registry.len();
            registry.clear();
            count
        };

        if let Some(session) = lifecycle.session.take() {
            info!(sinks = count, "shutting down pipeline");
            lifecycle.state = PipelineState::Stopping;
            self.stop_session(session).await;
            lifecycle.state = PipelineState::Idle;
        }
    }

    /// Ask the encoder for a keyframe on the next admitted frame.
    pub fn request_keyframe(&self) {
        debug!("keyframe requested");
        self.keyframe_request.store(true, Ordering::SeqCst);
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> PipelineState {
        self.lifecycle.lock().await.state
    }

    /// Whether the pipeline is currently streaming.
    pub async fn is_running(&self) -> bool {
        self.state().await == PipelineState::Running
    }

    /// Number of registered sinks.
    pub async fn sink_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// The configuration the pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Snapshot of the session counters.
    pub fn stats(&self) -> PipelineStats {
        self.metrics.snapshot()
    }

    /// Acquire devices and spawn both loops for a new session.
    async fn start_session(&self) -> Result<Session, PipelineError> {
        let format = self.config.video_format();
        info!(%format, "starting video pipeline");

        let capture = self
            .provider
            .open_capture(&format)
            .map_err(PipelineError::CaptureInit)?;
        let encoder = self
            .provider
            .open_encoder(&format)
            .map_err(PipelineError::EncoderInit)?;

        self.keyframe_request.store(false, Ordering::SeqCst);

        let queue = Arc::new(FrameQueue::new(self.config.queue_capacity));
        let running = Arc::new(AtomicBool::new(true));

        let capture_task = tokio::spawn(
            CaptureEncodeLoop::new(
                capture,
                encoder,
                Arc::clone(&queue),
                Arc::clone(&self.metrics),
                Arc::clone(&running),
                Arc::clone(&self.keyframe_request),
                &self.config,
            )
            .run(),
        );
        let transmit_task = tokio::spawn(
            TransmitLoop::new(
                Arc::clone(&queue),
                Arc::clone(&self.registry),
                Arc::clone(&self.metrics),
            )
            .run(),
        );

        Ok(Session {
            running,
            queue,
            capture_task,
            transmit_task,
            started_at: Instant::now(),
        })
    }

    /// Stop both loops, release the devices, drain the queue.
    async fn stop_session(&self, session: Session) {
        debug!("stopping video pipeline");
        session.running.store(false, Ordering::SeqCst);

        // Producer first; its exit drops (and thereby releases) both
        // devices.
        if let Err(e) = session.capture_task.await {
            warn!(error = %e, "capture task join failed");
        }

        // Discards anything still queued and wakes the parked consumer.
        session.queue.shutdown().await;
        if let Err(e) = session.transmit_task.await {
            warn!(error = %e, "transmit task join failed");
        }

        let stats = self.metrics.snapshot();
        if stats.frames_skipped > 0 {
            info!(
                frames = stats.frames_encoded,
                skipped = stats.frames_skipped,
                skip_pct = stats.skip_ratio() * 100.0,
                avg_fps = stats.average_fps(session.started_at.elapsed()),
                "pipeline stopped"
            );
        } else {
            info!(
                frames = stats.frames_encoded,
                avg_fps = stats.average_fps(session.started_at.elapsed()),
                "pipeline stopped"
            );
        }

        self.metrics.reset();
    }
}

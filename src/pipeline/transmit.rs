//! Transmit consumer loop
//!
//! Pops encoded frames off the queue and fans each one out to every
//! registered sink. The sink registry is snapshotted under its lock and
//! the lock released before any I/O, so a slow or blocked sink can never
//! stall `add_sink`/`remove_sink`, and a sink removed from the registry
//! is guaranteed to see no frame produced after its removal.
//!
//! A failure from one sink is logged and isolated; the remaining sinks
//! still receive the frame. Only the queue's shutdown signal terminates
//! the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::sink::FrameSink;
use crate::stats::PipelineMetrics;

use super::queue::FrameQueue;

/// Cadence of the fan-out latency debug line, in frames.
const SEND_STATS_EVERY: u64 = 50;

/// Consumer half of the pipeline.
pub(crate) struct TransmitLoop {
    queue: Arc<FrameQueue>,
    registry: Arc<RwLock<HashMap<String, Arc<dyn FrameSink>>>>,
    metrics: Arc<PipelineMetrics>,
}

impl TransmitLoop {
    pub(crate) fn new(
        queue: Arc<FrameQueue>,
        registry: Arc<RwLock<HashMap<String, Arc<dyn FrameSink>>>>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            queue,
            registry,
            metrics,
        }
    }

    /// Run until the queue signals shutdown.
    pub(crate) async fn run(self) {
        debug!("transmit loop started");

        while let Some(frame) = self.queue.pop().await {
            // Snapshot, then release the lock before any sink I/O.
            let sinks: Vec<(String, Arc<dyn FrameSink>)> = {
                let registry = self.registry.read().await;
                registry
                    .iter()
                    .map(|(id, sink)| (id.clone(), Arc::clone(sink)))
                    .collect()
            };

            let started = Instant::now();
            let mut failures = 0u64;

            for (id, sink) in &sinks {
                if !sink.is_open() {
                    debug!(sink = %id, "sink closed, skipping");
                    continue;
                }

                if let Err(e) = sink.send(&frame.data, &frame.info).await {
                    failures += 1;
                    warn!(sink = %id, error = %e, "sink send failed");
                }
            }

            self.metrics.record_send(started.elapsed(), failures);

            let sent = self.metrics.frames_sent();
            if sent % SEND_STATS_EVERY == 0 {
                let stats = self.metrics.snapshot();
                debug!(
                    frames = sent,
                    avg_send = ?stats.avg_send_time(),
                    failures = stats.send_failures,
                    "send progress"
                );
            }
            // Frame dropped here, after every sink has been attempted.
        }

        debug!("transmit loop exited");
    }
}

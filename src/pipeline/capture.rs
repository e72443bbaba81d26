//! Capture/encode producer loop
//!
//! Pulls raw frames from the camera, pushes them through the hardware
//! encoder, and queues the encoded output for the transmit loop. Runs as
//! one tokio task per streaming session.
//!
//! Each iteration has two non-blocking stages:
//!
//! 1. **Feed**: while the encoder has room (`depth < encoder_capacity`),
//!    poll the camera. A captured frame is dropped *before* encoding when
//!    queue occupancy has reached the skip watermark, so overload never
//!    spends encode cycles on frames that would be thrown away anyway.
//! 2. **Drain**: poll the encoder for finished output, stamp it against
//!    the session epoch, and queue it.
//!
//! Device errors are transient: they are logged and the loop keeps
//! polling. Only the `running` flag terminates the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::device::{CaptureDevice, EncodeDevice};
use crate::stats::PipelineMetrics;

use super::config::PipelineConfig;
use super::frame::Frame;
use super::queue::FrameQueue;

/// Producer half of the pipeline.
///
/// Owns both devices for the duration of a session; dropping the loop at
/// exit releases them.
pub(crate) struct CaptureEncodeLoop {
    capture: Box<dyn CaptureDevice>,
    encoder: Box<dyn EncodeDevice>,
    queue: Arc<FrameQueue>,
    metrics: Arc<PipelineMetrics>,
    running: Arc<AtomicBool>,
    keyframe_request: Arc<AtomicBool>,

    skip_watermark: usize,
    encoder_capacity: u32,
    idle_poll_interval: Duration,
    stats_interval: Duration,

    /// Frames submitted to the encoder but not yet retrieved.
    depth: u32,
    /// Session epoch, recorded at the first encoder retrieval.
    epoch: Option<Instant>,
}

impl CaptureEncodeLoop {
    pub(crate) fn new(
        capture: Box<dyn CaptureDevice>,
        encoder: Box<dyn EncodeDevice>,
        queue: Arc<FrameQueue>,
        metrics: Arc<PipelineMetrics>,
        running: Arc<AtomicBool>,
        keyframe_request: Arc<AtomicBool>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            capture,
            encoder,
            queue,
            metrics,
            running,
            keyframe_request,
            skip_watermark: config.skip_watermark(),
            encoder_capacity: config.encoder_capacity,
            idle_poll_interval: config.idle_poll_interval,
            stats_interval: config.stats_interval,
            depth: 0,
            epoch: None,
        }
    }

    /// Run until the `running` flag is cleared.
    pub(crate) async fn run(mut self) {
        debug!(
            watermark = self.skip_watermark,
            encoder_capacity = self.encoder_capacity,
            "capture loop started"
        );

        let mut last_stats = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            let fed = self.feed().await;
            let drained = self.drain().await;

            if last_stats.elapsed() >= self.stats_interval {
                self.log_progress();
                last_stats = Instant::now();
            }

            if !fed && !drained {
                tokio::time::sleep(self.idle_poll_interval).await;
            }
        }

        debug!("capture loop exited");
    }

    /// Feed stage: camera → encoder, with admission control.
    ///
    /// Returns whether the stage did any work this iteration.
    async fn feed(&mut self) -> bool {
        if self.depth >= self.encoder_capacity {
            return false;
        }

        let captured = match self.capture.try_capture() {
            Ok(Some(captured)) => captured,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "camera poll failed");
                return false;
            }
        };

        let occupancy = self.queue.len().await;
        if occupancy >= self.skip_watermark {
            // Overload: drop before encoding, give the buffer straight back.
            self.metrics.record_skip();
            debug!(occupancy, "send queue past watermark, skipping frame");
        } else {
            if self.keyframe_request.swap(false, Ordering::SeqCst) {
                if let Err(e) = self.encoder.force_keyframe() {
                    // Keep the request alive for the next admitted frame.
                    self.keyframe_request.store(true, Ordering::SeqCst);
                    warn!(error = %e, "keyframe request failed");
                }
            }

            match self.encoder.try_submit(&captured.data) {
                Ok(true) => self.depth += 1,
                Ok(false) => trace!("encoder input saturated"),
                Err(e) => warn!(error = %e, "encoder submit failed"),
            }
        }

        if let Err(e) = self.capture.return_buffer(captured.handle) {
            warn!(error = %e, "camera buffer return failed");
        }

        true
    }

    /// Drain stage: encoder → queue.
    ///
    /// Returns whether the stage did any work this iteration.
    async fn drain(&mut self) -> bool {
        let chunk = match self.encoder.try_retrieve() {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "encoder poll failed");
                return false;
            }
        };

        // The epoch is the instant the session's first frame leaves the
        // encoder; all timestamps are relative to it.
        let epoch = *self.epoch.get_or_insert_with(Instant::now);

        let frame = Frame::new(
            Bytes::copy_from_slice(&chunk.data),
            epoch.elapsed(),
            chunk.is_keyframe,
        );
        self.metrics.record_encoded(frame.len(), chunk.is_keyframe);

        if self.queue.try_push(frame).await.is_err() {
            // Admission control should have skipped upstream of this.
            self.metrics.record_overflow();
            warn!("send queue full despite admission control, dropping frame");
        }

        self.depth = self.depth.saturating_sub(1);

        if let Err(e) = self.encoder.return_output(chunk.handle) {
            warn!(error = %e, "encoder buffer return failed");
        }

        true
    }

    fn log_progress(&self) {
        let Some(epoch) = self.epoch else {
            return;
        };

        let stats = self.metrics.snapshot();
        debug!(
            frames = stats.frames_encoded,
            avg_fps = stats.average_fps(epoch.elapsed()),
            in_encoder = self.depth,
            skipped = stats.frames_skipped,
            "capture progress"
        );
    }
}

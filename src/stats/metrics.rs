//! Pipeline statistics
//!
//! Counters shared by the capture and transmit loops. Everything here is
//! observability only; nothing reads these values to make control-flow
//! decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free counters updated by both pipeline loops
///
/// Shared as `Arc<PipelineMetrics>`; plain relaxed atomics since there is
/// no ordering requirement between counters.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Frames retrieved from the encoder and enqueued
    frames_encoded: AtomicU64,
    /// Keyframes among the encoded frames
    keyframes: AtomicU64,
    /// Total encoded payload bytes
    bytes_encoded: AtomicU64,
    /// Captured frames dropped by the admission policy before encoding
    frames_skipped: AtomicU64,
    /// Frames dropped because the queue was unexpectedly full
    queue_overflows: AtomicU64,
    /// Frames fanned out by the transmit loop
    frames_sent: AtomicU64,
    /// Individual sink sends that failed
    send_failures: AtomicU64,
    /// Total wall time spent fanning out, in microseconds
    total_send_micros: AtomicU64,
}

impl PipelineMetrics {
    /// Create a zeroed metrics block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame retrieved from the encoder.
    pub fn record_encoded(&self, bytes: usize, is_keyframe: bool) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(bytes as u64, Ordering::Relaxed);
        if is_keyframe {
            self.keyframes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one frame skipped by the admission policy.
    pub fn record_skip(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one frame lost to a full queue despite admission control.
    pub fn record_overflow(&self) {
        self.queue_overflows.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed fan-out.
    pub fn record_send(&self, elapsed: Duration, failures: u64) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.send_failures.fetch_add(failures, Ordering::Relaxed);
        self.total_send_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Frames retrieved from the encoder so far.
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded.load(Ordering::Relaxed)
    }

    /// Frames skipped so far.
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped.load(Ordering::Relaxed)
    }

    /// Frames fanned out so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Copy the current counter values into a plain snapshot.
    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_encoded: self.frames_encoded.load(Ordering::Relaxed),
            keyframes: self.keyframes.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            queue_overflows: self.queue_overflows.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            total_send_time: Duration::from_micros(self.total_send_micros.load(Ordering::Relaxed)),
        }
    }

    /// Zero all counters for a new session.
    pub fn reset(&self) {
        self.frames_encoded.store(0, Ordering::Relaxed);
        self.keyframes.store(0, Ordering::Relaxed);
        self.bytes_encoded.store(0, Ordering::Relaxed);
        self.frames_skipped.store(0, Ordering::Relaxed);
        self.queue_overflows.store(0, Ordering::Relaxed);
        self.frames_sent.store(0, Ordering::Relaxed);
        self.send_failures.store(0, Ordering::Relaxed);
        self.total_send_micros.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of the pipeline counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames retrieved from the encoder and enqueued
    pub frames_encoded: u64,
    /// Keyframes among the encoded frames
    pub keyframes: u64,
    /// Total encoded payload bytes
    pub bytes_encoded: u64,
    /// Captured frames dropped before encoding by the admission policy
    pub frames_skipped: u64,
    /// Frames dropped because the queue was unexpectedly full
    pub queue_overflows: u64,
    /// Frames fanned out by the transmit loop
    pub frames_sent: u64,
    /// Individual sink sends that failed
    pub send_failures: u64,
    /// Total wall time spent fanning out
    pub total_send_time: Duration,
}

impl PipelineStats {
    /// Fraction of captured frames dropped by the skip policy.
    pub fn skip_ratio(&self) -> f64 {
        let total = self.frames_encoded + self.frames_skipped;
        if total > 0 {
            self.frames_skipped as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Average wall time per fan-out.
    pub fn avg_send_time(&self) -> Duration {
        if self.frames_sent > 0 {
            self.total_send_time / self.frames_sent as u32
        } else {
            Duration::ZERO
        }
    }

    /// Average encoded frame rate over `elapsed`.
    pub fn average_fps(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_encoded as f64 / secs
        } else {
            0.0
        }
    }
}

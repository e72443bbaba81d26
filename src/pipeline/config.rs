//! Pipeline configuration

use std::time::Duration;

use crate::device::VideoFormat;

/// Configuration for [`VideoPipeline`](super::VideoPipeline)
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Output width in pixels (forwarded to device acquisition).
    pub width: u32,

    /// Output height in pixels (forwarded to device acquisition).
    pub height: u32,

    /// Target frame rate (forwarded to device acquisition).
    pub fps: u32,

    /// Capacity of the encoded-frame queue between the two loops.
    pub queue_capacity: usize,

    /// Maximum frames in flight inside the hardware encoder.
    pub encoder_capacity: u32,

    /// Queue occupancy fraction at which captured frames are skipped
    /// before encoding. Clamped to `0.0..=1.0`.
    pub skip_threshold: f64,

    /// Sleep between iterations when neither loop stage produced work.
    pub idle_poll_interval: Duration,

    /// Interval for the capture loop's progress log line.
    pub stats_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 25,
            queue_capacity: 8, // ~320ms of buffering at 25fps
            encoder_capacity: 3,
            skip_threshold: 0.75,
            idle_poll_interval: Duration::from_millis(1),
            stats_interval: Duration::from_secs(1),
        }
    }
}

impl PipelineConfig {
    /// Create a config with a custom resolution.
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Set the target frame rate.
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the encoded-frame queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the encoder in-flight capacity.
    pub fn encoder_capacity(mut self, capacity: u32) -> Self {
        self.encoder_capacity = capacity;
        self
    }

    /// Set the skip threshold fraction (clamped to `0.0..=1.0`).
    pub fn skip_threshold(mut self, threshold: f64) -> Self {
        self.skip_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the idle poll interval.
    pub fn idle_poll_interval(mut self, interval: Duration) -> Self {
        self.idle_poll_interval = interval;
        self
    }

    /// Set the progress-log interval.
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Queue occupancy at which capture skipping kicks in.
    ///
    /// `ceil(queue_capacity * skip_threshold)`; with the defaults (8 and
    /// 0.75) skipping starts once 6 frames are queued.
    pub fn skip_watermark(&self) -> usize {
        (self.queue_capacity as f64 * self.skip_threshold).ceil() as usize
    }

    /// Video format handed to the device provider.
    pub fn video_format(&self) -> VideoFormat {
        VideoFormat {
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }

    /// Check the config for values the pipeline cannot run with.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be at least 1".into());
        }
        if self.encoder_capacity == 0 {
            return Err("encoder_capacity must be at least 1".into());
        }
        if self.fps == 0 {
            return Err("fps must be at least 1".into());
        }
        Ok(())
    }
}

//! Scripted devices and sinks for the pipeline tests
//!
//! The devices mirror the real buffer-cycling contract: every captured or
//! retrieved buffer gets a handle that must be returned exactly once, and
//! the outstanding-handle sets let tests assert nothing leaked. State is
//! shared through `Arc` so tests keep visibility after the pipeline has
//! taken ownership of the device boxes.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;

use crate::device::{
    BufferHandle, CaptureDevice, CapturedFrame, DeviceError, DeviceProvider, EncodeDevice,
    EncodedChunk, VideoFormat,
};
use crate::pipeline::frame::FrameInfo;
use crate::sink::{FrameSink, SinkError};

/// Poll `cond` until it holds or `timeout` elapses.
pub(crate) async fn wait_until<F: FnMut() -> bool>(mut cond: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

// ── Capture device ───────────────────────────────────────────────

/// Shared state behind [`TestCaptureDevice`].
#[derive(Default)]
pub(crate) struct CaptureState {
    frames: Mutex<VecDeque<Bytes>>,
    outstanding: Mutex<HashSet<u32>>,
    next_handle: AtomicU32,
    next_tag: AtomicU64,
    captured: AtomicU64,
    fail_next: AtomicBool,
}

impl CaptureState {
    /// Queue `count` capturable frames of `size` bytes; each payload is
    /// filled with its sequence number so sinks can identify frames.
    pub fn push_frames(&self, count: usize, size: usize) {
        let mut frames = self.frames.lock().unwrap();
        for _ in 0..count {
            let tag = self.next_tag.fetch_add(1, Ordering::Relaxed) as u8;
            frames.push_back(Bytes::from(vec![tag; size.max(1)]));
        }
    }

    /// Make the next `try_capture` fail with an I/O error.
    pub fn fail_next_capture(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }

    /// Frames handed out so far.
    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    /// Buffers handed out but not yet returned.
    pub fn outstanding(&self) -> usize {
        self.outstanding.lock().unwrap().len()
    }
}

struct TestCaptureDevice {
    state: Arc<CaptureState>,
}

impl CaptureDevice for TestCaptureDevice {
    fn try_capture(&mut self) -> Result<Option<CapturedFrame>, DeviceError> {
        if self.state.fail_next.swap(false, Ordering::Relaxed) {
            return Err(DeviceError::Io("injected capture fault".into()));
        }

        let data = self.state.frames.lock().unwrap().pop_front();
        match data {
            Some(data) => {
                let handle = BufferHandle(self.state.next_handle.fetch_add(1, Ordering::Relaxed));
                self.state.outstanding.lock().unwrap().insert(handle.0);
                self.state.captured.fetch_add(1, Ordering::Relaxed);
                Ok(Some(CapturedFrame { handle, data }))
            }
            None => Ok(None),
        }
    }

    fn return_buffer(&mut self, handle: BufferHandle) -> Result<(), DeviceError> {
        if self.state.outstanding.lock().unwrap().remove(&handle.0) {
            Ok(())
        } else {
            Err(DeviceError::Io("unknown capture buffer".into()))
        }
    }
}

// ── Encode device ────────────────────────────────────────────────

/// Shared state behind [`TestEncodeDevice`].
///
/// Encoding is instant and lossless: a submitted payload comes back out
/// of `try_retrieve` verbatim. The first chunk of a session is flagged as
/// a keyframe, mimicking an encoder that opens with an IDR.
pub(crate) struct EncoderState {
    pending: Mutex<VecDeque<Bytes>>,
    outstanding: Mutex<HashSet<u32>>,
    next_handle: AtomicU32,
    submitted: AtomicU64,
    retrieved: AtomicU64,
    hold: AtomicBool,
    input_capacity: AtomicU64,
    fail_next_retrieve: AtomicBool,
    keyframe_requests: AtomicU64,
    force_keyframe: AtomicBool,
}

impl Default for EncoderState {
    fn default() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            outstanding: Mutex::new(HashSet::new()),
            next_handle: AtomicU32::new(0),
            submitted: AtomicU64::new(0),
            retrieved: AtomicU64::new(0),
            hold: AtomicBool::new(false),
            input_capacity: AtomicU64::new(u64::MAX),
            fail_next_retrieve: AtomicBool::new(false),
            keyframe_requests: AtomicU64::new(0),
            force_keyframe: AtomicBool::new(false),
        }
    }
}

impl EncoderState {
    /// When set, `try_retrieve` yields nothing; submissions pile up.
    pub fn hold_output(&self, hold: bool) {
        self.hold.store(hold, Ordering::Relaxed);
    }

    /// Cap on queued submissions before `try_submit` reports saturation.
    pub fn set_input_capacity(&self, capacity: u64) {
        self.input_capacity.store(capacity, Ordering::Relaxed);
    }

    /// Make the next `try_retrieve` fail with an I/O error.
    pub fn fail_next_retrieve(&self) {
        self.fail_next_retrieve.store(true, Ordering::Relaxed);
    }

    /// Frames accepted for encoding so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Chunks handed out so far.
    pub fn retrieved(&self) -> u64 {
        self.retrieved.load(Ordering::Relaxed)
    }

    /// Output buffers handed out but not yet returned.
    pub fn outstanding(&self) -> usize {
        self.outstanding.lock().unwrap().len()
    }

    /// Times `force_keyframe` has been called.
    pub fn keyframe_requests(&self) -> u64 {
        self.keyframe_requests.load(Ordering::Relaxed)
    }
}

struct TestEncodeDevice {
    state: Arc<EncoderState>,
}

impl EncodeDevice for TestEncodeDevice {
    fn try_submit(&mut self, data: &[u8]) -> Result<bool, DeviceError> {
        let mut pending = self.state.pending.lock().unwrap();
        if (pending.len() as u64) >= self.state.input_capacity.load(Ordering::Relaxed) {
            return Ok(false);
        }

        pending.push_back(Bytes::copy_from_slice(data));
        self.state.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    fn try_retrieve(&mut self) -> Result<Option<EncodedChunk>, DeviceError> {
        if self.state.fail_next_retrieve.swap(false, Ordering::Relaxed) {
            return Err(DeviceError::Io("injected encoder fault".into()));
        }
        if self.state.hold.load(Ordering::Relaxed) {
            return Ok(None);
        }

        let data = self.state.pending.lock().unwrap().pop_front();
        match data {
            Some(data) => {
                let first = self.state.retrieved.fetch_add(1, Ordering::Relaxed) == 0;
                let forced = self.state.force_keyframe.swap(false, Ordering::Relaxed);
                let handle = BufferHandle(self.state.next_handle.fetch_add(1, Ordering::Relaxed));
                self.state.outstanding.lock().unwrap().insert(handle.0);
                Ok(Some(EncodedChunk {
                    handle,
                    data,
                    is_keyframe: first || forced,
                }))
            }
            None => Ok(None),
        }
    }

    fn return_output(&mut self, handle: BufferHandle) -> Result<(), DeviceError> {
        if self.state.outstanding.lock().unwrap().remove(&handle.0) {
            Ok(())
        } else {
            Err(DeviceError::Io("unknown encoder buffer".into()))
        }
    }

    fn force_keyframe(&mut self) -> Result<(), DeviceError> {
        self.state.keyframe_requests.fetch_add(1, Ordering::Relaxed);
        self.state.force_keyframe.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Device bundles ───────────────────────────────────────────────

/// A capture/encoder pair with shared observable state.
#[derive(Clone, Default)]
pub(crate) struct TestDevices {
    pub capture: Arc<CaptureState>,
    pub encoder: Arc<EncoderState>,
}

impl TestDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_capture(&self) -> Box<dyn CaptureDevice> {
        Box::new(TestCaptureDevice {
            state: Arc::clone(&self.capture),
        })
    }

    pub fn open_encoder(&self) -> Box<dyn EncodeDevice> {
        Box::new(TestEncodeDevice {
            state: Arc::clone(&self.encoder),
        })
    }
}

#[derive(Default)]
struct ProviderFlags {
    fail_capture: AtomicBool,
    fail_encoder: AtomicBool,
    capture_opens: AtomicU64,
    encoder_opens: AtomicU64,
}

/// [`DeviceProvider`] over [`TestDevices`], with acquisition-failure
/// injection. Clones share all state, so tests keep a handle after the
/// pipeline takes the boxed provider.
#[derive(Clone, Default)]
pub(crate) struct TestProvider {
    pub capture: Arc<CaptureState>,
    pub encoder: Arc<EncoderState>,
    flags: Arc<ProviderFlags>,
}

impl TestProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_capture_open(&self, fail: bool) {
        self.flags.fail_capture.store(fail, Ordering::Relaxed);
    }

    pub fn fail_encoder_open(&self, fail: bool) {
        self.flags.fail_encoder.store(fail, Ordering::Relaxed);
    }

    pub fn capture_opens(&self) -> u64 {
        self.flags.capture_opens.load(Ordering::Relaxed)
    }

    pub fn encoder_opens(&self) -> u64 {
        self.flags.encoder_opens.load(Ordering::Relaxed)
    }
}

impl DeviceProvider for TestProvider {
    fn open_capture(&self, _format: &VideoFormat) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        if self.flags.fail_capture.load(Ordering::Relaxed) {
            return Err(DeviceError::Init("camera unavailable".into()));
        }
        self.flags.capture_opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(TestCaptureDevice {
            state: Arc::clone(&self.capture),
        }))
    }

    fn open_encoder(&self, _format: &VideoFormat) -> Result<Box<dyn EncodeDevice>, DeviceError> {
        if self.flags.fail_encoder.load(Ordering::Relaxed) {
            return Err(DeviceError::Init("encoder unavailable".into()));
        }
        self.flags.encoder_opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(TestEncodeDevice {
            state: Arc::clone(&self.encoder),
        }))
    }
}

// ── Sinks ────────────────────────────────────────────────────────

/// Sink that records everything it is sent.
pub(crate) struct CollectingSink {
    received: Mutex<Vec<(Bytes, FrameInfo)>>,
    open: AtomicBool,
    delay: Option<Duration>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            delay: None,
        }
    }

    /// Simulate a slow transport by sleeping inside every send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Relaxed);
    }

    pub fn received_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn received(&self) -> Vec<(Bytes, FrameInfo)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrameSink for CollectingSink {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    async fn send(&self, data: &[u8], info: &FrameInfo) -> Result<(), SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.received
            .lock()
            .unwrap()
            .push((Bytes::copy_from_slice(data), *info));
        Ok(())
    }
}

/// Sink whose every send fails.
pub(crate) struct FailingSink;

#[async_trait]
impl FrameSink for FailingSink {
    fn is_open(&self) -> bool {
        true
    }

    async fn send(&self, _data: &[u8], _info: &FrameInfo) -> Result<(), SinkError> {
        Err(SinkError::Transport("injected send failure".into()))
    }
}

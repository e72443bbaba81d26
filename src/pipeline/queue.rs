//! Bounded frame queue between the capture and transmit loops
//!
//! Single-producer/single-consumer FIFO with a hard capacity. The
//! producer never blocks: [`try_push`](FrameQueue::try_push) fails when
//! the queue is full and hands the frame back so the caller decides its
//! disposal. The consumer parks in [`pop`](FrameQueue::pop) until a frame
//! arrives or the queue is shut down.
//!
//! Frames are owned values; whatever is still queued at
//! [`shutdown`](FrameQueue::shutdown) is dropped there rather than leaked.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

use super::frame::Frame;

struct Inner {
    frames: VecDeque<Frame>,
    closed: bool,
}

/// Bounded FIFO of encoded frames
pub struct FrameQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
}

impl FrameQueue {
    /// Create a queue holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of queued frames.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.frames.len()
    }

    /// Whether the queue is currently empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.frames.is_empty()
    }

    /// Enqueue a frame without waiting.
    ///
    /// Fails when the queue is full or shut down; the rejected frame is
    /// handed back to the caller.
    pub async fn try_push(&self, frame: Frame) -> Result<(), Frame> {
        let mut inner = self.inner.lock().await;

        if inner.closed || inner.frames.len() >= self.capacity {
            return Err(frame);
        }

        inner.frames.push_back(frame);
        drop(inner);

        self.notify.notify_one();
        Ok(())
    }

    /// Dequeue the next frame, waiting until one is available.
    ///
    /// Returns `None` once the queue has been shut down; no frames are
    /// delivered past that point.
    pub async fn pop(&self) -> Option<Frame> {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(frame) = inner.frames.pop_front() {
                    return Some(frame);
                }
                if inner.closed {
                    return None;
                }
            }

            // A push between the unlock above and this await leaves a
            // stored permit, so the wakeup cannot be lost.
            self.notify.notified().await;
        }
    }

    /// Shut the queue down.
    ///
    /// Discards any queued frames, causes subsequent pushes to fail, and
    /// wakes a parked consumer so it can observe the shutdown.
    pub async fn shutdown(&self) {
        let discarded = {
            let mut inner = self.inner.lock().await;
            inner.closed = true;
            let discarded = inner.frames.len();
            inner.frames.clear();
            discarded
        };

        if discarded > 0 {
            tracing::debug!(discarded, "frame queue shut down with frames pending");
        }

        self.notify.notify_one();
    }
}

//! The bounded hand-off queue between the receive filter and the bridge loop.
//!
//! Single producer (the WiFi delivery context), single consumer (the bridge
//! task). The queue depth doubles as the backpressure byte in the
//! device-bound header, so the current length has to be observable without
//! consuming.
//!
//! The reference system blocked the delivery context indefinitely on a full
//! queue. That is kept available as [OverflowPolicy::Block], but the default
//! is a bounded wait: a stalled bridge loop (the external device drives the
//! transfer cadence and may simply stop) must not be able to wedge the WiFi
//! driver forever.

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{with_timeout, Duration};

use crate::rx_handle::RxFrameHandle;

/// Capacity of the hand-off queue.
pub const QUEUE_DEPTH: usize = 20;

pub(crate) type FrameChannel = Channel<CriticalSectionRawMutex, RxFrameHandle, QUEUE_DEPTH>;

/// How long [OverflowPolicy::default] waits for queue space.
pub const DEFAULT_ENQUEUE_WAIT: Duration = Duration::from_millis(100);

/// What the enqueue does while the hand-off queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Block the delivery context until the bridge loop dequeues an entry.
    ///
    /// This is the reference behavior. It never drops a frame, but if the
    /// external device stops servicing transfers, the WiFi driver's delivery
    /// context blocks with it.
    Block,
    /// Wait at most this long for space, then fail the enqueue. The frame's
    /// buffer is released and the failure is logged, never silent.
    BoundedWait(Duration),
}
impl Default for OverflowPolicy {
    fn default() -> Self {
        Self::BoundedWait(DEFAULT_ENQUEUE_WAIT)
    }
}

/// Why an enqueue did not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueError {
    /// The bounded wait elapsed without space becoming available.
    Timeout,
}

/// Producer end, held by the receive filter.
pub(crate) struct QueueSender<'res> {
    pub(crate) channel: &'res FrameChannel,
    pub(crate) policy: OverflowPolicy,
}
impl QueueSender<'_> {
    /// Hand a frame to the bridge loop.
    ///
    /// On failure the handle has already been dropped, so the buffer is
    /// released either way.
    pub(crate) async fn enqueue(&self, frame: RxFrameHandle) -> Result<(), EnqueueError> {
        match self.policy {
            OverflowPolicy::Block => {
                self.channel.send(frame).await;
                Ok(())
            }
            OverflowPolicy::BoundedWait(wait) => with_timeout(wait, self.channel.send(frame))
                .await
                .map_err(|_| EnqueueError::Timeout),
        }
    }
}

/// Consumer end, held by the bridge loop.
pub(crate) struct QueueReceiver<'res> {
    pub(crate) channel: &'res FrameChannel,
}
impl QueueReceiver<'_> {
    pub(crate) fn len(&self) -> usize {
        self.channel.len()
    }
    /// Take the oldest queued frame, if any.
    ///
    /// The bridge loop is the sole consumer and only calls this after
    /// observing a non-zero length, so `None` is a defensive path.
    pub(crate) fn try_dequeue(&self) -> Option<RxFrameHandle> {
        self.channel.try_receive().ok()
    }
}

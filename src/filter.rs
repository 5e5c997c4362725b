//! The receive filter, running in the WiFi driver's delivery context.
//!
//! The driver invokes [RxFilter::frame_received] for every frame arriving on
//! the station interface. Only ARP and IPv4 frames are worth relaying to the
//! external device; everything else is dropped on the spot. Whatever happens,
//! the driver's buffer is released before the call returns or the frame is
//! owned by the hand-off queue. Delivery must never fail, so all errors are
//! absorbed here.

use crate::{
    frame::{ETHER_TYPE_ARP, ETHER_TYPE_IPV4, ETHER_TYPE_OFFSET},
    queue::QueueSender,
    rx_handle::RxFrameHandle,
    stop::StopSignal,
};

/// Entry point for frames delivered by the WiFi driver.
pub struct RxFilter<'res> {
    pub(crate) queue: QueueSender<'res>,
    pub(crate) stop: &'res StopSignal,
}
impl RxFilter<'_> {
    /// Classify one inbound frame and hand it to the bridge loop if wanted.
    ///
    /// Called from the delivery context. May wait for queue space according
    /// to the configured [OverflowPolicy](crate::OverflowPolicy); never
    /// panics and never reports failure to the driver. The frame's buffer is
    /// released on every path that doesn't enqueue it.
    pub async fn frame_received(&self, frame: RxFrameHandle) {
        if !wanted(&frame) {
            // Dropping the handle releases the driver's buffer.
            return;
        }
        if self.stop.is_stopped() {
            return;
        }
        if self.queue.enqueue(frame).await.is_err() {
            error!("receive queue full, dropping frame");
        }
    }
}

/// A frame is wanted if its EtherType is ARP or IPv4. Nothing past the
/// EtherType is inspected.
fn wanted(frame: &[u8]) -> bool {
    let Some(ether_type) = frame.get(ETHER_TYPE_OFFSET..ETHER_TYPE_OFFSET + 2) else {
        return false;
    };
    *ether_type == ETHER_TYPE_ARP || *ether_type == ETHER_TYPE_IPV4
}

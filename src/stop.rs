//! Cooperative shutdown shared by the three bridge contexts.
//!
//! Stopping is visible from two places with different needs: the receive
//! filter polls it on every delivery, and the bridge loop is usually
//! suspended inside the duplex transfer and needs waking. A bare signal
//! covers the wake-up but not the poll, since waiting on it consumes the
//! value. The latch stays set once fired; the signal only exists to
//! interrupt the transfer.

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use portable_atomic::{AtomicBool, Ordering};

pub(crate) struct StopSignal {
    stopped: AtomicBool,
    waker: Signal<CriticalSectionRawMutex, ()>,
}

impl StopSignal {
    pub(crate) const fn new() -> Self {
        Self {
            stopped: AtomicBool::new(false),
            waker: Signal::new(),
        }
    }

    /// Latch the stop and wake the bridge loop.
    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        self.waker.signal(());
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Resolve once stopped. The latch is left set, so this resolves
    /// immediately when called after the fact.
    pub(crate) async fn wait(&self) {
        if self.is_stopped() {
            return;
        }
        self.waker.wait().await;
    }
}

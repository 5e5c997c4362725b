//! Running transfer counters and the diagnostic print toggles.
//!
//! The counters are written only by the bridge loop and read by the console
//! collaborator, so relaxed atomics are sufficient. They live in one explicit
//! structure inside [BridgeResources](crate::BridgeResources) rather than as
//! free-floating globals.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Counters and toggles shared between the bridge loop and the console.
pub struct BridgeStats {
    transfers: AtomicU32,
    no_magic: AtomicU32,
    to_device_frames: AtomicU32,
    to_device_bytes: AtomicU32,
    from_device_frames: AtomicU32,
    from_device_bytes: AtomicU32,
    both_directions: AtomicU32,

    print_to_device: AtomicBool,
    print_from_device: AtomicBool,
}
impl BridgeStats {
    pub(crate) const fn new() -> Self {
        Self {
            transfers: AtomicU32::new(0),
            no_magic: AtomicU32::new(0),
            to_device_frames: AtomicU32::new(0),
            to_device_bytes: AtomicU32::new(0),
            from_device_frames: AtomicU32::new(0),
            from_device_bytes: AtomicU32::new(0),
            both_directions: AtomicU32::new(0),
            print_to_device: AtomicBool::new(false),
            print_from_device: AtomicBool::new(false),
        }
    }

    pub(crate) fn record_transfer(&self) {
        self.transfers.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_no_magic(&self) {
        self.no_magic.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_to_device(&self, bytes: usize) {
        self.to_device_frames.fetch_add(1, Ordering::Relaxed);
        self.to_device_bytes.fetch_add(bytes as u32, Ordering::Relaxed);
    }
    pub(crate) fn record_from_device(&self, bytes: usize) {
        self.from_device_frames.fetch_add(1, Ordering::Relaxed);
        self.from_device_bytes
            .fetch_add(bytes as u32, Ordering::Relaxed);
    }
    pub(crate) fn record_both_directions(&self) {
        self.both_directions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn print_to_device(&self) -> bool {
        self.print_to_device.load(Ordering::Relaxed)
    }
    pub(crate) fn print_from_device(&self) -> bool {
        self.print_from_device.load(Ordering::Relaxed)
    }
    pub(crate) fn set_print_to_device(&self, enabled: bool) {
        self.print_to_device.store(enabled, Ordering::Relaxed);
    }
    pub(crate) fn set_print_from_device(&self, enabled: bool) {
        self.print_from_device.store(enabled, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transfers: self.transfers.load(Ordering::Relaxed),
            no_magic: self.no_magic.load(Ordering::Relaxed),
            to_device_frames: self.to_device_frames.load(Ordering::Relaxed),
            to_device_bytes: self.to_device_bytes.load(Ordering::Relaxed),
            from_device_frames: self.from_device_frames.load(Ordering::Relaxed),
            from_device_bytes: self.from_device_bytes.load(Ordering::Relaxed),
            both_directions: self.both_directions.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of the bridge counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Completed duplex transfers.
    pub transfers: u32,
    /// Transfers whose device-originated half carried no valid magic.
    pub no_magic: u32,
    /// Frames relayed WiFi to device.
    pub to_device_frames: u32,
    /// Payload bytes relayed WiFi to device.
    pub to_device_bytes: u32,
    /// Frames relayed device to WiFi.
    pub from_device_frames: u32,
    /// Payload bytes relayed device to WiFi.
    pub from_device_bytes: u32,
    /// Transfers that carried a frame in both directions.
    pub both_directions: u32,
}
impl StatsSnapshot {
    /// Per-counter difference against an earlier snapshot.
    pub fn delta_since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            transfers: self.transfers.wrapping_sub(earlier.transfers),
            no_magic: self.no_magic.wrapping_sub(earlier.no_magic),
            to_device_frames: self.to_device_frames.wrapping_sub(earlier.to_device_frames),
            to_device_bytes: self.to_device_bytes.wrapping_sub(earlier.to_device_bytes),
            from_device_frames: self
                .from_device_frames
                .wrapping_sub(earlier.from_device_frames),
            from_device_bytes: self
                .from_device_bytes
                .wrapping_sub(earlier.from_device_bytes),
            both_directions: self.both_directions.wrapping_sub(earlier.both_directions),
        }
    }
}

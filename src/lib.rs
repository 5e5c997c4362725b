#![no_std]
#![deny(missing_docs)]
//! # spibridge
//! An Ethernet frame bridge between a synchronous duplex serial link and an
//! 802.11 station interface, for controllers acting as the network adapter
//! of an external, non-IP-capable device (a retro computer board on the
//! other end of the link, in the system this was built for).
//!
//! The WiFi driver delivers received frames into the [RxFilter], which keeps
//! only ARP and IPv4 traffic and hands it across a bounded queue to the
//! [BridgeRunner]. The runner services one fixed-size duplex transaction per
//! iteration: the staged frame travels to the device while the device's own
//! outbound frame travels back, is validated, checksummed and pushed out of
//! the raw station transmit path. No IP stack is involved on either path.
//!
//! ## Structure
//! All process-lifetime state lives in [BridgeResources]. Calling [new]
//! borrows it and returns the three per-context handles:
//!
//! | struct | context |
//! | -- | -- |
//! | [RxFilter] | the WiFi driver's delivery context |
//! | [BridgeRunner] | a dedicated long-running task |
//! | [BridgeControl] | the console collaborator |
//!
//! The hardware itself is reached through the traits in [transport]; the
//! crate contains no chip-specific code.

#[cfg(test)]
extern crate std;

#[macro_use]
extern crate defmt_or_log;

use embassy_time::Instant;

pub mod config;
pub mod frame;
pub mod transport;

mod control;
mod crc;
mod diag;
mod filter;
mod queue;
mod runner;
mod rx_handle;
mod stats;
mod stop;

pub use control::{BridgeControl, StatsReport};
pub use crc::crc32;
pub use filter::RxFilter;
pub use queue::{EnqueueError, OverflowPolicy, DEFAULT_ENQUEUE_WAIT, QUEUE_DEPTH};
pub use runner::BridgeRunner;
pub use rx_handle::{ReleaseFn, RxFrameHandle};
pub use stats::{BridgeStats, StatsSnapshot};

use frame::BUFFER_LEN;
use queue::{FrameChannel, QueueReceiver, QueueSender};
use stop::StopSignal;

/// The resources required by the bridge.
///
/// The transfer buffers are mutated every iteration and reused for process
/// lifetime, so this wants a `'static` home (e.g. a `static_cell`) on real
/// hardware.
pub struct BridgeResources {
    queue: FrameChannel,
    stats: BridgeStats,
    stop: StopSignal,
    device_bound: [u8; BUFFER_LEN],
    device_originated: [u8; BUFFER_LEN],
}
impl BridgeResources {
    /// Create new bridge resources.
    pub const fn new() -> Self {
        Self {
            queue: FrameChannel::new(),
            stats: BridgeStats::new(),
            stop: StopSignal::new(),
            device_bound: [0; BUFFER_LEN],
            device_originated: [0; BUFFER_LEN],
        }
    }
}
impl Default for BridgeResources {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialise the bridge.
///
/// `mac_address` is the station interface's own address, read once at
/// startup; it ends up in every device-bound header. `overflow_policy`
/// decides what the delivery context does while the hand-off queue is full.
/// The three hardware collaborators come in through their [transport]
/// traits.
pub fn new<'res, L, R, T>(
    resources: &'res mut BridgeResources,
    mac_address: [u8; 6],
    overflow_policy: OverflowPolicy,
    link: L,
    ready: R,
    wifi_tx: T,
) -> (RxFilter<'res>, BridgeRunner<'res, L, R, T>, BridgeControl<'res>)
where
    L: transport::DuplexLink,
    R: transport::ReadySignal,
    T: transport::EthTransmit,
{
    let BridgeResources {
        queue,
        stats,
        stop,
        device_bound,
        device_originated,
    } = resources;
    // Shared between the three handles; only the transfer buffers stay
    // exclusive to the runner.
    let queue: &'res FrameChannel = queue;
    let stats: &'res BridgeStats = stats;
    let stop: &'res StopSignal = stop;
    let now = Instant::now();
    (
        RxFilter {
            queue: QueueSender {
                channel: queue,
                policy: overflow_policy,
            },
            stop,
        },
        BridgeRunner {
            link,
            ready,
            wifi_tx,
            queue: QueueReceiver { channel: queue },
            stats,
            stop,
            mac: mac_address,
            sequence: 0,
            device_bound,
            device_originated,
        },
        BridgeControl {
            stats,
            stop,
            started: now,
            last_report: now,
            last_snapshot: StatsSnapshot::default(),
        },
    )
}

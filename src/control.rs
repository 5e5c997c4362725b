//! The console-facing handle for the bridge.
//!
//! The interactive console lives outside this crate; what it needs from the
//! core is the counter report (totals plus deltas since the previous query,
//! as the reference firmware's `stats` command printed them), the two
//! diagnostic print toggles and a way to stop the bridge.

use embassy_time::{Duration, Instant};

use crate::{
    stats::{BridgeStats, StatsSnapshot},
    stop::StopSignal,
};

/// Read-only counter access and the diagnostic toggles.
pub struct BridgeControl<'res> {
    pub(crate) stats: &'res BridgeStats,
    pub(crate) stop: &'res StopSignal,
    pub(crate) started: Instant,
    pub(crate) last_report: Instant,
    pub(crate) last_snapshot: StatsSnapshot,
}

/// One counter report, totals and deltas since the previous report.
#[derive(Clone, Copy, Debug)]
pub struct StatsReport {
    /// Time since the bridge was initialized.
    pub uptime: Duration,
    /// Time since the previous call to [BridgeControl::report].
    pub interval: Duration,
    /// Current counter totals.
    pub current: StatsSnapshot,
    /// Counter movement since the previous report.
    pub delta: StatsSnapshot,
}

impl BridgeControl<'_> {
    /// Produce a counter report and remember it as the new baseline.
    pub fn report(&mut self) -> StatsReport {
        let now = Instant::now();
        let current = self.stats.snapshot();
        let report = StatsReport {
            uptime: now.duration_since(self.started),
            interval: now.duration_since(self.last_report),
            current,
            delta: current.delta_since(&self.last_snapshot),
        };
        self.last_report = now;
        self.last_snapshot = current;
        report
    }

    /// Current counter totals without moving the delta baseline.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Enable or disable dumping of frames relayed WiFi to device.
    pub fn set_print_to_device(&self, enabled: bool) {
        self.stats.set_print_to_device(enabled);
    }

    /// Enable or disable dumping of frames relayed device to WiFi.
    pub fn set_print_from_device(&self, enabled: bool) {
        self.stats.set_print_from_device(enabled);
    }

    /// Stop the bridge.
    ///
    /// Latches: the receive filter stops accepting frames immediately and
    /// permanently, and the bridge loop exits at its next blocking point.
    /// Intended for tests and controlled shutdown, the reference system ran
    /// for process lifetime.
    pub fn stop(&self) {
        self.stop.stop();
    }
}

//! The bridge loop: one duplex transfer per iteration.
//!
//! Every iteration stages the device-bound buffer (header plus at most one
//! dequeued frame), runs a single fixed-size duplex transaction against the
//! external device and then validates and forwards whatever the device sent
//! in the other direction. The external device drives the transfer cadence;
//! this task spends most of its life suspended inside
//! [DuplexLink::transfer].
//!
//! Per-iteration faults (transfer error, bad magic, oversize length, transmit
//! error) are logged or counted and abandon the iteration, never the loop.
//! Only the stop signal ends the loop.

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};

use crate::{
    crc::crc32,
    diag,
    frame::{self, Inbound, BUFFER_LEN, HEADER_LEN, MAX_PAYLOAD, TRAILER_LEN},
    queue::QueueReceiver,
    stats::BridgeStats,
    stop::StopSignal,
    transport::{DuplexLink, EthTransmit, ReadySignal},
};

/// Pause between fully processed iterations, so an unusually chatty device
/// can't saturate the scheduler.
const YIELD_INTERVAL: Duration = Duration::from_micros(2000);

/// The background task servicing the duplex link.
pub struct BridgeRunner<'res, L, R, T> {
    pub(crate) link: L,
    pub(crate) ready: R,
    pub(crate) wifi_tx: T,
    pub(crate) queue: QueueReceiver<'res>,
    pub(crate) stats: &'res BridgeStats,
    pub(crate) stop: &'res StopSignal,
    pub(crate) mac: [u8; 6],
    pub(crate) sequence: u8,
    pub(crate) device_bound: &'res mut [u8; BUFFER_LEN],
    pub(crate) device_originated: &'res mut [u8; BUFFER_LEN],
}

impl<L: DuplexLink, R: ReadySignal, T: EthTransmit> BridgeRunner<'_, L, R, T> {
    /// Run the bridge until the stop signal fires.
    pub async fn run(&mut self) {
        debug!("bridge runner active");
        loop {
            if self.stop.is_stopped() {
                break;
            }
            let staged = self.stage_device_bound();
            if staged > 0 && self.stats.print_to_device() {
                diag::print_frame(&self.device_bound[..], staged, "rc  ", &self.mac);
            }
            // The device-originated half must not carry last iteration's
            // bytes into this iteration's classification.
            self.device_originated.fill(0);

            let Self {
                link,
                ready,
                stop,
                device_bound,
                device_originated,
                ..
            } = self;
            ready.assert();
            let outcome = select(
                link.transfer(&device_bound[..], &mut device_originated[..]),
                stop.wait(),
            )
            .await;
            ready.deassert();
            match outcome {
                Either::First(Ok(())) => {}
                Either::First(Err(_)) => {
                    error!("duplex transfer failed");
                    continue;
                }
                Either::Second(()) => break,
            }
            self.stats.record_transfer();

            if !self.forward_device_originated(staged > 0).await {
                continue;
            }
            Timer::after(YIELD_INTERVAL).await;
        }
        debug!("bridge runner stopped");
    }

    /// Build the device-bound buffer for this iteration.
    ///
    /// Returns the wire length placed in the header, 0 if no frame was
    /// staged. The queue depth is sampled before the dequeue, so the
    /// backpressure byte counts the staged frame itself, as the reference
    /// firmware did.
    fn stage_device_bound(&mut self) -> usize {
        let depth = self.queue.len();
        frame::write_header(&mut self.device_bound[..], self.sequence, depth, &self.mac);
        self.sequence = self.sequence.wrapping_add(1);
        // Cleared unconditionally: the padding below a copied frame must not
        // leak payload bytes from an earlier iteration to the device.
        self.device_bound[HEADER_LEN..].fill(0);
        if depth == 0 {
            return 0;
        }
        // This loop is the sole consumer, so a non-zero depth guarantees the
        // dequeue succeeds.
        let Some(handle) = self.queue.try_dequeue() else {
            return 0;
        };
        if handle.len() > MAX_PAYLOAD {
            error!("oversized receive frame, length={}", handle.len());
            return 0;
        }
        self.device_bound[HEADER_LEN..HEADER_LEN + handle.len()].copy_from_slice(&handle);
        // The length field includes the checksum slot the device manages on
        // this direction.
        let wire_len = frame::padded_len(handle.len()) + TRAILER_LEN;
        frame::set_wire_len(&mut self.device_bound[..], wire_len);
        self.stats.record_to_device(handle.len());
        wire_len
        // `handle` drops here, returning the buffer to the driver.
    }

    /// Validate and forward the device-originated half of a transfer.
    ///
    /// Returns `false` when the iteration was abandoned (no magic, oversize
    /// declared length).
    async fn forward_device_originated(&mut self, staged: bool) -> bool {
        let declared = match frame::classify_inbound(&self.device_originated[..]) {
            Inbound::NoMagic => {
                self.stats.record_no_magic();
                return false;
            }
            Inbound::Oversize(len) => {
                error!("overlength frame, length={}", len);
                return false;
            }
            Inbound::Empty => return true,
            Inbound::Payload(len) => len,
        };
        if self.stats.print_from_device() {
            // Rendered before padding and checksum mutate the buffer.
            diag::print_frame(&self.device_originated[..], declared, "  xm", &self.mac);
        }
        self.stats.record_from_device(declared);
        if staged {
            self.stats.record_both_directions();
        }
        let padded = frame::padded_len(declared);
        let checksum = crc32(&self.device_originated[HEADER_LEN..HEADER_LEN + padded]);
        self.device_originated[HEADER_LEN + padded..HEADER_LEN + padded + TRAILER_LEN]
            .copy_from_slice(&checksum.to_le_bytes());
        if self
            .wifi_tx
            .transmit(&self.device_originated[HEADER_LEN..HEADER_LEN + padded + TRAILER_LEN])
            .await
            .is_err()
        {
            error!("station transmit failed");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        queue::OverflowPolicy,
        rx_handle::test_support::*,
        transport::NoReadySignal,
        BridgeControl, BridgeResources, RxFilter,
    };
    use embassy_futures::{block_on, join::join};
    use portable_atomic::Ordering;
    use std::{boxed::Box, collections::VecDeque, vec, vec::Vec};

    const MAC: [u8; 6] = [0x24, 0x0A, 0xC4, 0xAB, 0xCD, 0xEF];

    /// A device that answers each transfer from a script, then leaves the
    /// bus idle forever.
    struct ScriptedLink {
        responses: VecDeque<Result<Vec<u8>, ()>>,
        sent: Vec<Vec<u8>>,
    }
    impl ScriptedLink {
        fn with(responses: Vec<Result<Vec<u8>, ()>>) -> Self {
            Self {
                responses: responses.into(),
                sent: Vec::new(),
            }
        }
    }
    impl DuplexLink for ScriptedLink {
        type Error = ();
        async fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), ()> {
            let Some(response) = self.responses.pop_front() else {
                core::future::pending::<()>().await;
                unreachable!()
            };
            self.sent.push(tx.to_vec());
            let response = response?;
            rx[..response.len()].copy_from_slice(&response);
            Ok(())
        }
    }

    #[derive(Default)]
    struct ReadyProbe {
        asserts: u32,
        deasserts: u32,
    }
    impl ReadySignal for ReadyProbe {
        fn assert(&mut self) {
            self.asserts += 1;
        }
        fn deassert(&mut self) {
            self.deasserts += 1;
        }
    }

    #[derive(Default)]
    struct RecordingTx {
        sent: Vec<Vec<u8>>,
        fail: bool,
    }
    impl EthTransmit for RecordingTx {
        type Error = ();
        async fn transmit(&mut self, frame: &[u8]) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.sent.push(frame.to_vec());
            Ok(())
        }
    }

    /// Run the bridge against its script, stopping once the script is spent.
    fn run_to_completion<L: DuplexLink, R: ReadySignal, T: EthTransmit>(
        runner: &mut BridgeRunner<'_, L, R, T>,
        control: BridgeControl<'_>,
    ) {
        block_on(join(runner.run(), async {
            Timer::after(Duration::from_millis(40)).await;
            control.stop();
        }));
    }

    fn device_frame(declared: usize, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; BUFFER_LEN];
        buf[0..2].copy_from_slice(&frame::MAGIC_FROM_DEVICE);
        buf[4..6].copy_from_slice(&(declared as u16).to_be_bytes());
        buf[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);
        buf
    }

    #[test]
    fn wifi_frame_reaches_the_device_with_header() {
        let mut resources = BridgeResources::new();
        let (filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Ok(vec![0u8; BUFFER_LEN])]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        let releases = release_counter();
        block_on(filter.frame_received(handle_over(ether_frame([0x08, 0x00], 64), releases)));

        run_to_completion(&mut runner, control);

        assert_eq!(runner.link.sent.len(), 1);
        let staged = &runner.link.sent[0];
        assert_eq!(staged[0..2], frame::MAGIC_TO_DEVICE);
        assert_eq!(staged[2], 0, "first sequence number");
        assert_eq!(staged[3], 1, "depth sampled before the dequeue");
        // 64 bytes floored to 128, plus the checksum slot.
        assert_eq!(staged[4..6], 132u16.to_be_bytes());
        assert_eq!(staged[6..12], MAC);
        assert_eq!(staged[24..26], [0x08, 0x00]);
        // Padding carries no stale bytes.
        assert!(staged[HEADER_LEN + 64..].iter().all(|b| *b == 0));

        assert_eq!(releases.load(Ordering::Relaxed), 1, "buffer returned");
        let stats = runner.stats.snapshot();
        assert_eq!(stats.transfers, 1);
        assert_eq!(stats.to_device_frames, 1);
        assert_eq!(stats.to_device_bytes, 64);
        assert_eq!(stats.no_magic, 1, "all-zero response has no magic");
        assert_eq!(stats.both_directions, 0);
    }

    #[test]
    fn device_frame_is_padded_checksummed_and_transmitted() {
        let payload: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let response = device_frame(300, &payload);
        let expected_crc = crc32(&response[HEADER_LEN..HEADER_LEN + 300]);

        let mut resources = BridgeResources::new();
        let (_filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Ok(response)]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        run_to_completion(&mut runner, control);

        assert_eq!(runner.wifi_tx.sent.len(), 1);
        let transmitted = &runner.wifi_tx.sent[0];
        // 300 is above the padding floor, so only the checksum is appended.
        assert_eq!(transmitted.len(), 304);
        assert_eq!(transmitted[..300], payload[..]);
        assert_eq!(transmitted[300..304], expected_crc.to_le_bytes());

        let stats = runner.stats.snapshot();
        assert_eq!(stats.transfers, 1);
        assert_eq!(stats.from_device_frames, 1);
        assert_eq!(stats.from_device_bytes, 300);
        assert_eq!(stats.no_magic, 0);
        assert_eq!(stats.both_directions, 0, "nothing was staged");
    }

    #[test]
    fn short_device_frame_is_padded_to_the_floor() {
        let payload = [0xA5u8; 64];
        let response = device_frame(64, &payload);
        // The padding bytes count into the checksum.
        let expected_crc = crc32(&response[HEADER_LEN..HEADER_LEN + 128]);

        let mut resources = BridgeResources::new();
        let (_filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Ok(response)]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        run_to_completion(&mut runner, control);

        let transmitted = &runner.wifi_tx.sent[0];
        assert_eq!(transmitted.len(), 132);
        assert_eq!(transmitted[..64], payload);
        assert!(transmitted[64..128].iter().all(|b| *b == 0));
        assert_eq!(transmitted[128..132], expected_crc.to_le_bytes());
    }

    #[test]
    fn missing_magic_is_counted_not_transmitted() {
        let mut resources = BridgeResources::new();
        let (_filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Ok(vec![0u8; BUFFER_LEN])]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        run_to_completion(&mut runner, control);

        assert!(runner.wifi_tx.sent.is_empty());
        let stats = runner.stats.snapshot();
        assert_eq!(stats.transfers, 1);
        assert_eq!(stats.no_magic, 1);
        assert_eq!(stats.from_device_frames, 0);
    }

    #[test]
    fn oversize_declared_length_is_dropped() {
        let response = device_frame(1600, &[]);
        let mut resources = BridgeResources::new();
        let (_filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Ok(response)]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        run_to_completion(&mut runner, control);

        assert!(runner.wifi_tx.sent.is_empty());
        let stats = runner.stats.snapshot();
        assert_eq!(stats.transfers, 1);
        assert_eq!(stats.from_device_frames, 0);
        assert_eq!(stats.no_magic, 0);
    }

    #[test]
    fn oversize_dequeued_frame_is_dropped_and_released() {
        let mut resources = BridgeResources::new();
        let (filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Ok(vec![0u8; BUFFER_LEN])]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        let releases = release_counter();
        block_on(filter.frame_received(handle_over(ether_frame([0x08, 0x00], 1600), releases)));

        run_to_completion(&mut runner, control);

        let staged = &runner.link.sent[0];
        assert_eq!(staged[4..6], [0, 0], "no payload staged");
        assert!(staged[HEADER_LEN..].iter().all(|b| *b == 0));
        assert_eq!(releases.load(Ordering::Relaxed), 1);
        assert_eq!(runner.stats.snapshot().to_device_frames, 0);
    }

    #[test]
    fn sequence_increments_every_transfer() {
        let mut resources = BridgeResources::new();
        let (_filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![
                Ok(vec![0u8; BUFFER_LEN]),
                Ok(vec![0u8; BUFFER_LEN]),
                Ok(vec![0u8; BUFFER_LEN]),
            ]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        run_to_completion(&mut runner, control);

        let sequences: Vec<u8> = runner.link.sent.iter().map(|tx| tx[2]).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(runner.stats.snapshot().transfers, 3);
    }

    #[test]
    fn both_directions_in_one_transfer_is_counted() {
        let payload = [0x5Au8; 200];
        let mut resources = BridgeResources::new();
        let (filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Ok(device_frame(200, &payload))]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        let releases = release_counter();
        block_on(filter.frame_received(handle_over(ether_frame([0x08, 0x06], 64), releases)));

        run_to_completion(&mut runner, control);

        let stats = runner.stats.snapshot();
        assert_eq!(stats.to_device_frames, 1);
        assert_eq!(stats.from_device_frames, 1);
        assert_eq!(stats.both_directions, 1);
    }

    #[test]
    fn transfer_error_abandons_the_iteration_only() {
        let mut resources = BridgeResources::new();
        let (_filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Err(()), Ok(vec![0u8; BUFFER_LEN])]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        run_to_completion(&mut runner, control);

        let stats = runner.stats.snapshot();
        // The failed transaction doesn't count; the loop carried on.
        assert_eq!(stats.transfers, 1);
        // Readiness bracketing held for every arming, including the failed
        // and the final idle one.
        assert_eq!(runner.ready.asserts, runner.ready.deasserts);
        assert_eq!(runner.ready.asserts, 3);
    }

    #[test]
    fn transmit_error_is_absorbed() {
        let payload = [1u8; 200];
        let mut resources = BridgeResources::new();
        let (_filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Ok(device_frame(200, &payload))]),
            ReadyProbe::default(),
            RecordingTx {
                fail: true,
                ..RecordingTx::default()
            },
        );
        run_to_completion(&mut runner, control);

        let stats = runner.stats.snapshot();
        assert_eq!(stats.transfers, 1);
        // Counted before the attempt, as the reference firmware did.
        assert_eq!(stats.from_device_frames, 1);
    }

    #[test]
    fn padding_never_leaks_an_earlier_frame() {
        let long = Box::leak(
            {
                let mut data = vec![0xFFu8; 200];
                data[12] = 0x08;
                data[13] = 0x00;
                data
            }
            .into_boxed_slice(),
        );
        let mut resources = BridgeResources::new();
        let (filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![Ok(vec![0u8; BUFFER_LEN]), Ok(vec![0u8; BUFFER_LEN])]),
            ReadyProbe::default(),
            RecordingTx::default(),
        );
        let releases = release_counter();
        block_on(filter.frame_received(handle_over(long, releases)));
        block_on(filter.frame_received(handle_over(ether_frame([0x08, 0x00], 64), releases)));

        run_to_completion(&mut runner, control);

        let second = &runner.link.sent[1];
        assert_eq!(second[4..6], 132u16.to_be_bytes());
        // Bytes between the short frame and the floor are zero, not residue
        // of the 200-byte frame staged one iteration earlier.
        assert!(second[HEADER_LEN + 64..HEADER_LEN + 200]
            .iter()
            .all(|b| *b == 0));
        assert_eq!(releases.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn stop_mid_transfer_latches_for_the_filter() {
        let mut resources = BridgeResources::new();
        let (filter, mut runner, control) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![]),
            NoReadySignal,
            RecordingTx::default(),
        );
        // Stop fires while the runner is suspended in the transfer, its
        // normal state. Breaking out of the loop must not unlatch it.
        block_on(join(runner.run(), async {
            Timer::after(Duration::from_millis(5)).await;
            control.stop();
        }));

        let releases = release_counter();
        block_on(filter.frame_received(handle_over(ether_frame([0x08, 0x00], 64), releases)));
        // With the loop gone nothing would ever drain the queue, so the
        // filter has to release instead of enqueue.
        assert_eq!(releases.load(Ordering::Relaxed), 1);
        assert_eq!(runner.queue.len(), 0);
    }

    #[test]
    fn stop_signal_ends_the_loop() {
        let mut resources = BridgeResources::new();
        let (_filter, mut runner, control): (RxFilter<'_>, _, _) = crate::new(
            &mut resources,
            MAC,
            OverflowPolicy::Block,
            ScriptedLink::with(vec![]),
            NoReadySignal,
            RecordingTx::default(),
        );
        // The link never answers; only the stop signal can end the run.
        run_to_completion(&mut runner, control);
        assert_eq!(runner.stats.snapshot().transfers, 0);
    }
}

//! Seams towards the hardware collaborators.
//!
//! The bridge core is chip-agnostic: the duplex link, its side-band
//! readiness line and the raw station transmit path are reached through
//! these traits, and platform glue supplies the implementations.

/// One full-duplex exchange with the external device.
#[allow(async_fn_in_trait)]
pub trait DuplexLink {
    /// Error reported by the underlying driver.
    type Error;
    /// Send `tx` and fill `rx` in a single fixed-size hardware transaction.
    ///
    /// Both slices always span the full transfer buffer; the logical frame
    /// length travels inside the header. The transaction is driven by the
    /// external device, so this suspends until the device clocks it out.
    async fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error>;
}

/// The readiness line toggled around each transfer.
///
/// The external device samples this to know a transaction is armed. Kept
/// separate from [DuplexLink] so platforms without such a line can plug in
/// [NoReadySignal].
pub trait ReadySignal {
    /// Signal that a transfer is armed and may be clocked.
    fn assert(&mut self);
    /// Signal that the transfer completed.
    fn deassert(&mut self);
}

/// [ReadySignal] no-op for platforms without a readiness line.
pub struct NoReadySignal;
impl ReadySignal for NoReadySignal {
    fn assert(&mut self) {}
    fn deassert(&mut self) {}
}

/// Raw frame transmission on the 802.11 station interface.
///
/// Takes a complete Ethernet frame and hands it to the WiFi driver directly,
/// bypassing any local IP stack.
#[allow(async_fn_in_trait)]
pub trait EthTransmit {
    /// Error reported by the WiFi driver.
    type Error;
    /// Queue one frame for transmission.
    async fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

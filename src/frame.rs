//! The wire format shared with the external device.
//!
//! Both directions of the duplex transfer carry a fixed 12 byte header in
//! front of the payload. The header layout is the bit-exact contract with the
//! device side and must not change without a corresponding change there.
//!
//! Controller to device:
//!
//! | offset | field |
//! | -- | -- |
//! | 0..2 | magic `AA 55` |
//! | 2 | sequence counter, wraps at 256 |
//! | 3 | hand-off queue depth, clamped to 255 |
//! | 4..6 | payload length, big endian, 0 if no frame was staged |
//! | 6..12 | station MAC address |
//!
//! Device to controller uses magic `A0 A0` and the same length field; the
//! remaining header bytes are ignored.

/// Length of the link header in front of the payload, both directions.
pub const HEADER_LEN: usize = 12;
/// Largest payload accepted in either direction (maximum Ethernet frame).
pub const MAX_PAYLOAD: usize = 1518;
/// Frames shorter than this are padded up before transmission.
pub const MIN_FRAME: usize = 128;
/// Trailer reserved for the 32-bit checksum field.
pub const TRAILER_LEN: usize = 4;
/// Slack kept at the end of the transfer buffers.
pub const BUFFER_MARGIN: usize = 32;
/// Size of one duplex transfer buffer. Every hardware transaction moves this
/// many bytes in both directions, regardless of the logical frame length.
pub const BUFFER_LEN: usize = HEADER_LEN + MAX_PAYLOAD + BUFFER_MARGIN;

/// Magic bytes identifying a controller-to-device frame.
pub const MAGIC_TO_DEVICE: [u8; 2] = [0xAA, 0x55];
/// Magic bytes the device places in front of a frame it wants transmitted.
/// Anything else means the device had nothing to send this transfer.
pub const MAGIC_FROM_DEVICE: [u8; 2] = [0xA0, 0xA0];

pub(crate) const ETHER_TYPE_OFFSET: usize = 12;
pub(crate) const ETHER_TYPE_IPV4: [u8; 2] = [0x08, 0x00];
pub(crate) const ETHER_TYPE_ARP: [u8; 2] = [0x08, 0x06];

/// Pad a logical payload length up to the minimum frame size.
pub(crate) fn padded_len(payload_len: usize) -> usize {
    payload_len.max(MIN_FRAME)
}

/// Write the device-bound header with a zeroed length field.
pub(crate) fn write_header(buf: &mut [u8], sequence: u8, queue_depth: usize, mac: &[u8; 6]) {
    buf[0..2].copy_from_slice(&MAGIC_TO_DEVICE);
    buf[2] = sequence;
    buf[3] = queue_depth.min(255) as u8;
    buf[4] = 0;
    buf[5] = 0;
    buf[6..12].copy_from_slice(mac);
}

/// Set the big-endian payload length field of a device-bound header.
pub(crate) fn set_wire_len(buf: &mut [u8], wire_len: usize) {
    buf[4..6].copy_from_slice(&(wire_len as u16).to_be_bytes());
}

/// Outcome of inspecting the buffer received from the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Inbound {
    /// The magic bytes didn't match. Expected whenever the device had
    /// nothing ready, so this is counted rather than logged.
    NoMagic,
    /// Valid magic, but the declared length exceeds [MAX_PAYLOAD].
    Oversize(usize),
    /// Valid magic, zero length. Nothing to forward.
    Empty,
    /// Valid magic with this declared payload length.
    Payload(usize),
}

/// Classify the device-originated half of a completed transfer.
pub(crate) fn classify_inbound(buf: &[u8]) -> Inbound {
    if buf.len() < HEADER_LEN || buf[0..2] != MAGIC_FROM_DEVICE {
        return Inbound::NoMagic;
    }
    let len = u16::from_be_bytes([buf[4], buf[5]]) as usize;
    if len > MAX_PAYLOAD {
        Inbound::Oversize(len)
    } else if len == 0 {
        Inbound::Empty
    } else {
        Inbound::Payload(len)
    }
}

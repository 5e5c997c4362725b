//! The 32-bit cyclic redundancy check appended to frames handed to the
//! station transmit path.
//!
//! This is the common reflected CRC-32 (polynomial `0xEDB88320`, register
//! preset to all ones, final complement), computed bitwise so it needs no
//! lookup table in flash.

/// Compute the CRC-32 of `data` in a single pass.
///
/// The external device checks this value against the checksum field its own
/// link layer carries, so the exact variant matters: reflected, LSB-first,
/// complemented. An empty input yields `0`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = u32::MAX;
    for byte in data {
        let mut ch = *byte;
        for _ in 0..8 {
            let bit = (u32::from(ch) ^ crc) & 1;
            crc >>= 1;
            if bit != 0 {
                crc ^= 0xEDB8_8320;
            }
            ch >>= 1;
        }
    }
    !crc
}

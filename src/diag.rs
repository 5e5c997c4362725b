//! Frame-dump rendering for the diagnostic print toggles.
//!
//! One line per frame: direction tag, the frame's own length field, the
//! destination and source MAC (collapsed to a `*me*` marker when they match
//! the station's address) and a protocol hint from the EtherType.

use core::fmt::Write;

use heapless::String;

use crate::frame::{ETHER_TYPE_ARP, ETHER_TYPE_IPV4};

const LINE_CAP: usize = 96;
const ME_MARKER: &str = "    *me*    ";

/// Log one relayed frame. No-op on empty or truncated input.
pub(crate) fn print_frame(buf: &[u8], len: usize, title: &str, own_mac: &[u8; 6]) {
    if let Some(line) = format_frame(buf, len, title, own_mac) {
        info!("{}", line.as_str());
    }
}

fn format_frame(buf: &[u8], len: usize, title: &str, own_mac: &[u8; 6]) -> Option<String<LINE_CAP>> {
    if len == 0 || buf.len() < 26 {
        return None;
    }
    let mut line = String::new();
    let field_len = u16::from_be_bytes([buf[4], buf[5]]);
    write!(line, "{}[{:04}] ", title, field_len).ok()?;
    // Destination and source MAC of the embedded Ethernet frame.
    write_mac(&mut line, &buf[12..18], own_mac)?;
    line.push('<').ok()?;
    write_mac(&mut line, &buf[18..24], own_mac)?;
    if buf[24..26] == ETHER_TYPE_IPV4 {
        line.push_str(" | ip | ").ok()?;
    } else if buf[24..26] == ETHER_TYPE_ARP {
        line.push_str(" |arp | ").ok()?;
    } else {
        write!(line, " |{:02x}{:02x}| ", buf[24], buf[25]).ok()?;
    }
    Some(line)
}

fn write_mac(line: &mut String<LINE_CAP>, mac: &[u8], own_mac: &[u8; 6]) -> Option<()> {
    if mac == own_mac {
        line.push_str(ME_MARKER).ok()
    } else {
        for byte in mac {
            write!(line, "{:02x}", byte).ok()?;
        }
        Some(())
    }
}

//! Packet decoding.
//!
//! Layout of one notification buffer:
//!
//! ```text
//! byte 0      type code (1 = ACC, 2 = PPG)
//! bytes 1..3  sequence counter, u16 little-endian
//! bytes 3..   N consecutive u24 little-endian samples
//! ```
//!
//! Trailing bytes that do not fill a whole sample are ignored.

use crate::collector::types::{DecodedPacket, PacketHeader, HEADER_LEN, SAMPLE_LEN};

/// Decode one notification buffer.
///
/// Returns `None` for buffers shorter than the header or carrying no
/// complete sample. Short packets happen on real links and are not errors.
pub fn decode_packet(data: &[u8]) -> Option<DecodedPacket> {
    if data.len() < HEADER_LEN {
        return None;
    }

    let sample_count = (data.len() - HEADER_LEN) / SAMPLE_LEN;
    if sample_count == 0 {
        return None;
    }

    let header = PacketHeader {
        type_code: data[0],
        sequence_counter: u16::from_le_bytes([data[1], data[2]]),
    };

    let raw_values = data[HEADER_LEN..]
        .chunks_exact(SAMPLE_LEN)
        .map(|chunk| decode_u24_le([chunk[0], chunk[1], chunk[2]]))
        .collect();

    Some(DecodedPacket { header, raw_values })
}

/// `low | mid << 8 | high << 16`
pub fn decode_u24_le(bytes: [u8; 3]) -> u32 {
    u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16)
}

/// Build a packet buffer. Values above 24 bits are truncated.
pub fn encode_packet(type_code: u8, sequence_counter: u16, values: &[u32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_LEN + values.len() * SAMPLE_LEN);
    data.push(type_code);
    data.extend_from_slice(&sequence_counter.to_le_bytes());
    for value in values {
        data.extend_from_slice(&value.to_le_bytes()[..SAMPLE_LEN]);
    }
    data
}

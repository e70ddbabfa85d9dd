//! protobuf::varint
//!
//! Zigzag-mapped base-128 varints, as used for the message index path of
//! the wire envelope.
//!
//! A signed value `v` is mapped to `(v << 1) ^ (v >> 63)` and emitted seven
//! bits at a time, least significant group first, with the high bit set on
//! every byte except the last.

use super::ProtoError;

/// Longest encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Map a signed value onto the unsigned range.
pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag`].
pub fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Append the zigzag varint encoding of `value` to `buf`.
pub fn encode_varint(value: i64, buf: &mut Vec<u8>) {
    let mut ux = zigzag(value);
    while ux >= 0x80 {
        buf.push((ux as u8) | 0x80);
        ux >>= 7;
    }
    buf.push(ux as u8);
}

/// Decode one zigzag varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Errors
///
/// `ProtoError::WireFormat` if `buf` ends mid-varint, or the encoding is
/// longer than [`MAX_VARINT_LEN`] bytes or overflows 64 bits.
pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize), ProtoError> {
    let mut ux: u64 = 0;

    for (i, &byte) in buf.iter().enumerate() {
        // The tenth byte carries the single remaining bit and must end the varint.
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(ProtoError::WireFormat("varint overflows 64 bits".into()));
        }

        ux |= u64::from(byte & 0x7f) << (7 * i);
        if byte < 0x80 {
            return Ok((unzigzag(ux), i + 1));
        }
    }

    Err(ProtoError::WireFormat("truncated varint".into()))
}

use bytes::{Buf, BufMut};

use crate::errors::{Result, corrupt};

/// Max number of bytes in a vlq encoded u64.
pub const MAX_VLQ_LEN: usize = 10;

/// Reads an unsigned vlq from the buffer.
///
/// The most-significant bit acts as a continuation flag; the lower 7 bits are
/// accumulated into the result in little-endian order.
pub fn read_unsigned_vlq(buf: &mut impl Buf) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(corrupt!("vlq integer truncated"));
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as u64) << shift;
        // If the continuation bit is not set, we're done.
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return Err(corrupt!("vlq integer too large"));
        }
    }
    Ok(result)
}

/// Writes an unsigned vlq to the buffer.
pub fn write_unsigned_vlq(buf: &mut impl BufMut, mut v: u64) {
    while v >= 0x80 {
        buf.put_u8((v as u8) | 0x80);
        v >>= 7;
    }
    buf.put_u8(v as u8);
}

/// Number of bytes `v` takes when vlq encoded.
pub const fn unsigned_vlq_len(v: u64) -> usize {
    let bits = 64 - (v | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decodes a ZigZag-encoded unsigned integer into a signed value.
pub const fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

/// Encodes a signed integer into a ZigZag-encoded unsigned integer.
pub const fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

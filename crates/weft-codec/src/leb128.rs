//! LEB128 variable-length integers
//!
//! The wire format uses unsigned LEB128 for counts, lengths and `nat`
//! values, and signed LEB128 for type opcodes and `int` values. Unbounded
//! values go through the `big_*` variants; everything structural fits in
//! 64 bits.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::error::DecodeError;

/// Append `v` as unsigned LEB128.
pub fn write_uleb128(buf: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Append `v` as signed LEB128.
pub fn write_sleb128(buf: &mut Vec<u8>, mut v: i64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        let done = (v == 0 && byte & 0x40 == 0) || (v == -1 && byte & 0x40 != 0);
        if done {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Append an unbounded natural as unsigned LEB128.
pub fn write_big_uleb128(buf: &mut Vec<u8>, v: &BigUint) {
    let mut digits = v.to_radix_le(128);
    if digits.is_empty() {
        digits.push(0);
    }
    let last = digits.len() - 1;
    for (i, d) in digits.into_iter().enumerate() {
        buf.push(if i == last { d } else { d | 0x80 });
    }
}

/// Append an unbounded integer as signed LEB128.
pub fn write_big_sleb128(buf: &mut Vec<u8>, v: &BigInt) {
    let mut v = v.clone();
    let minus_one = BigInt::from(-1);
    loop {
        let byte = (&v & BigInt::from(0x7f)).to_u8().unwrap_or(0);
        v >>= 7;
        let done = (v.is_zero() && byte & 0x40 == 0) || (v == minus_one && byte & 0x40 != 0);
        if done {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Read an unsigned LEB128 value fitting in 64 bits. `pos` advances past
/// the consumed bytes.
pub fn read_uleb128(bytes: &[u8], pos: &mut usize) -> Result<u64, DecodeError> {
    let start = *pos;
    let mut value: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *bytes.get(*pos).ok_or(DecodeError::Truncated(*pos))?;
        *pos += 1;
        let low = (byte & 0x7f) as u64;
        if shift >= 64 || (shift == 63 && low > 1) {
            return Err(DecodeError::Leb128(start));
        }
        value |= low << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Read a signed LEB128 value fitting in 64 bits.
pub fn read_sleb128(bytes: &[u8], pos: &mut usize) -> Result<i64, DecodeError> {
    let start = *pos;
    let mut value: i64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *bytes.get(*pos).ok_or(DecodeError::Truncated(*pos))?;
        *pos += 1;
        if shift >= 64 {
            return Err(DecodeError::Leb128(start));
        }
        value |= ((byte & 0x7f) as i64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 64 && byte & 0x40 != 0 {
                value |= -1i64 << shift;
            }
            return Ok(value);
        }
    }
}

/// Read an unbounded unsigned LEB128 natural.
pub fn read_big_uleb128(bytes: &[u8], pos: &mut usize) -> Result<BigUint, DecodeError> {
    let mut digits = Vec::new();
    loop {
        let byte = *bytes.get(*pos).ok_or(DecodeError::Truncated(*pos))?;
        *pos += 1;
        digits.push(byte & 0x7f);
        if byte & 0x80 == 0 {
            // Digits are all < 128, so this cannot fail.
            return Ok(BigUint::from_radix_le(&digits, 128).unwrap_or_default());
        }
    }
}

/// Read an unbounded signed LEB128 integer.
pub fn read_big_sleb128(bytes: &[u8], pos: &mut usize) -> Result<BigInt, DecodeError> {
    let mut digits = Vec::new();
    loop {
        let byte = *bytes.get(*pos).ok_or(DecodeError::Truncated(*pos))?;
        *pos += 1;
        digits.push(byte & 0x7f);
        if byte & 0x80 == 0 {
            let negative = byte & 0x40 != 0;
            let mut value = BigInt::from_radix_le(Sign::Plus, &digits, 128).unwrap_or_default();
            if negative {
                value -= BigInt::from(1u8) << (7 * digits.len());
            }
            return Ok(value);
        }
    }
}

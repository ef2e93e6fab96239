//! Packed decimal (BCD) codec
//!
//! RT130 packet headers carry their numeric fields as packed decimal: two
//! decimal digits per byte, most significant nibble first.

use crate::types::{RecordError, Result};

/// Widest value that fits the `u32` decoders (4 bytes = 8 digits)
pub const MAX_WIDTH: usize = 4;

/// Decode packed decimal bytes to their integer value
///
/// Accepts 1 to [`MAX_WIDTH`] bytes. Any nibble above 9 is a malformed field.
pub fn decode(bytes: &[u8]) -> Result<u32> {
    if bytes.is_empty() || bytes.len() > MAX_WIDTH {
        return Err(RecordError::malformed(
            "bcd",
            bytes,
            format!("unsupported BCD width {}", bytes.len()),
        ));
    }

    let mut value: u32 = 0;
    for &b in bytes {
        let (hi, lo) = nibbles(bytes, b)?;
        value = value * 100 + u32::from(hi) * 10 + u32::from(lo);
    }
    Ok(value)
}

/// Decode packed decimal bytes to a zero-padded digit string (two digits per byte)
///
/// Unlike [`decode`] this accepts any width, which is how the 6-byte packet
/// header time (`DDDHHMMSSTTT`) is read.
pub fn decode_string(bytes: &[u8]) -> Result<String> {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        let (hi, lo) = nibbles(bytes, b)?;
        out.push(char::from(b'0' + hi));
        out.push(char::from(b'0' + lo));
    }
    Ok(out)
}

/// Encode an integer into `width` bytes of packed decimal
pub fn encode(value: u32, width: usize) -> Result<Vec<u8>> {
    if width == 0 || width > MAX_WIDTH {
        return Err(RecordError::malformed(
            "bcd",
            value.to_string().as_bytes(),
            format!("unsupported BCD width {}", width),
        ));
    }
    let digits = format!("{:0w$}", value, w = width * 2);
    if digits.len() > width * 2 {
        return Err(RecordError::malformed(
            "bcd",
            digits.as_bytes(),
            format!("value does not fit in {} bytes", width),
        ));
    }

    Ok(digits
        .as_bytes()
        .chunks(2)
        .map(|pair| ((pair[0] - b'0') << 4) | (pair[1] - b'0'))
        .collect())
}

/// Split one packed byte into its two decimal digits
fn nibbles(field: &[u8], b: u8) -> Result<(u8, u8)> {
    let hi = b >> 4;
    let lo = b & 0x0F;
    if hi > 9 || lo > 9 {
        return Err(RecordError::malformed(
            "bcd",
            format!("{:02X?}", field).as_bytes(),
            format!("invalid packed digit 0x{:02X}", b),
        ));
    }
    Ok((hi, lo))
}

//! Conversions between register words and typed values.

use thiserror::Error;

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("expected {expected} registers, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Reinterpret each register as a big-endian two's-complement `i16`.
///
/// Fails if the device returned a different number of registers than
/// requested.
pub fn decode_signed16(raw: &[u16], expected: usize) -> Result<Vec<i16>, CodecError> {
    if raw.len() != expected {
        return Err(CodecError::InvalidLength {
            expected,
            actual: raw.len(),
        });
    }
    Ok(raw.iter().map(|&word| word as i16).collect())
}

/// Split every register into `(high, low)` bytes.
///
/// The output is always twice as long as the input.
pub fn decode_packed_bytes(raw: &[u16]) -> Vec<u8> {
    raw.iter().flat_map(|word| word.to_be_bytes()).collect()
}

/// Clamp each value to `[lo, hi]` and convert it to a register word.
pub fn encode_clamped(values: &[i32], lo: i16, hi: i16) -> Vec<u16> {
    values
        .iter()
        .map(|&value| value.clamp(i32::from(lo), i32::from(hi)) as i16 as u16)
        .collect()
}

//! Tactile sensor register table.
//!
//! Only hands connected over Modbus TCP expose tactile data. Each sensor
//! region is a contiguous block of signed 16-bit registers holding a
//! row-major pressure matrix.

use inspire_common::TouchMatrix;
use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};

/// One tactile sensor region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TactileRegion {
    /// Region name used as the key in published touch frames.
    pub name: String,
    /// First register of the region.
    pub address: u16,
    /// Size of the region in bytes (two per register).
    pub byte_len: u16,
    pub rows: usize,
    pub cols: usize,
}

impl TactileRegion {
    pub fn new(name: &str, address: u16, byte_len: u16, rows: usize, cols: usize) -> Self {
        Self {
            name: name.to_string(),
            address,
            byte_len,
            rows,
            cols,
        }
    }

    /// Number of registers to read.
    pub fn register_count(&self) -> u16 {
        self.byte_len / 2
    }

    /// `rows * cols` must equal the register count.
    pub fn is_consistent(&self) -> bool {
        self.rows * self.cols == self.register_count() as usize
    }

    /// Decode raw registers into this region's matrix.
    pub fn decode(&self, raw: &[u16]) -> Result<TouchMatrix, CodecError> {
        let expected = self.register_count() as usize;
        let values = codec::decode_signed16(raw, expected)?;
        TouchMatrix::from_flat(self.rows, self.cols, values).ok_or(CodecError::InvalidLength {
            expected: self.rows * self.cols,
            actual: expected,
        })
    }
}

/// Tactile layout of the standard hand: tip, top and pad of every finger,
/// an extra middle section on the thumb, and the palm.
pub fn default_tactile_table() -> Vec<TactileRegion> {
    vec![
        TactileRegion::new("fingerone_tip_touch", 3000, 18, 3, 3),
        TactileRegion::new("fingerone_top_touch", 3018, 192, 12, 8),
        TactileRegion::new("fingerone_palm_touch", 3210, 160, 10, 8),
        TactileRegion::new("fingertwo_tip_touch", 3370, 18, 3, 3),
        TactileRegion::new("fingertwo_top_touch", 3388, 192, 12, 8),
        TactileRegion::new("fingertwo_palm_touch", 3580, 160, 10, 8),
        TactileRegion::new("fingerthree_tip_touch", 3740, 18, 3, 3),
        TactileRegion::new("fingerthree_top_touch", 3758, 192, 12, 8),
        TactileRegion::new("fingerthree_palm_touch", 3950, 160, 10, 8),
        TactileRegion::new("fingerfour_tip_touch", 4110, 18, 3, 3),
        TactileRegion::new("fingerfour_top_touch", 4128, 192, 12, 8),
        TactileRegion::new("fingerfour_palm_touch", 4320, 160, 10, 8),
        TactileRegion::new("fingerfive_tip_touch", 4480, 18, 3, 3),
        TactileRegion::new("fingerfive_top_touch", 4498, 192, 12, 8),
        TactileRegion::new("fingerfive_middle_touch", 4690, 18, 3, 3),
        TactileRegion::new("fingerfive_palm_touch", 4708, 192, 12, 8),
        TactileRegion::new("palm_touch", 4900, 224, 14, 8),
    ]
}

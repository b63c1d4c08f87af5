//! Messages published by the bridge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of actuators on the hand.
///
/// Actuator arrays are always ordered
/// `[pinky, ring, middle, index, thumb-bend, thumb-rotation]`.
pub const ACTUATOR_COUNT: usize = 6;

/// Decoded actuator state for one poll cycle.
///
/// A channel whose register read failed in this cycle is `None` and is left
/// out of the serialized message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandState {
    /// Unix epoch milliseconds when the cycle started.
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_act: Option<Vec<i16>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_act: Option<Vec<i16>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_act: Option<Vec<i16>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Vec<i16>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Vec<u8>>,
}

/// A 2-D pressure matrix from one tactile region, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchMatrix {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<i16>,
}

impl TouchMatrix {
    /// Reshape a flat buffer. Returns `None` if the length does not match.
    pub fn from_flat(rows: usize, cols: usize, values: Vec<i16>) -> Option<Self> {
        (rows * cols == values.len()).then_some(Self { rows, cols, values })
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<i16> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col).copied()
    }

    /// Iterate over the rows.
    pub fn rows(&self) -> impl Iterator<Item = &[i16]> {
        self.values.chunks(self.cols.max(1))
    }
}

/// Tactile frame: one matrix per sensor region, keyed by region name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandTouch {
    pub timestamp: i64,
    pub regions: BTreeMap<String, TouchMatrix>,
}

/// Current time in milliseconds since the Unix epoch.
///
/// Returns 0 if the system clock is before the epoch.
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

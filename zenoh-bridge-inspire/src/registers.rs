//! Register map of the hand controller.
//!
//! Addresses are fixed per device model. Setpoints are written as six
//! consecutive holding registers; state is read back from the table in
//! [`default_states_table`].

use inspire_common::{ACTUATOR_COUNT, CommandTarget};
use serde::{Deserialize, Serialize};

/// Base of the angle setpoints.
pub const ANGLE_SET: u16 = 1486;
/// Base of the position setpoints.
pub const POS_SET: u16 = 1474;
/// Base of the force setpoints.
pub const FORCE_SET: u16 = 1498;
/// Base of the speed setpoints.
pub const SPEED_SET: u16 = 1522;
/// Writing 1 here clears latched actuator errors.
pub const ERROR_RESET: u16 = 1004;
/// Registers written per command target.
pub const SETPOINT_REGISTERS: u16 = ACTUATOR_COUNT as u16;

pub const POS_ACT: u16 = 1534;
pub const ANGLE_ACT: u16 = 1546;
pub const FORCE_ACT: u16 = 1582;
pub const CURRENT: u16 = 1594;
pub const ERR: u16 = 1606;
pub const STATUS: u16 = 1612;
pub const TEMPERATURE: u16 = 1618;

/// Register base for a command target.
pub fn write_base(target: CommandTarget) -> u16 {
    match target {
        CommandTarget::Angle => ANGLE_SET,
        CommandTarget::Position => POS_SET,
        CommandTarget::Force => FORCE_SET,
        CommandTarget::Speed => SPEED_SET,
    }
}

/// How the words of a register range decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// One big-endian signed 16-bit value per register.
    #[serde(rename = "short", alias = "signed16")]
    Signed16,
    /// Two unsigned bytes per register, high byte first.
    #[serde(rename = "byte", alias = "packed_byte")]
    PackedByte,
}

impl Encoding {
    /// Number of decoded values produced by `count` registers.
    pub fn decoded_len(&self, count: u16) -> usize {
        match self {
            Encoding::Signed16 => count as usize,
            Encoding::PackedByte => count as usize * 2,
        }
    }
}

/// A named telemetry channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    PosAct,
    AngleAct,
    ForceAct,
    Current,
    #[serde(alias = "error")]
    Err,
    Status,
    #[serde(alias = "temp")]
    Temperature,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::PosAct,
        Channel::AngleAct,
        Channel::ForceAct,
        Channel::Current,
        Channel::Err,
        Channel::Status,
        Channel::Temperature,
    ];

    /// Field name in the state message.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::PosAct => "pos_act",
            Channel::AngleAct => "angle_act",
            Channel::ForceAct => "force_act",
            Channel::Current => "current",
            Channel::Err => "err",
            Channel::Status => "status",
            Channel::Temperature => "temperature",
        }
    }

    /// Key in a poll snapshot.
    pub fn snapshot_key(&self) -> &'static str {
        match self {
            Channel::PosAct => "POS_ACT",
            Channel::AngleAct => "ANGLE_ACT",
            Channel::ForceAct => "FORCE_ACT",
            Channel::Current => "CURRENT",
            Channel::Err => "ERROR",
            Channel::Status => "STATUS",
            Channel::Temperature => "TEMP",
        }
    }

    /// Encoding used by the default register table.
    pub fn default_encoding(&self) -> Encoding {
        match self {
            Channel::PosAct | Channel::AngleAct | Channel::ForceAct | Channel::Current => {
                Encoding::Signed16
            }
            Channel::Err | Channel::Status | Channel::Temperature => Encoding::PackedByte,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the states table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEntry {
    pub channel: Channel,
    pub address: u16,
    pub count: u16,
    pub encoding: Encoding,
}

impl RegisterEntry {
    pub const fn new(channel: Channel, address: u16, count: u16, encoding: Encoding) -> Self {
        Self {
            channel,
            address,
            count,
            encoding,
        }
    }

    /// Number of values this entry decodes to.
    pub fn decoded_len(&self) -> usize {
        self.encoding.decoded_len(self.count)
    }
}

/// States table of the standard six-actuator hand.
pub fn default_states_table() -> Vec<RegisterEntry> {
    vec![
        RegisterEntry::new(Channel::PosAct, POS_ACT, 6, Encoding::Signed16),
        RegisterEntry::new(Channel::AngleAct, ANGLE_ACT, 6, Encoding::Signed16),
        RegisterEntry::new(Channel::ForceAct, FORCE_ACT, 6, Encoding::Signed16),
        RegisterEntry::new(Channel::Current, CURRENT, 6, Encoding::Signed16),
        RegisterEntry::new(Channel::Err, ERR, 3, Encoding::PackedByte),
        RegisterEntry::new(Channel::Status, STATUS, 3, Encoding::PackedByte),
        RegisterEntry::new(Channel::Temperature, TEMPERATURE, 3, Encoding::PackedByte),
    ]
}

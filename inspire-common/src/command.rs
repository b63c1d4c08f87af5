//! Control commands sent to the hand.
//!
//! A command carries a 4-bit mode mask selecting which of the four setpoint
//! arrays it contains. The mask is kept on the wire exactly as the hand
//! firmware tooling expects it:
//!
//! | bit      | target   |
//! |----------|----------|
//! | `0b0001` | angle    |
//! | `0b0010` | position |
//! | `0b0100` | force    |
//! | `0b1000` | speed    |
//!
//! Bits combine freely (`0b1001` is angle + speed) and mode `0` is a no-op.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::ACTUATOR_COUNT;

bitflags! {
    /// Mode mask of a [`ControlCommand`].
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Mode: u8 {
        const ANGLE = 0b0001;
        const POSITION = 0b0010;
        const FORCE = 0b0100;
        const SPEED = 0b1000;
    }
}

/// One setpoint array of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandTarget {
    Angle,
    Position,
    Force,
    Speed,
}

impl CommandTarget {
    /// All targets in ascending bit order. Dispatch follows this order.
    pub const ALL: [CommandTarget; 4] = [
        CommandTarget::Angle,
        CommandTarget::Position,
        CommandTarget::Force,
        CommandTarget::Speed,
    ];

    /// Mode bit selecting this target.
    pub fn mode(&self) -> Mode {
        match self {
            CommandTarget::Angle => Mode::ANGLE,
            CommandTarget::Position => Mode::POSITION,
            CommandTarget::Force => Mode::FORCE,
            CommandTarget::Speed => Mode::SPEED,
        }
    }

    /// Name of the wire field carrying this target.
    pub fn field(&self) -> &'static str {
        match self {
            CommandTarget::Angle => "angle_set",
            CommandTarget::Position => "pos_set",
            CommandTarget::Force => "force_set",
            CommandTarget::Speed => "speed_set",
        }
    }
}

impl std::fmt::Display for CommandTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field())
    }
}

/// Errors raised while building or decoding a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{target} requires exactly {expected} values, got {actual}")]
    InvalidArity {
        target: CommandTarget,
        expected: usize,
        actual: usize,
    },

    #[error("mode selects {0} but the field is missing")]
    MissingField(CommandTarget),
}

/// Setpoints for the six actuators.
pub type Setpoints = [i16; ACTUATOR_COUNT];

/// A validated control command.
///
/// A setpoint array is present if and only if its mode bit is set. Values are
/// carried as given; clamping to the device range happens when the command
/// is written to registers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireCommand", into = "WireCommand")]
pub struct ControlCommand {
    angle_set: Option<Setpoints>,
    pos_set: Option<Setpoints>,
    force_set: Option<Setpoints>,
    speed_set: Option<Setpoints>,
}

impl ControlCommand {
    /// Command with mode 0.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Start building a command.
    pub fn builder() -> ControlCommandBuilder {
        ControlCommandBuilder::default()
    }

    /// Mode mask derived from the fields present.
    pub fn mode(&self) -> Mode {
        CommandTarget::ALL
            .iter()
            .filter(|target| self.setpoints(**target).is_some())
            .fold(Mode::empty(), |mode, target| mode | target.mode())
    }

    /// Setpoints for a target, if selected.
    pub fn setpoints(&self, target: CommandTarget) -> Option<&Setpoints> {
        match target {
            CommandTarget::Angle => self.angle_set.as_ref(),
            CommandTarget::Position => self.pos_set.as_ref(),
            CommandTarget::Force => self.force_set.as_ref(),
            CommandTarget::Speed => self.speed_set.as_ref(),
        }
    }

    /// Selected targets with their setpoints, in dispatch order.
    pub fn selected(&self) -> impl Iterator<Item = (CommandTarget, &Setpoints)> {
        CommandTarget::ALL
            .into_iter()
            .filter_map(|target| self.setpoints(target).map(|values| (target, values)))
    }

    pub fn is_noop(&self) -> bool {
        self.mode().is_empty()
    }

    fn slot(&mut self, target: CommandTarget) -> &mut Option<Setpoints> {
        match target {
            CommandTarget::Angle => &mut self.angle_set,
            CommandTarget::Position => &mut self.pos_set,
            CommandTarget::Force => &mut self.force_set,
            CommandTarget::Speed => &mut self.speed_set,
        }
    }
}

/// Builder with one validated setter per target.
#[derive(Debug, Clone, Default)]
pub struct ControlCommandBuilder {
    command: ControlCommand,
}

impl ControlCommandBuilder {
    pub fn angle(self, values: &[i16]) -> Result<Self, CommandError> {
        self.set(CommandTarget::Angle, values)
    }

    pub fn position(self, values: &[i16]) -> Result<Self, CommandError> {
        self.set(CommandTarget::Position, values)
    }

    pub fn force(self, values: &[i16]) -> Result<Self, CommandError> {
        self.set(CommandTarget::Force, values)
    }

    pub fn speed(self, values: &[i16]) -> Result<Self, CommandError> {
        self.set(CommandTarget::Speed, values)
    }

    /// Set the setpoints of any target.
    pub fn set(mut self, target: CommandTarget, values: &[i16]) -> Result<Self, CommandError> {
        *self.command.slot(target) = Some(to_setpoints(target, values)?);
        Ok(self)
    }

    pub fn build(self) -> ControlCommand {
        self.command
    }
}

fn to_setpoints(target: CommandTarget, values: &[i16]) -> Result<Setpoints, CommandError> {
    values
        .try_into()
        .map_err(|_| CommandError::InvalidArity {
            target,
            expected: ACTUATOR_COUNT,
            actual: values.len(),
        })
}

/// Wire form of a command: the raw mode mask plus optional arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCommand {
    pub mode: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_set: Option<Vec<i16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_set: Option<Vec<i16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_set: Option<Vec<i16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_set: Option<Vec<i16>>,
}

impl WireCommand {
    fn field(&self, target: CommandTarget) -> Option<&Vec<i16>> {
        match target {
            CommandTarget::Angle => self.angle_set.as_ref(),
            CommandTarget::Position => self.pos_set.as_ref(),
            CommandTarget::Force => self.force_set.as_ref(),
            CommandTarget::Speed => self.speed_set.as_ref(),
        }
    }
}

impl TryFrom<WireCommand> for ControlCommand {
    type Error = CommandError;

    /// Validate a wire command.
    ///
    /// Mode bits above bit 3 are ignored, as are arrays whose bit is unset.
    /// Fixed-layout publishers always send all four arrays, so every array
    /// present must still hold six values.
    fn try_from(wire: WireCommand) -> Result<Self, Self::Error> {
        let mode = Mode::from_bits_truncate(wire.mode);
        let mut command = ControlCommand::default();

        for target in CommandTarget::ALL {
            match (mode.contains(target.mode()), wire.field(target)) {
                (true, Some(values)) => {
                    *command.slot(target) = Some(to_setpoints(target, values)?);
                }
                (true, None) => return Err(CommandError::MissingField(target)),
                (false, Some(values)) => {
                    to_setpoints(target, values)?;
                }
                (false, None) => {}
            }
        }

        Ok(command)
    }
}

impl From<ControlCommand> for WireCommand {
    fn from(command: ControlCommand) -> Self {
        Self {
            mode: command.mode().bits(),
            angle_set: command.angle_set.map(|v| v.to_vec()),
            pos_set: command.pos_set.map(|v| v.to_vec()),
            force_set: command.force_set.map(|v| v.to_vec()),
            speed_set: command.speed_set.map(|v| v.to_vec()),
        }
    }
}

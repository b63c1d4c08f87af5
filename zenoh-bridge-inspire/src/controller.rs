//! Client side of the control topic.

use inspire_common::{ControlCommand, Format, HandTopics, Result, encode};
use std::sync::Arc;
use tracing::debug;
use zenoh::Session;

/// Publishes validated commands for one hand.
///
/// Every setter takes six values, one per actuator, and fails with
/// [`inspire_common::CommandError::InvalidArity`] before anything is sent
/// otherwise.
#[derive(Clone, Debug)]
pub struct HandController {
    session: Arc<Session>,
    topics: HandTopics,
    format: Format,
}

impl HandController {
    pub fn new(session: Arc<Session>, topics: HandTopics, format: Format) -> Self {
        Self {
            session,
            topics,
            format,
        }
    }

    pub fn topics(&self) -> &HandTopics {
        &self.topics
    }

    pub async fn set_angle(&self, angles: &[i16]) -> Result<()> {
        self.send(&ControlCommand::builder().angle(angles)?.build())
            .await
    }

    pub async fn set_position(&self, positions: &[i16]) -> Result<()> {
        self.send(&ControlCommand::builder().position(positions)?.build())
            .await
    }

    pub async fn set_force(&self, forces: &[i16]) -> Result<()> {
        self.send(&ControlCommand::builder().force(forces)?.build())
            .await
    }

    pub async fn set_velocity(&self, speeds: &[i16]) -> Result<()> {
        self.send(&ControlCommand::builder().speed(speeds)?.build())
            .await
    }

    pub async fn set_angle_and_position(&self, angles: &[i16], positions: &[i16]) -> Result<()> {
        let command = ControlCommand::builder()
            .angle(angles)?
            .position(positions)?
            .build();
        self.send(&command).await
    }

    pub async fn set_angle_and_velocity(&self, angles: &[i16], speeds: &[i16]) -> Result<()> {
        let command = ControlCommand::builder()
            .angle(angles)?
            .speed(speeds)?
            .build();
        self.send(&command).await
    }

    /// Send a mode 0 command.
    pub async fn stop(&self) -> Result<()> {
        self.send(&ControlCommand::noop()).await
    }

    /// Publish any prepared command.
    pub async fn send(&self, command: &ControlCommand) -> Result<()> {
        let key = self.topics.ctrl();
        let payload = encode(command, self.format)?;
        debug!(key = %key, mode = command.mode().bits(), "Sending control command");
        self.session.put(&key, payload).await?;
        Ok(())
    }
}

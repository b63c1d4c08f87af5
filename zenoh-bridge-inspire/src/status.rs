//! Bridge status reporting on `<prefix>/@/status/<side>`.

use serde::{Deserialize, Serialize};
use zenoh::Session;

/// Bridge name reported in status messages.
pub const BRIDGE_NAME: &str = "inspire";

/// Status message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub bridge: String,
    pub version: String,
    /// "running" or "offline".
    pub status: String,
    /// Extra fields, flattened into the message.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl BridgeStatus {
    fn new(status: &str) -> Self {
        Self {
            bridge: BRIDGE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: status.to_string(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn running() -> Self {
        Self::new("running")
    }

    pub fn offline() -> Self {
        Self::new("offline")
    }

    /// Add one metadata field.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Publish as JSON regardless of the configured payload format.
    pub async fn publish(&self, session: &Session, key: &str) -> inspire_common::Result<()> {
        let payload = serde_json::to_vec(self)?;
        session.put(key, payload).await?;
        Ok(())
    }
}

//! Destinations for decoded telemetry.

use async_trait::async_trait;
use inspire_common::{Error, Format, HandState, HandTopics, HandTouch, Result, encode};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use zenoh::Session;

/// Receives every state and touch frame the poller produces.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn publish_state(&self, state: &HandState) -> Result<()>;

    async fn publish_touch(&self, touch: &HandTouch) -> Result<()>;
}

/// Publishes frames on the hand's Zenoh topics.
#[derive(Clone, Debug)]
pub struct ZenohSink {
    session: Arc<Session>,
    topics: HandTopics,
    format: Format,
}

impl ZenohSink {
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

    async fn put<T: serde::Serialize + Sync>(&self, key: String, value: &T) -> Result<()> {
        let payload = encode(value, self.format)?;
        self.session.put(&key, payload).await?;
        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for ZenohSink {
    async fn publish_state(&self, state: &HandState) -> Result<()> {
        self.put(self.topics.state(), state).await
    }

    async fn publish_touch(&self, touch: &HandTouch) -> Result<()> {
        self.put(self.topics.touch(), touch).await
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    states: Mutex<Vec<HandState>>,
    touches: Mutex<Vec<HandTouch>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn states(&self) -> Vec<HandState> {
        self.states.lock().clone()
    }

    pub fn touches(&self) -> Vec<HandTouch> {
        self.touches.lock().clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(Error::Io(std::io::Error::other("sink unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    async fn publish_state(&self, state: &HandState) -> Result<()> {
        self.check()?;
        self.states.lock().push(state.clone());
        Ok(())
    }

    async fn publish_touch(&self, touch: &HandTouch) -> Result<()> {
        self.check()?;
        self.touches.lock().push(touch.clone());
        Ok(())
    }
}

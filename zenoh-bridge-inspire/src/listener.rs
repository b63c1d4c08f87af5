//! Subscriber that forwards control commands to the engine.

use inspire_common::{ControlCommand, decode_auto};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};
use zenoh::Session;
use zenoh::sample::SampleKind;

use crate::engine::CommandHandler;

/// Listens on the hand's control topic.
pub struct CommandListener {
    session: Arc<Session>,
    key_expr: String,
    handler: CommandHandler,
}

impl CommandListener {
    pub fn new(session: Arc<Session>, key_expr: impl Into<String>, handler: CommandHandler) -> Self {
        Self {
            session,
            key_expr: key_expr.into(),
            handler,
        }
    }

    /// Run until `shutdown` flips to true or the subscriber closes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> inspire_common::Result<()> {
        let subscriber = self.session.declare_subscriber(&self.key_expr).await?;
        info!(key_expr = %self.key_expr, "Listening for control commands");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Command listener stopping");
                        break;
                    }
                }

                sample = subscriber.recv_async() => {
                    let sample = match sample {
                        Ok(sample) => sample,
                        Err(e) => {
                            warn!(error = %e, "Command subscriber closed");
                            break;
                        }
                    };

                    if sample.kind() == SampleKind::Delete {
                        trace!(key = %sample.key_expr(), "Ignoring delete sample");
                        continue;
                    }

                    let payload = sample.payload().to_bytes();
                    let command: ControlCommand = match decode_auto(&payload) {
                        Ok(command) => command,
                        Err(e) => {
                            warn!(
                                key = %sample.key_expr(),
                                payload_len = payload.len(),
                                error = %e,
                                "Rejected control command"
                            );
                            continue;
                        }
                    };

                    debug!(mode = command.mode().bits(), "Received control command");
                    let report = self.handler.handle(&command).await;
                    if !report.is_success() {
                        debug!(
                            failed = report.failures().count(),
                            attempted = report.writes.len(),
                            "Control command partially applied"
                        );
                    }
                }
            }
        }

        subscriber.undeclare().await?;
        Ok(())
    }
}

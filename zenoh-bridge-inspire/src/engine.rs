//! The synchronization engine: one transport guard shared by the poll loop
//! and the command handler.

use inspire_common::ControlCommand;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::HandConfig;
use crate::dispatcher::{CommandDispatcher, DispatchReport};
use crate::history::HistoryStore;
use crate::poller::{Snapshot, TelemetryPoller};
use crate::registers;
use crate::sink::TelemetrySink;
use crate::stats::EngineStats;
use crate::transport::{ConnectError, ConnectionState, RegisterTransport, TransportGuard};

pub struct SyncEngine {
    guard: Arc<TransportGuard>,
    poller: TelemetryPoller,
    dispatcher: CommandDispatcher,
    stats: Arc<EngineStats>,
}

impl SyncEngine {
    /// Connect the transport and prepare the device.
    ///
    /// Fails only when every connection attempt fails. The error-reset write
    /// that follows is best effort.
    pub async fn connect(
        config: &HandConfig,
        transport: Box<dyn RegisterTransport>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Result<Self, ConnectError> {
        let guard = Arc::new(TransportGuard::new(transport));
        guard
            .connect(config.max_retries, config.retry_delay())
            .await?;

        if config.reset_errors_on_start {
            match guard.write_register(registers::ERROR_RESET, 1).await {
                Ok(()) => info!("Cleared actuator errors"),
                Err(e) => warn!("Error reset failed, continuing: {}", e),
            }
        }

        let tactile = if config.tactile_enabled() {
            config.tactile_regions.clone()
        } else {
            Vec::new()
        };

        let stats = Arc::new(EngineStats::new());
        let poller = TelemetryPoller::new(
            guard.clone(),
            config.states.clone(),
            tactile,
            sink,
            stats.clone(),
            config.history_length,
        );
        let dispatcher = CommandDispatcher::new(guard.clone(), config.limits, stats.clone());

        Ok(Self {
            guard,
            poller,
            dispatcher,
            stats,
        })
    }

    /// Run one poll cycle.
    pub async fn poll(&mut self) -> Snapshot {
        self.poller.poll().await
    }

    pub fn history(&self) -> &HistoryStore {
        self.poller.history()
    }

    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.stats
    }

    pub fn state(&self) -> ConnectionState {
        self.guard.state()
    }

    pub fn endpoint(&self) -> &str {
        self.guard.endpoint()
    }

    pub fn tactile_enabled(&self) -> bool {
        self.poller.tactile_enabled()
    }

    /// Handle for delivering commands from another task.
    pub fn command_handler(&self) -> CommandHandler {
        CommandHandler {
            dispatcher: self.dispatcher.clone(),
        }
    }

    pub async fn close(&self) {
        self.guard.close().await;
    }
}

/// Cloneable entry point for inbound commands.
#[derive(Clone)]
pub struct CommandHandler {
    dispatcher: CommandDispatcher,
}

impl CommandHandler {
    pub async fn handle(&self, command: &ControlCommand) -> DispatchReport {
        self.dispatcher.dispatch(command).await
    }
}

//! Writes control commands to the setpoint registers.

use inspire_common::{CommandTarget, ControlCommand};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec;
use crate::config::CommandLimits;
use crate::registers;
use crate::stats::EngineStats;
use crate::transport::{TransportError, TransportGuard};

/// Outcome of one setpoint write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub target: CommandTarget,
    pub address: u16,
    pub result: Result<(), TransportError>,
}

/// Every write attempted for one command, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub writes: Vec<WriteOutcome>,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.writes.iter().all(|write| write.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &WriteOutcome> {
        self.writes.iter().filter(|write| write.result.is_err())
    }

    /// Start addresses in the order they were written.
    pub fn addresses(&self) -> Vec<u16> {
        self.writes.iter().map(|write| write.address).collect()
    }
}

/// Translates commands into register writes.
#[derive(Clone)]
pub struct CommandDispatcher {
    guard: Arc<TransportGuard>,
    limits: CommandLimits,
    stats: Arc<EngineStats>,
}

impl CommandDispatcher {
    pub fn new(guard: Arc<TransportGuard>, limits: CommandLimits, stats: Arc<EngineStats>) -> Self {
        Self {
            guard,
            limits,
            stats,
        }
    }

    /// Write every selected target, angle first and speed last.
    ///
    /// A failed write is reported and the remaining targets are still
    /// written.
    pub async fn dispatch(&self, command: &ControlCommand) -> DispatchReport {
        self.stats.record_command();
        let mut report = DispatchReport::default();

        for (target, setpoints) in command.selected() {
            let address = registers::write_base(target);
            let range = self.limits.range(target);
            let values: Vec<i32> = setpoints.iter().map(|&v| i32::from(v)).collect();
            let words = codec::encode_clamped(&values, range.min, range.max);

            let result = self.guard.write_registers(address, &words).await;
            match &result {
                Ok(()) => debug!("Wrote {} setpoints at {}: {:?}", target, address, words),
                Err(e) => {
                    self.stats.record_write_failure();
                    warn!("Failed to write {} setpoints at {}: {}", target, address, e);
                }
            }

            report.writes.push(WriteOutcome {
                target,
                address,
                result,
            });
        }

        report
    }
}

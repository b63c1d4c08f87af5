//! Bridge counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters shared by the poller, the dispatcher and the sink.
#[derive(Debug)]
pub struct EngineStats {
    start_time: Instant,
    cycles: AtomicU64,
    read_failures: AtomicU64,
    write_failures: AtomicU64,
    commands: AtomicU64,
    publish_failures: AtomicU64,
    last_poll_duration_us: AtomicU64,
}

impl Default for EngineStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: AtomicU64::new(0),
            read_failures: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            commands: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            last_poll_duration_us: AtomicU64::new(0),
        }
    }
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, duration_us: u64) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_poll_duration_us
            .store(duration_us, Ordering::Relaxed);
    }

    pub fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn read_failures(&self) -> u64 {
        self.read_failures.load(Ordering::Relaxed)
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    pub fn commands(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            cycles: self.cycles(),
            read_failures: self.read_failures(),
            write_failures: self.write_failures(),
            commands: self.commands(),
            publish_failures: self.publish_failures(),
            last_poll_duration_us: self.last_poll_duration_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub cycles: u64,
    pub read_failures: u64,
    pub write_failures: u64,
    pub commands: u64,
    pub publish_failures: u64,
    pub last_poll_duration_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = EngineStats::new();
        stats.record_cycle(850);
        stats.record_cycle(900);
        stats.record_read_failure();
        stats.record_write_failure();
        stats.record_write_failure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cycles, 2);
        assert_eq!(snapshot.read_failures, 1);
        assert_eq!(snapshot.write_failures, 2);
        assert_eq!(snapshot.commands, 0);
        assert_eq!(snapshot.last_poll_duration_us, 900);
    }
}

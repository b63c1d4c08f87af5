//! Configuration for the Inspire hand bridge.

use inspire_common::{CommandTarget, Format, HandSide, HandTopics, LoggingConfig, ZenohConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::registers::{Encoding, RegisterEntry, default_states_table};
use crate::tactile::{TactileRegion, default_tactile_table};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspireBridgeConfig {
    /// Zenoh connection settings
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Hand controller settings
    #[serde(default)]
    pub hand: HandConfig,

    /// Payload encoding of published messages
    #[serde(default)]
    pub serialization: Format,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for one hand controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandConfig {
    /// Topic suffix, `l` or `r`
    #[serde(default)]
    pub side: HandSide,

    /// Topic prefix (default: "rt/inspire_hand")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Modbus connection
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Modbus unit/slave ID (1-247)
    #[serde(default = "default_device_id")]
    pub device_id: u8,

    /// Poll period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Samples kept per actuator and channel
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    /// Connection attempts before giving up at startup
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between connection attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Read and publish tactile data (TCP connections only)
    #[serde(default = "default_true")]
    pub tactile: bool,

    /// Clear latched actuator errors after connecting
    #[serde(default = "default_true")]
    pub reset_errors_on_start: bool,

    /// State registers to poll
    #[serde(default = "default_states_table")]
    pub states: Vec<RegisterEntry>,

    /// Tactile regions to poll
    #[serde(default = "default_tactile_table")]
    pub tactile_regions: Vec<TactileRegion>,

    /// Setpoint ranges applied before writing
    #[serde(default)]
    pub limits: CommandLimits,
}

fn default_key_prefix() -> String {
    inspire_common::KEY_PREFIX.to_string()
}

fn default_device_id() -> u8 {
    1
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_history_length() -> usize {
    crate::history::DEFAULT_HISTORY_LENGTH
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            side: HandSide::default(),
            key_prefix: default_key_prefix(),
            connection: ConnectionConfig::default(),
            device_id: default_device_id(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
            history_length: default_history_length(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            tactile: true,
            reset_errors_on_start: true,
            states: default_states_table(),
            tactile_regions: default_tactile_table(),
            limits: CommandLimits::default(),
        }
    }
}

impl HandConfig {
    pub fn topics(&self) -> HandTopics {
        HandTopics::with_prefix(&self.key_prefix, self.side)
    }

    /// Tactile data is only available over TCP.
    pub fn tactile_enabled(&self) -> bool {
        self.tactile && self.connection.is_tcp()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Connection configuration (TCP or RTU).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    /// Modbus TCP connection
    Tcp {
        /// Host address (default: "192.168.11.210")
        #[serde(default = "default_host")]
        host: String,
        /// TCP port (default: 6000)
        #[serde(default = "default_tcp_port")]
        port: u16,
    },
    /// Modbus RTU (serial) connection
    Rtu {
        /// Serial port path (default: "/dev/ttyUSB0")
        #[serde(default = "default_serial_port")]
        port: String,
        /// Baud rate (default: 115200)
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        /// Data bits (default: 8)
        #[serde(default = "default_data_bits")]
        data_bits: u8,
        /// Parity: "none", "even", or "odd" (default: "none")
        #[serde(default = "default_parity")]
        parity: String,
        /// Stop bits: 1 or 2 (default: 1)
        #[serde(default = "default_stop_bits")]
        stop_bits: u8,
    },
}

fn default_host() -> String {
    "192.168.11.210".to_string()
}

fn default_tcp_port() -> u16 {
    6000
}

fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    115200
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig::Tcp {
            host: default_host(),
            port: default_tcp_port(),
        }
    }
}

impl ConnectionConfig {
    pub fn is_tcp(&self) -> bool {
        matches!(self, ConnectionConfig::Tcp { .. })
    }

    /// Short description for logs and status reports.
    pub fn describe(&self) -> String {
        match self {
            ConnectionConfig::Tcp { host, port } => format!("tcp://{}:{}", host, port),
            ConnectionConfig::Rtu {
                port, baud_rate, ..
            } => format!("rtu://{}@{}", port, baud_rate),
        }
    }
}

/// Inclusive setpoint range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: i16,
    pub max: i16,
}

impl ValueRange {
    pub const fn new(min: i16, max: i16) -> Self {
        Self { min, max }
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::new(0, 1000)
    }
}

/// Per-target setpoint ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLimits {
    #[serde(default)]
    pub angle: ValueRange,
    #[serde(default)]
    pub position: ValueRange,
    #[serde(default)]
    pub force: ValueRange,
    #[serde(default)]
    pub speed: ValueRange,
}

impl CommandLimits {
    pub fn range(&self, target: CommandTarget) -> ValueRange {
        match target {
            CommandTarget::Angle => self.angle,
            CommandTarget::Position => self.position,
            CommandTarget::Force => self.force,
            CommandTarget::Speed => self.speed,
        }
    }
}

impl InspireBridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: InspireBridgeConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hand = &self.hand;

        if hand.device_id == 0 || hand.device_id > 247 {
            return Err(ConfigError::Validation(format!(
                "device_id must be 1-247, got {}",
                hand.device_id
            )));
        }

        if hand.history_length == 0 {
            return Err(ConfigError::Validation(
                "history_length must be at least 1".to_string(),
            ));
        }

        if hand.max_retries == 0 {
            return Err(ConfigError::Validation(
                "max_retries must be at least 1".to_string(),
            ));
        }

        if hand.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }

        if hand.states.is_empty() {
            return Err(ConfigError::Validation(
                "states table cannot be empty".to_string(),
            ));
        }

        for entry in &hand.states {
            if entry.count == 0 || entry.count > 125 {
                return Err(ConfigError::Validation(format!(
                    "state '{}': count must be 1-125, got {}",
                    entry.channel, entry.count
                )));
            }
            if entry.channel.default_encoding() == Encoding::PackedByte
                && entry.encoding != Encoding::PackedByte
            {
                return Err(ConfigError::Validation(format!(
                    "state '{}': byte channel must use the byte encoding",
                    entry.channel
                )));
            }
        }

        for region in &hand.tactile_regions {
            let count = region.register_count();
            if count == 0 || count > 125 {
                return Err(ConfigError::Validation(format!(
                    "tactile region '{}': byte_len must cover 1-125 registers, got {}",
                    region.name, count
                )));
            }
            if !region.is_consistent() {
                return Err(ConfigError::Validation(format!(
                    "tactile region '{}': {}x{} does not match {} registers",
                    region.name,
                    region.rows,
                    region.cols,
                    region.register_count()
                )));
            }
        }

        for target in CommandTarget::ALL {
            let range = hand.limits.range(target);
            if range.min > range.max {
                return Err(ConfigError::Validation(format!(
                    "limits.{:?}: min {} is greater than max {}",
                    target, range.min, range.max
                )));
            }
        }

        if let ConnectionConfig::Rtu { parity, .. } = &hand.connection {
            match parity.to_lowercase().as_str() {
                "none" | "even" | "odd" => {}
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "invalid parity '{}' (use none, even, or odd)",
                        parity
                    )));
                }
            }
        }

        Ok(())
    }
}

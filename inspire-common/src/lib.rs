//! Inspire hand common library.
//!
//! Shared types and utilities for the Modbus ⇄ Zenoh hand bridge and the
//! tools that talk to it:
//!
//! - [`messages`] - State and tactile messages published by the bridge
//! - [`command`] - Mode-masked control commands consumed by the bridge
//! - [`keyexpr`] - Topic key expressions per hand side
//! - [`serialization`] - JSON/CBOR encoding and decoding
//! - [`config`] - Zenoh/logging settings and JSON5 loading
//! - [`session`] - Zenoh session management
//! - [`error`] - Error types

pub mod command;
pub mod config;
pub mod error;
pub mod keyexpr;
pub mod messages;
pub mod serialization;
pub mod session;

pub use command::{CommandError, CommandTarget, ControlCommand, Mode, Setpoints, WireCommand};
pub use config::{LogFormat, LoggingConfig, ZenohConfig, load_config, parse_config};
pub use error::{Error, Result};
pub use keyexpr::{HandSide, HandTopics, KEY_PREFIX};
pub use messages::{ACTUATOR_COUNT, HandState, HandTouch, TouchMatrix, current_timestamp_millis};
pub use serialization::{Format, decode, decode_auto, encode};
pub use session::connect;

/// Initialize tracing.
///
/// `RUST_LOG` takes precedence over the configured level. The output format
/// follows [`LoggingConfig::format`].
///
/// # Example
///
/// ```ignore
/// use inspire_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}

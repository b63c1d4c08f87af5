//! Zenoh bridge for Inspire dexterous hands.
//!
//! The bridge polls a hand's holding registers over Modbus TCP or RTU,
//! publishes decoded state and tactile frames to Zenoh, and writes inbound
//! control commands back to the setpoint registers.
//!
//! # Key Expressions
//!
//! ```text
//! rt/inspire_hand/state/<side>      actuator state (published)
//! rt/inspire_hand/touch/<side>      tactile matrices (published, TCP only)
//! rt/inspire_hand/ctrl/<side>       control commands (subscribed)
//! rt/inspire_hand/@/status/<side>   bridge status
//! ```
//!
//! Where `<side>` is `l` or `r`.
//!
//! # Architecture
//!
//! A [`SyncEngine`](engine::SyncEngine) owns one
//! [`TransportGuard`](transport::TransportGuard). The poll loop and the
//! command listener share it; every register exchange takes its lock once.

pub mod codec;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod engine;
pub mod history;
pub mod listener;
pub mod memory;
pub mod poller;
pub mod registers;
pub mod sink;
pub mod stats;
pub mod status;
pub mod tactile;
pub mod transport;

pub use config::{CommandLimits, ConnectionConfig, HandConfig, InspireBridgeConfig, ValueRange};
pub use engine::{CommandHandler, SyncEngine};
pub use memory::MemoryTransport;
pub use poller::Snapshot;
pub use transport::{ConnectError, ModbusTransport, RegisterTransport, TransportError};

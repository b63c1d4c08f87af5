//! Register transports and the guard that serializes access to them.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;

/// Errors from a single register exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Read of {count} registers at {address} failed: {reason}")]
    ReadFailed {
        address: u16,
        count: u16,
        reason: String,
    },
    #[error("Write at {address} failed: {reason}")]
    WriteFailed { address: u16, reason: String },
    #[error("Not connected")]
    NotConnected,
    #[error("Request at {address} timed out after {timeout_ms} ms")]
    Timeout { address: u16, timeout_ms: u64 },
}

/// Startup connection failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("Gave up after {attempts} connection attempts: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: String },
}

/// Connection lifecycle as seen by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Attempt number in progress, starting at 1.
    Connecting(u32),
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting(_) => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

/// A link to the hand's holding registers.
#[async_trait]
pub trait RegisterTransport: Send {
    /// Human readable endpoint, used in logs.
    fn describe(&self) -> String;

    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError>;

    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), TransportError>;

    async fn write_register(&mut self, address: u16, word: u16) -> Result<(), TransportError>;

    async fn disconnect(&mut self);
}

/// Modbus TCP or RTU transport.
pub struct ModbusTransport {
    connection: ConnectionConfig,
    slave: Slave,
    timeout: Duration,
    ctx: Option<Context>,
}

impl ModbusTransport {
    pub fn new(connection: ConnectionConfig, device_id: u8, timeout: Duration) -> Self {
        Self {
            connection,
            slave: Slave(device_id),
            timeout,
            ctx: None,
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Open a fresh context. Borrows nothing from `self`: `Context` is not `Sync`.
    async fn open(
        connection: ConnectionConfig,
        slave: Slave,
        timeout: Duration,
    ) -> Result<Context, TransportError> {
        match connection {
            ConnectionConfig::Tcp { host, port } => {
                let addr = tokio::net::lookup_host((host.as_str(), port))
                    .await
                    .map_err(|e| TransportError::Connect(format!("Invalid address: {}", e)))?
                    .next()
                    .ok_or_else(|| {
                        TransportError::Connect(format!("No address for {}:{}", host, port))
                    })?;

                tokio::time::timeout(timeout, tcp::connect_slave(addr, slave))
                    .await
                    .map_err(|_| TransportError::Connect("Connection timeout".to_string()))?
                    .map_err(|e| TransportError::Connect(e.to_string()))
            }
            ConnectionConfig::Rtu {
                port,
                baud_rate,
                data_bits,
                parity,
                stop_bits,
            } => {
                let parity = match parity.to_lowercase().as_str() {
                    "even" => tokio_serial::Parity::Even,
                    "odd" => tokio_serial::Parity::Odd,
                    _ => tokio_serial::Parity::None,
                };

                let stop_bits = match stop_bits {
                    2 => tokio_serial::StopBits::Two,
                    _ => tokio_serial::StopBits::One,
                };

                let data_bits = match data_bits {
                    5 => tokio_serial::DataBits::Five,
                    6 => tokio_serial::DataBits::Six,
                    7 => tokio_serial::DataBits::Seven,
                    _ => tokio_serial::DataBits::Eight,
                };

                let builder = tokio_serial::new(port, baud_rate)
                    .parity(parity)
                    .stop_bits(stop_bits)
                    .data_bits(data_bits);

                let serial = tokio_serial::SerialStream::open(&builder)
                    .map_err(|e| TransportError::Connect(format!("Serial open failed: {}", e)))?;

                Ok(rtu::attach_slave(serial, slave))
            }
        }
    }
}

#[async_trait]
impl RegisterTransport for ModbusTransport {
    fn describe(&self) -> String {
        self.connection.describe()
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if let Some(mut ctx) = self.ctx.take() {
            let _ = ctx.disconnect().await;
        }
        let ctx = Self::open(self.connection.clone(), self.slave, self.timeout).await?;
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;

        let failed = |reason: String| TransportError::ReadFailed {
            address,
            count,
            reason,
        };

        tokio::time::timeout(timeout, ctx.read_holding_registers(address, count))
            .await
            .map_err(|_| TransportError::Timeout {
                address,
                timeout_ms,
            })?
            .map_err(|e| failed(e.to_string()))?
            .map_err(|e| failed(format!("Exception: {:?}", e)))
    }

    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), TransportError> {
        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;

        let failed = |reason: String| TransportError::WriteFailed { address, reason };

        tokio::time::timeout(timeout, ctx.write_multiple_registers(address, words))
            .await
            .map_err(|_| TransportError::Timeout {
                address,
                timeout_ms,
            })?
            .map_err(|e| failed(e.to_string()))?
            .map_err(|e| failed(format!("Exception: {:?}", e)))
    }

    async fn write_register(&mut self, address: u16, word: u16) -> Result<(), TransportError> {
        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;

        let failed = |reason: String| TransportError::WriteFailed { address, reason };

        tokio::time::timeout(timeout, ctx.write_single_register(address, word))
            .await
            .map_err(|_| TransportError::Timeout {
                address,
                timeout_ms,
            })?
            .map_err(|e| failed(e.to_string()))?
            .map_err(|e| failed(format!("Exception: {:?}", e)))
    }

    async fn disconnect(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            if let Err(e) = ctx.disconnect().await {
                debug!("Error while disconnecting: {}", e);
            }
        }
    }
}

/// Serializes every register exchange against one transport.
///
/// The async lock is taken once per exchange and released before the call
/// returns, so a poll cycle and a command dispatch interleave at register
/// granularity.
pub struct TransportGuard {
    transport: tokio::sync::Mutex<Box<dyn RegisterTransport>>,
    state: Mutex<ConnectionState>,
    endpoint: String,
}

impl TransportGuard {
    pub fn new(transport: Box<dyn RegisterTransport>) -> Self {
        let endpoint = transport.describe();
        Self {
            transport: tokio::sync::Mutex::new(transport),
            state: Mutex::new(ConnectionState::Disconnected),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// Connect, retrying up to `max_retries` attempts in total.
    ///
    /// Sleeps `retry_delay` between attempts, never after the last one.
    pub async fn connect(&self, max_retries: u32, retry_delay: Duration) -> Result<(), ConnectError> {
        let mut last_error = String::from("no connection attempt made");

        for attempt in 1..=max_retries {
            self.set_state(ConnectionState::Connecting(attempt));
            info!(
                "Connecting to {} (attempt {}/{})",
                self.endpoint, attempt, max_retries
            );

            let result = {
                let mut transport = self.transport.lock().await;
                transport.connect().await
            };

            match result {
                Ok(()) => {
                    self.set_state(ConnectionState::Connected);
                    info!("Connected to {}", self.endpoint);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Connection attempt {}/{} to {} failed: {}",
                        attempt, max_retries, self.endpoint, e
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_retries {
                tokio::time::sleep(retry_delay).await;
            }
        }

        self.set_state(ConnectionState::Failed);
        error!(
            "Giving up on {} after {} attempts",
            self.endpoint, max_retries
        );

        Err(ConnectError::ExhaustedRetries {
            attempts: max_retries,
            last_error,
        })
    }

    pub async fn read_holding_registers(
        &self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let mut transport = self.transport.lock().await;
        transport.read_holding_registers(address, count).await
    }

    pub async fn write_registers(&self, address: u16, words: &[u16]) -> Result<(), TransportError> {
        let mut transport = self.transport.lock().await;
        transport.write_registers(address, words).await
    }

    pub async fn write_register(&self, address: u16, word: u16) -> Result<(), TransportError> {
        let mut transport = self.transport.lock().await;
        transport.write_register(address, word).await
    }

    /// Disconnect. The guard can be reconnected with [`connect`](Self::connect).
    pub async fn close(&self) {
        {
            let mut transport = self.transport.lock().await;
            transport.disconnect().await;
        }
        self.set_state(ConnectionState::Disconnected);
        info!("Disconnected from {}", self.endpoint);
    }
}

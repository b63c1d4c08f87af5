//! In-memory register bank.
//!
//! Backs `--simulate` runs and the test suite. Handles are cheap clones of
//! the same bank, so a test can keep one handle for inspection while the
//! engine owns another.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::registers;
use crate::tactile::TactileRegion;
use crate::transport::{RegisterTransport, TransportError};

/// One write seen by the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub address: u16,
    pub words: Vec<u16>,
}

#[derive(Debug, Clone, Copy)]
struct Mirror {
    from: u16,
    to: u16,
    count: u16,
}

#[derive(Debug, Default)]
struct Bank {
    registers: HashMap<u16, u16>,
    connected: bool,
    connect_failures: u32,
    connect_attempts: u32,
    failing_reads: BTreeSet<u16>,
    failing_writes: BTreeSet<u16>,
    writes: Vec<WriteRecord>,
    reads: Vec<(u16, u16)>,
    mirrors: Vec<Mirror>,
}

impl Bank {
    fn store(&mut self, address: u16, words: &[u16]) {
        for (offset, word) in words.iter().enumerate() {
            self.registers
                .insert(address.wrapping_add(offset as u16), *word);
        }

        let mirrored: Vec<(u16, Vec<u16>)> = self
            .mirrors
            .iter()
            .filter_map(|mirror| {
                let end = mirror.from.checked_add(mirror.count)?;
                (address >= mirror.from && address < end).then(|| {
                    let words: Vec<u16> = (0..mirror.count)
                        .map(|i| self.load(mirror.from + i))
                        .collect();
                    (mirror.to, words)
                })
            })
            .collect();

        for (to, words) in mirrored {
            for (offset, word) in words.into_iter().enumerate() {
                self.registers.insert(to.wrapping_add(offset as u16), word);
            }
        }
    }

    fn load(&self, address: u16) -> u16 {
        self.registers.get(&address).copied().unwrap_or(0)
    }
}

/// A register bank with failure injection.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    bank: Arc<Mutex<Bank>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bank that behaves like an idle hand: setpoints echo into the
    /// matching actual-value registers and tactile regions read a small
    /// gradient.
    pub fn simulated_hand(tactile: &[TactileRegion]) -> Self {
        let bank = Self::new();
        bank.mirror(registers::ANGLE_SET, registers::ANGLE_ACT, registers::SETPOINT_REGISTERS);
        bank.mirror(registers::POS_SET, registers::POS_ACT, registers::SETPOINT_REGISTERS);
        bank.set_registers(registers::ANGLE_ACT, &[1000; 6]);
        bank.set_registers(registers::CURRENT, &[12, 10, 11, 9, 15, 8]);
        // Two actuators per register, 35 degrees C.
        bank.set_registers(registers::TEMPERATURE, &[0x2323; 3]);

        for region in tactile {
            let words: Vec<u16> = (0..region.register_count()).map(|i| i % 16).collect();
            bank.set_registers(region.address, &words);
        }
        bank
    }

    pub fn set_registers(&self, address: u16, words: &[u16]) {
        let mut bank = self.bank.lock();
        for (offset, word) in words.iter().enumerate() {
            bank.registers
                .insert(address.wrapping_add(offset as u16), *word);
        }
    }

    /// Current contents, unset registers read as zero.
    pub fn registers(&self, address: u16, count: u16) -> Vec<u16> {
        let bank = self.bank.lock();
        (0..count)
            .map(|i| bank.load(address.wrapping_add(i)))
            .collect()
    }

    /// Copy `count` registers from `from` to `to` whenever a write touches
    /// the source range.
    pub fn mirror(&self, from: u16, to: u16, count: u16) {
        self.bank.lock().mirrors.push(Mirror { from, to, count });
    }

    /// Fail the next `n` connection attempts. `u32::MAX` fails forever.
    pub fn fail_connects(&self, n: u32) {
        self.bank.lock().connect_failures = n;
    }

    /// Fail every read that starts at `address`.
    pub fn fail_reads_at(&self, address: u16) {
        self.bank.lock().failing_reads.insert(address);
    }

    /// Fail every write that starts at `address`.
    pub fn fail_writes_at(&self, address: u16) {
        self.bank.lock().failing_writes.insert(address);
    }

    /// Drop every injected failure.
    pub fn clear_failures(&self) {
        let mut bank = self.bank.lock();
        bank.connect_failures = 0;
        bank.failing_reads.clear();
        bank.failing_writes.clear();
    }

    pub fn connect_attempts(&self) -> u32 {
        self.bank.lock().connect_attempts
    }

    pub fn is_connected(&self) -> bool {
        self.bank.lock().connected
    }

    /// Successful writes, oldest first.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.bank.lock().writes.clone()
    }

    /// `(address, count)` of every successful read, oldest first.
    pub fn reads(&self) -> Vec<(u16, u16)> {
        self.bank.lock().reads.clone()
    }

    pub fn clear_journal(&self) {
        let mut bank = self.bank.lock();
        bank.writes.clear();
        bank.reads.clear();
    }
}

#[async_trait]
impl RegisterTransport for MemoryTransport {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut bank = self.bank.lock();
        bank.connect_attempts += 1;

        if bank.connect_failures > 0 {
            if bank.connect_failures != u32::MAX {
                bank.connect_failures -= 1;
            }
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        bank.connected = true;
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let mut bank = self.bank.lock();
        if !bank.connected {
            return Err(TransportError::NotConnected);
        }
        if bank.failing_reads.contains(&address) {
            return Err(TransportError::ReadFailed {
                address,
                count,
                reason: "injected failure".to_string(),
            });
        }

        bank.reads.push((address, count));
        Ok((0..count)
            .map(|i| bank.load(address.wrapping_add(i)))
            .collect())
    }

    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), TransportError> {
        let mut bank = self.bank.lock();
        if !bank.connected {
            return Err(TransportError::NotConnected);
        }
        if bank.failing_writes.contains(&address) {
            return Err(TransportError::WriteFailed {
                address,
                reason: "injected failure".to_string(),
            });
        }

        bank.store(address, words);
        bank.writes.push(WriteRecord {
            address,
            words: words.to_vec(),
        });
        Ok(())
    }

    async fn write_register(&mut self, address: u16, word: u16) -> Result<(), TransportError> {
        self.write_registers(address, &[word]).await
    }

    async fn disconnect(&mut self) {
        self.bank.lock().connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write() {
        let mut bank = MemoryTransport::new();
        bank.connect().await.unwrap();

        bank.write_registers(100, &[1, 2, 3]).await.unwrap();

        assert_eq!(bank.read_holding_registers(99, 5).await.unwrap(), vec![0, 1, 2, 3, 0]);
        assert_eq!(
            bank.writes(),
            vec![WriteRecord {
                address: 100,
                words: vec![1, 2, 3]
            }]
        );
    }

    #[tokio::test]
    async fn test_mirror() {
        let mut bank = MemoryTransport::new();
        bank.mirror(registers::ANGLE_SET, registers::ANGLE_ACT, 6);
        bank.connect().await.unwrap();

        bank.write_registers(registers::ANGLE_SET, &[5, 6, 7, 8, 9, 10])
            .await
            .unwrap();

        assert_eq!(bank.registers(registers::ANGLE_ACT, 6), vec![5, 6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mut bank = MemoryTransport::new();
        bank.fail_connects(1);
        assert!(bank.connect().await.is_err());
        bank.connect().await.unwrap();

        bank.fail_reads_at(1582);
        bank.fail_writes_at(1498);

        assert!(matches!(
            bank.read_holding_registers(1582, 6).await,
            Err(TransportError::ReadFailed { address: 1582, .. })
        ));
        assert!(bank.read_holding_registers(1583, 6).await.is_ok());
        assert!(matches!(
            bank.write_registers(1498, &[0; 6]).await,
            Err(TransportError::WriteFailed { address: 1498, .. })
        ));
        assert!(bank.writes().is_empty());
        assert_eq!(bank.connect_attempts(), 2);
    }

    #[tokio::test]
    async fn test_disconnected_bank_rejects_io() {
        let mut bank = MemoryTransport::new();
        assert_eq!(
            bank.write_register(1004, 1).await,
            Err(TransportError::NotConnected)
        );
    }
}

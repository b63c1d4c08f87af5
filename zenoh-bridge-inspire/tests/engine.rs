//! Engine scenarios against the in-memory register bank.

use async_trait::async_trait;
use inspire_common::{CommandTarget, ControlCommand};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use zenoh_bridge_inspire::memory::MemoryTransport;
use zenoh_bridge_inspire::registers::{self, Channel};
use zenoh_bridge_inspire::sink::RecordingSink;
use zenoh_bridge_inspire::transport::ConnectionState;
use zenoh_bridge_inspire::{
    ConnectError, HandConfig, RegisterTransport, SyncEngine, TransportError, ValueRange,
};

fn test_config() -> HandConfig {
    HandConfig {
        max_retries: 3,
        retry_delay_ms: 0,
        history_length: 5,
        tactile: false,
        ..Default::default()
    }
}

async fn engine(bank: &MemoryTransport, config: &HandConfig) -> (SyncEngine, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let engine = SyncEngine::connect(config, Box::new(bank.clone()), sink.clone())
        .await
        .expect("engine should connect");
    (engine, sink)
}

#[tokio::test]
async fn test_connect_fails_after_exactly_max_retries() {
    let bank = MemoryTransport::new();
    bank.fail_connects(u32::MAX);

    let result = SyncEngine::connect(
        &test_config(),
        Box::new(bank.clone()),
        Arc::new(RecordingSink::new()),
    )
    .await;

    match result {
        Err(ConnectError::ExhaustedRetries { attempts, .. }) => assert_eq!(attempts, 3),
        Ok(_) => panic!("connect should fail"),
    }
    assert_eq!(bank.connect_attempts(), 3);
    assert!(bank.writes().is_empty());
}

#[tokio::test]
async fn test_startup_resets_errors() {
    let bank = MemoryTransport::new();
    let (engine, _) = engine(&bank, &test_config()).await;

    assert_eq!(engine.state(), ConnectionState::Connected);
    assert_eq!(bank.writes()[0].address, registers::ERROR_RESET);
    assert_eq!(bank.registers(registers::ERROR_RESET, 1), vec![1]);
}

#[tokio::test]
async fn test_failed_error_reset_is_advisory() {
    let bank = MemoryTransport::new();
    bank.fail_writes_at(registers::ERROR_RESET);

    let (mut engine, sink) = engine(&bank, &test_config()).await;
    engine.poll().await;

    assert_eq!(sink.states().len(), 1);
}

#[tokio::test]
async fn test_readback_is_clamped_for_every_target() {
    let bank = MemoryTransport::new();
    let mut config = test_config();
    config.limits.speed = ValueRange::new(0, 500);
    let (engine, _) = engine(&bank, &config).await;
    let handler = engine.command_handler();

    let values = [-100, 0, 250, 999, 1000, 5000];
    for target in CommandTarget::ALL {
        let command = ControlCommand::builder()
            .set(target, &values)
            .unwrap()
            .build();
        let report = handler.handle(&command).await;
        assert!(report.is_success());

        let range = config.limits.range(target);
        let expected: Vec<u16> = values
            .iter()
            .map(|v| (*v).clamp(range.min, range.max) as u16)
            .collect();
        assert_eq!(
            bank.registers(registers::write_base(target), 6),
            expected,
            "{}",
            target
        );
    }
}

#[tokio::test]
async fn test_mode_1001_writes_angle_then_speed() {
    let bank = MemoryTransport::new();
    let (engine, _) = engine(&bank, &test_config()).await;
    bank.clear_journal();

    let command = ControlCommand::builder()
        .angle(&[500; 6])
        .unwrap()
        .speed(&[300; 6])
        .unwrap()
        .build();
    assert_eq!(command.mode().bits(), 0b1001);

    engine.command_handler().handle(&command).await;

    let addresses: Vec<u16> = bank.writes().iter().map(|w| w.address).collect();
    assert_eq!(addresses, vec![1486, 1522]);
}

#[tokio::test]
async fn test_mode_zero_writes_nothing() {
    let bank = MemoryTransport::new();
    let (engine, _) = engine(&bank, &test_config()).await;
    bank.clear_journal();

    let report = engine.command_handler().handle(&ControlCommand::noop()).await;

    assert!(report.writes.is_empty());
    assert!(bank.writes().is_empty());
}

#[tokio::test]
async fn test_failed_force_read_skips_only_force() {
    let bank = MemoryTransport::new();
    bank.set_registers(registers::FORCE_ACT, &[7; 6]);
    let (mut engine, sink) = engine(&bank, &test_config()).await;

    engine.poll().await;
    bank.fail_reads_at(registers::FORCE_ACT);
    let snapshot = engine.poll().await;

    assert!(!snapshot.states.contains(Channel::ForceAct));
    for channel in [
        Channel::PosAct,
        Channel::AngleAct,
        Channel::Current,
        Channel::Err,
        Channel::Status,
        Channel::Temperature,
    ] {
        assert!(snapshot.states.contains(channel), "{}", channel);
        assert_eq!(engine.history().len(channel), 2, "{}", channel);
    }
    assert_eq!(engine.history().len(Channel::ForceAct), 1);
    assert_eq!(engine.stats().read_failures(), 1);

    let published = sink.states();
    assert_eq!(published.len(), 2);
    assert_eq!(published[1].force_act, None);
    assert!(published[1].pos_act.is_some());
    assert!(published[1].temperature.is_some());
}

#[tokio::test]
async fn test_channel_recovers_after_failed_reads() {
    let bank = MemoryTransport::new();
    bank.set_registers(registers::FORCE_ACT, &[7; 6]);
    let (mut engine, sink) = engine(&bank, &test_config()).await;

    bank.fail_reads_at(registers::FORCE_ACT);
    engine.poll().await;
    bank.clear_failures();
    let snapshot = engine.poll().await;

    assert!(snapshot.states.contains(Channel::ForceAct));
    assert_eq!(engine.history().len(Channel::ForceAct), 1);
    assert_eq!(engine.stats().read_failures(), 1);
    assert_eq!(sink.states()[1].force_act, Some(vec![7; 6]));
}

#[tokio::test]
async fn test_history_is_bounded() {
    let bank = MemoryTransport::new();
    let (mut engine, _) = engine(&bank, &test_config()).await;

    for cycle in 0..7u16 {
        bank.set_registers(registers::ANGLE_ACT, &[cycle; 6]);
        engine.poll().await;
    }

    let series = engine.history().series(Channel::AngleAct, 0).unwrap();
    assert_eq!(series.len(), 5);
    assert_eq!(series.iter().collect::<Vec<_>>(), vec![2, 3, 4, 5, 6]);
    assert_eq!(engine.stats().cycles(), 7);
}

#[tokio::test]
async fn test_tactile_frames_have_declared_shapes() {
    let bank = MemoryTransport::new();
    let config = HandConfig {
        tactile: true,
        ..test_config()
    };
    let (mut engine, sink) = engine(&bank, &config).await;
    assert!(engine.tactile_enabled());

    let snapshot = engine.poll().await;

    assert_eq!(snapshot.touch.len(), config.tactile_regions.len());
    for region in &config.tactile_regions {
        let matrix = &snapshot.touch[&region.name];
        assert_eq!((matrix.rows, matrix.cols), (region.rows, region.cols));
        assert_eq!(matrix.values.len(), region.register_count() as usize);
    }
    assert_eq!(sink.touches().len(), 1);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["touch"]["palm_touch"]["rows"], 14);
    assert!(json["states"]["POS_ACT"].is_array());
}

#[tokio::test]
async fn test_rtu_connection_disables_tactile() {
    let bank = MemoryTransport::new();
    let config = HandConfig {
        tactile: true,
        connection: zenoh_bridge_inspire::ConnectionConfig::Rtu {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            data_bits: 8,
            parity: "none".to_string(),
            stop_bits: 1,
        },
        ..test_config()
    };
    let (mut engine, sink) = engine(&bank, &config).await;

    let snapshot = engine.poll().await;

    assert!(snapshot.touch.is_empty());
    assert!(sink.touches().is_empty());
    assert!(bank.reads().iter().all(|(address, _)| *address < 3000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_commands_interleave_with_polling() {
    let bank = MemoryTransport::new();
    bank.mirror(registers::ANGLE_SET, registers::ANGLE_ACT, 6);
    let (mut engine, _) = engine(&bank, &test_config()).await;
    let handler = engine.command_handler();

    let commands = tokio::spawn(async move {
        for value in 0..50i16 {
            let command = ControlCommand::builder()
                .angle(&[value; 6])
                .unwrap()
                .build();
            assert!(handler.handle(&command).await.is_success());
        }
    });

    for _ in 0..50 {
        engine.poll().await;
    }
    commands.await.unwrap();

    let snapshot = engine.poll().await;
    assert_eq!(engine.stats().commands(), 50);
    assert_eq!(engine.stats().read_failures(), 0);
    assert_eq!(
        engine.history().latest(Channel::AngleAct),
        Some([49; 6]),
        "{:?}",
        snapshot
    );
}

/// Register bank that yields mid-exchange and records overlapping exchanges.
#[derive(Clone, Default)]
struct SlowTransport {
    bank: MemoryTransport,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl SlowTransport {
    async fn exchange<T>(&self, io: impl Future<Output = T>) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        let result = io.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl RegisterTransport for SlowTransport {
    fn describe(&self) -> String {
        "slow".to_string()
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.bank.connect().await
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let mut bank = self.bank.clone();
        self.exchange(bank.read_holding_registers(address, count))
            .await
    }

    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), TransportError> {
        let mut bank = self.bank.clone();
        self.exchange(bank.write_registers(address, words)).await
    }

    async fn write_register(&mut self, address: u16, word: u16) -> Result<(), TransportError> {
        let mut bank = self.bank.clone();
        self.exchange(bank.write_register(address, word)).await
    }

    async fn disconnect(&mut self) {
        self.bank.disconnect().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_register_exchanges_never_overlap() {
    let transport = SlowTransport::default();
    let (mut engine, sink) = {
        let sink = Arc::new(RecordingSink::new());
        let engine = SyncEngine::connect(&test_config(), Box::new(transport.clone()), sink.clone())
            .await
            .expect("engine should connect");
        (engine, sink)
    };

    let mut tasks = Vec::new();
    for task in 0..4i16 {
        let handler = engine.command_handler();
        tasks.push(tokio::spawn(async move {
            for value in 0..5i16 {
                let command = ControlCommand::builder()
                    .angle(&[task * 100 + value; 6])
                    .unwrap()
                    .speed(&[500; 6])
                    .unwrap()
                    .build();
                assert!(handler.handle(&command).await.is_success());
            }
        }));
    }

    for _ in 0..10 {
        engine.poll().await;
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(transport.in_flight.load(Ordering::SeqCst), 0);
    assert_eq!(engine.stats().commands(), 20);
    assert_eq!(sink.states().len(), 10);
    assert_eq!(transport.bank.writes().len(), 1 + 20 * 2);
}

#[tokio::test]
async fn test_close_disconnects() {
    let bank = MemoryTransport::new();
    let (engine, _) = engine(&bank, &test_config()).await;

    engine.close().await;

    assert_eq!(engine.state(), ConnectionState::Disconnected);
    assert!(!bank.is_connected());
}

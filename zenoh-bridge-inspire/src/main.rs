//! Zenoh bridge for Inspire dexterous hands.
//!
//! Polls the hand over Modbus (TCP or RTU/serial), publishes state and
//! tactile frames to Zenoh and applies control commands received on the
//! hand's control topic.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use zenoh_bridge_inspire::listener::CommandListener;
use zenoh_bridge_inspire::sink::ZenohSink;
use zenoh_bridge_inspire::status::BridgeStatus;
use zenoh_bridge_inspire::{
    InspireBridgeConfig, MemoryTransport, ModbusTransport, RegisterTransport, SyncEngine,
};

/// Seconds between rate and error-counter log lines.
const STATS_INTERVAL_SECS: u64 = 10;

/// Zenoh bridge for Inspire dexterous hands (Modbus TCP/RTU).
#[derive(Parser, Debug)]
#[command(name = "zenoh-bridge-inspire")]
#[command(about = "Bridges an Inspire hand's Modbus registers to Zenoh")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "inspire.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Run against an in-memory hand instead of the device.
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = InspireBridgeConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let mut log_config = config.logging.clone();
    if let Some(level) = &args.log_level {
        log_config.level = level.clone();
    }
    inspire_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting zenoh-bridge-inspire");
    info!("Loaded configuration from {:?}", args.config);

    let session = Arc::new(
        inspire_common::connect(&config.zenoh)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Zenoh: {}", e))?,
    );

    let hand = &config.hand;
    let topics = hand.topics();

    let transport: Box<dyn RegisterTransport> = if args.simulate {
        info!("Simulation mode: using an in-memory hand");
        Box::new(MemoryTransport::simulated_hand(&hand.tactile_regions))
    } else {
        Box::new(ModbusTransport::new(
            hand.connection.clone(),
            hand.device_id,
            hand.timeout(),
        ))
    };

    let sink = Arc::new(ZenohSink::new(
        session.clone(),
        topics.clone(),
        config.serialization,
    ));

    let mut engine = SyncEngine::connect(hand, transport, sink)
        .await
        .context("Failed to connect to the hand")?;

    let status_key = topics.status();
    let status = BridgeStatus::running()
        .with("side", topics.side().as_str())
        .with("endpoint", engine.endpoint())
        .with("device_id", hand.device_id)
        .with("tactile", engine.tactile_enabled())
        .with("poll_interval_ms", hand.poll_interval_ms)
        .with("simulate", args.simulate);
    if let Err(e) = status.publish(&session, &status_key).await {
        error!("Failed to publish bridge status: {}", e);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = CommandListener::new(session.clone(), topics.ctrl(), engine.command_handler());
    let listener_task = tokio::spawn(async move {
        if let Err(e) = listener.run(shutdown_rx).await {
            error!("Command listener failed: {}", e);
        }
    });

    info!(
        "Inspire bridge running: publishing {} every {} ms",
        topics.state(),
        hand.poll_interval_ms
    );

    let mut ticker = tokio::time::interval(hand.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let report_every = Duration::from_secs(STATS_INTERVAL_SECS);
    let mut report = tokio::time::interval_at(Instant::now() + report_every, report_every);
    let mut last_cycles = 0;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }

            _ = ticker.tick() => {
                engine.poll().await;
            }

            _ = report.tick() => {
                let stats = engine.stats().snapshot();
                let rate = (stats.cycles - last_cycles) as f64 / report_every.as_secs_f64();
                last_cycles = stats.cycles;
                info!(
                    rate_hz = (rate * 10.0).round() / 10.0,
                    last_poll_us = stats.last_poll_duration_us,
                    read_failures = stats.read_failures,
                    write_failures = stats.write_failures,
                    commands = stats.commands,
                    publish_failures = stats.publish_failures,
                    "Poll loop statistics"
                );
            }
        }
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = listener_task.await {
        warn!("Command listener task ended abnormally: {}", e);
    }

    let status = BridgeStatus::offline().with("side", topics.side().as_str());
    let _ = status.publish(&session, &status_key).await;

    engine.close().await;

    session
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to close Zenoh session: {}", e))?;
    info!("Inspire bridge stopped");

    Ok(())
}

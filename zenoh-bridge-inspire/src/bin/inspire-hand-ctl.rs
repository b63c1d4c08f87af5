//! Command-line client for a running Inspire hand bridge.
//!
//! Sends control commands on `rt/inspire_hand/ctrl/<side>` and can follow the
//! state topic.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inspire_common::{Format, HandSide, HandState, HandTopics, ZenohConfig, decode_auto};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use zenoh_bridge_inspire::InspireBridgeConfig;
use zenoh_bridge_inspire::controller::HandController;

/// Control an Inspire hand through the Zenoh bridge.
#[derive(Parser, Debug)]
#[command(name = "inspire-hand-ctl")]
#[command(version)]
struct Args {
    /// Bridge configuration file; supplies Zenoh settings, side and format
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hand side, `l` or `r` (overrides the config file)
    #[arg(short, long)]
    side: Option<HandSide>,

    /// Zenoh endpoints to connect to (e.g. tcp/192.168.123.161:7447)
    #[arg(long)]
    connect: Vec<String>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set the six joint angles
    Angle {
        #[arg(num_args = 6, required = true, allow_negative_numbers = true)]
        values: Vec<i16>,
    },
    /// Set the six actuator positions
    Position {
        #[arg(num_args = 6, required = true, allow_negative_numbers = true)]
        values: Vec<i16>,
    },
    /// Set the six force limits
    Force {
        #[arg(num_args = 6, required = true, allow_negative_numbers = true)]
        values: Vec<i16>,
    },
    /// Set the six actuator speeds
    Speed {
        #[arg(num_args = 6, required = true, allow_negative_numbers = true)]
        values: Vec<i16>,
    },
    /// Set angles and positions in one command
    AnglePosition {
        #[arg(long, num_args = 6, required = true, allow_negative_numbers = true)]
        angle: Vec<i16>,
        #[arg(long, num_args = 6, required = true, allow_negative_numbers = true)]
        position: Vec<i16>,
    },
    /// Set angles and speeds in one command
    AngleSpeed {
        #[arg(long, num_args = 6, required = true, allow_negative_numbers = true)]
        angle: Vec<i16>,
        #[arg(long, num_args = 6, required = true, allow_negative_numbers = true)]
        speed: Vec<i16>,
    },
    /// Send a command with no targets selected
    Stop,
    /// Print state messages as they arrive
    Watch {
        /// Stop after this many messages
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    inspire_common::init_tracing(&inspire_common::LoggingConfig {
        level: args.log_level.clone(),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    let (mut zenoh, mut topics, format) = match &args.config {
        Some(path) => {
            let config = InspireBridgeConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?;
            (config.zenoh, config.hand.topics(), config.serialization)
        }
        None => (
            ZenohConfig::default(),
            HandTopics::new(HandSide::default()),
            Format::default(),
        ),
    };

    if let Some(side) = args.side {
        topics = HandTopics::with_prefix(topics.prefix(), side);
    }
    if !args.connect.is_empty() {
        zenoh.connect = args.connect.clone();
    }

    let session = Arc::new(
        inspire_common::connect(&zenoh)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Zenoh: {}", e))?,
    );
    let hand = HandController::new(session.clone(), topics.clone(), format);

    let sent = match &args.command {
        Command::Angle { values } => hand.set_angle(values).await.map(|_| true),
        Command::Position { values } => hand.set_position(values).await.map(|_| true),
        Command::Force { values } => hand.set_force(values).await.map(|_| true),
        Command::Speed { values } => hand.set_velocity(values).await.map(|_| true),
        Command::AnglePosition { angle, position } => hand
            .set_angle_and_position(angle, position)
            .await
            .map(|_| true),
        Command::AngleSpeed { angle, speed } => hand
            .set_angle_and_velocity(angle, speed)
            .await
            .map(|_| true),
        Command::Stop => hand.stop().await.map(|_| true),
        Command::Watch { count } => {
            watch(&session, &topics, *count).await?;
            Ok(false)
        }
    }
    .context("Failed to send command")?;

    if sent {
        info!("Sent {:?} to {}", args.command, topics.ctrl());
    }

    session
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to close Zenoh session: {}", e))?;

    Ok(())
}

async fn watch(session: &zenoh::Session, topics: &HandTopics, count: Option<usize>) -> Result<()> {
    let subscriber = session
        .declare_subscriber(topics.state())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to subscribe: {}", e))?;

    let mut received = 0;
    while count.is_none_or(|count| received < count) {
        let sample = subscriber
            .recv_async()
            .await
            .map_err(|e| anyhow::anyhow!("Subscriber closed: {}", e))?;

        let state: HandState = match decode_auto(&sample.payload().to_bytes()) {
            Ok(state) => state,
            Err(e) => {
                eprintln!("undecodable state message: {}", e);
                continue;
            }
        };

        let time = chrono::DateTime::from_timestamp_millis(state.timestamp)
            .map(|t| t.format("%H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| state.timestamp.to_string());

        println!(
            "{} angle={:?} pos={:?} force={:?} err={:?}",
            time,
            state.angle_act.unwrap_or_default(),
            state.pos_act.unwrap_or_default(),
            state.force_act.unwrap_or_default(),
            state.err.unwrap_or_default(),
        );
        received += 1;
    }

    Ok(())
}

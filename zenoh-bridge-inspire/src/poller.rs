//! Telemetry polling.
//!
//! One [`TelemetryPoller::poll`] call reads the tactile regions, then every
//! entry of the states table, publishes both frames and appends the decoded
//! channels to the history store. A failed read only drops its own channel or
//! region for that cycle.

use inspire_common::{HandState, HandTouch, TouchMatrix, current_timestamp_millis};
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::codec::{self, CodecError};
use crate::history::HistoryStore;
use crate::registers::{Channel, Encoding, RegisterEntry};
use crate::sink::TelemetrySink;
use crate::stats::EngineStats;
use crate::tactile::TactileRegion;
use crate::transport::TransportGuard;

/// Decoded values of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelData {
    Signed(Vec<i16>),
    Bytes(Vec<u8>),
}

impl ChannelData {
    pub fn len(&self) -> usize {
        match self {
            ChannelData::Signed(values) => values.len(),
            ChannelData::Bytes(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_i32(&self) -> Vec<i32> {
        match self {
            ChannelData::Signed(values) => values.iter().map(|&v| i32::from(v)).collect(),
            ChannelData::Bytes(values) => values.iter().map(|&v| i32::from(v)).collect(),
        }
    }

    fn to_i16(&self) -> Vec<i16> {
        match self {
            ChannelData::Signed(values) => values.clone(),
            ChannelData::Bytes(values) => values.iter().map(|&v| i16::from(v)).collect(),
        }
    }

    /// Byte channels are always packed; validation rejects a signed override.
    fn to_u8(&self) -> Vec<u8> {
        match self {
            ChannelData::Signed(values) => values.iter().map(|&v| v.clamp(0, 255) as u8).collect(),
            ChannelData::Bytes(values) => values.clone(),
        }
    }
}

impl Serialize for ChannelData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChannelData::Signed(values) => values.serialize(serializer),
            ChannelData::Bytes(values) => values.serialize(serializer),
        }
    }
}

/// Decode one states-table entry.
pub fn decode_entry(entry: &RegisterEntry, raw: &[u16]) -> Result<ChannelData, CodecError> {
    match entry.encoding {
        Encoding::Signed16 => {
            codec::decode_signed16(raw, entry.count as usize).map(ChannelData::Signed)
        }
        Encoding::PackedByte => {
            if raw.len() != entry.count as usize {
                return Err(CodecError::InvalidLength {
                    expected: entry.count as usize,
                    actual: raw.len(),
                });
            }
            Ok(ChannelData::Bytes(codec::decode_packed_bytes(raw)))
        }
    }
}

/// Channels decoded in one cycle. Channels whose read failed are absent.
///
/// Serializes as a map keyed by [`Channel::snapshot_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySample {
    pub timestamp: i64,
    pub channels: BTreeMap<Channel, ChannelData>,
}

impl TelemetrySample {
    pub fn get(&self, channel: Channel) -> Option<&ChannelData> {
        self.channels.get(&channel)
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.channels.contains_key(&channel)
    }

    /// Message published on the state topic.
    pub fn to_state_message(&self) -> HandState {
        let signed = |channel| self.get(channel).map(ChannelData::to_i16);
        let bytes = |channel| self.get(channel).map(ChannelData::to_u8);

        HandState {
            timestamp: self.timestamp,
            pos_act: signed(Channel::PosAct),
            angle_act: signed(Channel::AngleAct),
            force_act: signed(Channel::ForceAct),
            current: signed(Channel::Current),
            err: bytes(Channel::Err),
            status: bytes(Channel::Status),
            temperature: bytes(Channel::Temperature),
        }
    }
}

impl Serialize for TelemetrySample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len()))?;
        for (channel, data) in &self.channels {
            map.serialize_entry(channel.snapshot_key(), data)?;
        }
        map.end()
    }
}

/// Tactile matrices keyed by region name.
pub type TactileMap = BTreeMap<String, TouchMatrix>;

/// Everything one poll cycle produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub timestamp: i64,
    pub states: TelemetrySample,
    pub touch: TactileMap,
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut snapshot = serializer.serialize_struct("Snapshot", 3)?;
        snapshot.serialize_field("timestamp", &self.timestamp)?;
        snapshot.serialize_field("states", &self.states)?;
        snapshot.serialize_field("touch", &self.touch)?;
        snapshot.end()
    }
}

/// Reads telemetry through the shared transport guard.
pub struct TelemetryPoller {
    guard: Arc<TransportGuard>,
    states: Vec<RegisterEntry>,
    tactile: Vec<TactileRegion>,
    sink: Arc<dyn TelemetrySink>,
    stats: Arc<EngineStats>,
    history: HistoryStore,
}

impl TelemetryPoller {
    /// `tactile` is empty when tactile sensing is disabled.
    pub fn new(
        guard: Arc<TransportGuard>,
        states: Vec<RegisterEntry>,
        tactile: Vec<TactileRegion>,
        sink: Arc<dyn TelemetrySink>,
        stats: Arc<EngineStats>,
        history_length: usize,
    ) -> Self {
        Self {
            guard,
            states,
            tactile,
            sink,
            stats,
            history: HistoryStore::new(history_length),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn tactile_enabled(&self) -> bool {
        !self.tactile.is_empty()
    }

    /// Run one cycle.
    pub async fn poll(&mut self) -> Snapshot {
        let started = Instant::now();
        let timestamp = current_timestamp_millis();

        let touch = if self.tactile_enabled() {
            let touch = self.read_tactile().await;
            let frame = HandTouch {
                timestamp,
                regions: touch,
            };
            if let Err(e) = self.sink.publish_touch(&frame).await {
                self.stats.record_publish_failure();
                warn!("Failed to publish touch frame: {}", e);
            }
            frame.regions
        } else {
            TactileMap::new()
        };

        let states = self.read_states(timestamp).await;

        if let Err(e) = self.sink.publish_state(&states.to_state_message()).await {
            self.stats.record_publish_failure();
            warn!("Failed to publish state: {}", e);
        }

        for (channel, data) in &states.channels {
            self.history.record(*channel, &data.to_i32());
        }

        self.stats
            .record_cycle(started.elapsed().as_micros() as u64);

        Snapshot {
            timestamp,
            states,
            touch,
        }
    }

    async fn read_tactile(&self) -> TactileMap {
        let mut touch = TactileMap::new();

        for region in &self.tactile {
            let decoded = match self
                .guard
                .read_holding_registers(region.address, region.register_count())
                .await
            {
                Ok(raw) => region.decode(&raw).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match decoded {
                Ok(matrix) => {
                    touch.insert(region.name.clone(), matrix);
                }
                Err(e) => {
                    self.stats.record_read_failure();
                    warn!("Failed to read tactile region '{}': {}", region.name, e);
                }
            }
        }

        touch
    }

    async fn read_states(&self, timestamp: i64) -> TelemetrySample {
        let mut sample = TelemetrySample {
            timestamp,
            channels: BTreeMap::new(),
        };

        for entry in &self.states {
            let decoded = match self
                .guard
                .read_holding_registers(entry.address, entry.count)
                .await
            {
                Ok(raw) => decode_entry(entry, &raw).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match decoded {
                Ok(data) => {
                    debug!("{} @ {}: {:?}", entry.channel, entry.address, data);
                    sample.channels.insert(entry.channel, data);
                }
                Err(e) => {
                    self.stats.record_read_failure();
                    warn!(
                        "Failed to read {} @ {} ({} registers): {}",
                        entry.channel, entry.address, entry.count, e
                    );
                }
            }
        }

        sample
    }
}

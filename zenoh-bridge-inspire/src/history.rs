//! Rolling per-actuator history of every telemetry channel.

use std::collections::{BTreeMap, VecDeque};

use inspire_common::ACTUATOR_COUNT;

use crate::registers::Channel;

/// Default number of samples kept per actuator.
pub const DEFAULT_HISTORY_LENGTH: usize = 100;

/// Fixed-capacity ring buffer. Pushing onto a full buffer evicts the oldest
/// sample.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    samples: VecDeque<i32>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: i32) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<i32> {
        self.samples.back().copied()
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.samples.iter().copied()
    }
}

/// History buffers for every (channel, actuator) pair.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    buffers: BTreeMap<Channel, [RingBuffer; ACTUATOR_COUNT]>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        let buffers = Channel::ALL
            .into_iter()
            .map(|channel| (channel, std::array::from_fn(|_| RingBuffer::new(capacity))))
            .collect();

        Self { buffers, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one cycle's values for a channel.
    ///
    /// `values[i]` goes to actuator `i`; values beyond the sixth are ignored.
    pub fn record(&mut self, channel: Channel, values: &[i32]) {
        if let Some(buffers) = self.buffers.get_mut(&channel) {
            for (buffer, &value) in buffers.iter_mut().zip(values) {
                buffer.push(value);
            }
        }
    }

    /// History of one actuator on one channel.
    pub fn series(&self, channel: Channel, actuator: usize) -> Option<&RingBuffer> {
        self.buffers.get(&channel)?.get(actuator)
    }

    /// Latest value of each actuator, `None` before the first sample.
    pub fn latest(&self, channel: Channel) -> Option<[i32; ACTUATOR_COUNT]> {
        let buffers = self.buffers.get(&channel)?;
        let mut latest = [0; ACTUATOR_COUNT];
        for (slot, buffer) in latest.iter_mut().zip(buffers) {
            *slot = buffer.latest()?;
        }
        Some(latest)
    }

    /// Number of samples recorded for a channel (first actuator).
    pub fn len(&self, channel: Channel) -> usize {
        self.buffers
            .get(&channel)
            .map(|buffers| buffers[0].len())
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.capacity);
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LENGTH)
    }
}

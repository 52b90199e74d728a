//! Absolute timestamp reconstruction.
//!
//! Packets carry no wall-clock time, only a 16-bit sequence counter. The
//! first packet of each type pins a genesis epoch to the local clock, and
//! every later sample of that type is placed relative to it:
//!
//! ```text
//! timestamp_ms = genesis[type] + (counter * COUNTER_MULTIPLIER + index) * period
//! ```
//!
//! The multiplier applies regardless of how many samples a packet carries,
//! so packets with fewer than five samples leave gaps. Counter wraparound
//! is not corrected.

use crate::collector::types::{DecodedPacket, SensorSample, SensorType, COUNTER_MULTIPLIER};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send {
    /// Current time in milliseconds.
    fn now_ms(&self) -> f64;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        Utc::now().timestamp_millis() as f64
    }
}

/// A clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn now_ms(&self) -> f64 {
        self.0
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// f64 milliseconds stored as bits
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `start_ms`.
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms.to_bits())),
        }
    }

    /// Jump to `now_ms`.
    pub fn set(&self, now_ms: f64) {
        self.now.store(now_ms.to_bits(), Ordering::SeqCst);
    }

    /// Move forward by `delta_ms`.
    pub fn advance(&self, delta_ms: f64) {
        self.set(self.now_ms() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now.load(Ordering::SeqCst))
    }
}

/// Genesis epoch per sensor type, set once and never recalibrated.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenesisEpochs {
    pub acc: Option<f64>,
    pub ppg: Option<f64>,
}

impl GenesisEpochs {
    /// Epoch for `sensor_type`, if its first packet has arrived.
    pub fn get(&self, sensor_type: SensorType) -> Option<f64> {
        match sensor_type {
            SensorType::Acc => self.acc,
            SensorType::Ppg => self.ppg,
        }
    }

    fn slot(&mut self, sensor_type: SensorType) -> &mut Option<f64> {
        match sensor_type {
            SensorType::Acc => &mut self.acc,
            SensorType::Ppg => &mut self.ppg,
        }
    }
}

/// Turns decoded packets into timestamped samples.
#[derive(Debug, Default)]
pub struct TimestampReconstructor {
    genesis: GenesisEpochs,
}

impl TimestampReconstructor {
    /// Create a reconstructor with no epochs set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epochs for both types.
    pub fn genesis(&self) -> GenesisEpochs {
        self.genesis
    }

    /// Genesis for `sensor_type`, capturing `now_ms` if this is the first
    /// packet of that type. Returns the epoch and whether it was just set.
    pub fn observe(&mut self, sensor_type: SensorType, now_ms: f64) -> (f64, bool) {
        let slot = self.genesis.slot(sensor_type);
        match *slot {
            Some(epoch) => (epoch, false),
            None => {
                *slot = Some(now_ms);
                (now_ms, true)
            }
        }
    }

    /// Reconstruct every sample of `packet`.
    ///
    /// `genesis` must be the epoch returned by [`observe`](Self::observe)
    /// for the packet's type.
    pub fn reconstruct(
        &self,
        sensor_type: SensorType,
        genesis: f64,
        packet: &DecodedPacket,
    ) -> Vec<SensorSample> {
        let counter = u64::from(packet.header.sequence_counter);
        let period = sensor_type.sample_period_ms();

        packet
            .raw_values
            .iter()
            .enumerate()
            .map(|(index, &value)| SensorSample {
                timestamp_ms: sample_timestamp(genesis, counter, index as u64, period),
                value,
                sensor_type,
            })
            .collect()
    }
}

/// Timestamp of sample `index` in the packet with sequence `counter`.
pub fn sample_timestamp(genesis: f64, counter: u64, index: u64, period_ms: f64) -> f64 {
    let slot = counter * u64::from(COUNTER_MULTIPLIER) + index;
    genesis + slot as f64 * period_ms
}

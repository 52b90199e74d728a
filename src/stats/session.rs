//! Session statistics.
//!
//! Counts what the collector has seen, including packets it dropped.
//! Dropped packets leave no trace in the sample data, so this is the only
//! place they show up.

use crate::collector::types::SensorType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Live counters for one collector session.
#[derive(Debug)]
pub struct SessionStats {
    /// Notification buffers handed to the collector
    packets_received: AtomicU64,
    /// Buffers too short to carry a sample
    malformed_packets: AtomicU64,
    /// Decodable buffers with a type byte outside the known codes
    unrecognized_packets: AtomicU64,
    acc_samples: AtomicU64,
    ppg_samples: AtomicU64,
    session_id: Uuid,
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            packets_received: AtomicU64::new(0),
            malformed_packets: AtomicU64::new(0),
            unrecognized_packets: AtomicU64::new(0),
            acc_samples: AtomicU64::new(0),
            ppg_samples: AtomicU64::new(0),
            session_id: Uuid::new_v4(),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Stats that [`save`](Self::save) writes to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);
        stats
    }

    pub fn record_packet(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unrecognized(&self) {
        self.unrecognized_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_samples(&self, sensor_type: SensorType, count: u64) {
        let counter = match sensor_type {
            SensorType::Acc => &self.acc_samples,
            SensorType::Ppg => &self.ppg_samples,
        };
        counter.fetch_add(count, Ordering::Relaxed);
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            session_id: self.session_id,
            packets_received: self.packets_received.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
            unrecognized_packets: self.unrecognized_packets.load(Ordering::Relaxed),
            acc_samples: self.acc_samples.load(Ordering::Relaxed),
            ppg_samples: self.ppg_samples.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session {}:\n\
             - Packets received: {}\n\
             - Malformed packets dropped: {}\n\
             - Unrecognized packet types: {}\n\
             - ACC samples: {}\n\
             - PPG samples: {}\n\
             - Session duration: {} seconds",
            stats.session_id,
            stats.packets_received,
            stats.malformed_packets,
            stats.unrecognized_packets,
            stats.acc_samples,
            stats.ppg_samples,
            stats.session_duration_secs
        )
    }

    /// Write the current counters to the persistence path, if any.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let persisted = PersistedStats {
                stats: self.snapshot(),
                last_updated: Utc::now(),
            };
            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Read stats previously written by [`save`](Self::save).
    pub fn load(path: &std::path::Path) -> Result<PersistedStats, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub session_id: Uuid,
    pub packets_received: u64,
    pub malformed_packets: u64,
    pub unrecognized_packets: u64,
    pub acc_samples: u64,
    pub ppg_samples: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedStats {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub last_updated: DateTime<Utc>,
}

/// Stats shared between the collector and readers on other threads.
pub type SharedSessionStats = Arc<SessionStats>;

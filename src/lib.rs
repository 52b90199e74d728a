//! Wearable Collector - notification stream collector for ACC/PPG sensors.
//!
//! This library turns the binary notification packets of a two-channel
//! wearable (accelerometer and photoplethysmogram) into timestamped samples,
//! keeps a recent window of each channel for live display and records the
//! whole session for export.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Wearable Collector                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │  Transport  │──▶│   Decoder   │──▶│ Timestamps  │        │
//! │  │ (notify ch) │   │ (u24 LE)    │   │ (genesis)   │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                                             │               │
//! │                          ┌──────────────────┴───────┐       │
//! │                          ▼                          ▼       │
//! │                   ┌─────────────┐           ┌─────────────┐ │
//! │                   │  Sliding    │           │   Record    │ │
//! │                   │ buffers 60s │           │    log      │ │
//! │                   └─────────────┘           └─────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use wearable_collector::{Collector, CollectorConfig, ReplayTransport};
//!
//! let transport = ReplayTransport::from_file("session.hex", Duration::from_millis(20))
//!     .expect("Failed to load recording");
//!
//! let mut collector = Collector::new(CollectorConfig::default());
//! collector.connect(Box::new(transport)).expect("Failed to subscribe");
//!
//! while collector.poll(Duration::from_millis(100)) != wearable_collector::PumpStatus::Ended {
//!     println!("ACC window: {} samples", collector.acc_snapshot().len());
//! }
//!
//! collector.stop();
//! println!("{}", collector.export());
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod stats;
pub mod transport;

// Re-export key types at crate root for convenience
pub use collector::{
    Collector, CollectorConfig, ExportError, PacketUpdate, PumpStatus, SensorSample, SensorType,
};
pub use config::{Config, ConfigError};
pub use core::{decode_packet, GenesisEpochs, RecordLog, SlidingBuffer};
pub use stats::{SessionStats, SharedSessionStats, StatsSnapshot};
pub use transport::{ReplayTransport, Transport, TransportError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

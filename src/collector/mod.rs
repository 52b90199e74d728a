//! Sample collection for the wearable collector.
//!
//! The [`Collector`] owns genesis state, both sliding buffers and the record
//! log, and runs each notification from the transport through the pipeline.

pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use pipeline::{Collector, CollectorConfig, ExportError, PumpStatus, UpdateCallback};
pub use types::{
    DecodedPacket, PacketHeader, PacketUpdate, SensorSample, SensorType, ACC_TYPE_CODE,
    CHARACTERISTIC_UUID, PPG_TYPE_CODE, SERVICE_UUID, WINDOW_DURATION_MS,
};

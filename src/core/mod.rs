//! Core sample processing.
//!
//! This module contains:
//! - Packet decoding from raw notification buffers
//! - Timestamp reconstruction from sequence counters
//! - The sliding display buffer and the full-session record log

pub mod buffer;
pub mod decoder;
pub mod record_log;
pub mod timestamps;

// Re-export commonly used types
pub use buffer::SlidingBuffer;
pub use decoder::{decode_packet, decode_u24_le, encode_packet};
pub use record_log::{RecordLog, Row};
pub use timestamps::{
    Clock, FixedClock, GenesisEpochs, ManualClock, SystemClock, TimestampReconstructor,
};

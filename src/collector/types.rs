//! Sample and packet types for the ACC/PPG notification stream.
//!
//! The sensor type domain is closed: every packet carries a type byte, and
//! only the two codes below map to a channel.

use serde::Serialize;

/// GATT service exposing the sensor stream.
pub const SERVICE_UUID: &str = "0000fe40-cc7a-482a-984a-7f2ed5b3e58f";

/// Notify characteristic carrying sample packets.
pub const CHARACTERISTIC_UUID: &str = "0000fe42-8e22-4541-9d4c-21edae82ed19";

/// Type byte for accelerometer packets.
pub const ACC_TYPE_CODE: u8 = 1;

/// Type byte for photoplethysmogram packets.
pub const PPG_TYPE_CODE: u8 = 2;

/// Sample periods elapsed per sequence counter increment.
pub const COUNTER_MULTIPLIER: u32 = 5;

/// Recency window kept for live display.
pub const WINDOW_DURATION_MS: f64 = 60_000.0;

/// Type byte plus little-endian u16 sequence counter.
pub const HEADER_LEN: usize = 3;

/// Width of one little-endian u24 sample.
pub const SAMPLE_LEN: usize = 3;

/// Largest value a 24-bit sample can hold.
pub const MAX_SAMPLE_VALUE: u32 = (1 << 24) - 1;

/// One of the two channels the sensor streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SensorType {
    /// Accelerometer magnitude
    Acc,
    /// Photoplethysmogram, green LED
    Ppg,
}

impl SensorType {
    /// Both channels, in type-code order.
    pub const ALL: [SensorType; 2] = [SensorType::Acc, SensorType::Ppg];

    /// Map a packet type byte to a channel.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            ACC_TYPE_CODE => Some(SensorType::Acc),
            PPG_TYPE_CODE => Some(SensorType::Ppg),
            _ => None,
        }
    }

    /// Packet type byte for this channel.
    pub fn code(self) -> u8 {
        match self {
            SensorType::Acc => ACC_TYPE_CODE,
            SensorType::Ppg => PPG_TYPE_CODE,
        }
    }

    /// Fixed sampling period in milliseconds.
    pub fn sample_period_ms(self) -> f64 {
        match self {
            SensorType::Acc => 16.0,
            SensorType::Ppg => 2.5,
        }
    }

    /// Value column label used in the exported table.
    pub fn value_column(self) -> &'static str {
        match self {
            SensorType::Acc => "magnitude_ug",
            SensorType::Ppg => "green",
        }
    }

    /// Short display name.
    pub fn label(self) -> &'static str {
        match self {
            SensorType::Acc => "ACC",
            SensorType::Ppg => "PPG",
        }
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single reconstructed sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSample {
    /// Absolute time in milliseconds since the Unix epoch.
    /// Fractional for PPG, whose period is 2.5 ms.
    pub timestamp_ms: f64,
    /// Raw 24-bit sample value
    pub value: u32,
    /// Channel the sample came from
    pub sensor_type: SensorType,
}

/// Fixed header at the start of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketHeader {
    /// Raw type byte, possibly outside the known codes
    pub type_code: u8,
    /// Wraps at 65536
    pub sequence_counter: u16,
}

impl PacketHeader {
    /// Channel for the type byte, `None` for unknown codes.
    pub fn sensor_type(&self) -> Option<SensorType> {
        SensorType::from_code(self.type_code)
    }
}

/// A packet split into its header and raw sample values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPacket {
    /// Type byte and sequence counter
    pub header: PacketHeader,
    /// Samples in arrival order
    pub raw_values: Vec<u32>,
}

impl DecodedPacket {
    /// Number of complete samples carried.
    pub fn sample_count(&self) -> usize {
        self.raw_values.len()
    }
}

/// What the push callback receives after a packet has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketUpdate {
    /// Channel whose buffer changed
    pub sensor_type: SensorType,
    /// Counter from the packet header
    pub sequence_counter: u16,
    /// Samples appended by this packet
    pub sample_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_mapping() {
        assert_eq!(SensorType::from_code(1), Some(SensorType::Acc));
        assert_eq!(SensorType::from_code(2), Some(SensorType::Ppg));
        assert_eq!(SensorType::from_code(0), None);
        assert_eq!(SensorType::from_code(3), None);

        for sensor in SensorType::ALL {
            assert_eq!(SensorType::from_code(sensor.code()), Some(sensor));
        }
    }

    #[test]
    fn test_value_columns() {
        assert_eq!(SensorType::Acc.value_column(), "magnitude_ug");
        assert_eq!(SensorType::Ppg.value_column(), "green");
    }

    #[test]
    fn test_sample_periods() {
        assert_eq!(SensorType::Acc.sample_period_ms(), 16.0);
        assert_eq!(SensorType::Ppg.sample_period_ms(), 2.5);
    }
}

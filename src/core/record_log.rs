//! Append-only record of every sample in the session.
//!
//! Rows from both channels interleave in arrival order. Each channel
//! contributes one header row the first time it is seen, so the value
//! column's meaning changes wherever a new channel first appears.

use crate::collector::types::{SensorSample, SensorType};
use std::fmt;

/// One row of the exported table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Row {
    /// `timestamp_ms,<value column>`
    Header(SensorType),
    Sample { timestamp_ms: f64, value: u32 },
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Row::Header(sensor_type) => write!(f, "timestamp_ms,{}", sensor_type.value_column()),
            Row::Sample {
                timestamp_ms,
                value,
            } => write!(f, "{timestamp_ms},{value}"),
        }
    }
}

/// Unbounded row store feeding export.
#[derive(Debug, Clone, Default)]
pub struct RecordLog {
    rows: Vec<Row>,
    acc_header: bool,
    ppg_header: bool,
}

impl RecordLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the header row for `sensor_type` unless it already has one.
    /// Returns true when a header was written.
    pub fn ensure_header(&mut self, sensor_type: SensorType) -> bool {
        let emitted = match sensor_type {
            SensorType::Acc => &mut self.acc_header,
            SensorType::Ppg => &mut self.ppg_header,
        };
        if *emitted {
            return false;
        }
        *emitted = true;
        self.rows.push(Row::Header(sensor_type));
        true
    }

    /// Append a sample row. The caller emits the header first.
    pub fn push(&mut self, sample: &SensorSample) {
        self.rows.push(Row::Sample {
            timestamp_ms: sample.timestamp_ms,
            value: sample.value,
        });
    }

    /// All rows in arrival order, headers included.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row count, headers included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of sample rows, excluding headers.
    pub fn sample_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, Row::Sample { .. }))
            .count()
    }

    /// Comma-joined fields, newline-joined rows, no trailing newline.
    pub fn export(&self) -> String {
        self.rows
            .iter()
            .map(Row::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

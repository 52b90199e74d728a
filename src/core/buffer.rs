//! Bounded-recency sample buffer for live display.
//!
//! One buffer exists per sensor type. Samples are appended in timestamp
//! order by the caller, and [`SlidingBuffer::trim`] runs once per packet to
//! drop everything older than the window.

use crate::collector::types::{SensorSample, SensorType, WINDOW_DURATION_MS};
use std::collections::VecDeque;

/// Samples from the most recent window of one channel.
#[derive(Debug, Clone)]
pub struct SlidingBuffer {
    sensor_type: SensorType,
    /// Window length in milliseconds
    window_ms: f64,
    samples: VecDeque<SensorSample>,
}

impl SlidingBuffer {
    /// Create a buffer with the default 60 s window.
    pub fn new(sensor_type: SensorType) -> Self {
        Self::with_window(sensor_type, WINDOW_DURATION_MS)
    }

    /// Create a buffer keeping `window_ms` of samples.
    pub fn with_window(sensor_type: SensorType, window_ms: f64) -> Self {
        Self {
            sensor_type,
            window_ms,
            samples: VecDeque::new(),
        }
    }

    /// Channel this buffer holds.
    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    /// Append to the tail. Ordering is not checked.
    pub fn append(&mut self, sample: SensorSample) {
        self.samples.push_back(sample);
    }

    /// Append several samples, in order. Ordering is not checked.
    pub fn extend<I: IntoIterator<Item = SensorSample>>(&mut self, samples: I) {
        self.samples.extend(samples);
    }

    /// Drop samples older than `latest - window`. Returns how many were evicted.
    pub fn trim(&mut self) -> usize {
        let Some(latest) = self.samples.back().map(|s| s.timestamp_ms) else {
            return 0;
        };

        let cutoff = latest - self.window_ms;
        let keep_from = self.samples.partition_point(|s| s.timestamp_ms < cutoff);
        self.samples.drain(..keep_from);
        keep_from
    }

    /// Copy of the current contents, oldest first.
    pub fn read(&self) -> Vec<SensorSample> {
        self.samples.iter().copied().collect()
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Latest minus earliest timestamp, zero when empty.
    pub fn span_ms(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0.0,
        }
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<&SensorSample> {
        self.samples.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp_ms: f64, value: u32) -> SensorSample {
        SensorSample {
            timestamp_ms,
            value,
            sensor_type: SensorType::Acc,
        }
    }

    #[test]
    fn test_empty_buffer() {
        let mut buffer = SlidingBuffer::new(SensorType::Acc);
        assert!(buffer.is_empty());
        assert_eq!(buffer.trim(), 0);
        assert_eq!(buffer.span_ms(), 0.0);
        assert!(buffer.read().is_empty());
    }

    #[test]
    fn test_trim_keeps_cutoff_boundary() {
        let mut buffer = SlidingBuffer::new(SensorType::Acc);
        buffer.append(sample(0.0, 1));
        buffer.append(sample(10_000.0, 2));
        buffer.append(sample(70_000.0, 3));

        // cutoff = 10_000, which is kept
        assert_eq!(buffer.trim(), 1);
        let values: Vec<u32> = buffer.read().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![2, 3]);
        assert_eq!(buffer.span_ms(), 60_000.0);
    }

    #[test]
    fn test_span_bounded_after_trim() {
        let mut buffer = SlidingBuffer::new(SensorType::Acc);

        // ACC packets of 5 samples at 16 ms, roughly 3 minutes of data
        for counter in 0..2_500u64 {
            for index in 0..5u64 {
                let ts = ((counter * 5 + index) * 16) as f64;
                buffer.append(sample(ts, index as u32));
            }
            buffer.trim();
            assert!(buffer.span_ms() <= WINDOW_DURATION_MS);
        }

        let snapshot = buffer.read();
        let first = snapshot.first().unwrap().timestamp_ms;
        assert!(snapshot.iter().all(|s| s.timestamp_ms - first <= WINDOW_DURATION_MS));
    }

    #[test]
    fn test_read_is_independent_copy() {
        let mut buffer = SlidingBuffer::new(SensorType::Acc);
        buffer.append(sample(1.0, 1));

        let snapshot = buffer.read();
        buffer.append(sample(2.0, 2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_custom_window() {
        let mut buffer = SlidingBuffer::with_window(SensorType::Ppg, 100.0);
        buffer.extend((0..10).map(|i| sample(i as f64 * 25.0, i)));

        buffer.trim();
        assert_eq!(buffer.latest().map(|s| s.value), Some(9));
        assert!(buffer.span_ms() <= 100.0);
        assert_eq!(buffer.len(), 5);
    }
}

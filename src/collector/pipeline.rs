//! The collector: owns all session state and runs the packet pipeline.
//!
//! Every notification goes through decode, timestamp reconstruction,
//! sliding-buffer append and trim, record-log append and the push callback,
//! in that order and to completion before the next one is looked at.
//! Notifications arrive on a channel handed to the transport at subscribe
//! time and are drained on the caller's thread by [`Collector::pump`],
//! [`Collector::poll`] or [`Collector::run`].

use crate::collector::types::{
    PacketUpdate, SensorSample, SensorType, CHARACTERISTIC_UUID, SERVICE_UUID, WINDOW_DURATION_MS,
};
use crate::config::Config;
use crate::core::{
    decode_packet, Clock, GenesisEpochs, RecordLog, SlidingBuffer, SystemClock,
    TimestampReconstructor,
};
use crate::stats::{SessionStats, SharedSessionStats};
use crate::transport::{ConnectionHandle, Notification, Transport, TransportError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Push callback invoked after each applied packet.
pub type UpdateCallback = Box<dyn FnMut(&PacketUpdate) + Send>;

/// Collector settings.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Sliding buffer window in milliseconds
    pub window_ms: f64,
    pub service_uuid: String,
    pub characteristic_uuid: String,
    /// Notifications the transport may queue before it blocks
    pub channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            window_ms: WINDOW_DURATION_MS,
            service_uuid: SERVICE_UUID.to_string(),
            characteristic_uuid: CHARACTERISTIC_UUID.to_string(),
            channel_capacity: 10_000,
        }
    }
}

impl From<&Config> for CollectorConfig {
    fn from(config: &Config) -> Self {
        Self {
            window_ms: config.window_ms(),
            service_uuid: config.service_uuid.clone(),
            characteristic_uuid: config.characteristic_uuid.clone(),
            ..Self::default()
        }
    }
}

/// Result of waiting for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// Nothing arrived before the timeout
    Idle,
    /// This many notifications were handled
    Processed(usize),
    /// The transport hung up, or no transport is attached
    Ended,
}

/// Failure writing the export file.
#[derive(Debug, Error)]
#[error("failed to write export to {path:?}: {source}")]
pub struct ExportError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

struct Link {
    transport: Box<dyn Transport>,
    connection: ConnectionHandle,
    notifications: Receiver<Notification>,
}

/// Two-channel sample collector.
pub struct Collector {
    config: CollectorConfig,
    clock: Box<dyn Clock>,
    reconstructor: TimestampReconstructor,
    acc: SlidingBuffer,
    ppg: SlidingBuffer,
    log: RecordLog,
    on_update: Option<UpdateCallback>,
    link: Option<Link>,
    stats: SharedSessionStats,
}

impl Collector {
    /// Create a collector reading the system clock.
    pub fn new(config: CollectorConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    /// Create a collector taking genesis epochs from `clock`.
    pub fn with_clock(config: CollectorConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            acc: SlidingBuffer::with_window(SensorType::Acc, config.window_ms),
            ppg: SlidingBuffer::with_window(SensorType::Ppg, config.window_ms),
            config,
            clock,
            reconstructor: TimestampReconstructor::new(),
            log: RecordLog::new(),
            on_update: None,
            link: None,
            stats: Arc::new(SessionStats::new()),
        }
    }

    /// Replace the stats sink, e.g. with one that persists.
    pub fn with_stats(mut self, stats: SharedSessionStats) -> Self {
        self.stats = stats;
        self
    }

    /// Register the push callback, replacing any previous one.
    pub fn on_update<F>(&mut self, callback: F)
    where
        F: FnMut(&PacketUpdate) + Send + 'static,
    {
        self.on_update = Some(Box::new(callback));
    }

    /// Connect, resolve the sample characteristic and subscribe.
    ///
    /// Transport failures are returned as raised. A collector holds at most
    /// one subscription.
    pub fn connect(&mut self, mut transport: Box<dyn Transport>) -> Result<(), TransportError> {
        if self.link.is_some() {
            return Err(TransportError::AlreadySubscribed);
        }

        let connection = transport.connect(&self.config.service_uuid)?;
        let (sink, notifications) = bounded(self.config.channel_capacity);

        let subscribed = transport
            .characteristic(connection, &self.config.characteristic_uuid)
            .and_then(|characteristic| transport.subscribe(characteristic, sink));
        if let Err(e) = subscribed {
            let _ = transport.disconnect(connection);
            return Err(e);
        }

        tracing::info!(
            service = %self.config.service_uuid,
            characteristic = %self.config.characteristic_uuid,
            "subscribed to sensor notifications"
        );

        self.link = Some(Link {
            transport,
            connection,
            notifications,
        });
        Ok(())
    }

    /// Whether a transport is attached and subscribed.
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Request transport teardown. Buffers, log and genesis are kept.
    ///
    /// Notifications still queued are discarded. Calling this when not
    /// connected does nothing.
    pub fn stop(&mut self) {
        let Some(mut link) = self.link.take() else {
            return;
        };
        if let Err(e) = link.transport.disconnect(link.connection) {
            tracing::warn!(error = %e, "transport disconnect failed");
        }
        tracing::info!(
            acc = self.acc.len(),
            ppg = self.ppg.len(),
            rows = self.log.len(),
            "collector stopped"
        );
    }

    /// Handle every notification already queued, without blocking.
    pub fn pump(&mut self) -> usize {
        let Some(notifications) = self.receiver() else {
            return 0;
        };
        let mut handled = 0;
        for data in notifications.try_iter() {
            self.handle_notification(&data);
            handled += 1;
        }
        handled
    }

    /// Wait up to `timeout` for a notification, then drain the queue.
    pub fn poll(&mut self, timeout: Duration) -> PumpStatus {
        let Some(notifications) = self.receiver() else {
            return PumpStatus::Ended;
        };
        match notifications.recv_timeout(timeout) {
            Ok(data) => {
                self.handle_notification(&data);
                PumpStatus::Processed(1 + self.pump())
            }
            Err(RecvTimeoutError::Timeout) => PumpStatus::Idle,
            Err(RecvTimeoutError::Disconnected) => PumpStatus::Ended,
        }
    }

    /// Process notifications until `running` clears or the stream ends.
    /// Returns the number handled.
    pub fn run(&mut self, running: &AtomicBool) -> usize {
        let mut handled = 0;
        while running.load(Ordering::SeqCst) {
            match self.poll(RECV_TIMEOUT) {
                PumpStatus::Processed(n) => handled += n,
                PumpStatus::Idle => {}
                PumpStatus::Ended => break,
            }
        }
        handled
    }

    /// Run one raw notification through the pipeline.
    ///
    /// Short buffers and unknown type codes are dropped without touching
    /// any state other than the counters. Returns what the push callback
    /// was given, if the packet was applied.
    pub fn handle_notification(&mut self, data: &[u8]) -> Option<PacketUpdate> {
        self.stats.record_packet();

        let Some(packet) = decode_packet(data) else {
            self.stats.record_malformed();
            tracing::trace!(len = data.len(), "dropping short packet");
            return None;
        };

        let Some(sensor_type) = packet.header.sensor_type() else {
            self.stats.record_unrecognized();
            tracing::trace!(type_code = packet.header.type_code, "ignoring unknown packet type");
            return None;
        };

        let (genesis, first) = self.reconstructor.observe(sensor_type, self.clock.now_ms());
        if first {
            tracing::info!(sensor = %sensor_type, genesis_ms = genesis, "genesis epoch set");
        }
        let samples = self.reconstructor.reconstruct(sensor_type, genesis, &packet);

        let buffer = self.buffer_mut(sensor_type);
        buffer.extend(samples.iter().copied());
        let evicted = buffer.trim();

        self.log.ensure_header(sensor_type);
        for sample in &samples {
            self.log.push(sample);
        }
        self.stats.record_samples(sensor_type, samples.len() as u64);

        let update = PacketUpdate {
            sensor_type,
            sequence_counter: packet.header.sequence_counter,
            sample_count: samples.len(),
        };
        tracing::debug!(
            sensor = %sensor_type,
            counter = update.sequence_counter,
            samples = update.sample_count,
            evicted,
            "packet applied"
        );

        if let Some(callback) = self.on_update.as_mut() {
            callback(&update);
        }
        Some(update)
    }

    /// Copy of the sliding buffer for `sensor_type`.
    pub fn snapshot(&self, sensor_type: SensorType) -> Vec<SensorSample> {
        self.buffer(sensor_type).read()
    }

    /// Copy of the ACC sliding buffer.
    pub fn acc_snapshot(&self) -> Vec<SensorSample> {
        self.acc.read()
    }

    /// Copy of the PPG sliding buffer.
    pub fn ppg_snapshot(&self) -> Vec<SensorSample> {
        self.ppg.read()
    }

    /// Borrow the sliding buffer for `sensor_type`.
    pub fn buffer(&self, sensor_type: SensorType) -> &SlidingBuffer {
        match sensor_type {
            SensorType::Acc => &self.acc,
            SensorType::Ppg => &self.ppg,
        }
    }

    /// The full session table as text.
    pub fn export(&self) -> String {
        self.log.export()
    }

    /// Write [`export`](Self::export) to `path`, creating parent directories.
    pub fn export_to(&self, path: &Path) -> Result<(), ExportError> {
        let wrap = |source| ExportError {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(wrap)?;
        }
        std::fs::write(path, self.export()).map_err(wrap)?;
        tracing::info!(path = ?path, rows = self.log.len(), "exported session");
        Ok(())
    }

    /// Borrow the full session log.
    pub fn record_log(&self) -> &RecordLog {
        &self.log
    }

    /// Genesis epochs captured so far.
    pub fn genesis(&self) -> GenesisEpochs {
        self.reconstructor.genesis()
    }

    /// Shared session counters.
    pub fn stats(&self) -> SharedSessionStats {
        self.stats.clone()
    }

    fn buffer_mut(&mut self, sensor_type: SensorType) -> &mut SlidingBuffer {
        match sensor_type {
            SensorType::Acc => &mut self.acc,
            SensorType::Ppg => &mut self.ppg,
        }
    }

    fn receiver(&self) -> Option<Receiver<Notification>> {
        self.link.as_ref().map(|link| link.notifications.clone())
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Replay of recorded notification buffers.
//!
//! Recordings are plain text, one hex-encoded packet per line. Spaces inside
//! a line are ignored, blank lines and lines starting with `#` are skipped.
//! After `subscribe`, a background thread sends the packets in order,
//! pausing `interval` between them, and hangs up once the recording ends.
//! Disconnecting wakes the thread out of any wait, so teardown does not
//! wait out the interval.

use crate::transport::{
    CharacteristicHandle, ConnectionHandle, Notification, Transport, TransportError,
};
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Characteristic id handed out for the notify characteristic.
const NOTIFY_CHARACTERISTIC: u64 = 1;

/// Parse a replay recording into notification buffers.
pub fn parse_replay(text: &str) -> Result<Vec<Notification>, TransportError> {
    let mut packets = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let packet = hex::decode(&compact).map_err(|source| TransportError::ReplayFormat {
            line: index + 1,
            source,
        })?;
        packets.push(packet);
    }
    Ok(packets)
}

/// A transport that plays back a fixed list of packets.
pub struct ReplayTransport {
    packets: Option<Vec<Notification>>,
    interval: Duration,
    /// Service the fake device advertises. `None` accepts any.
    service: Option<String>,
    connection: Option<ConnectionHandle>,
    running: Arc<AtomicBool>,
    /// Dropped to wake and stop the playback thread
    shutdown: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ReplayTransport {
    /// Create a transport that plays `packets` with `interval` between them.
    pub fn new(packets: Vec<Notification>, interval: Duration) -> Self {
        Self {
            packets: Some(packets),
            interval,
            service: None,
            connection: None,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: None,
            thread_handle: None,
        }
    }

    /// Load a recording from disk.
    pub fn from_file(path: impl AsRef<Path>, interval: Duration) -> Result<Self, TransportError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(parse_replay(&text)?, interval))
    }

    /// Only accept connections for `service`.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Whether the playback thread is still sending.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop_playback(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Transport for ReplayTransport {
    fn connect(&mut self, service: &str) -> Result<ConnectionHandle, TransportError> {
        if let Some(ref expected) = self.service {
            if !expected.eq_ignore_ascii_case(service) {
                return Err(TransportError::Connect(format!(
                    "no device advertising service {service}"
                )));
            }
        }
        let handle = ConnectionHandle(1);
        self.connection = Some(handle);
        tracing::debug!(service, "replay transport connected");
        Ok(handle)
    }

    fn characteristic(
        &mut self,
        connection: ConnectionHandle,
        id: &str,
    ) -> Result<CharacteristicHandle, TransportError> {
        if self.connection != Some(connection) {
            return Err(TransportError::NotConnected);
        }
        if id.is_empty() {
            return Err(TransportError::CharacteristicNotFound(id.to_string()));
        }
        Ok(CharacteristicHandle {
            connection,
            id: NOTIFY_CHARACTERISTIC,
        })
    }

    fn subscribe(
        &mut self,
        characteristic: CharacteristicHandle,
        sink: Sender<Notification>,
    ) -> Result<(), TransportError> {
        if self.connection != Some(characteristic.connection) {
            return Err(TransportError::NotConnected);
        }
        if characteristic.id != NOTIFY_CHARACTERISTIC {
            return Err(TransportError::CharacteristicNotFound(characteristic.id.to_string()));
        }
        let packets = self.packets.take().ok_or(TransportError::AlreadySubscribed)?;

        let (shutdown, stopped) = bounded(0);
        self.shutdown = Some(shutdown);
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let interval = self.interval;

        let handle = thread::spawn(move || {
            play(packets, interval, &sink, &stopped);
            running.store(false, Ordering::SeqCst);
            // Dropping the sink tells the collector the stream has ended
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn disconnect(&mut self, connection: ConnectionHandle) -> Result<(), TransportError> {
        if self.connection != Some(connection) {
            return Err(TransportError::NotConnected);
        }
        self.stop_playback();
        self.connection = None;
        tracing::debug!("replay transport disconnected");
        Ok(())
    }
}

impl Drop for ReplayTransport {
    fn drop(&mut self) {
        self.stop_playback();
    }
}

fn play(
    packets: Vec<Notification>,
    interval: Duration,
    sink: &Sender<Notification>,
    stopped: &Receiver<()>,
) {
    for (index, packet) in packets.into_iter().enumerate() {
        if index > 0 && !interval.is_zero() {
            // Anything but a timeout means the sender was dropped
            if !matches!(stopped.recv_timeout(interval), Err(RecvTimeoutError::Timeout)) {
                return;
            }
        }

        select! {
            send(sink, packet) -> sent => {
                if sent.is_err() {
                    return;
                }
            }
            recv(stopped) -> _ => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_parse_replay() {
        let text = "# recorded session\n\n010000 0a0000\n02 01 00 ff ff ff\n";
        let packets = parse_replay(text).unwrap();

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0], vec![0x01, 0x00, 0x00, 0x0a, 0x00, 0x00]);
        assert_eq!(packets[1], vec![0x02, 0x01, 0x00, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_parse_replay_reports_line() {
        let err = parse_replay("010000\nzz\n").unwrap_err();
        assert!(matches!(err, TransportError::ReplayFormat { line: 2, .. }));
    }

    #[test]
    fn test_delivers_all_packets_then_hangs_up() {
        let mut transport = ReplayTransport::new(vec![vec![1], vec![2], vec![3]], Duration::ZERO);
        let connection = transport.connect("any").unwrap();
        let characteristic = transport.characteristic(connection, "char").unwrap();

        let (tx, rx) = unbounded();
        transport.subscribe(characteristic, tx).unwrap();

        let received: Vec<Notification> = rx.iter().collect();
        assert_eq!(received, vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_single_subscription() {
        let mut transport = ReplayTransport::new(Vec::new(), Duration::ZERO);
        let connection = transport.connect("any").unwrap();
        let characteristic = transport.characteristic(connection, "char").unwrap();

        let (tx, _rx) = unbounded();
        transport.subscribe(characteristic, tx.clone()).unwrap();
        assert!(matches!(
            transport.subscribe(characteristic, tx),
            Err(TransportError::AlreadySubscribed)
        ));
    }

    #[test]
    fn test_service_mismatch() {
        let mut transport = ReplayTransport::new(Vec::new(), Duration::ZERO).with_service("abc");
        assert!(matches!(transport.connect("def"), Err(TransportError::Connect(_))));
        assert!(transport.connect("ABC").is_ok());
    }

    #[test]
    fn test_unknown_characteristic_rejected() {
        let mut transport = ReplayTransport::new(Vec::new(), Duration::ZERO);
        let connection = transport.connect("any").unwrap();
        let characteristic = CharacteristicHandle { connection, id: 9 };

        let (tx, _rx) = unbounded();
        assert!(matches!(
            transport.subscribe(characteristic, tx),
            Err(TransportError::CharacteristicNotFound(_))
        ));
    }

    #[test]
    fn test_disconnect_interrupts_interval_wait() {
        let packets = vec![vec![1], vec![2]];
        let mut transport = ReplayTransport::new(packets, Duration::from_secs(3));
        let connection = transport.connect("any").unwrap();
        let characteristic = transport.characteristic(connection, "char").unwrap();

        let (tx, rx) = unbounded();
        transport.subscribe(characteristic, tx).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), vec![1]);

        let started = std::time::Instant::now();
        transport.disconnect(connection).unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(!transport.is_running());

        // The second packet never arrives and the sink is closed
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_disconnect_interrupts_blocked_send() {
        let packets = vec![vec![1], vec![2], vec![3]];
        let mut transport = ReplayTransport::new(packets, Duration::ZERO);
        let connection = transport.connect("any").unwrap();
        let characteristic = transport.characteristic(connection, "char").unwrap();

        // Capacity one: the thread blocks sending the second packet
        let (tx, rx) = bounded(1);
        transport.subscribe(characteristic, tx).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let started = std::time::Instant::now();
        transport.disconnect(connection).unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![vec![1]]);
    }
}

//! Integration tests driving the collector through a replay transport

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wearable_collector::collector::{CHARACTERISTIC_UUID, SERVICE_UUID};
use wearable_collector::core::{encode_packet, FixedClock};
use wearable_collector::transport::{
    parse_replay, CharacteristicHandle, ConnectionHandle, Notification, Transport,
};
use wearable_collector::{
    Collector, CollectorConfig, PumpStatus, ReplayTransport, SensorType, TransportError,
};

const GENESIS: f64 = 1_700_000_000_000.0;

fn collector() -> Collector {
    Collector::with_clock(CollectorConfig::default(), Box::new(FixedClock(GENESIS)))
}

fn drain(collector: &mut Collector) -> usize {
    let mut handled = 0;
    loop {
        match collector.poll(Duration::from_millis(500)) {
            PumpStatus::Processed(n) => handled += n,
            PumpStatus::Idle => {}
            PumpStatus::Ended => return handled,
        }
    }
}

#[test]
fn test_replay_mixed_stream() {
    let packets = vec![
        encode_packet(1, 0, &[10, 20, 30]),
        vec![1, 0],
        encode_packet(2, 0, &[100, 200]),
        encode_packet(1, 1, &[40, 50, 60]),
        encode_packet(5, 3, &[1]),
    ];

    let mut collector = collector();
    collector
        .connect(Box::new(ReplayTransport::new(packets, Duration::ZERO)))
        .expect("Failed to connect");
    assert!(collector.is_connected());

    assert_eq!(drain(&mut collector), 5);

    let acc: Vec<f64> = collector
        .acc_snapshot()
        .iter()
        .map(|s| s.timestamp_ms - GENESIS)
        .collect();
    assert_eq!(acc, vec![0.0, 16.0, 32.0, 80.0, 96.0, 112.0]);

    let ppg = collector.ppg_snapshot();
    assert_eq!(ppg.len(), 2);
    assert_eq!(ppg[1].timestamp_ms, GENESIS + 2.5);

    let export = collector.export();
    let lines: Vec<&str> = export.lines().collect();
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "timestamp_ms,magnitude_ug");
    assert_eq!(lines[4], "timestamp_ms,green");
    assert_eq!(lines.iter().filter(|l| l.starts_with("timestamp_ms")).count(), 2);

    let stats = collector.stats().snapshot();
    assert_eq!(stats.packets_received, 5);
    assert_eq!(stats.malformed_packets, 1);
    assert_eq!(stats.unrecognized_packets, 1);
    assert_eq!(stats.acc_samples, 6);
    assert_eq!(stats.ppg_samples, 2);
}

#[test]
fn test_run_until_stream_ends() {
    let recording = "# two ACC packets\n01 0000 050000 060000\n01 0100 070000\n";
    let packets = parse_replay(recording).unwrap();

    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();

    let mut collector = collector();
    collector.on_update(move |update| sink.lock().unwrap().push(update.sequence_counter));
    collector
        .connect(Box::new(ReplayTransport::new(packets, Duration::from_millis(1))))
        .unwrap();

    let running = AtomicBool::new(true);
    assert_eq!(collector.run(&running), 2);
    assert_eq!(*updates.lock().unwrap(), vec![0, 1]);

    let values: Vec<u32> = collector.acc_snapshot().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![5, 6, 7]);
}

#[test]
fn test_stop_preserves_data_for_export() {
    let packets = vec![encode_packet(1, 0, &[5, 6])];

    let mut collector =
        Collector::with_clock(CollectorConfig::default(), Box::new(FixedClock(1000.0)));
    collector
        .connect(Box::new(ReplayTransport::new(packets, Duration::ZERO)))
        .unwrap();
    drain(&mut collector);

    collector.stop();
    assert!(!collector.is_connected());
    assert_eq!(collector.export(), "timestamp_ms,magnitude_ug\n1000,5\n1016,6");
    assert_eq!(collector.snapshot(SensorType::Acc).len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exports").join("session.csv");
    collector.export_to(&path).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "timestamp_ms,magnitude_ug\n1000,5\n1016,6"
    );
}

#[test]
fn test_stop_does_not_wait_out_replay_interval() {
    let packets = vec![encode_packet(1, 0, &[5, 6]), encode_packet(1, 1, &[7])];

    let mut collector = collector();
    collector
        .connect(Box::new(ReplayTransport::new(packets, Duration::from_secs(3))))
        .unwrap();
    assert_eq!(collector.poll(Duration::from_secs(1)), PumpStatus::Processed(1));

    // The replay thread is now inside its 3 s pause before the second packet
    let started = Instant::now();
    collector.stop();
    assert!(started.elapsed() < Duration::from_millis(500));

    assert!(!collector.is_connected());
    assert_eq!(collector.acc_snapshot().len(), 2);
    assert_eq!(collector.record_log().sample_count(), 2);
}

#[test]
fn test_connect_error_propagates() {
    let transport = ReplayTransport::new(Vec::new(), Duration::ZERO).with_service("not-the-sensor");

    let mut collector = collector();
    let err = collector.connect(Box::new(transport)).unwrap_err();
    assert!(matches!(err, TransportError::Connect(_)));
    assert!(!collector.is_connected());
}

#[test]
fn test_single_subscription_per_collector() {
    let mut collector = collector();
    collector
        .connect(Box::new(ReplayTransport::new(Vec::new(), Duration::ZERO)))
        .unwrap();

    let second = collector.connect(Box::new(ReplayTransport::new(Vec::new(), Duration::ZERO)));
    assert!(matches!(second, Err(TransportError::AlreadySubscribed)));
}

/// Records the identifiers it is asked for and fails subscription.
struct RefusingTransport {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Transport for RefusingTransport {
    fn connect(&mut self, service: &str) -> Result<ConnectionHandle, TransportError> {
        self.calls.lock().unwrap().push(format!("connect {service}"));
        Ok(ConnectionHandle(7))
    }

    fn characteristic(
        &mut self,
        connection: ConnectionHandle,
        id: &str,
    ) -> Result<CharacteristicHandle, TransportError> {
        self.calls.lock().unwrap().push(format!("characteristic {id}"));
        Ok(CharacteristicHandle { connection, id: 3 })
    }

    fn subscribe(
        &mut self,
        _characteristic: CharacteristicHandle,
        _sink: crossbeam_channel::Sender<Notification>,
    ) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push("subscribe".to_string());
        Err(TransportError::Subscribe("notifications not permitted".to_string()))
    }

    fn disconnect(&mut self, _connection: ConnectionHandle) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push("disconnect".to_string());
        Ok(())
    }
}

#[test]
fn test_subscribe_failure_propagates_unmodified() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let transport = RefusingTransport {
        calls: calls.clone(),
    };

    let mut collector = collector();
    let err = collector.connect(Box::new(transport)).unwrap_err();
    assert_eq!(err.to_string(), "subscription failed: notifications not permitted");

    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            format!("connect {SERVICE_UUID}"),
            format!("characteristic {CHARACTERISTIC_UUID}"),
            "subscribe".to_string(),
            "disconnect".to_string(),
        ]
    );
}

#[test]
fn test_long_session_window_bound() {
    // About two and a half minutes of ACC at five samples per counter step
    let packets: Vec<Notification> = (0..2_000u16)
        .map(|counter| encode_packet(1, counter, &[1, 2, 3, 4, 5]))
        .collect();

    let mut collector = collector();
    collector
        .connect(Box::new(ReplayTransport::new(packets, Duration::ZERO)))
        .unwrap();
    drain(&mut collector);

    let acc = collector.acc_snapshot();
    let span = acc.last().unwrap().timestamp_ms - acc.first().unwrap().timestamp_ms;
    assert!(span <= 60_000.0);
    assert_eq!(collector.record_log().sample_count(), 10_000);
}

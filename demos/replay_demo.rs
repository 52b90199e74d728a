//! Demonstration of the collector pipeline on a synthetic stream.
//!
//! This example shows how to:
//! 1. Build notification packets the way the sensor sends them
//! 2. Connect a collector through a replay transport
//! 3. Watch the sliding windows while packets arrive
//! 4. Export the full session table
//!
//! Run with: cargo run --example replay_demo

use std::time::Duration;

use wearable_collector::{
    collector::{Collector, CollectorConfig, PumpStatus, ACC_TYPE_CODE, PPG_TYPE_CODE},
    core::encode_packet,
    transport::ReplayTransport,
};

fn main() {
    println!("Wearable Collector - Replay Demo");
    println!("================================");
    println!();

    // Interleave ACC and PPG packets, five samples each, with a short one
    // thrown in to show it being dropped.
    let mut packets = Vec::new();
    for counter in 0..200u16 {
        let acc: Vec<u32> = (0..5).map(|i| 1_000 + u32::from(counter % 50) * 10 + i).collect();
        packets.push(encode_packet(ACC_TYPE_CODE, counter, &acc));

        let ppg: Vec<u32> = (0..5).map(|i| 80_000 + u32::from(counter) * 5 + i).collect();
        packets.push(encode_packet(PPG_TYPE_CODE, counter, &ppg));

        if counter == 100 {
            packets.push(vec![ACC_TYPE_CODE, 0]);
        }
    }

    let transport = ReplayTransport::new(packets, Duration::from_millis(2));
    let mut collector = Collector::new(CollectorConfig::default());
    collector.on_update(|update| {
        if update.sequence_counter % 50 == 0 {
            if let Ok(json) = serde_json::to_string(update) {
                println!("  {json}");
            }
        }
    });

    if let Err(e) = collector.connect(Box::new(transport)) {
        eprintln!("Connection failed: {e}");
        return;
    }

    println!("Streaming...");
    while collector.poll(Duration::from_millis(100)) != PumpStatus::Ended {}
    collector.stop();

    println!();
    let acc = collector.acc_snapshot();
    let ppg = collector.ppg_snapshot();
    println!("ACC window: {} samples", acc.len());
    println!("PPG window: {} samples", ppg.len());
    for sample in [acc.last(), ppg.last()].into_iter().flatten() {
        if let Ok(json) = serde_json::to_string(sample) {
            println!("  latest: {json}");
        }
    }
    println!();
    println!("{}", collector.stats().summary());
    println!();

    let export = collector.export();
    println!("Export preview:");
    for line in export.lines().take(4) {
        println!("  {line}");
    }
    println!("  ... ({} lines total)", export.lines().count());
}

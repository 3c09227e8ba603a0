//! Hardware integration tests against the OS MIDI subsystem.
//!
//! Loopback tests need a virtual MIDI cable (IAC Driver on macOS, `snd-virmidi`
//! on Linux) whose name contains `PORTAMENTO_LOOPBACK` (default "IAC").
//! All tests are `#[ignore]` so CI doesn't fail without hardware.
//!
//! Run with:
//!   cargo test -p portamento-port --test hardware -- --ignored --test-threads=1

#![cfg(feature = "midi-io")]

use crossbeam_channel::bounded;
use portamento_port::{
    ChannelSink, MidiClient, MidiEvent, MidiPort, MidirClient, PortMode, Timestamp,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(200);

fn loopback_name() -> String {
    std::env::var("PORTAMENTO_LOOPBACK").unwrap_or_else(|_| "IAC".to_string())
}

fn client() -> Arc<MidirClient> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Arc::new(
        MidirClient::builder()
            .client_name("portamento-test")
            .poll_interval(Duration::from_millis(50))
            .build()
            .expect("Failed to open the OS MIDI subsystem"),
    )
}

fn find(endpoints: &[String], needle: &str) -> Option<String> {
    endpoints.iter().find(|name| name.contains(needle)).cloned()
}

#[test]
#[ignore]
fn test_lists_endpoints() {
    let client = client();
    println!("readable: {:?}", client.readable_ports());
    println!("writable: {:?}", client.writable_ports());
}

#[test]
#[ignore]
fn test_port_sees_system_endpoints() {
    let client = client();
    let sink = Arc::new(|_: &MidiEvent, _: Timestamp| {});
    let port = MidiPort::builder("Endpoints", client.clone(), sink)
        .mode(PortMode::Duplex)
        .build();
    assert_eq!(port.readable_ports().len(), client.readable_ports().len());
    assert_eq!(port.writable_ports().len(), client.writable_ports().len());
}

#[test]
#[ignore]
fn test_loopback_round_trip() {
    let client = client();
    let needle = loopback_name();
    let Some(readable) = find(&client.readable_ports(), &needle) else {
        eprintln!("No readable loopback endpoint matching '{}'", needle);
        return;
    };
    let Some(writable) = find(&client.writable_ports(), &needle) else {
        eprintln!("No writable loopback endpoint matching '{}'", needle);
        return;
    };

    let (tx, rx) = bounded(64);
    let port = MidiPort::builder("Loopback", client.clone(), Arc::new(ChannelSink(tx)))
        .mode(PortMode::Duplex)
        .build();
    port.subscribe_readable_port(&readable, true);
    port.subscribe_writable_port(&writable, true);
    thread::sleep(SETTLE);

    port.process_out_event(&MidiEvent::note_on(1, 60, 100), Timestamp::ZERO);
    let (event, _) = rx
        .recv_timeout(Duration::from_secs(1))
        .expect("Loopback event not received");
    assert_eq!(event, MidiEvent::note_on(0, 60, 100));

    // Unsubscribed endpoints stop delivering
    port.subscribe_readable_port(&readable, false);
    thread::sleep(SETTLE);
    port.process_out_event(&MidiEvent::note_on(1, 62, 100), Timestamp::ZERO);
    assert!(rx.recv_timeout(SETTLE).is_err());
}

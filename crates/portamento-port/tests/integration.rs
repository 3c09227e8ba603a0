//! Integration tests for portamento-port.
//!
//! These tests exercise multi-component workflows without hardware MIDI devices.

use crossbeam_channel::bounded;
use parking_lot::Mutex;
use portamento_port::{
    ChannelSink, Direction, MidiEvent, MidiEventKind, MidiEventProcessor, MidiPort, PortMode,
    PortNotification, PortSettings, Timestamp, VirtualClient,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn studio_client() -> Arc<VirtualClient> {
    let client = Arc::new(VirtualClient::new());
    client.set_readable_ports(["Keystation", "Drum Pads"]);
    client.set_writable_ports(["Hardware Synth", "Sampler"]);
    client
}

// ---------------------------------------------------------------------------
// 1. Event flow: endpoint -> port -> sink, engine -> port -> endpoint
// ---------------------------------------------------------------------------

#[test]
fn test_duplex_event_flow() {
    init_tracing();
    let client = studio_client();
    let (tx, rx) = bounded(64);
    let port = MidiPort::builder("Piano", client.clone(), Arc::new(ChannelSink(tx)))
        .mode(PortMode::Duplex)
        .build();
    port.subscribe_readable_port("Keystation", true);
    port.subscribe_writable_port("Hardware Synth", true);
    port.set_input_channel(1);
    port.set_output_channel(2);

    // Hardware sends on channel 0 (accepted) and channel 1 (filtered)
    client.deliver("Keystation", &MidiEvent::note_on(0, 60, 90), Timestamp::from_raw(10));
    client.deliver("Keystation", &MidiEvent::note_on(1, 62, 90), Timestamp::from_raw(11));
    client.deliver("Drum Pads", &MidiEvent::note_on(0, 36, 90), Timestamp::from_raw(12));

    let received: Vec<_> = rx.try_iter().collect();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0.key(), 60);
    assert_eq!(received[0].1, Timestamp::from_raw(10));

    // Engine answers on the 1-based output channel
    port.process_out_event(&MidiEvent::note_on(2, 64, 80), Timestamp::from_raw(20));
    let out = client.drain_output();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].event.channel, 1);
    assert_eq!(out[0].event.to_bytes(), vec![0x91, 64, 80]);
}

#[test]
fn test_wire_bytes_through_port() {
    let client = studio_client();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let sink: Arc<dyn MidiEventProcessor> =
        Arc::new(move |event: &MidiEvent, _: Timestamp| log.lock().push(*event));
    let port = MidiPort::builder("Bytes", client.clone(), sink)
        .mode(PortMode::Input)
        .build();
    port.subscribe_readable_port("Drum Pads", true);
    port.set_fixed_input_velocity(127);

    let event = MidiEvent::from_bytes(&[0x99, 38, 40]).unwrap();
    client.deliver("Drum Pads", &event, Timestamp::ZERO);

    let events = seen.lock();
    assert_eq!(events[0].kind, MidiEventKind::NoteOn);
    assert_eq!(events[0].channel, 9);
    assert_eq!(events[0].velocity(), 127);
}

// ---------------------------------------------------------------------------
// 2. Hot-plug: endpoint lists change while ports are live
// ---------------------------------------------------------------------------

#[test]
fn test_hot_plug_reconciles_every_port() {
    init_tracing();
    let client = studio_client();
    let sink: Arc<dyn MidiEventProcessor> = Arc::new(|_: &MidiEvent, _: Timestamp| {});
    let a = MidiPort::builder("A", client.clone(), sink.clone())
        .mode(PortMode::Input)
        .build();
    let b = MidiPort::builder("B", client.clone(), sink)
        .mode(PortMode::Input)
        .build();
    a.subscribe_readable_port("Keystation", true);
    b.subscribe_readable_port("Drum Pads", true);

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    a.on_notification(move |n| {
        if n == PortNotification::ReadablePortsChanged {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });

    // Drum pads unplugged, a new controller appears
    client.set_readable_ports(["Keystation", "Launchpad"]);

    assert_eq!(notified.load(Ordering::Relaxed), 1);
    assert!(a.is_subscribed(Direction::Input, "Keystation"));
    assert!(b.subscribed_ports(Direction::Input).is_empty());
    assert_eq!(b.readable_ports().get("Launchpad"), Some(&false));
    assert!(!client.is_readable_subscribed(b.id(), "Drum Pads"));
}

// ---------------------------------------------------------------------------
// 3. Mode transitions cascade to the transport
// ---------------------------------------------------------------------------

#[test]
fn test_disable_cascades_then_subscribe_reenables() {
    let client = studio_client();
    let sink: Arc<dyn MidiEventProcessor> = Arc::new(|_: &MidiEvent, _: Timestamp| {});
    let port = MidiPort::builder("Lead", client.clone(), sink)
        .mode(PortMode::Output)
        .build();
    port.subscribe_writable_port("Hardware Synth", true);
    port.subscribe_writable_port("Sampler", true);

    port.set_send_enabled(false);
    assert_eq!(port.mode(), PortMode::Disabled);
    assert!(client.writable_subscriptions(port.id()).is_empty());
    assert_eq!(client.applied_mode(port.id()), Some(PortMode::Disabled));

    port.subscribe_writable_port("Sampler", true);
    assert_eq!(port.mode(), PortMode::Output);
    assert_eq!(client.writable_subscriptions(port.id()), vec!["Sampler".to_string()]);
}

// ---------------------------------------------------------------------------
// 4. Settings persistence
// ---------------------------------------------------------------------------

#[test]
fn test_settings_survive_json_and_restore() {
    init_tracing();
    let client = studio_client();
    let sink: Arc<dyn MidiEventProcessor> = Arc::new(|_: &MidiEvent, _: Timestamp| {});
    let original = MidiPort::builder("Strings", client.clone(), sink.clone())
        .mode(PortMode::Duplex)
        .build();
    original.set_input_channel(4);
    original.set_output_program(33);
    original.subscribe_readable_port("Keystation", true);
    original.subscribe_writable_port("Sampler", true);

    let json = serde_json::to_string(&original.save_settings()).unwrap();
    drop(original);

    let settings: PortSettings = serde_json::from_str(&json).unwrap();
    let restored = MidiPort::builder("Strings", client.clone(), sink).build();
    restored.load_settings(&settings);

    assert_eq!(restored.mode(), PortMode::Duplex);
    assert_eq!(restored.input_channel(), 4);
    assert_eq!(restored.output_program(), 33);
    assert!(client.is_readable_subscribed(restored.id(), "Keystation"));
    assert!(client.is_writable_subscribed(restored.id(), "Sampler"));
}

#[test]
fn test_out_of_range_settings_are_clamped_on_load() {
    let sink: Arc<dyn MidiEventProcessor> = Arc::new(|_: &MidiEvent, _: Timestamp| {});
    let port = MidiPort::builder("Clamp", studio_client(), sink).build();
    let settings: PortSettings = serde_json::from_str(
        r#"{"inputchannel":99,"outputchannel":-4,"inputcontroller":500,
            "outputcontroller":0,"fixedinputvelocity":200,"fixedoutputvelocity":-9,
            "outputprogram":0,"readable":false,"writable":false}"#,
    )
    .unwrap();
    port.load_settings(&settings);

    assert_eq!(port.input_channel(), 16);
    assert_eq!(port.output_channel(), 1);
    assert_eq!(port.input_controller(), 127);
    assert_eq!(port.fixed_input_velocity(), 127);
    assert_eq!(port.fixed_output_velocity(), -1);
    assert_eq!(port.output_program(), 1);
}

// ---------------------------------------------------------------------------
// 5. Concurrency: racing configuration transitions
// ---------------------------------------------------------------------------

#[test]
fn test_disable_racing_subscribe_leaves_consistent_state() {
    let client = studio_client();
    let sink: Arc<dyn MidiEventProcessor> = Arc::new(|_: &MidiEvent, _: Timestamp| {});

    for _ in 0..200 {
        let port = MidiPort::builder("Racy", client.clone(), sink.clone())
            .mode(PortMode::Input)
            .build();
        let start = Arc::new(Barrier::new(3));

        let subscriber = {
            let port = Arc::clone(&port);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                port.subscribe_readable_port("Keystation", true);
                port.subscribe_readable_port("Drum Pads", true);
            })
        };
        let disabler = {
            let port = Arc::clone(&port);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                port.set_receive_enabled(false);
            })
        };
        let hot_plug = {
            let client = Arc::clone(&client);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                client.set_readable_ports(["Drum Pads", "Keystation"]);
            })
        };
        subscriber.join().unwrap();
        disabler.join().unwrap();
        hot_plug.join().unwrap();

        let table = port.subscribed_ports(Direction::Input);
        let connected = client.readable_subscriptions(port.id());
        assert_eq!(table, connected, "port table and client disagree");
        if !port.input_enabled() {
            assert!(table.is_empty(), "disabled input kept {:?}", table);
            assert!(connected.is_empty(), "disabled input still connected to {:?}", connected);
        }
    }
}

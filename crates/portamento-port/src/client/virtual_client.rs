//! In-process transport with programmable endpoints.
//!
//! Endpoint lists are set by the host (or a test) and changes are pushed to
//! every registered port, like a hot-plug event from a real MIDI subsystem.
//! Incoming events are injected with [`VirtualClient::deliver`]; outgoing
//! events are queued and drained with [`VirtualClient::drain_output`].

use super::{MidiClient, PortsChangedCallback};
use crate::mode::PortMode;
use crate::port::{MidiPort, PortId};
use crossbeam_channel::{bounded, Receiver, Sender};
use dashmap::DashMap;
use parking_lot::RwLock;
use portamento_midi::{MidiEvent, Timestamp};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use tracing::debug;

const DEFAULT_CAPACITY: usize = 1024;

/// An event a port sent through the client. The channel is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundEvent {
    pub port: PortId,
    pub event: MidiEvent,
    pub time: Timestamp,
}

struct RegisteredPort {
    port: Weak<MidiPort>,
    name: String,
    mode: PortMode,
    readable: BTreeSet<String>,
    writable: BTreeSet<String>,
    on_readable_changed: Option<PortsChangedCallback>,
    on_writable_changed: Option<PortsChangedCallback>,
}

pub struct VirtualClient {
    raw: bool,
    readable: RwLock<Vec<String>>,
    writable: RwLock<Vec<String>>,
    ports: DashMap<PortId, RegisteredPort>,
    outbound_tx: Sender<OutboundEvent>,
    outbound_rx: Receiver<OutboundEvent>,
}

impl VirtualClient {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds the outbound queue; events beyond it are dropped.
    pub fn with_capacity(capacity: usize) -> Self {
        let (outbound_tx, outbound_rx) = bounded(capacity);
        Self {
            raw: false,
            readable: RwLock::new(Vec::new()),
            writable: RwLock::new(Vec::new()),
            ports: DashMap::new(),
            outbound_tx,
            outbound_rx,
        }
    }

    /// A client without endpoint discovery.
    pub fn raw() -> Self {
        Self {
            raw: true,
            ..Self::new()
        }
    }

    pub fn set_readable_ports<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        *self.readable.write() = names.clone();

        let mut callbacks: SmallVec<[PortsChangedCallback; 4]> = SmallVec::new();
        for mut entry in self.ports.iter_mut() {
            entry.readable.retain(|endpoint| names.contains(endpoint));
            if let Some(callback) = &entry.on_readable_changed {
                callbacks.push(Arc::clone(callback));
            }
        }
        debug!("Virtual client now has {} readable endpoints", names.len());
        for callback in callbacks {
            callback();
        }
    }

    pub fn set_writable_ports<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        *self.writable.write() = names.clone();

        let mut callbacks: SmallVec<[PortsChangedCallback; 4]> = SmallVec::new();
        for mut entry in self.ports.iter_mut() {
            entry.writable.retain(|endpoint| names.contains(endpoint));
            if let Some(callback) = &entry.on_writable_changed {
                callbacks.push(Arc::clone(callback));
            }
        }
        debug!("Virtual client now has {} writable endpoints", names.len());
        for callback in callbacks {
            callback();
        }
    }

    /// Feed an event from a readable endpoint to every port subscribed to it.
    /// Returns the number of ports it was offered to.
    pub fn deliver(&self, endpoint: &str, event: &MidiEvent, time: Timestamp) -> usize {
        let targets: SmallVec<[Arc<MidiPort>; 4]> = self
            .ports
            .iter()
            .filter(|entry| entry.readable.contains(endpoint))
            .filter_map(|entry| entry.port.upgrade())
            .collect();
        for port in &targets {
            port.process_in_event(event, time);
        }
        targets.len()
    }

    pub fn drain_output(&self) -> Vec<OutboundEvent> {
        self.outbound_rx.try_iter().collect()
    }

    pub fn is_registered(&self, port: PortId) -> bool {
        self.ports.contains_key(&port)
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn applied_name(&self, port: PortId) -> Option<String> {
        self.ports.get(&port).map(|entry| entry.name.clone())
    }

    pub fn applied_mode(&self, port: PortId) -> Option<PortMode> {
        self.ports.get(&port).map(|entry| entry.mode)
    }

    pub fn is_readable_subscribed(&self, port: PortId, endpoint: &str) -> bool {
        self.ports
            .get(&port)
            .map(|entry| entry.readable.contains(endpoint))
            .unwrap_or(false)
    }

    pub fn is_writable_subscribed(&self, port: PortId, endpoint: &str) -> bool {
        self.ports
            .get(&port)
            .map(|entry| entry.writable.contains(endpoint))
            .unwrap_or(false)
    }

    /// Sorted endpoint names the port is connected to.
    pub fn readable_subscriptions(&self, port: PortId) -> Vec<String> {
        self.ports
            .get(&port)
            .map(|entry| entry.readable.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Sorted endpoint names the port is connected to.
    pub fn writable_subscriptions(&self, port: PortId) -> Vec<String> {
        self.ports
            .get(&port)
            .map(|entry| entry.writable.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for VirtualClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiClient for VirtualClient {
    fn add_port(&self, port: &Arc<MidiPort>) {
        self.ports.insert(
            port.id(),
            RegisteredPort {
                port: Arc::downgrade(port),
                name: port.name(),
                mode: port.mode(),
                readable: BTreeSet::new(),
                writable: BTreeSet::new(),
                on_readable_changed: None,
                on_writable_changed: None,
            },
        );
    }

    fn remove_port(&self, port: &MidiPort) {
        self.ports.remove(&port.id());
    }

    fn apply_port_name(&self, port: &MidiPort) {
        let name = port.name();
        if let Some(mut entry) = self.ports.get_mut(&port.id()) {
            entry.name = name;
        }
    }

    fn apply_port_mode(&self, port: &MidiPort) {
        let mode = port.mode();
        if let Some(mut entry) = self.ports.get_mut(&port.id()) {
            entry.mode = mode;
        }
    }

    fn is_raw(&self) -> bool {
        self.raw
    }

    fn readable_ports(&self) -> Vec<String> {
        self.readable.read().clone()
    }

    fn writable_ports(&self) -> Vec<String> {
        self.writable.read().clone()
    }

    fn subscribe_readable_port(&self, port: &MidiPort, endpoint: &str, subscribe: bool) {
        if let Some(mut entry) = self.ports.get_mut(&port.id()) {
            if subscribe {
                entry.readable.insert(endpoint.to_owned());
            } else {
                entry.readable.remove(endpoint);
            }
        }
    }

    fn subscribe_writable_port(&self, port: &MidiPort, endpoint: &str, subscribe: bool) {
        if let Some(mut entry) = self.ports.get_mut(&port.id()) {
            if subscribe {
                entry.writable.insert(endpoint.to_owned());
            } else {
                entry.writable.remove(endpoint);
            }
        }
    }

    #[inline]
    fn process_out_event(&self, event: &MidiEvent, time: Timestamp, origin: &MidiPort) {
        let _ = self.outbound_tx.try_send(OutboundEvent {
            port: origin.id(),
            event: *event,
            time,
        });
    }

    fn connect_readable_ports_changed(&self, port: PortId, callback: PortsChangedCallback) {
        if let Some(mut entry) = self.ports.get_mut(&port) {
            entry.on_readable_changed = Some(callback);
        }
    }

    fn connect_writable_ports_changed(&self, port: PortId, callback: PortsChangedCallback) {
        if let Some(mut entry) = self.ports.get_mut(&port) {
            entry.on_writable_changed = Some(callback);
        }
    }
}

impl std::fmt::Debug for VirtualClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualClient")
            .field("raw", &self.raw)
            .field("num_ports", &self.ports.len())
            .field("readable", &*self.readable.read())
            .field("writable", &*self.writable.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MidiEventProcessor;
    use parking_lot::Mutex;

    fn recording_port(
        client: &Arc<VirtualClient>,
        mode: PortMode,
    ) -> (Arc<MidiPort>, Arc<Mutex<Vec<MidiEvent>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        let sink: Arc<dyn MidiEventProcessor> =
            Arc::new(move |event: &MidiEvent, _: Timestamp| log.lock().push(*event));
        let port = MidiPort::builder("Rec", client.clone(), sink)
            .mode(mode)
            .build();
        (port, received)
    }

    #[test]
    fn test_deliver_reaches_subscribed_ports_only() {
        let client = Arc::new(VirtualClient::new());
        client.set_readable_ports(["Keys", "Pads"]);
        let (keys_port, keys_rx) = recording_port(&client, PortMode::Input);
        let (pads_port, pads_rx) = recording_port(&client, PortMode::Input);
        keys_port.subscribe_readable_port("Keys", true);
        pads_port.subscribe_readable_port("Pads", true);

        let offered = client.deliver("Keys", &MidiEvent::note_on(0, 60, 100), Timestamp::ZERO);

        assert_eq!(offered, 1);
        assert_eq!(keys_rx.lock().len(), 1);
        assert!(pads_rx.lock().is_empty());
    }

    #[test]
    fn test_vanished_endpoint_is_disconnected() {
        let client = Arc::new(VirtualClient::new());
        client.set_readable_ports(["Keys"]);
        let (port, _rx) = recording_port(&client, PortMode::Input);
        port.subscribe_readable_port("Keys", true);

        client.set_readable_ports(Vec::<String>::new());

        assert!(!client.is_readable_subscribed(port.id(), "Keys"));
        assert!(port.readable_ports().is_empty());
        assert_eq!(
            client.deliver("Keys", &MidiEvent::note_on(0, 60, 100), Timestamp::ZERO),
            0
        );
    }

    #[test]
    fn test_outbound_queue_is_bounded() {
        let client = Arc::new(VirtualClient::with_capacity(2));
        let (port, _rx) = recording_port(&client, PortMode::Output);
        for _ in 0..5 {
            port.process_out_event(&MidiEvent::note_on(1, 60, 100), Timestamp::ZERO);
        }
        assert_eq!(client.drain_output().len(), 2);
        assert!(client.drain_output().is_empty());
    }

    #[test]
    fn test_mode_is_pushed_to_client() {
        let client = Arc::new(VirtualClient::new());
        let (port, _rx) = recording_port(&client, PortMode::Input);
        assert_eq!(client.applied_mode(port.id()), Some(PortMode::Input));

        port.set_send_enabled(true);
        assert_eq!(client.applied_mode(port.id()), Some(PortMode::Duplex));
    }
}

//! Hardware transport: endpoint scanning, connections and event delivery via
//! a dedicated thread.
//!
//! midir connections are thread-affine on some backends, so a single worker
//! thread owns every connection. Ports talk to it through a bounded command
//! queue and never block on it. Between commands the worker rescans the
//! system's endpoints and pushes list changes to the registered ports.

use crate::client::{MidiClient, PortsChangedCallback};
use crate::error::{Error, Result};
use crate::mode::Direction;
use crate::port::{MidiPort, PortId};
use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use midir::{
    Ignore, MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use portamento_midi::{MidiEvent, Timestamp};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const DEFAULT_CLIENT_NAME: &str = "portamento";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configures and starts a [`MidirClient`].
#[derive(Debug, Clone)]
pub struct MidirClientBuilder {
    client_name: String,
    poll_interval: Duration,
    queue_capacity: usize,
}

impl MidirClientBuilder {
    pub fn new() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Name the client registers with the OS MIDI subsystem.
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// How often the endpoint lists are rescanned.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Capacity of the command queue. Outgoing events beyond it are dropped.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Spawn the worker and wait for its first endpoint scan.
    ///
    /// Fails when the OS MIDI subsystem cannot be opened.
    pub fn build(self) -> Result<MidirClient> {
        let (command_tx, command_rx) = bounded(self.queue_capacity);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let shared = Arc::new(Shared::new());

        let worker_shared = Arc::clone(&shared);
        let client_name = self.client_name.clone();
        let poll_interval = self.poll_interval;
        thread::Builder::new()
            .name("midi-client-thread".to_string())
            .spawn(move || match Worker::new(client_name, worker_shared) {
                Ok(mut worker) => {
                    worker.rescan();
                    let _ = ready_tx.send(Ok(()));
                    worker.run(command_rx, poll_interval);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| Error::MidiDevice(format!("Failed to spawn MIDI client thread: {}", e)))?;

        ready_rx.recv().map_err(|_| {
            Error::MidiDevice("MIDI client thread exited during startup".to_string())
        })??;

        debug!(
            "MIDI client '{}' started ({} readable, {} writable endpoints)",
            self.client_name,
            shared.readable.load().len(),
            shared.writable.load().len()
        );
        Ok(MidirClient {
            client_name: self.client_name,
            commands: command_tx,
            shared,
        })
    }
}

impl Default for MidirClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Registration {
    port: Weak<MidiPort>,
    name: String,
    on_readable_changed: Option<PortsChangedCallback>,
    on_writable_changed: Option<PortsChangedCallback>,
}

/// State read by ports and written by the worker.
struct Shared {
    readable: ArcSwap<Vec<String>>,
    writable: ArcSwap<Vec<String>>,
    ports: DashMap<PortId, Registration>,
}

impl Shared {
    fn new() -> Self {
        Self {
            readable: ArcSwap::from_pointee(Vec::new()),
            writable: ArcSwap::from_pointee(Vec::new()),
            ports: DashMap::new(),
        }
    }
}

enum Command {
    Subscribe {
        direction: Direction,
        port: PortId,
        port_name: String,
        endpoint: String,
        target: Weak<MidiPort>,
    },
    Unsubscribe {
        direction: Direction,
        port: PortId,
        endpoint: String,
    },
    Send {
        port: PortId,
        event: MidiEvent,
    },
    RemovePort(PortId),
    Shutdown,
}

/// Connects ports to the endpoints of the OS MIDI subsystem.
///
/// Readable endpoints are the system's MIDI inputs, writable endpoints its
/// MIDI outputs.
pub struct MidirClient {
    client_name: String,
    commands: Sender<Command>,
    shared: Arc<Shared>,
}

impl MidirClient {
    pub fn builder() -> MidirClientBuilder {
        MidirClientBuilder::new()
    }

    /// Start a client with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    fn command(&self, command: Command) {
        if let Err(e) = self.commands.try_send(command) {
            debug!("MIDI client command queue full or disconnected: {}", e);
        }
    }

    fn subscribe(&self, direction: Direction, port: &MidiPort, endpoint: &str, subscribe: bool) {
        let command = if subscribe {
            let Some((target, port_name)) = self
                .shared
                .ports
                .get(&port.id())
                .map(|entry| (entry.port.clone(), entry.name.clone()))
            else {
                warn!("MIDI port {} is not registered with this client", port.id());
                return;
            };
            Command::Subscribe {
                direction,
                port: port.id(),
                port_name,
                endpoint: endpoint.to_owned(),
                target,
            }
        } else {
            Command::Unsubscribe {
                direction,
                port: port.id(),
                endpoint: endpoint.to_owned(),
            }
        };
        self.command(command);
    }
}

impl MidiClient for MidirClient {
    fn add_port(&self, port: &Arc<MidiPort>) {
        self.shared.ports.insert(
            port.id(),
            Registration {
                port: Arc::downgrade(port),
                name: port.name(),
                on_readable_changed: None,
                on_writable_changed: None,
            },
        );
    }

    fn remove_port(&self, port: &MidiPort) {
        self.shared.ports.remove(&port.id());
        self.command(Command::RemovePort(port.id()));
    }

    /// Existing connections keep the name they were opened with.
    fn apply_port_name(&self, port: &MidiPort) {
        let name = port.name();
        if let Some(mut entry) = self.shared.ports.get_mut(&port.id()) {
            entry.name = name;
        }
    }

    fn is_raw(&self) -> bool {
        false
    }

    fn readable_ports(&self) -> Vec<String> {
        self.shared.readable.load().as_ref().clone()
    }

    fn writable_ports(&self) -> Vec<String> {
        self.shared.writable.load().as_ref().clone()
    }

    fn subscribe_readable_port(&self, port: &MidiPort, endpoint: &str, subscribe: bool) {
        self.subscribe(Direction::Input, port, endpoint, subscribe);
    }

    fn subscribe_writable_port(&self, port: &MidiPort, endpoint: &str, subscribe: bool) {
        self.subscribe(Direction::Output, port, endpoint, subscribe);
    }

    /// Encoding happens on the worker. A full queue drops the event.
    #[inline]
    fn process_out_event(&self, event: &MidiEvent, _time: Timestamp, origin: &MidiPort) {
        let _ = self.commands.try_send(Command::Send {
            port: origin.id(),
            event: *event,
        });
    }

    fn connect_readable_ports_changed(&self, port: PortId, callback: PortsChangedCallback) {
        if let Some(mut entry) = self.shared.ports.get_mut(&port) {
            entry.on_readable_changed = Some(callback);
        }
    }

    fn connect_writable_ports_changed(&self, port: PortId, callback: PortsChangedCallback) {
        if let Some(mut entry) = self.shared.ports.get_mut(&port) {
            entry.on_writable_changed = Some(callback);
        }
    }
}

impl Drop for MidirClient {
    fn drop(&mut self) {
        let _ = self.commands.try_send(Command::Shutdown);
    }
}

impl std::fmt::Debug for MidirClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidirClient")
            .field("client_name", &self.client_name)
            .field("num_ports", &self.shared.ports.len())
            .field("readable", &*self.shared.readable.load())
            .field("writable", &*self.shared.writable.load())
            .finish()
    }
}

/// Owns the midir handles. Lives on the worker thread only.
struct Worker {
    client_name: String,
    shared: Arc<Shared>,
    scan_in: MidiInput,
    scan_out: MidiOutput,
    inputs: HashMap<(PortId, String), MidiInputConnection<()>>,
    outputs: HashMap<(PortId, String), MidiOutputConnection>,
    last_scan: Instant,
}

impl Worker {
    fn new(client_name: String, shared: Arc<Shared>) -> Result<Self> {
        let scan_in = MidiInput::new(&format!("{}-scan", client_name))?;
        let scan_out = MidiOutput::new(&format!("{}-scan", client_name))?;
        Ok(Self {
            client_name,
            shared,
            scan_in,
            scan_out,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            last_scan: Instant::now(),
        })
    }

    fn run(mut self, commands: Receiver<Command>, poll_interval: Duration) {
        loop {
            match commands.recv_timeout(poll_interval) {
                Ok(Command::Subscribe {
                    direction: Direction::Input,
                    port,
                    port_name,
                    endpoint,
                    target,
                }) => self.connect_input(port, &port_name, endpoint, target),
                Ok(Command::Subscribe {
                    direction: Direction::Output,
                    port,
                    port_name,
                    endpoint,
                    ..
                }) => self.connect_output(port, &port_name, endpoint),
                Ok(Command::Unsubscribe {
                    direction,
                    port,
                    endpoint,
                }) => self.disconnect(direction, port, endpoint),
                Ok(Command::Send { port, event }) => self.send(port, &event),
                Ok(Command::RemovePort(port)) => {
                    self.inputs.retain(|(id, _), _| *id != port);
                    self.outputs.retain(|(id, _), _| *id != port);
                }
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            // Busy queues must not starve discovery
            if self.last_scan.elapsed() >= poll_interval {
                self.rescan();
            }
        }
        debug!("MIDI client '{}' worker stopped", self.client_name);
    }

    fn rescan(&mut self) {
        self.last_scan = Instant::now();
        let readable = self.endpoint_names(Direction::Input);
        let writable = self.endpoint_names(Direction::Output);

        let readable_changed = **self.shared.readable.load() != readable;
        let writable_changed = **self.shared.writable.load() != writable;
        if !readable_changed && !writable_changed {
            return;
        }

        if readable_changed {
            self.inputs.retain(|(_, endpoint), _| readable.contains(endpoint));
            debug!("Readable MIDI endpoints changed: {:?}", readable);
            self.shared.readable.store(Arc::new(readable));
        }
        if writable_changed {
            self.outputs.retain(|(_, endpoint), _| writable.contains(endpoint));
            debug!("Writable MIDI endpoints changed: {:?}", writable);
            self.shared.writable.store(Arc::new(writable));
        }

        let mut callbacks: SmallVec<[PortsChangedCallback; 8]> = SmallVec::new();
        for entry in self.shared.ports.iter() {
            if readable_changed {
                callbacks.extend(entry.on_readable_changed.clone());
            }
            if writable_changed {
                callbacks.extend(entry.on_writable_changed.clone());
            }
        }
        for callback in callbacks {
            callback();
        }
    }

    /// Our own connection ports show up in the scan on some backends.
    fn endpoint_names(&self, direction: Direction) -> Vec<String> {
        let names: Vec<String> = match direction {
            Direction::Input => self
                .scan_in
                .ports()
                .iter()
                .filter_map(|p| self.scan_in.port_name(p).ok())
                .collect(),
            Direction::Output => self
                .scan_out
                .ports()
                .iter()
                .filter_map(|p| self.scan_out.port_name(p).ok())
                .collect(),
        };
        names
            .into_iter()
            .filter(|name| !name.starts_with(&self.client_name))
            .collect()
    }

    fn find_input(&self, endpoint: &str) -> Option<MidiInputPort> {
        self.scan_in
            .ports()
            .into_iter()
            .find(|p| self.scan_in.port_name(p).is_ok_and(|name| name == endpoint))
    }

    fn find_output(&self, endpoint: &str) -> Option<MidiOutputPort> {
        self.scan_out
            .ports()
            .into_iter()
            .find(|p| self.scan_out.port_name(p).is_ok_and(|name| name == endpoint))
    }

    fn connect_input(
        &mut self,
        port: PortId,
        port_name: &str,
        endpoint: String,
        target: Weak<MidiPort>,
    ) {
        let key = (port, endpoint);
        if self.inputs.contains_key(&key) {
            return;
        }
        let Some(device) = self.find_input(&key.1) else {
            warn!("Readable MIDI endpoint '{}' not found", key.1);
            return;
        };
        let mut midi_in = match MidiInput::new(&self.client_name) {
            Ok(midi_in) => midi_in,
            Err(e) => {
                warn!("Failed to open MIDI input: {}", e);
                return;
            }
        };
        midi_in.ignore(Ignore::All);

        let result = midi_in.connect(
            &device,
            port_name,
            move |stamp, bytes, _| {
                let Some(port) = target.upgrade() else {
                    return;
                };
                match MidiEvent::from_bytes(bytes) {
                    Ok(event) => port.process_in_event(&event, Timestamp::from_raw(stamp)),
                    Err(e) => trace!("Ignoring incoming MIDI message: {}", e),
                }
            },
            (),
        );
        match result {
            Ok(connection) => {
                debug!("MIDI port {} connected to readable endpoint '{}'", port, key.1);
                self.inputs.insert(key, connection);
            }
            Err(e) => warn!("Failed to connect to '{}': {}", key.1, Error::from(e)),
        }
    }

    fn connect_output(&mut self, port: PortId, port_name: &str, endpoint: String) {
        let key = (port, endpoint);
        if self.outputs.contains_key(&key) {
            return;
        }
        let Some(device) = self.find_output(&key.1) else {
            warn!("Writable MIDI endpoint '{}' not found", key.1);
            return;
        };
        let midi_out = match MidiOutput::new(&self.client_name) {
            Ok(midi_out) => midi_out,
            Err(e) => {
                warn!("Failed to open MIDI output: {}", e);
                return;
            }
        };
        match midi_out.connect(&device, port_name) {
            Ok(connection) => {
                debug!("MIDI port {} connected to writable endpoint '{}'", port, key.1);
                self.outputs.insert(key, connection);
            }
            Err(e) => warn!("Failed to connect to '{}': {}", key.1, Error::from(e)),
        }
    }

    fn disconnect(&mut self, direction: Direction, port: PortId, endpoint: String) {
        let key = (port, endpoint);
        let removed = match direction {
            Direction::Input => self.inputs.remove(&key).is_some(),
            Direction::Output => self.outputs.remove(&key).is_some(),
        };
        if removed {
            debug!("MIDI port {} disconnected from '{}'", port, key.1);
        }
    }

    fn send(&mut self, port: PortId, event: &MidiEvent) {
        let bytes = event.to_bytes();
        let connections = self
            .outputs
            .iter_mut()
            .filter(|((id, _), _)| *id == port);
        for ((_, endpoint), connection) in connections {
            if let Err(e) = connection.send(&bytes) {
                warn!("Failed to send MIDI to '{}': {}", endpoint, e);
            }
        }
    }
}

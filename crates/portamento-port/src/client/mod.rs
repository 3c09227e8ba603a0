//! Transport clients.
//!
//! A client is the shared connection to a MIDI subsystem. Every port is bound
//! to exactly one client and calls into it for registration, endpoint lists,
//! (un)subscription and outgoing events. Clients serialize their own work;
//! ports never hold a lock while calling them.

mod null;
mod virtual_client;

pub use null::NullClient;
pub use virtual_client::{OutboundEvent, VirtualClient};

use crate::port::{MidiPort, PortId};
use portamento_midi::{MidiEvent, Timestamp};
use std::sync::Arc;

/// Invoked by a client when its list of readable or writable endpoints changed.
pub type PortsChangedCallback = Arc<dyn Fn() + Send + Sync>;

pub trait MidiClient: Send + Sync {
    fn add_port(&self, port: &Arc<MidiPort>);

    fn remove_port(&self, port: &MidiPort);

    fn apply_port_name(&self, _port: &MidiPort) {}

    fn apply_port_mode(&self, _port: &MidiPort) {}

    /// Raw clients have no endpoint discovery; ports bound to them skip
    /// subscription management entirely.
    fn is_raw(&self) -> bool;

    fn readable_ports(&self) -> Vec<String>;

    fn writable_ports(&self) -> Vec<String>;

    /// Redundant requests must be tolerated.
    fn subscribe_readable_port(&self, port: &MidiPort, endpoint: &str, subscribe: bool);

    /// Redundant requests must be tolerated.
    fn subscribe_writable_port(&self, port: &MidiPort, endpoint: &str, subscribe: bool);

    /// Called on the event path with a 0-based channel.
    fn process_out_event(&self, event: &MidiEvent, time: Timestamp, origin: &MidiPort);

    fn connect_readable_ports_changed(&self, _port: PortId, _callback: PortsChangedCallback) {}

    fn connect_writable_ports_changed(&self, _port: PortId, _callback: PortsChangedCallback) {}
}

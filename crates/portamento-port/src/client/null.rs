//! Raw client without endpoints.

use super::MidiClient;
use crate::port::MidiPort;
use portamento_midi::{MidiEvent, Timestamp};
use std::sync::Arc;

/// Accepts every request and discards it. Ports bound to a `NullClient` only
/// relay input to their sink; output goes nowhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClient;

impl MidiClient for NullClient {
    fn add_port(&self, port: &Arc<MidiPort>) {
        tracing::trace!("Null client ignoring port {}", port.id());
    }

    fn remove_port(&self, _port: &MidiPort) {}

    fn is_raw(&self) -> bool {
        true
    }

    fn readable_ports(&self) -> Vec<String> {
        Vec::new()
    }

    fn writable_ports(&self) -> Vec<String> {
        Vec::new()
    }

    fn subscribe_readable_port(&self, _port: &MidiPort, _endpoint: &str, _subscribe: bool) {}

    fn subscribe_writable_port(&self, _port: &MidiPort, _endpoint: &str, _subscribe: bool) {}

    #[inline]
    fn process_out_event(&self, _event: &MidiEvent, _time: Timestamp, _origin: &MidiPort) {}
}

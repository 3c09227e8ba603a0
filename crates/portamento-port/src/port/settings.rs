//! Persisted port state.
//!
//! The field names are the on-disk keys. Endpoint lists are only written for
//! enabled directions, as comma-joined names.

use super::MidiPort;
use crate::mode::Direction;
use crate::notify::PortNotification;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSettings {
    #[serde(rename = "inputchannel")]
    pub input_channel: i32,
    #[serde(rename = "outputchannel")]
    pub output_channel: i32,
    #[serde(rename = "inputcontroller")]
    pub input_controller: i32,
    #[serde(rename = "outputcontroller")]
    pub output_controller: i32,
    #[serde(rename = "fixedinputvelocity")]
    pub fixed_input_velocity: i32,
    #[serde(rename = "fixedoutputvelocity")]
    pub fixed_output_velocity: i32,
    #[serde(rename = "outputprogram")]
    pub output_program: i32,
    pub readable: bool,
    pub writable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outports: Option<String>,
}

impl PortSettings {
    pub fn endpoints(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Input => self.inports.as_deref(),
            Direction::Output => self.outports.as_deref(),
        }
    }
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            input_channel: 0,
            output_channel: 1,
            input_controller: 0,
            output_controller: 0,
            fixed_input_velocity: -1,
            fixed_output_velocity: -1,
            output_program: 1,
            readable: false,
            writable: false,
            inports: None,
            outports: None,
        }
    }
}

impl MidiPort {
    pub fn save_settings(&self) -> PortSettings {
        let joined = |direction: Direction| {
            self.is_enabled(direction)
                .then(|| self.table(direction).lock().subscribed().join(","))
        };

        PortSettings {
            input_channel: self.input_channel(),
            output_channel: self.output_channel(),
            input_controller: self.input_controller(),
            output_controller: self.output_controller(),
            fixed_input_velocity: self.fixed_input_velocity(),
            fixed_output_velocity: self.fixed_output_velocity(),
            output_program: self.output_program(),
            readable: self.input_enabled(),
            writable: self.output_enabled(),
            inports: joined(Direction::Input),
            outports: joined(Direction::Output),
        }
    }

    /// Apply stored settings, then bring each enabled direction's live
    /// subscriptions in line with the stored endpoint list.
    ///
    /// Stored endpoints the client does not currently offer are ignored.
    pub fn load_settings(&self, settings: &PortSettings) {
        let _config = self.config.lock();
        self.set_input_channel(settings.input_channel);
        self.set_output_channel(settings.output_channel);
        self.set_input_controller(settings.input_controller);
        self.set_output_controller(settings.output_controller);
        self.set_fixed_input_velocity(settings.fixed_input_velocity);
        self.set_fixed_output_velocity(settings.fixed_output_velocity);
        self.set_output_program(settings.output_program);
        self.set_receive_enabled(settings.readable);
        self.set_send_enabled(settings.writable);

        for direction in Direction::ALL {
            if self.is_enabled(direction) {
                self.restore_subscriptions(direction, settings.endpoints(direction).unwrap_or(""));
            }
        }
    }

    fn restore_subscriptions(&self, direction: Direction, stored: &str) {
        let wanted: SmallVec<[&str; 8]> = stored.split(',').filter(|s| !s.is_empty()).collect();

        let changes: SmallVec<[(String, bool); 8]> = self
            .table(direction)
            .lock()
            .iter()
            .filter_map(|(name, subscribed)| {
                let stored = wanted.contains(&name);
                (stored != subscribed).then(|| (name.to_owned(), stored))
            })
            .collect();

        debug!(
            "MIDI port {} restoring {} {:?} subscription(s)",
            self.id,
            changes.len(),
            direction
        );
        for (endpoint, subscribe) in changes {
            self.subscribe_port(direction, &endpoint, subscribe);
        }
        self.notifier.emit(PortNotification::ports_changed(direction));
    }
}

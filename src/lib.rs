//! # Portamento - MIDI Ports
//!
//! The port layer between a MIDI transport and an instrument or engine.
//!
//! ## Architecture
//!
//! Portamento is an umbrella crate that coordinates:
//! - **portamento-midi** - MIDI value types (events, timestamps, bounded settings, wire bytes)
//! - **portamento-port** - Ports, mode state machine, endpoint subscriptions, transports
//!
//! ## Quick Start
//!
//! ```ignore
//! use portamento::prelude::*;
//!
//! let client = Arc::new(VirtualClient::new());
//! client.set_readable_ports(["Keyboard"]);
//!
//! let port = MidiPort::builder("Piano", client.clone(), sink)
//!     .mode(PortMode::Input)
//!     .build();
//! port.subscribe_readable_port("Keyboard", true);
//! port.set_input_channel(1);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Everything enabled
//! - `midi-hardware` - `MidirClient`, the OS MIDI transport

/// Re-export of portamento-midi for direct access
pub use portamento_midi as midi;

/// Re-export of portamento-port for direct access
pub use portamento_port as port;

// MIDI values
pub use portamento_midi::{
    IntModel, MidiEvent, MidiEventKind, Timestamp, CHANNEL_COUNT, CONTROLLER_COUNT, MAX_VELOCITY,
    NUM_KEYS, PROGRAM_COUNT,
};

// Ports
pub use portamento_port::{
    ChannelSink, Direction, ListenerId, MidiClient, MidiEventProcessor, MidiPort, MidiPortBuilder,
    NoProject, NullClient, OutboundEvent, PortId, PortMode, PortNotification, PortSettings,
    PortsChangedCallback, ProjectHandle, SubscriptionTable, VirtualClient,
};

#[cfg(feature = "midi-hardware")]
pub use portamento_port::{MidirClient, MidirClientBuilder};

pub mod error;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use std::sync::Arc;

    // Ports
    pub use crate::{Direction, MidiPort, MidiPortBuilder, PortMode, PortSettings};

    // Collaborators
    pub use crate::{ChannelSink, MidiEventProcessor, ProjectHandle};

    // Transports
    pub use crate::{MidiClient, NullClient, VirtualClient};

    #[cfg(feature = "midi-hardware")]
    pub use crate::MidirClient;

    // Events
    pub use crate::{MidiEvent, MidiEventKind, Timestamp};
}

//! MIDI port core for Portamento.
//!
//! A [`MidiPort`] sits between a MIDI transport and an instrument or engine:
//! it filters and transforms events in both directions, derives its mode from
//! two enable flags, and tracks which external endpoints it is subscribed to.
//!
//! Transports implement [`MidiClient`]. Three are provided: [`NullClient`],
//! the in-process [`VirtualClient`], and the hardware `MidirClient` behind
//! the `midi-io` feature.

pub mod error;
pub use error::{Error, Result};

pub mod mode;
pub use mode::{Direction, PortMode};

pub mod subscription;
pub use subscription::SubscriptionTable;

pub mod sink;
pub use sink::{ChannelSink, MidiEventProcessor, NoProject, ProjectHandle};

pub(crate) mod notify;
pub use notify::{ListenerId, PortNotification};

pub mod client;
pub use client::{MidiClient, NullClient, OutboundEvent, PortsChangedCallback, VirtualClient};

pub(crate) mod port;
pub use port::{MidiPort, MidiPortBuilder, PortId, PortSettings};

#[cfg(feature = "midi-io")]
pub(crate) mod io;

#[cfg(feature = "midi-io")]
pub use io::{MidirClient, MidirClientBuilder};

pub use portamento_midi::{MidiEvent, MidiEventKind, Timestamp};

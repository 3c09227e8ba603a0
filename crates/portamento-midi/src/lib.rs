//! MIDI value types for Portamento ports.
//!
//! Provides the `MidiEvent` that flows through ports, the opaque `Timestamp`
//! that accompanies it, the bounded `IntModel` used for port settings, and
//! conversion to and from wire bytes via `midi-msg`.

pub mod error;
pub use error::{Error, Result};

pub(crate) mod event;
pub use event::{
    MidiEvent, MidiEventKind, Timestamp, CHANNEL_COUNT, CONTROLLER_COUNT, MAX_VELOCITY, NUM_KEYS,
    PROGRAM_COUNT,
};

pub(crate) mod model;
pub use model::IntModel;

pub(crate) mod wire;

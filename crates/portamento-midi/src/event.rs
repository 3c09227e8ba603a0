//! RT-safe MIDI event type as seen by ports.
//!
//! Events are small `Copy` values. Channel numbering depends on which side of a
//! port the event is on: the transport side uses 0..15, the engine side of an
//! output port uses 1..16.

use serde::{Deserialize, Serialize};

/// Number of addressable keys. Note-class events outside `0..NUM_KEYS` are invalid.
pub const NUM_KEYS: i16 = 128;

pub const CHANNEL_COUNT: i32 = 16;

pub const CONTROLLER_COUNT: i32 = 127;

pub const MAX_VELOCITY: i32 = 127;

pub const PROGRAM_COUNT: i32 = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MidiEventKind {
    NoteOff,
    NoteOn,
    KeyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
}

impl MidiEventKind {
    /// NoteOn, NoteOff and KeyPressure carry a key and a velocity.
    #[inline]
    pub fn is_note(self) -> bool {
        matches!(
            self,
            MidiEventKind::NoteOn | MidiEventKind::NoteOff | MidiEventKind::KeyPressure
        )
    }
}

/// Opaque scheduling token carried alongside an event.
///
/// Ports never interpret it; it is handed on exactly as received.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A single channel message.
///
/// `params[0]` holds the key, controller, program or pressure; `params[1]`
/// holds the velocity, controller value or key pressure. Pitch bend stores its
/// 14-bit value in `params[0]`. The fields are signed so that out-of-range data
/// coming from the engine stays representable until a port rejects it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiEvent {
    pub kind: MidiEventKind,
    pub channel: u8,
    params: [i16; 2],
}

impl MidiEvent {
    #[inline]
    pub fn new(kind: MidiEventKind, channel: u8, param0: i16, param1: i16) -> Self {
        Self {
            kind,
            channel,
            params: [param0, param1],
        }
    }

    #[inline]
    pub fn note_on(channel: u8, key: i16, velocity: i16) -> Self {
        Self::new(MidiEventKind::NoteOn, channel, key, velocity)
    }

    #[inline]
    pub fn note_off(channel: u8, key: i16, velocity: i16) -> Self {
        Self::new(MidiEventKind::NoteOff, channel, key, velocity)
    }

    #[inline]
    pub fn key_pressure(channel: u8, key: i16, pressure: i16) -> Self {
        Self::new(MidiEventKind::KeyPressure, channel, key, pressure)
    }

    #[inline]
    pub fn control_change(channel: u8, controller: i16, value: i16) -> Self {
        Self::new(MidiEventKind::ControlChange, channel, controller, value)
    }

    #[inline]
    pub fn program_change(channel: u8, program: i16) -> Self {
        Self::new(MidiEventKind::ProgramChange, channel, program, 0)
    }

    #[inline]
    pub fn channel_pressure(channel: u8, pressure: i16) -> Self {
        Self::new(MidiEventKind::ChannelPressure, channel, pressure, 0)
    }

    /// `bend`: unsigned 14-bit, 8192 = center.
    #[inline]
    pub fn pitch_bend(channel: u8, bend: u16) -> Self {
        Self::new(MidiEventKind::PitchBend, channel, bend.min(0x3FFF) as i16, 0)
    }

    #[inline]
    pub fn key(&self) -> i16 {
        self.params[0]
    }

    #[inline]
    pub fn has_valid_key(&self) -> bool {
        (0..NUM_KEYS).contains(&self.key())
    }

    /// Velocity of a note-class event (pressure for KeyPressure), 0 otherwise.
    #[inline]
    pub fn velocity(&self) -> i16 {
        if self.kind.is_note() {
            self.params[1]
        } else {
            0
        }
    }

    /// No-op for events without a velocity.
    #[inline]
    pub fn set_velocity(&mut self, velocity: i16) {
        if self.kind.is_note() {
            self.params[1] = velocity;
        }
    }

    #[inline]
    pub fn controller(&self) -> i16 {
        self.params[0]
    }

    #[inline]
    pub fn controller_value(&self) -> i16 {
        self.params[1]
    }

    #[inline]
    pub fn program(&self) -> i16 {
        self.params[0]
    }

    #[inline]
    pub fn pressure(&self) -> i16 {
        match self.kind {
            MidiEventKind::KeyPressure => self.params[1],
            _ => self.params[0],
        }
    }

    #[inline]
    pub fn bend(&self) -> u16 {
        self.params[0].clamp(0, 0x3FFF) as u16
    }

    #[inline]
    pub fn params(&self) -> [i16; 2] {
        self.params
    }
}

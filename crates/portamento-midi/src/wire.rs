//! Conversion between [`MidiEvent`] and raw MIDI bytes.
//!
//! Only the transport side of a port talks bytes, so channels here are always
//! 0-based. Values are clamped to 7 bits on the way out.

use crate::error::{Error, Result};
use crate::event::{MidiEvent, MidiEventKind};
use midi_msg::{Channel, ChannelVoiceMsg, ControlChange, MidiMsg};

#[inline]
fn data_byte(value: i16) -> u8 {
    value.clamp(0, 127) as u8
}

impl MidiEvent {
    fn to_midi_msg(&self) -> MidiMsg {
        let channel = Channel::from_u8(self.channel.min(15));
        let [p0, p1] = self.params();
        let msg = match self.kind {
            MidiEventKind::NoteOn => ChannelVoiceMsg::NoteOn {
                note: data_byte(p0),
                velocity: data_byte(p1),
            },
            MidiEventKind::NoteOff => ChannelVoiceMsg::NoteOff {
                note: data_byte(p0),
                velocity: data_byte(p1),
            },
            MidiEventKind::KeyPressure => ChannelVoiceMsg::PolyPressure {
                note: data_byte(p0),
                pressure: data_byte(p1),
            },
            MidiEventKind::ControlChange => ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC {
                    control: data_byte(p0),
                    value: data_byte(p1),
                },
            },
            MidiEventKind::ProgramChange => ChannelVoiceMsg::ProgramChange {
                program: data_byte(p0),
            },
            MidiEventKind::ChannelPressure => ChannelVoiceMsg::ChannelPressure {
                pressure: data_byte(p0),
            },
            MidiEventKind::PitchBend => ChannelVoiceMsg::PitchBend { bend: self.bend() },
        };
        MidiMsg::ChannelVoice { channel, msg }
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_midi_msg().to_midi()
    }

    /// Parse one channel message. Controller messages are read straight from
    /// the data bytes so that named controllers and channel-mode messages keep
    /// their raw number.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (msg, _len) = MidiMsg::from_midi(bytes)?;
        let raw_cc = || {
            let controller = bytes.get(1).copied().unwrap_or(0) & 0x7F;
            let value = bytes.get(2).copied().unwrap_or(0) & 0x7F;
            (controller as i16, value as i16)
        };
        match msg {
            MidiMsg::ChannelVoice { channel, msg } => {
                let channel = channel as u8;
                let event = match msg {
                    ChannelVoiceMsg::NoteOn { note, velocity } => {
                        MidiEvent::note_on(channel, note as i16, velocity as i16)
                    }
                    ChannelVoiceMsg::NoteOff { note, velocity } => {
                        MidiEvent::note_off(channel, note as i16, velocity as i16)
                    }
                    ChannelVoiceMsg::HighResNoteOn { note, velocity } => {
                        MidiEvent::note_on(channel, note as i16, (velocity >> 7) as i16)
                    }
                    ChannelVoiceMsg::HighResNoteOff { note, velocity } => {
                        MidiEvent::note_off(channel, note as i16, (velocity >> 7) as i16)
                    }
                    ChannelVoiceMsg::PolyPressure { note, pressure } => {
                        MidiEvent::key_pressure(channel, note as i16, pressure as i16)
                    }
                    ChannelVoiceMsg::ControlChange { .. } => {
                        let (controller, value) = raw_cc();
                        MidiEvent::control_change(channel, controller, value)
                    }
                    ChannelVoiceMsg::ProgramChange { program } => {
                        MidiEvent::program_change(channel, program as i16)
                    }
                    ChannelVoiceMsg::ChannelPressure { pressure } => {
                        MidiEvent::channel_pressure(channel, pressure as i16)
                    }
                    ChannelVoiceMsg::PitchBend { bend } => MidiEvent::pitch_bend(channel, bend),
                };
                Ok(event)
            }
            MidiMsg::ChannelMode { channel, .. } => {
                let (controller, value) = raw_cc();
                Ok(MidiEvent::control_change(channel as u8, controller, value))
            }
            _ => Err(Error::UnsupportedMessage("expected a channel message")),
        }
    }
}

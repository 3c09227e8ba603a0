//! Per-event filtering and transformation.
//!
//! RT-safe: atomics only, no locks, no allocation. Rejected events are dropped
//! silently. Events are forwarded in the order they are passed in.

use super::MidiPort;
use portamento_midi::{MidiEvent, MidiEventKind, Timestamp};

impl MidiPort {
    /// Filter an event arriving from the transport and hand it to the sink.
    ///
    /// The channel is 0-based and is forwarded unchanged.
    pub fn process_in_event(&self, event: &MidiEvent, time: Timestamp) {
        if !self.input_enabled() {
            return;
        }

        let input_channel = self.input_channel();
        if input_channel != 0 && input_channel - 1 != i32::from(event.channel) {
            return;
        }

        if event.kind.is_note() && !event.has_valid_key() {
            return;
        }

        let mut ev = *event;
        let fixed = self.fixed_input_velocity();
        // Zero velocity means note-off and is never rewritten
        if fixed >= 0 && event.velocity() > 0 {
            ev.set_velocity(fixed as i16);
        }
        self.sink.process_in_event(&ev, time);
    }

    /// Filter an event from the engine and send it through the client.
    ///
    /// The incoming channel is 1-based; the client receives it 0-based.
    pub fn process_out_event(&self, event: &MidiEvent, time: Timestamp) {
        if !self.output_enabled() || self.output_channel() != i32::from(event.channel) {
            return;
        }

        let mut ev = *event;
        if ev.channel > 0 {
            ev.channel -= 1;
        }

        let fixed = self.fixed_output_velocity();
        if fixed >= 0
            && event.velocity() > 0
            && matches!(
                event.kind,
                MidiEventKind::NoteOn | MidiEventKind::KeyPressure
            )
        {
            ev.set_velocity(fixed as i16);
        }
        self.client.process_out_event(&ev, time, self);
    }

    /// Send the configured program on the output channel.
    pub fn notify_output_program_changed(&self) {
        let channel = self.output_channel().clamp(0, u8::MAX as i32) as u8;
        let program = (self.output_program() - 1) as i16;
        self.process_out_event(
            &MidiEvent::program_change(channel, program),
            Timestamp::ZERO,
        );
    }
}

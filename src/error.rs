//! Centralized error type for the portamento umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI: {0}")]
    Midi(#[from] portamento_midi::Error),

    #[error("Port: {0}")]
    Port(#[from] portamento_port::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use portamento_midi::MidiEvent;

    fn parse(bytes: &[u8]) -> Result<MidiEvent> {
        Ok(MidiEvent::from_bytes(bytes)?)
    }

    #[test]
    fn test_subsystem_errors_propagate() {
        assert!(matches!(parse(&[0xF8]), Err(Error::Midi(_))));

        let err: Error = portamento_port::Error::MidiDevice("no backend".into()).into();
        assert_eq!(err.to_string(), "Port: MIDI device error: no backend");
    }
}

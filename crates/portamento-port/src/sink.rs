//! Collaborators a port calls back into: the event sink that receives
//! filtered input and the owning project that is told about modifications.

use crossbeam_channel::Sender;
use portamento_midi::{MidiEvent, Timestamp};

/// Receives input events that passed a port's filters.
///
/// Called on the event path. Implementations must not block.
pub trait MidiEventProcessor: Send + Sync {
    fn process_in_event(&self, event: &MidiEvent, time: Timestamp);
}

impl<F> MidiEventProcessor for F
where
    F: Fn(&MidiEvent, Timestamp) + Send + Sync,
{
    #[inline]
    fn process_in_event(&self, event: &MidiEvent, time: Timestamp) {
        self(event, time)
    }
}

/// Hands input events to another thread. A full channel drops the event.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub Sender<(MidiEvent, Timestamp)>);

impl MidiEventProcessor for ChannelSink {
    #[inline]
    fn process_in_event(&self, event: &MidiEvent, time: Timestamp) {
        let _ = self.0.try_send((*event, time));
    }
}

/// The document that owns a port. Notified after configuration changes so it
/// can be marked dirty.
pub trait ProjectHandle: Send + Sync {
    fn set_modified(&self);
}

impl<F> ProjectHandle for F
where
    F: Fn() + Send + Sync,
{
    #[inline]
    fn set_modified(&self) {
        self()
    }
}

/// Project handle for ports that are not part of a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProject;

impl ProjectHandle for NoProject {
    #[inline]
    fn set_modified(&self) {}
}

//! Builder for configuring and constructing a `MidiPort`.

use super::MidiPort;
use crate::client::MidiClient;
use crate::mode::PortMode;
use crate::sink::{MidiEventProcessor, NoProject, ProjectHandle};
use std::sync::Arc;

/// The port registers itself with its client when built and, for clients with
/// endpoint discovery, pulls the current endpoint lists and follows changes.
///
/// # Example
///
/// ```ignore
/// let port = MidiPort::builder("Piano", client, sink)
///     .mode(PortMode::Duplex)
///     .project(project)
///     .build();
/// ```
pub struct MidiPortBuilder {
    name: String,
    client: Arc<dyn MidiClient>,
    sink: Arc<dyn MidiEventProcessor>,
    project: Arc<dyn ProjectHandle>,
    mode: PortMode,
}

impl MidiPortBuilder {
    pub fn new(
        name: impl Into<String>,
        client: Arc<dyn MidiClient>,
        sink: Arc<dyn MidiEventProcessor>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            sink,
            project: Arc::new(NoProject),
            mode: PortMode::Disabled,
        }
    }

    pub fn mode(mut self, mode: PortMode) -> Self {
        self.mode = mode;
        self
    }

    /// Told about every configuration change.
    pub fn project(mut self, project: Arc<dyn ProjectHandle>) -> Self {
        self.project = project;
        self
    }

    pub fn build(self) -> Arc<MidiPort> {
        let port = Arc::new(MidiPort::new(
            self.name,
            self.client,
            self.sink,
            self.project,
            self.mode,
        ));
        port.attach();
        port
    }
}

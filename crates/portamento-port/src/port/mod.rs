//! The MIDI port aggregate.
//!
//! A [`MidiPort`] is one logical input/output point. It owns its settings and
//! the two subscription tables, and is shared as `Arc<MidiPort>` between the
//! engine, the transport client and the configuration code.
//!
//! Two call paths touch a port:
//! - the event path ([`MidiPort::process_in_event`], [`MidiPort::process_out_event`])
//!   reads enable flags and settings from atomics and never locks;
//! - the configuration path (flags, subscriptions, endpoint refresh, settings)
//!   runs under a per-port reentrant guard, so transitions from different
//!   threads never interleave. Table locks are short and always released
//!   before calling the client, the project or an observer.

mod builder;
mod processor;
mod settings;

pub use builder::MidiPortBuilder;
pub use settings::PortSettings;

use crate::client::MidiClient;
use crate::mode::{Direction, PortMode};
use crate::notify::{ListenerId, Notifier, PortNotification};
use crate::sink::{MidiEventProcessor, ProjectHandle};
use crate::subscription::SubscriptionTable;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use portamento_midi::{IntModel, CHANNEL_COUNT, CONTROLLER_COUNT, MAX_VELOCITY, PROGRAM_COUNT};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

static NEXT_PORT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a port, used by clients to key their state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(u64);

impl PortId {
    fn next() -> Self {
        Self(NEXT_PORT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct MidiPort {
    id: PortId,
    name: RwLock<String>,
    client: Arc<dyn MidiClient>,
    sink: Arc<dyn MidiEventProcessor>,
    project: Arc<dyn ProjectHandle>,

    receive_enabled: AtomicBool,
    send_enabled: AtomicBool,

    input_channel: IntModel,
    output_channel: IntModel,
    input_controller: IntModel,
    output_controller: IntModel,
    fixed_input_velocity: IntModel,
    fixed_output_velocity: IntModel,
    output_program: IntModel,

    readable_ports: Mutex<SubscriptionTable>,
    writable_ports: Mutex<SubscriptionTable>,
    config: ReentrantMutex<()>,

    notifier: Notifier,
}

impl MidiPort {
    pub fn builder(
        name: impl Into<String>,
        client: Arc<dyn MidiClient>,
        sink: Arc<dyn MidiEventProcessor>,
    ) -> MidiPortBuilder {
        MidiPortBuilder::new(name, client, sink)
    }

    fn new(
        name: String,
        client: Arc<dyn MidiClient>,
        sink: Arc<dyn MidiEventProcessor>,
        project: Arc<dyn ProjectHandle>,
        mode: PortMode,
    ) -> Self {
        Self {
            id: PortId::next(),
            name: RwLock::new(name),
            client,
            sink,
            project,
            receive_enabled: AtomicBool::new(mode.input_enabled()),
            send_enabled: AtomicBool::new(mode.output_enabled()),
            input_channel: IntModel::new(0, 0, CHANNEL_COUNT),
            output_channel: IntModel::new(1, 1, CHANNEL_COUNT),
            input_controller: IntModel::new(0, 0, CONTROLLER_COUNT),
            output_controller: IntModel::new(0, 0, CONTROLLER_COUNT),
            fixed_input_velocity: IntModel::new(-1, -1, MAX_VELOCITY),
            fixed_output_velocity: IntModel::new(-1, -1, MAX_VELOCITY),
            output_program: IntModel::new(1, 1, PROGRAM_COUNT),
            readable_ports: Mutex::new(SubscriptionTable::new()),
            writable_ports: Mutex::new(SubscriptionTable::new()),
            config: ReentrantMutex::new(()),
            notifier: Notifier::new(),
        }
    }

    /// Registration and endpoint discovery. Runs once, right after the port
    /// is placed in its `Arc`.
    ///
    /// The change callbacks are connected before the first reconcile so a
    /// list change in between is never missed.
    fn attach(self: &Arc<Self>) {
        let _config = self.config.lock();
        self.client.add_port(self);

        if !self.client.is_raw() {
            let weak = Arc::downgrade(self);
            self.client.connect_readable_ports_changed(
                self.id,
                Arc::new(move || {
                    if let Some(port) = weak.upgrade() {
                        port.update_ports(Direction::Input);
                    }
                }),
            );
            let weak = Arc::downgrade(self);
            self.client.connect_writable_ports_changed(
                self.id,
                Arc::new(move || {
                    if let Some(port) = weak.upgrade() {
                        port.update_ports(Direction::Output);
                    }
                }),
            );

            self.update_ports(Direction::Input);
            self.update_ports(Direction::Output);
        }

        self.update_mode();
        debug!("Created MIDI port {}: {}", self.id, self.name());
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        debug!("Renaming MIDI port {} to {}", self.id, name);
        *self.name.write() = name;
        self.client.apply_port_name(self);
    }

    pub fn client(&self) -> &Arc<dyn MidiClient> {
        &self.client
    }

    // ==================== Mode ====================

    /// Always derived from the two enable flags.
    #[inline]
    pub fn mode(&self) -> PortMode {
        PortMode::from_flags(self.input_enabled(), self.output_enabled())
    }

    #[inline]
    pub fn input_enabled(&self) -> bool {
        self.receive_enabled.load(Ordering::Acquire)
    }

    #[inline]
    pub fn output_enabled(&self) -> bool {
        self.send_enabled.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_enabled(&self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.input_enabled(),
            Direction::Output => self.output_enabled(),
        }
    }

    pub fn set_receive_enabled(&self, enabled: bool) {
        self.set_enabled(Direction::Input, enabled);
    }

    pub fn set_send_enabled(&self, enabled: bool) {
        self.set_enabled(Direction::Output, enabled);
    }

    /// No-op when the flag already has that value.
    pub fn set_enabled(&self, direction: Direction, enabled: bool) {
        let _config = self.config.lock();
        let flag = match direction {
            Direction::Input => &self.receive_enabled,
            Direction::Output => &self.send_enabled,
        };
        if flag.swap(enabled, Ordering::AcqRel) != enabled {
            self.update_mode();
        }
    }

    fn update_mode(&self) {
        let mode = self.mode();
        debug!("MIDI port {} mode is now {:?}", self.id, mode);
        self.client.apply_port_mode(self);

        // Only transitions subscriptions; unsubscribing never touches the flags.
        for direction in Direction::ALL {
            if !mode.is_enabled(direction) {
                let subscribed = self.table(direction).lock().subscribed();
                for endpoint in subscribed {
                    self.subscribe_port(direction, &endpoint, false);
                }
            }
        }

        self.notifier.emit(PortNotification::ReadablePortsChanged);
        self.notifier.emit(PortNotification::WritablePortsChanged);
        self.notifier.emit(PortNotification::ModeChanged);
        self.project.set_modified();
    }

    // ==================== Subscriptions ====================

    fn table(&self, direction: Direction) -> &Mutex<SubscriptionTable> {
        match direction {
            Direction::Input => &self.readable_ports,
            Direction::Output => &self.writable_ports,
        }
    }

    pub fn subscribe_readable_port(&self, endpoint: &str, subscribe: bool) {
        self.subscribe_port(Direction::Input, endpoint, subscribe);
    }

    pub fn subscribe_writable_port(&self, endpoint: &str, subscribe: bool) {
        self.subscribe_port(Direction::Output, endpoint, subscribe);
    }

    /// Records the request, enables the direction when subscribing, then
    /// forwards to the client.
    pub fn subscribe_port(&self, direction: Direction, endpoint: &str, subscribe: bool) {
        let _config = self.config.lock();
        self.table(direction).lock().set(endpoint, subscribe);

        if subscribe && !self.is_enabled(direction) {
            self.set_enabled(direction, true);
        }

        debug!(
            "MIDI port {} {} {:?} endpoint {}",
            self.id,
            if subscribe { "subscribing" } else { "unsubscribing" },
            direction,
            endpoint
        );
        match direction {
            Direction::Input => self.client.subscribe_readable_port(self, endpoint, subscribe),
            Direction::Output => self.client.subscribe_writable_port(self, endpoint, subscribe),
        }
        self.project.set_modified();
    }

    pub fn is_subscribed(&self, direction: Direction, endpoint: &str) -> bool {
        self.table(direction).lock().is_subscribed(endpoint)
    }

    pub fn readable_ports(&self) -> BTreeMap<String, bool> {
        self.readable_ports.lock().to_map()
    }

    pub fn writable_ports(&self) -> BTreeMap<String, bool> {
        self.writable_ports.lock().to_map()
    }

    pub fn subscribed_ports(&self, direction: Direction) -> Vec<String> {
        self.table(direction).lock().subscribed().into_vec()
    }

    /// Rebuild one direction's table from the client's current endpoint list.
    ///
    /// Called at construction and from the client's endpoint-list-changed
    /// callbacks. The list is read under the configuration guard, so
    /// concurrent refreshes apply in the order they read.
    pub fn update_ports(&self, direction: Direction) {
        let _config = self.config.lock();
        let endpoints = match direction {
            Direction::Input => self.client.readable_ports(),
            Direction::Output => self.client.writable_ports(),
        };
        debug!(
            "MIDI port {} reconciling {} {:?} endpoints",
            self.id,
            endpoints.len(),
            direction
        );
        self.table(direction).lock().reconcile(endpoints);
        self.notifier.emit(PortNotification::ports_changed(direction));
    }

    // ==================== Notifications ====================

    pub fn on_notification<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(PortNotification) + Send + Sync + 'static,
    {
        self.notifier.add(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.notifier.remove(id)
    }

    // ==================== Settings ====================

    #[inline]
    pub fn input_channel(&self) -> i32 {
        self.input_channel.value()
    }

    #[inline]
    pub fn output_channel(&self) -> i32 {
        self.output_channel.value()
    }

    #[inline]
    pub fn input_controller(&self) -> i32 {
        self.input_controller.value()
    }

    #[inline]
    pub fn output_controller(&self) -> i32 {
        self.output_controller.value()
    }

    #[inline]
    pub fn fixed_input_velocity(&self) -> i32 {
        self.fixed_input_velocity.value()
    }

    #[inline]
    pub fn fixed_output_velocity(&self) -> i32 {
        self.fixed_output_velocity.value()
    }

    #[inline]
    pub fn output_program(&self) -> i32 {
        self.output_program.value()
    }

    /// 0 listens on every channel.
    pub fn set_input_channel(&self, channel: i32) {
        self.set_model(&self.input_channel, channel);
    }

    pub fn set_output_channel(&self, channel: i32) {
        self.set_model(&self.output_channel, channel);
    }

    pub fn set_input_controller(&self, controller: i32) {
        self.set_model(&self.input_controller, controller);
    }

    pub fn set_output_controller(&self, controller: i32) {
        self.set_model(&self.output_controller, controller);
    }

    /// -1 disables the override.
    pub fn set_fixed_input_velocity(&self, velocity: i32) {
        self.set_model(&self.fixed_input_velocity, velocity);
    }

    /// -1 disables the override.
    pub fn set_fixed_output_velocity(&self, velocity: i32) {
        self.set_model(&self.fixed_output_velocity, velocity);
    }

    /// 1-based. Sends a program change when the value changes.
    pub fn set_output_program(&self, program: i32) {
        if self.set_model(&self.output_program, program) {
            self.notify_output_program_changed();
        }
    }

    fn set_model(&self, model: &IntModel, value: i32) -> bool {
        let changed = model.set_value(value);
        if changed {
            self.project.set_modified();
        }
        changed
    }
}

impl Drop for MidiPort {
    fn drop(&mut self) {
        // Detach every endpoint through the normal mode transition
        self.set_receive_enabled(false);
        self.set_send_enabled(false);

        self.client.remove_port(self);
        debug!("Removed MIDI port {}", self.id);
    }
}

impl fmt::Debug for MidiPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiPort")
            .field("id", &self.id)
            .field("name", &*self.name.read())
            .field("mode", &self.mode())
            .finish()
    }
}

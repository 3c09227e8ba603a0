//! Hardware MIDI I/O.
//!
//! Endpoint discovery, connections and real-time event delivery via midir.
//! Requires the `midi-io` feature.

mod midir_client;

pub use midir_client::{MidirClient, MidirClientBuilder};

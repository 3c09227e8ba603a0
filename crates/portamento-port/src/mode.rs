//! Port mode lattice derived from the two direction enable flags.

use serde::{Deserialize, Serialize};

/// Input is the readable direction (events arrive from endpoints), output is
/// the writable one (events are sent to endpoints).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Input, Direction::Output];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PortMode {
    #[default]
    Disabled,
    Input,
    Output,
    Duplex,
}

impl PortMode {
    // Indexed by [receive][send]
    const TABLE: [[PortMode; 2]; 2] = [
        [PortMode::Disabled, PortMode::Output],
        [PortMode::Input, PortMode::Duplex],
    ];

    /// The only way a mode comes into existence on a live port.
    #[inline]
    pub const fn from_flags(receive_enabled: bool, send_enabled: bool) -> Self {
        Self::TABLE[receive_enabled as usize][send_enabled as usize]
    }

    #[inline]
    pub const fn input_enabled(self) -> bool {
        matches!(self, PortMode::Input | PortMode::Duplex)
    }

    #[inline]
    pub const fn output_enabled(self) -> bool {
        matches!(self, PortMode::Output | PortMode::Duplex)
    }

    #[inline]
    pub const fn is_enabled(self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.input_enabled(),
            Direction::Output => self.output_enabled(),
        }
    }
}

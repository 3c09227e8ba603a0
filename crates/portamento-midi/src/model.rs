//! Bounded integer setting cell.
//!
//! Used for channel, controller, velocity and program settings that the
//! configuration path writes and the real-time path reads. Reads and writes
//! are single atomic operations, so the event path never waits on a writer.

use std::sync::atomic::{AtomicI32, Ordering};

#[derive(Debug)]
pub struct IntModel {
    value: AtomicI32,
    min: i32,
    max: i32,
}

impl IntModel {
    pub const fn new(default: i32, min: i32, max: i32) -> Self {
        Self {
            value: AtomicI32::new(default),
            min,
            max,
        }
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::Relaxed)
    }

    /// Clamps into `[min, max]`. Returns `true` if the stored value changed.
    #[inline]
    pub fn set_value(&self, value: i32) -> bool {
        let value = value.clamp(self.min, self.max);
        self.value.swap(value, Ordering::Relaxed) != value
    }
}

//! Change events emitted by the monitor.
//!
//! Both types serialize to the JSON body downstream delivery posts:
//!
//! ```text
//! { "frame": 20, "old_frame": 10,
//!   "events": [ { "location": 3, "old": 3, "new": 33 } ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::frame::{Address, CellValue};

/// A change at one subscribed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamEvent {
    /// Location in memory.
    pub location: Address,
    /// Previous value, or `None` if the address was not observed before.
    pub old: Option<CellValue>,
    /// Current value.
    pub new: CellValue,
}

/// One batch of changes between two accepted frames.
///
/// `events` is never empty for a batch handed to a [`ChangeHandler`](crate::ChangeHandler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamChangeInfo {
    /// Frame number of the new frame.
    pub frame: u64,
    /// Frame number of the previously accepted frame, if any.
    pub old_frame: Option<u64>,
    /// Changes, in the order addresses appear in the new frame.
    pub events: Vec<RamEvent>,
}

impl RamChangeInfo {
    /// Whether this batch covers the first accepted frame.
    #[inline]
    pub fn is_initial(&self) -> bool {
        self.old_frame.is_none()
    }

    /// The event for `location`, if it changed in this batch.
    pub fn event_for(&self, location: Address) -> Option<&RamEvent> {
        self.events.iter().find(|event| event.location == location)
    }
}

//! RAM frame data model.
//!
//! A [`RamFrame`] is one snapshot of watched emulator memory, tagged with the
//! emulator's frame counter. Wire field names follow the emulator-side client:
//!
//! ```text
//! { "frame": 10, "cells": [ { "location": 53604, "value": 7 }, ... ] }
//! ```
//!
//! Older clients send the cell list as `data` or `ram_data`; both are accepted.

use serde::{Deserialize, Serialize};

/// A memory address in the emulated machine.
pub type Address = u64;

/// A value observed at an address.
///
/// Emulator semantics imply 0-255, but the protocol treats values as opaque
/// unsigned integers and nothing here clamps them.
pub type CellValue = u64;

/// One (address, value) observation within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryCell {
    /// Location in memory.
    pub location: Address,
    /// Value at that location.
    pub value: CellValue,
}

impl MemoryCell {
    /// Create a new cell.
    #[inline]
    pub fn new(location: Address, value: CellValue) -> Self {
        Self { location, value }
    }
}

impl From<(Address, CellValue)> for MemoryCell {
    fn from((location, value): (Address, CellValue)) -> Self {
        Self { location, value }
    }
}

/// One decoded RAM snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamFrame {
    /// Frame counter from the emulator.
    pub frame: u64,
    /// Observed cells, in the order the emulator sent them.
    #[serde(alias = "data", alias = "ram_data")]
    pub cells: Vec<MemoryCell>,
}

impl RamFrame {
    /// Create a frame from a counter and cells.
    pub fn new(frame: u64, cells: Vec<MemoryCell>) -> Self {
        Self { frame, cells }
    }

    /// Build a frame from `(address, value)` pairs.
    pub fn from_pairs<I>(frame: u64, pairs: I) -> Self
    where
        I: IntoIterator<Item = (Address, CellValue)>,
    {
        Self {
            frame,
            cells: pairs.into_iter().map(MemoryCell::from).collect(),
        }
    }

    /// Value at `location`, if the frame contains it.
    ///
    /// When an address repeats, the last observation wins.
    pub fn value_at(&self, location: Address) -> Option<CellValue> {
        self.cells
            .iter()
            .rev()
            .find(|cell| cell.location == location)
            .map(|cell| cell.value)
    }

    /// Number of cells in the frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the frame carries no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

//! Per-cycle forecast cache.
//!
//! Lives for exactly one refresh cycle, so every distinct coordinate is
//! fetched at most once per cycle and never reused across cycles.

use std::collections::HashMap;

use common::Coordinate;
use smhi_client::ParameterSnapshot;

/// Current snapshot per coordinate, scoped to one refresh cycle.
#[derive(Debug, Default)]
pub struct CycleCache {
    entries: HashMap<Coordinate, ParameterSnapshot>,
}

impl CycleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, coordinate: &Coordinate) -> Option<&ParameterSnapshot> {
        self.entries.get(coordinate)
    }

    pub fn put(&mut self, coordinate: Coordinate, snapshot: ParameterSnapshot) {
        self.entries.insert(coordinate, snapshot);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

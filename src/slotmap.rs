// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Stable-handle slot map (spec §3/§4.3).
//!
//! Hand-rolled rather than built on the `slotmap` crate: the spec pins an
//! exact handle wire layout and a `reserved` field the crate's opaque
//! `KeyData` doesn't expose, and the slot map needs its own
//! readers-writer lock independent of the archetype it points into (see
//! DESIGN.md for the dependency-drop note).

use parking_lot::RwLock;

use crate::error::{EcsError, Result};
use crate::handle::Handle;

/// Where a live handle's row currently lives: the owning archetype's hash
/// plus its row within that archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub archetype_hash: u64,
    pub row: u32,
}

enum Slot {
    Occupied { generation: u32, location: Location },
    Free { next_free: Option<u32>, generation: u32 },
}

/// Growable vector of slots mapping a `Handle` to its current
/// `(archetype, row)`, with a free list for reuse and strictly increasing
/// generations on reuse (spec §3/§8 invariant 4).
pub struct SlotMap {
    slots: RwLock<Vec<Slot>>,
    free_head: RwLock<Option<u32>>,
}

impl SlotMap {
    pub fn new() -> Self {
        Self { slots: RwLock::new(Vec::new()), free_head: RwLock::new(None) }
    }

    /// Allocate a new handle pointing at `location`.
    pub fn allocate(&self, location: Location) -> Handle {
        let mut head = self.free_head.write();
        let mut slots = self.slots.write();
        if let Some(index) = *head {
            let (next_free, generation) = match &slots[index as usize] {
                Slot::Free { next_free, generation } => (*next_free, *generation),
                Slot::Occupied { .. } => unreachable!("free list pointed at an occupied slot"),
            };
            *head = next_free;
            slots[index as usize] = Slot::Occupied { generation, location };
            Handle::new(index, generation)
        } else {
            let index = slots.len() as u32;
            slots.push(Slot::Occupied { generation: 0, location });
            Handle::new(index, 0)
        }
    }

    /// Resolve a handle's current location. Fails `DeadHandle` if the
    /// generation doesn't match or the slot is free.
    pub fn get(&self, handle: Handle) -> Result<Location> {
        let slots = self.slots.read();
        match slots.get(handle.index() as usize) {
            Some(Slot::Occupied { generation, location }) if *generation == handle.generation() => Ok(*location),
            _ => Err(EcsError::DeadHandle),
        }
    }

    /// True iff `handle` currently resolves to a live slot.
    pub fn exists(&self, handle: Handle) -> bool {
        self.get(handle).is_ok()
    }

    /// Rebind a live handle's slot to a new location (spec §4.3 `Put`:
    /// "update slot to {D, new_row, gen}"), e.g. after a migration or a
    /// same-archetype row move.
    pub fn rebind(&self, handle: Handle, location: Location) -> Result<()> {
        let mut slots = self.slots.write();
        match slots.get_mut(handle.index() as usize) {
            Some(Slot::Occupied { generation, location: slot_location }) if *generation == handle.generation() => {
                *slot_location = location;
                Ok(())
            }
            _ => Err(EcsError::DeadHandle),
        }
    }

    /// Free a live handle's slot, bumping its generation so reuse can never
    /// alias a still-outstanding handle (spec §8 invariant 4).
    pub fn free(&self, handle: Handle) -> Result<()> {
        let mut head = self.free_head.write();
        let mut slots = self.slots.write();
        match slots.get(handle.index() as usize) {
            Some(Slot::Occupied { generation, .. }) if *generation == handle.generation() => {
                let next_generation = generation.wrapping_add(1);
                slots[handle.index() as usize] = Slot::Free { next_free: *head, generation: next_generation };
                *head = Some(handle.index());
                Ok(())
            }
            _ => Err(EcsError::DeadHandle),
        }
    }

    /// Drop every slot, returning the map to empty (spec §4.3 `Clear`).
    pub fn clear(&self) {
        let mut head = self.free_head.write();
        let mut slots = self.slots.write();
        slots.clear();
        *head = None;
    }

    /// Number of live (occupied) slots.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .iter()
            .filter(|s| matches!(s, Slot::Occupied { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SlotMap {
    fn default() -> Self {
        Self::new()
    }
}

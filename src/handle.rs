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

//! Stable, opaque entity identifiers.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque entity handle: a storage index plus a generation counter.
///
/// Two handles compare equal iff both fields match. A handle whose
/// generation no longer matches the slot's current generation denotes a
/// destroyed entity (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    /// Reserved for future use (alignment/padding in the spec's wire
    /// layout notwithstanding); always zero today.
    pub(crate) reserved: u32,
}

impl Handle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation, reserved: 0 }
    }

    /// The slot-map storage index this handle resolves through.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The generation captured at allocation time.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}#{})", self.index, self.generation)
    }
}

/// Wire layout from spec §6: `{"index":u32,"gen":u32}`. The `reserved`
/// field never crosses the wire.
#[derive(Serialize, Deserialize)]
struct HandleWire {
    index: u32,
    gen: u32,
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        HandleWire { index: self.index, gen: self.generation }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = HandleWire::deserialize(deserializer)?;
        Ok(Handle { index: wire.index, generation: wire.gen, reserved: 0 })
    }
}

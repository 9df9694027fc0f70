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

//! The sole interface obligation toward an external debug collaborator
//! (spec §6/§9: the console/TCP channel itself is out of scope, but the
//! registry still implements the handshake-independent snapshot shape it
//! would serve).

use serde::Serialize;

/// One archetype's shape, as reported in a [`SnapshotDoc`].
#[derive(Debug, Clone, Serialize)]
pub struct ArchetypeSnapshot {
    pub hash: u64,
    pub type_count: usize,
    pub entity_count: usize,
}

/// A point-in-time summary of the whole store, serializable as the JSON
/// body of a debug-console snapshot response.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDoc {
    pub archetype_count: usize,
    pub entity_count: usize,
    pub archetypes: Vec<ArchetypeSnapshot>,
}

/// Implemented by anything that can produce a [`SnapshotDoc`] on demand.
/// A debug console would hold a `dyn SnapshotSupplier` and call this once
/// per inspection request; nothing here assumes how it is transported.
pub trait SnapshotSupplier {
    fn snapshot(&self) -> SnapshotDoc;
}

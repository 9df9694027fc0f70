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

//! Process-stable 64-bit type identity.
//!
//! The host language's runtime type identity (`std::any::TypeId`) is not a
//! `u64` and carries no stable hash guarantee across types, so every
//! component type is instead identified by hashing its `TypeId` once through
//! a fast, process-local hasher. The result is stable for the lifetime of
//! the process, which is all the spec requires.

use std::any::TypeId;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// A 64-bit hash identifying a component type for the lifetime of the process.
pub type ComponentTypeId = u64;

/// Hash a Rust type's identity down to a `ComponentTypeId`.
pub fn type_id_of<T: 'static>() -> ComponentTypeId {
    let mut hasher = FxHasher::default();
    TypeId::of::<T>().hash(&mut hasher);
    hasher.finish()
}

/// Zero-sized marker whose type id is reserved for the Handle pseudo-column
/// every archetype carries (spec §3: "types... must include the handle
/// pseudo-type `Handle`").
struct HandleMarker;

/// The reserved `ComponentTypeId` for the archetype's own Handle column.
pub fn handle_type_id() -> ComponentTypeId {
    type_id_of::<HandleMarker>()
}

/// Order-independent combine of a set of type-id hashes into one archetype
/// hash, as spec §3 requires ("hashes computed by XOR-combining sorted
/// element hashes, consistent with the classic boost-hash-combine mix").
pub fn combine_type_set(types: &[ComponentTypeId]) -> u64 {
    let mut sorted = types.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut acc: u64 = 0;
    for t in sorted {
        acc ^= boost_hash_combine(acc, t);
    }
    acc
}

/// The classic `boost::hash_combine` mix, widened to 64 bits.
fn boost_hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9e3779b97f4a7c15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_id_is_stable_within_process() {
        assert_eq!(type_id_of::<u32>(), type_id_of::<u32>());
        assert_ne!(type_id_of::<u32>(), type_id_of::<u64>());
    }

    #[test]
    fn combine_is_order_independent() {
        let a = type_id_of::<u32>();
        let b = type_id_of::<u64>();
        let c = type_id_of::<String>();
        assert_eq!(combine_type_set(&[a, b, c]), combine_type_set(&[c, a, b]));
        assert_eq!(combine_type_set(&[a, b, c]), combine_type_set(&[b, c, a]));
    }

    #[test]
    fn combine_distinguishes_sets() {
        let a = type_id_of::<u32>();
        let b = type_id_of::<u64>();
        assert_ne!(combine_type_set(&[a]), combine_type_set(&[a, b]));
    }

    #[test]
    fn handle_type_id_reserved_and_stable() {
        assert_eq!(handle_type_id(), handle_type_id());
    }
}

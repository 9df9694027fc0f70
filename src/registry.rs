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

//! The Registry: owns every archetype, the slot map, and resolves the
//! public insert/get/put/erase/view operations (spec §4.3).

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::{debug, trace};

use crate::archetype::{ArchetypeCell, ArchetypeData};
use crate::column::{Column, TypedColumn};
use crate::component::{Bundle, Component, TypeList};
use crate::error::{EcsError, Result};
use crate::handle::Handle;
use crate::refs::Ref;
use crate::slotmap::{Location, SlotMap};
use crate::snapshot::{ArchetypeSnapshot, SnapshotDoc, SnapshotSupplier};
use crate::typeid::{combine_type_set, handle_type_id, type_id_of, ComponentTypeId};
use crate::view::View;

struct ArchetypeTable {
    by_hash: AHashMap<u64, usize>,
    in_order: Vec<Arc<ArchetypeCell>>,
}

impl ArchetypeTable {
    fn new() -> Self {
        Self { by_hash: AHashMap::new(), in_order: Vec::new() }
    }
}

/// Owns all archetypes and the slot map; resolves every structural and
/// read operation the public API exposes (spec §4.3).
pub struct Registry {
    archetypes: RwLock<ArchetypeTable>,
    slots: SlotMap,
}

impl Registry {
    pub fn new() -> Self {
        Self { archetypes: RwLock::new(ArchetypeTable::new()), slots: SlotMap::new() }
    }

    fn lookup(&self, hash: u64) -> Arc<ArchetypeCell> {
        let table = self.archetypes.read();
        let idx = *table.by_hash.get(&hash).expect("slot pointed at a hash with no archetype");
        table.in_order[idx].clone()
    }

    /// Find the archetype for `types`, creating it (via `make_columns`) if
    /// no archetype with that exact type set exists yet.
    fn find_or_create(
        &self,
        types: Vec<ComponentTypeId>,
        make_columns: impl FnOnce() -> AHashMap<ComponentTypeId, Box<dyn Column>>,
    ) -> Arc<ArchetypeCell> {
        let hash = combine_type_set(&types);
        {
            let table = self.archetypes.read();
            if let Some(&idx) = table.by_hash.get(&hash) {
                return table.in_order[idx].clone();
            }
        }
        let mut table = self.archetypes.write();
        if let Some(&idx) = table.by_hash.get(&hash) {
            return table.in_order[idx].clone();
        }
        let cell = Arc::new(ArchetypeCell::new(types, make_columns()));
        let idx = table.in_order.len();
        table.by_hash.insert(cell.hash, idx);
        table.in_order.push(cell.clone());
        debug!(archetype_hash = cell.hash, type_count = cell.types.len(), "created archetype");
        cell
    }

    /// Acquire both archetypes' write locks in ascending-hash order (spec
    /// §5 "when two archetypes must be locked together... locked in
    /// ascending archetype-hash order"), returning the guards in
    /// `(a, b)` order regardless of which was physically locked first.
    fn lock_pair<'a>(
        a: &'a ArchetypeCell,
        b: &'a ArchetypeCell,
    ) -> (RwLockWriteGuard<'a, ArchetypeData>, RwLockWriteGuard<'a, ArchetypeData>) {
        if a.hash <= b.hash {
            let ga = a.write();
            let gb = b.write();
            (ga, gb)
        } else {
            let gb = b.write();
            let ga = a.write();
            (ga, gb)
        }
    }

    /// Insert a new entity with `bundle`'s components, returning its handle.
    pub fn insert<B: Bundle>(&self, bundle: B) -> Handle {
        let mut types = B::type_ids().to_vec();
        types.push(handle_type_id());
        let arch = self.find_or_create(types, || {
            let mut columns: AHashMap<ComponentTypeId, Box<dyn Column>> =
                B::empty_columns().into_iter().collect();
            columns.insert(handle_type_id(), Box::new(TypedColumn::<Handle>::new()));
            columns
        });

        // Held for the whole sequence, not just the push: a concurrent
        // erase on this archetype could otherwise swap-remove our
        // freshly-pushed (and still tail) row out from under us before the
        // slot map learns where it lives.
        let mut data = arch.write();
        let row = data.insert_handle(Handle::new(0, 0));
        bundle.push_into(data.columns_mut());
        let handle = self.slots.allocate(Location { archetype_hash: arch.hash, row: row as u32 });
        data.put(row, handle).expect("just-inserted handle column write");
        // Bump while still holding the write guard: a concurrent `Ref::with`
        // must observe either the lock held or the counter already moved,
        // never a gap where neither blocks it from reading the new row.
        arch.bump_on_structural_change();
        drop(data);

        trace!(?handle, archetype_hash = arch.hash, "inserted entity");
        handle
    }

    pub fn exists(&self, h: Handle) -> bool {
        self.slots.exists(h)
    }

    pub fn has<T: Component>(&self, h: Handle) -> Result<bool> {
        let loc = self.slots.get(h)?;
        Ok(self.lookup(loc.archetype_hash).has(type_id_of::<T>()))
    }

    pub fn has_all(&self, h: Handle, types: &[ComponentTypeId]) -> Result<bool> {
        let loc = self.slots.get(h)?;
        let arch = self.lookup(loc.archetype_hash);
        Ok(types.iter().all(|t| arch.has(*t)))
    }

    /// Run `f` with a read-locked view of the raw archetype row behind `h`,
    /// the primitive every typed `get*` helper is built from.
    pub fn view_entity<R>(&self, h: Handle, f: impl FnOnce(&ArchetypeData, usize) -> Result<R>) -> Result<R> {
        let loc = self.slots.get(h)?;
        let arch = self.lookup(loc.archetype_hash);
        let data = arch.read();
        f(&data, loc.row as usize)
    }

    /// `Get<T>(Handle)`.
    pub fn get<T: Component, R>(&self, h: Handle, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.view_entity(h, |data, row| data.get::<T>(row).map(f))
    }

    /// `Get<A, B>(Handle)`.
    pub fn get2<A: Component, B: Component, R>(&self, h: Handle, f: impl FnOnce(&A, &B) -> R) -> Result<R> {
        self.view_entity(h, |data, row| {
            let a = data.get::<A>(row)?;
            let b = data.get::<B>(row)?;
            Ok(f(a, b))
        })
    }

    /// `Get<A, B, C>(Handle)`.
    pub fn get3<A: Component, B: Component, C: Component, R>(
        &self,
        h: Handle,
        f: impl FnOnce(&A, &B, &C) -> R,
    ) -> Result<R> {
        self.view_entity(h, |data, row| {
            let a = data.get::<A>(row)?;
            let b = data.get::<B>(row)?;
            let c = data.get::<C>(row)?;
            Ok(f(a, b, c))
        })
    }

    /// Capture a `Ref<T>` for later, staleness-checked access (spec §4.5).
    pub fn get_ref<T: Component>(&self, h: Handle) -> Result<Ref<T>> {
        let loc = self.slots.get(h)?;
        let arch = self.lookup(loc.archetype_hash);
        Ref::capture(arch, loc.row as usize)
    }

    /// The archetype currently backing `h`, mostly useful for diagnostics
    /// and tests that want to observe a migration happening.
    pub fn archetype_of(&self, h: Handle) -> Result<Arc<ArchetypeCell>> {
        let loc = self.slots.get(h)?;
        Ok(self.lookup(loc.archetype_hash))
    }

    /// `Put<T>(Handle, value)`: overwrite if already present, else migrate.
    pub fn put<B: Bundle>(&self, h: Handle, bundle: B) -> Result<()> {
        let loc = self.slots.get(h)?;
        let src = self.lookup(loc.archetype_hash);
        let new_types = B::type_ids();

        if new_types.iter().all(|t| src.has(*t)) {
            let mut data = src.write();
            bundle.overwrite_into(data.columns_mut(), loc.row as usize);
            src.bump_on_structural_change();
            drop(data);
            return Ok(());
        }

        let (dst_types, dst_columns) = {
            let mut types = src.types.clone();
            for t in &new_types {
                if !types.contains(t) {
                    types.push(*t);
                }
            }
            let src_data = src.read();
            let mut columns = AHashMap::new();
            for (type_id, column) in src_data.columns().iter() {
                if !new_types.contains(type_id) {
                    columns.insert(*type_id, column.clone_empty());
                }
            }
            drop(src_data);
            for (type_id, column) in B::empty_columns() {
                columns.insert(type_id, column);
            }
            (types, columns)
        };
        let dst = self.find_or_create(dst_types, || dst_columns);

        let (mut src_guard, mut dst_guard) = Self::lock_pair(&src, &dst);
        let row = loc.row as usize;
        dst_guard.copy_common_from(&src_guard, row, &new_types)?;
        bundle.push_into(dst_guard.columns_mut());
        let new_row = dst_guard.size() - 1;
        let displaced = src_guard.erase(row)?;
        // Rebind while both archetype locks are still held: once they are
        // released, another thread's erase on either archetype could shift
        // rows again before the slot map catches up.
        self.slots.rebind(h, Location { archetype_hash: dst.hash, row: new_row as u32 })?;
        if let Some(displaced_handle) = displaced {
            self.slots.rebind(displaced_handle, Location { archetype_hash: src.hash, row: row as u32 })?;
        }
        // Bump both counters before releasing either guard, so a concurrent
        // `Ref::with` sees the lock held or the counter already advanced.
        src.bump_on_structural_change();
        dst.bump_on_structural_change();
        drop(src_guard);
        drop(dst_guard);
        Ok(())
    }

    /// `Erase<Ts…>(Handle)`: drop component types from an entity.
    pub fn erase_components<Ts: TypeList>(&self, h: Handle) -> Result<()> {
        let drop_types = Ts::type_ids();
        self.migrate_shrink(h, &drop_types)
    }

    /// `AddTags(Handle, tag_ids…)`: idempotent.
    pub fn add_tags(&self, h: Handle, tags: &[ComponentTypeId]) -> Result<()> {
        let loc = self.slots.get(h)?;
        let src = self.lookup(loc.archetype_hash);
        let missing: Vec<ComponentTypeId> = tags.iter().copied().filter(|t| !src.has(*t)).collect();
        if missing.is_empty() {
            return Ok(());
        }
        let (dst_types, dst_columns) = ArchetypeCell::clone_with_extra_types(&src, &missing);
        self.migrate_no_values(h, &src, dst_types, dst_columns)
    }

    /// `EraseTags(Handle, tag_ids…)`: idempotent.
    pub fn erase_tags(&self, h: Handle, tags: &[ComponentTypeId]) -> Result<()> {
        self.migrate_shrink(h, tags)
    }

    /// Shared implementation for component-erase and tag-erase: both drop
    /// types from the signature with no replacement values.
    fn migrate_shrink(&self, h: Handle, drop_types: &[ComponentTypeId]) -> Result<()> {
        let loc = self.slots.get(h)?;
        let src = self.lookup(loc.archetype_hash);
        let present: Vec<ComponentTypeId> = drop_types.iter().copied().filter(|t| src.has(*t)).collect();
        if present.is_empty() {
            return Ok(());
        }
        let (dst_types, dst_columns) = ArchetypeCell::clone_without(&src, &present);
        self.migrate_no_values(h, &src, dst_types, dst_columns)
    }

    /// Migrate `h` from `src` into a freshly-resolved destination archetype
    /// whose columns need nothing but a copy of the source row (no new
    /// component values to write) — the shared tail of `add_tags`,
    /// `erase_tags`, and `erase_components`.
    fn migrate_no_values(
        &self,
        h: Handle,
        src: &Arc<ArchetypeCell>,
        dst_types: Vec<ComponentTypeId>,
        dst_columns: AHashMap<ComponentTypeId, Box<dyn Column>>,
    ) -> Result<()> {
        let loc = self.slots.get(h)?;
        let dst = self.find_or_create(dst_types, || dst_columns);
        let (mut src_guard, mut dst_guard) = Self::lock_pair(src, &dst);
        let row = loc.row as usize;
        dst_guard.copy_common_from(&src_guard, row, &[])?;
        let new_row = dst_guard.size() - 1;
        let displaced = src_guard.erase(row)?;
        self.slots.rebind(h, Location { archetype_hash: dst.hash, row: new_row as u32 })?;
        if let Some(displaced_handle) = displaced {
            self.slots.rebind(displaced_handle, Location { archetype_hash: src.hash, row: row as u32 })?;
        }
        // Bump both counters before releasing either guard, so a concurrent
        // `Ref::with` sees the lock held or the counter already advanced.
        src.bump_on_structural_change();
        dst.bump_on_structural_change();
        drop(src_guard);
        drop(dst_guard);
        Ok(())
    }

    /// `Erase(Handle)`: destroy the entity entirely. No-op if already dead.
    pub fn erase_entity(&self, h: Handle) -> Result<()> {
        let Ok(loc) = self.slots.get(h) else {
            return Ok(());
        };
        let arch = self.lookup(loc.archetype_hash);
        let mut data = arch.write();
        let displaced = data.erase(loc.row as usize)?;
        if let Some(displaced_handle) = displaced {
            self.slots.rebind(displaced_handle, loc)?;
        }
        self.slots.free(h)?;
        // Bump while still holding the write guard, same reasoning as insert.
        arch.bump_on_structural_change();
        drop(data);
        trace!(?h, "erased entity");
        Ok(())
    }

    /// `GetView<T>(excluded)`: single-fetch-type view over every archetype
    /// with `T` and none of `excluded`.
    pub fn get_view<T: Component>(&self, excluded: &[ComponentTypeId]) -> View<T> {
        let included = [type_id_of::<T>()];
        View::materialize(self.snapshot_archetypes(&included, excluded))
    }

    /// A view counting matches for an arbitrary include/exclude set, used
    /// when the caller only needs cardinality (spec §8 S4), not typed
    /// iteration.
    pub fn count_view(&self, included: &[ComponentTypeId], excluded: &[ComponentTypeId]) -> usize {
        self.snapshot_archetypes(included, excluded)
            .iter()
            .map(|(arch, _)| arch.size())
            .sum()
    }

    fn snapshot_archetypes(&self, included: &[ComponentTypeId], excluded: &[ComponentTypeId]) -> Vec<(Arc<ArchetypeCell>, usize)> {
        let table = self.archetypes.read();
        table
            .in_order
            .iter()
            .filter(|a| a.matches(included, excluded))
            .map(|a| (a.clone(), a.size()))
            .collect()
    }

    /// `Clear()`: drop every archetype and reset the slot map.
    pub fn clear(&self) {
        {
            let mut table = self.archetypes.write();
            table.in_order.clear();
            table.by_hash.clear();
        }
        self.slots.clear();
    }

    /// `Size()`: total live entity count across all archetypes.
    pub fn size(&self) -> usize {
        let table = self.archetypes.read();
        table.in_order.iter().map(|a| a.size()).sum()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.read().in_order.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSupplier for Registry {
    fn snapshot(&self) -> SnapshotDoc {
        let table = self.archetypes.read();
        let archetypes: Vec<ArchetypeSnapshot> = table
            .in_order
            .iter()
            .map(|a| ArchetypeSnapshot { hash: a.hash, type_count: a.types.len(), entity_count: a.size() })
            .collect();
        SnapshotDoc {
            archetype_count: archetypes.len(),
            entity_count: archetypes.iter().map(|a| a.entity_count).sum(),
            archetypes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity(i32);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Name;

    #[test]
    fn s1_insert_get_erase() {
        let reg = Registry::new();
        let h = reg.insert((Position { x: 1, y: 2 }, Name));
        assert_eq!(reg.get::<Position, _>(h, |p| *p).unwrap(), Position { x: 1, y: 2 });
        reg.erase_entity(h).unwrap();
        assert!(!reg.exists(h));
    }

    #[test]
    fn s2_migration_on_put() {
        let reg = Registry::new();
        let h = reg.insert((Position { x: 7, y: 0 },));
        let before_hash = reg.archetype_of(h).unwrap().hash;
        reg.put(h, (Velocity(9),)).unwrap();
        assert_eq!(reg.get::<Position, _>(h, |p| p.x).unwrap(), 7);
        assert_eq!(reg.get::<Velocity, _>(h, |v| v.0).unwrap(), 9);
        let after_hash = reg.archetype_of(h).unwrap().hash;
        assert_ne!(before_hash, after_hash);
    }

    #[test]
    fn s3_swap_with_last_reindexes() {
        let reg = Registry::new();
        let h1 = reg.insert((Position { x: 1, y: 1 },));
        let h2 = reg.insert((Position { x: 2, y: 2 },));
        let h3 = reg.insert((Position { x: 3, y: 3 },));
        reg.erase_entity(h2).unwrap();
        assert!(reg.exists(h3));
        assert!(!reg.exists(h2));
        assert!(reg.exists(h1));
        assert_eq!(reg.get::<Position, _>(h3, |p| *p).unwrap(), Position { x: 3, y: 3 });
    }

    #[test]
    fn s4_view_filters() {
        let reg = Registry::new();
        for _ in 0..3 {
            reg.insert((Position { x: 0, y: 0 },));
        }
        for _ in 0..2 {
            reg.insert((Position { x: 0, y: 0 }, Velocity(1)));
        }
        reg.insert((Velocity(1),));

        let pos = type_id_of::<Position>();
        let vel = type_id_of::<Velocity>();
        assert_eq!(reg.count_view(&[pos], &[]), 5);
        assert_eq!(reg.count_view(&[pos, vel], &[]), 2);
        assert_eq!(reg.count_view(&[pos], &[vel]), 3);
    }

    #[test]
    fn erase_components_drops_type() {
        let reg = Registry::new();
        let h = reg.insert((Position { x: 1, y: 1 }, Velocity(2)));
        reg.erase_components::<(Velocity,)>(h).unwrap();
        assert!(!reg.has::<Velocity>(h).unwrap());
        assert!(reg.has::<Position>(h).unwrap());
    }

    #[test]
    fn add_tags_idempotent() {
        let reg = Registry::new();
        let h = reg.insert((Position { x: 0, y: 0 },));
        let tag = type_id_of::<Name>();
        reg.add_tags(h, &[tag]).unwrap();
        let hash1 = reg.archetype_of(h).unwrap().hash;
        reg.add_tags(h, &[tag]).unwrap();
        let hash2 = reg.archetype_of(h).unwrap().hash;
        assert_eq!(hash1, hash2);
        assert!(reg.has_all(h, &[tag]).unwrap());
    }

    #[test]
    fn clear_resets_everything() {
        let reg = Registry::new();
        let h = reg.insert((Position { x: 0, y: 0 },));
        reg.clear();
        assert!(!reg.exists(h));
        assert_eq!(reg.size(), 0);
        assert_eq!(reg.archetype_count(), 0);
    }

    #[test]
    fn dead_handle_errors() {
        let reg = Registry::new();
        let h = reg.insert((Position { x: 0, y: 0 },));
        reg.erase_entity(h).unwrap();
        assert_eq!(reg.get::<Position, _>(h, |p| *p), Err(EcsError::DeadHandle));
    }
}

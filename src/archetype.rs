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

//! Archetype storage: a set of component types, one densely packed column
//! per type, and a per-archetype change counter (spec §3/§4.2).

use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::column::{Column, TypedColumn};
use crate::component::Component;
use crate::error::{EcsError, Result};
use crate::handle::Handle;
use crate::typeid::{combine_type_set, handle_type_id, type_id_of, ComponentTypeId};

/// An archetype: the equivalence class of entities sharing exactly one
/// component-type set (including tag types, which carry no column).
///
/// The type set and hash are fixed at construction and never change; only
/// the row data behind `data` mutates, under `data`'s own lock. The change
/// counter lives outside that lock so a `Ref`'s staleness check never has
/// to contend with writers (spec §4.5: "no locking is performed by Ref
/// itself").
pub struct ArchetypeCell {
    /// Order-independent hash of `types`, used as the registry's key.
    pub hash: u64,
    /// Sorted, deduplicated set of every type in this archetype, including
    /// tag types (no column) and the reserved handle type (spec §3).
    pub types: Vec<ComponentTypeId>,
    change_counter: AtomicU64,
    data: RwLock<ArchetypeData>,
}

/// The mutable row data behind an [`ArchetypeCell`]'s lock.
pub struct ArchetypeData {
    columns: AHashMap<ComponentTypeId, Box<dyn Column>>,
}

impl ArchetypeCell {
    /// Construct an archetype from its full type set and column set. Tag
    /// types in `types` that have no entry in `columns` are valid and
    /// expected.
    pub fn new(types: Vec<ComponentTypeId>, columns: AHashMap<ComponentTypeId, Box<dyn Column>>) -> Self {
        let mut sorted = types;
        sorted.sort_unstable();
        sorted.dedup();
        debug_assert!(
            sorted.contains(&handle_type_id()),
            "archetype type set must include the handle pseudo-type"
        );
        let hash = combine_type_set(&sorted);
        Self {
            hash,
            types: sorted,
            change_counter: AtomicU64::new(0),
            data: RwLock::new(ArchetypeData { columns }),
        }
    }

    /// Whether this archetype's type set includes `t` (component or tag).
    pub fn has(&self, t: ComponentTypeId) -> bool {
        self.types.binary_search(&t).is_ok()
    }

    /// Whether this archetype's type set is a superset of `included` and
    /// disjoint from `excluded` (spec §4.3 `GetView`).
    pub fn matches(&self, included: &[ComponentTypeId], excluded: &[ComponentTypeId]) -> bool {
        included.iter().all(|t| self.has(*t)) && excluded.iter().all(|t| !self.has(*t))
    }

    /// Current change-counter value, read without the data lock.
    pub fn change_counter(&self) -> u64 {
        self.change_counter.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.change_counter.fetch_add(1, Ordering::AcqRel);
    }

    pub fn read(&self) -> RwLockReadGuard<'_, ArchetypeData> {
        self.data.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ArchetypeData> {
        self.data.write()
    }

    /// Number of live rows, taking a read lock.
    pub fn size(&self) -> usize {
        self.data.read().size()
    }
}

impl ArchetypeData {
    /// Number of live rows: the handle column's length, which every other
    /// column's length must equal (spec §3 invariant).
    pub fn size(&self) -> usize {
        self.columns.get(&handle_type_id()).map(|c| c.len()).unwrap_or(0)
    }

    fn handle_column(&self) -> &TypedColumn<Handle> {
        self.columns
            .get(&handle_type_id())
            .expect("archetype always carries a handle column")
            .as_any()
            .downcast_ref::<TypedColumn<Handle>>()
            .expect("handle column has the wrong concrete type")
    }

    fn handle_column_mut(&mut self) -> &mut TypedColumn<Handle> {
        self.columns
            .get_mut(&handle_type_id())
            .expect("archetype always carries a handle column")
            .as_any_mut()
            .downcast_mut::<TypedColumn<Handle>>()
            .expect("handle column has the wrong concrete type")
    }

    /// The owning handle stored at `row`.
    pub fn handle_at(&self, row: usize) -> Result<Handle> {
        self.handle_column().get(row).copied()
    }

    /// Push `handle`'s row and hand back the column map so the caller can
    /// fill in the freshly-allocated row's component values before
    /// releasing the write lock. Returns the new row index.
    pub fn insert_handle(&mut self, handle: Handle) -> usize {
        let row = self.handle_column_mut().push(handle);
        row
    }

    /// Direct access to the column map, for bundle writes and migration.
    pub fn columns_mut(&mut self) -> &mut AHashMap<ComponentTypeId, Box<dyn Column>> {
        &mut self.columns
    }

    /// Read-only access to the column map, for inspecting a source
    /// archetype's types during migration planning.
    pub fn columns(&self) -> &AHashMap<ComponentTypeId, Box<dyn Column>> {
        &self.columns
    }

    /// Read a single component reference (spec §4.2 `get<T>`).
    pub fn get<T: Component>(&self, row: usize) -> Result<&T> {
        let type_id = type_id_of::<T>();
        self.columns
            .get(&type_id)
            .ok_or(EcsError::MissingComponent(type_id))?
            .as_any()
            .downcast_ref::<TypedColumn<T>>()
            .ok_or(EcsError::TypeMismatch)?
            .get(row)
    }

    pub fn get_mut<T: Component>(&mut self, row: usize) -> Result<&mut T> {
        let type_id = type_id_of::<T>();
        self.columns
            .get_mut(&type_id)
            .ok_or(EcsError::MissingComponent(type_id))?
            .as_any_mut()
            .downcast_mut::<TypedColumn<T>>()
            .ok_or(EcsError::TypeMismatch)?
            .get_mut(row)
    }

    /// Overwrite a single component value in place (spec §4.3 `Put`, same
    /// archetype fast path).
    pub fn put<T: Component>(&mut self, row: usize, value: T) -> Result<()> {
        let type_id = type_id_of::<T>();
        self.columns
            .get_mut(&type_id)
            .ok_or(EcsError::MissingComponent(type_id))?
            .as_any_mut()
            .downcast_mut::<TypedColumn<T>>()
            .ok_or(EcsError::TypeMismatch)?
            .set(row, value)
    }

    /// Swap-with-last erase of `row` across every column (spec §4.2).
    ///
    /// Returns the handle that was moved into `row` from the old tail, or
    /// `None` if `row` was already the tail.
    pub fn erase(&mut self, row: usize) -> Result<Option<Handle>> {
        let size_before = self.size();
        if row >= size_before {
            return Err(EcsError::OutOfRange);
        }
        let last = size_before - 1;
        for column in self.columns.values_mut() {
            column.erase(row)?;
        }
        if row == last {
            Ok(None)
        } else {
            Ok(Some(self.handle_at(row)?))
        }
    }

    /// Exchange two rows across every column.
    pub fn swap_rows(&mut self, a: usize, b: usize) -> Result<()> {
        for column in self.columns.values_mut() {
            column.swap(a, b)?;
        }
        Ok(())
    }

    /// Append a deep copy of `src_row` for every column this archetype has
    /// in common with `src`, except types in `exclude` (spec §4.2 "Move
    /// between archetypes": the `if S has t` branch). `exclude` is the set
    /// of types a caller is about to overwrite with fresh values (e.g. a
    /// `Put` bundle) rather than carry over from the source row. Columns
    /// unique to this archetype are left for the caller to fill before
    /// releasing the write lock.
    pub fn copy_common_from(&mut self, src: &ArchetypeData, src_row: usize, exclude: &[ComponentTypeId]) -> Result<()> {
        for (type_id, dst_column) in self.columns.iter_mut() {
            if exclude.contains(type_id) {
                continue;
            }
            if let Some(src_column) = src.columns.get(type_id) {
                dst_column.copy_from(src_column.as_ref(), src_row)?;
            }
        }
        Ok(())
    }
}

impl ArchetypeCell {
    /// Insert a fresh row with no component values yet, bumping the change
    /// counter. Caller fills component columns before releasing the write
    /// guard they already hold.
    pub fn bump_on_structural_change(&self) {
        self.bump();
    }

    /// Build the empty column set for a brand-new archetype that is
    /// `base`'s columns restricted to `base.types \ drop`, used by
    /// `clone_without` (spec §4.2) for component/tag removal.
    pub fn clone_without(base: &ArchetypeCell, drop: &[ComponentTypeId]) -> (Vec<ComponentTypeId>, AHashMap<ComponentTypeId, Box<dyn Column>>) {
        let types: Vec<ComponentTypeId> = base.types.iter().copied().filter(|t| !drop.contains(t)).collect();
        let base_data = base.read();
        let mut columns = AHashMap::new();
        for (type_id, column) in base_data.columns.iter() {
            if !drop.contains(type_id) {
                columns.insert(*type_id, column.clone_empty());
            }
        }
        (types, columns)
    }

    /// Build the (types, columns) pair for a new archetype that is `base`
    /// plus extra tag types (spec §9.3 "tags... migrating... follows the
    /// same find-or-create-archetype protocol as components"). Tags carry
    /// no column, so every column is simply cloned empty from `base`.
    pub fn clone_with_extra_types(base: &ArchetypeCell, add: &[ComponentTypeId]) -> (Vec<ComponentTypeId>, AHashMap<ComponentTypeId, Box<dyn Column>>) {
        let mut types = base.types.clone();
        for t in add {
            if !types.contains(t) {
                types.push(*t);
            }
        }
        let base_data = base.read();
        let mut columns = AHashMap::new();
        for (type_id, column) in base_data.columns.iter() {
            columns.insert(*type_id, column.clone_empty());
        }
        (types, columns)
    }
}

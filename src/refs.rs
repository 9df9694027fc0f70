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

//! `Ref<T>`: a cached handle to one component value, validated lazily
//! against its archetype's change counter rather than kept alive behind a
//! lock (spec §3/§4.5).

use std::marker::PhantomData;
use std::sync::Arc;

use crate::archetype::ArchetypeCell;
use crate::component::Component;
use crate::error::{EcsError, Result};

/// A lazily-validated reference to component `T` on one entity's row.
///
/// `Ref` holds no lock: it snapshots the owning archetype's change counter
/// at capture time and re-checks it on every access, failing
/// [`EcsError::StaleRef`] if a structural change happened in between (spec
/// §4.5: "no locking is performed by Ref itself; staleness is detected,
/// not prevented").
pub struct Ref<T> {
    archetype: Arc<ArchetypeCell>,
    row: usize,
    snapshot: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> Ref<T> {
    pub(crate) fn capture(archetype: Arc<ArchetypeCell>, row: usize) -> Result<Self> {
        let snapshot = archetype.change_counter();
        archetype.read().get::<T>(row)?;
        Ok(Self { archetype, row, snapshot, _marker: PhantomData })
    }

    /// Run `f` against the referenced value if it is still valid.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        if self.archetype.change_counter() != self.snapshot {
            return Err(EcsError::StaleRef);
        }
        let data = self.archetype.read();
        if self.archetype.change_counter() != self.snapshot {
            return Err(EcsError::StaleRef);
        }
        data.get::<T>(self.row).map(f)
    }

    /// Convenience for `Clone` component values.
    pub fn get(&self) -> Result<T>
    where
        T: Clone,
    {
        self.with(|v| v.clone())
    }

    /// Whether this reference is still valid, without producing a value.
    pub fn is_stale(&self) -> bool {
        self.archetype.change_counter() != self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::TypedColumn;
    use crate::handle::Handle;
    use crate::typeid::{handle_type_id, type_id_of};
    use ahash::AHashMap;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Hp(i32);

    fn archetype_with_one_hp(value: i32) -> Arc<ArchetypeCell> {
        let mut columns: AHashMap<_, Box<dyn crate::column::Column>> = AHashMap::new();
        columns.insert(handle_type_id(), Box::new(TypedColumn::<Handle>::new()));
        columns.insert(type_id_of::<Hp>(), Box::new(TypedColumn::<Hp>::new()));
        let arch = Arc::new(ArchetypeCell::new(vec![handle_type_id(), type_id_of::<Hp>()], columns));
        let mut data = arch.write();
        data.insert_handle(Handle::default());
        data.columns_mut()
            .get_mut(&type_id_of::<Hp>())
            .unwrap()
            .as_any_mut()
            .downcast_mut::<TypedColumn<Hp>>()
            .unwrap()
            .push(Hp(value));
        drop(data);
        arch
    }

    #[test]
    fn fresh_ref_reads_current_value() {
        let arch = archetype_with_one_hp(10);
        let r = Ref::<Hp>::capture(arch, 0).unwrap();
        assert_eq!(r.get().unwrap(), Hp(10));
    }

    #[test]
    fn structural_change_invalidates_ref() {
        let arch = archetype_with_one_hp(10);
        let r = Ref::<Hp>::capture(arch.clone(), 0).unwrap();
        arch.bump_on_structural_change();
        assert!(r.is_stale());
        assert_eq!(r.get(), Err(EcsError::StaleRef));
    }
}

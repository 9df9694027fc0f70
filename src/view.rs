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

//! Views: a snapshot of the archetypes matching an include/exclude
//! predicate, iterated in archetype-insertion order (spec §3/§4.4).
//!
//! A view's archetype list is materialized once, the first time it is
//! iterated or handed to the manager for parallel dispatch — later
//! structural changes are simply not reflected (spec §9 Open Question:
//! "views are snapshot-only; no live-updating variant").

use std::marker::PhantomData;
use std::sync::Arc;

use crate::archetype::ArchetypeCell;
use crate::component::Component;
use crate::error::Result;

/// A materialized, single-component view over every archetype matching a
/// `GetView` predicate.
pub struct View<T> {
    matches: Vec<(Arc<ArchetypeCell>, usize)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> View<T> {
    pub(crate) fn materialize(matches: Vec<(Arc<ArchetypeCell>, usize)>) -> Self {
        Self { matches, _marker: PhantomData }
    }

    /// Total number of rows across every matched archetype, as of
    /// materialization.
    pub fn len(&self) -> usize {
        self.matches.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of archetypes this view matched.
    pub fn archetype_count(&self) -> usize {
        self.matches.len()
    }

    /// Visit every matched row, archetype by archetype in insertion order,
    /// row `0..size` within each (spec §4.4 iteration order).
    pub fn for_each(&self, mut f: impl FnMut(&T)) -> Result<()> {
        for (arch, size) in &self.matches {
            let data = arch.read();
            for row in 0..*size {
                f(data.get::<T>(row)?);
            }
        }
        Ok(())
    }

    /// Visit every matched row mutably. Each archetype is locked for
    /// exclusive access for the duration of its own sub-iteration only.
    pub fn for_each_mut(&self, mut f: impl FnMut(&mut T)) -> Result<()> {
        for (arch, size) in &self.matches {
            let mut data = arch.write();
            for row in 0..*size {
                f(data.get_mut::<T>(row)?);
            }
        }
        Ok(())
    }

    /// The matched archetypes and their snapshot-time row counts, for the
    /// manager to dispatch one worker task per archetype (spec §4.6).
    pub(crate) fn archetypes(&self) -> &[(Arc<ArchetypeCell>, usize)] {
        &self.matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, TypedColumn};
    use crate::handle::Handle;
    use crate::typeid::{handle_type_id, type_id_of};
    use ahash::AHashMap;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Counter(i32);

    fn archetype_with(values: &[i32]) -> Arc<ArchetypeCell> {
        let mut columns: AHashMap<_, Box<dyn Column>> = AHashMap::new();
        columns.insert(handle_type_id(), Box::new(TypedColumn::<Handle>::new()));
        columns.insert(type_id_of::<Counter>(), Box::new(TypedColumn::<Counter>::new()));
        let arch = Arc::new(ArchetypeCell::new(vec![handle_type_id(), type_id_of::<Counter>()], columns));
        let mut data = arch.write();
        for v in values {
            data.insert_handle(Handle::default());
            data.columns_mut()
                .get_mut(&type_id_of::<Counter>())
                .unwrap()
                .as_any_mut()
                .downcast_mut::<TypedColumn<Counter>>()
                .unwrap()
                .push(Counter(*v));
        }
        drop(data);
        arch
    }

    #[test]
    fn for_each_visits_in_order() {
        let a = archetype_with(&[1, 2]);
        let b = archetype_with(&[3]);
        let view = View::<Counter>::materialize(vec![(a, 2), (b, 1)]);
        let mut seen = Vec::new();
        view.for_each(|c| seen.push(c.0)).unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn for_each_mut_updates_in_place() {
        let a = archetype_with(&[1, 2]);
        let view = View::<Counter>::materialize(vec![(a.clone(), 2)]);
        view.for_each_mut(|c| c.0 += 100).unwrap();
        let data = a.read();
        assert_eq!(*data.get::<Counter>(0).unwrap(), Counter(101));
        assert_eq!(*data.get::<Counter>(1).unwrap(), Counter(102));
    }

    #[test]
    fn len_sums_across_archetypes() {
        let a = archetype_with(&[1, 2]);
        let b = archetype_with(&[3]);
        let view = View::<Counter>::materialize(vec![(a, 2), (b, 1)]);
        assert_eq!(view.len(), 3);
        assert_eq!(view.archetype_count(), 2);
    }
}

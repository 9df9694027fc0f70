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

//! Component, Bundle and type-list traits.
//!
//! Components are plain data attached to entities. `Bundle` groups several
//! components together for `Insert`/`Put`; `TypeList` is the weaker,
//! value-less counterpart used by `GetView` to describe an include set at
//! compile time. Both lower, at the implementation level, to runtime sets of
//! `ComponentTypeId` (spec §9: "compile-time type lists... reduce, at the
//! specification level, to runtime predicates over sets of TypeIds").

use ahash::AHashMap;
use smallvec::{smallvec, SmallVec};

use crate::column::{Column, TypedColumn};
use crate::typeid::{type_id_of, ComponentTypeId};

/// Maximum number of components a `Bundle`/`TypeList` tuple impl supports.
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// Fixed-capacity scratch storage for a type set, sized for the common case.
pub type TypeIdSet = SmallVec<[ComponentTypeId; MAX_BUNDLE_COMPONENTS]>;

/// Marker trait for components. Components must be `'static`, safely
/// shareable across the worker threads that iterate views in parallel, and
/// `Clone` — every column needs to deep-copy a row when an entity migrates
/// between archetypes (spec §4.2 "move between archetypes").
pub trait Component: 'static + Clone + Send + Sync {}

impl<T: 'static + Clone + Send + Sync> Component for T {}

/// A compile-time list of component types, lowered to a runtime
/// `ComponentTypeId` set. Implemented for tuples of up to
/// [`MAX_BUNDLE_COMPONENTS`] component types.
pub trait TypeList {
    /// The runtime type-id set this list lowers to.
    fn type_ids() -> TypeIdSet;
}

/// A tuple of components that can be written into an archetype's columns in
/// one shot, used by `Insert`/`Put`.
pub trait Bundle: TypeList + Send + Sync + 'static {
    /// Build one freshly empty, correctly-typed column per component in the
    /// bundle — used when a brand-new archetype is created to host it.
    fn empty_columns() -> SmallVec<[(ComponentTypeId, Box<dyn Column>); MAX_BUNDLE_COMPONENTS]>
    where
        Self: Sized;

    /// Push this bundle's values into already-typed columns keyed by type id.
    ///
    /// # Panics
    /// Panics if `columns` is missing an entry for one of the bundle's
    /// types, or if an entry's concrete type doesn't match — both indicate
    /// an archetype was built with the wrong column set, an internal
    /// invariant violation rather than a reportable error (spec §7).
    fn push_into(self, columns: &mut AHashMap<ComponentTypeId, Box<dyn Column>>)
    where
        Self: Sized;

    /// Overwrite `row` in already-typed columns with this bundle's values,
    /// used by `Put`'s same-archetype fast path. Same panic contract as
    /// [`Bundle::push_into`].
    fn overwrite_into(self, columns: &mut AHashMap<ComponentTypeId, Box<dyn Column>>, row: usize)
    where
        Self: Sized;
}

macro_rules! impl_type_list {
    ($($T:ident),*) => {
        impl<$($T: Component),*> TypeList for ($($T,)*) {
            fn type_ids() -> TypeIdSet {
                smallvec![$(type_id_of::<$T>()),*]
            }
        }

        impl<$($T: Component),*> Bundle for ($($T,)*) {
            fn empty_columns() -> SmallVec<[(ComponentTypeId, Box<dyn Column>); MAX_BUNDLE_COMPONENTS]> {
                smallvec![$((type_id_of::<$T>(), Box::new(TypedColumn::<$T>::new()) as Box<dyn Column>)),*]
            }

            #[allow(non_snake_case)]
            fn push_into(self, columns: &mut AHashMap<ComponentTypeId, Box<dyn Column>>) {
                let ($($T,)*) = self;
                $(
                    let column = columns
                        .get_mut(&type_id_of::<$T>())
                        .expect("archetype missing column for bundle type");
                    column
                        .as_any_mut()
                        .downcast_mut::<TypedColumn<$T>>()
                        .expect("archetype column type mismatch for bundle type")
                        .push($T);
                )*
            }

            #[allow(non_snake_case)]
            fn overwrite_into(self, columns: &mut AHashMap<ComponentTypeId, Box<dyn Column>>, row: usize) {
                let ($($T,)*) = self;
                $(
                    let column = columns
                        .get_mut(&type_id_of::<$T>())
                        .expect("archetype missing column for bundle type");
                    column
                        .as_any_mut()
                        .downcast_mut::<TypedColumn<$T>>()
                        .expect("archetype column type mismatch for bundle type")
                        .set(row, $T)
                        .expect("row within bounds for same-archetype overwrite");
                )*
            }
        }
    };
}

impl_type_list!(A);
impl_type_list!(A, B);
impl_type_list!(A, B, C);
impl_type_list!(A, B, C, D);
impl_type_list!(A, B, C, D, E);
impl_type_list!(A, B, C, D, E, F);
impl_type_list!(A, B, C, D, E, F, G);
impl_type_list!(A, B, C, D, E, F, G, H);

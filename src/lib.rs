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

//! An archetype-based entity-component-storage engine.
//!
//! Entities are opaque [`Handle`]s. Components live in densely packed,
//! per-archetype columns (struct-of-arrays), one archetype per distinct
//! set of component types an entity carries. [`Registry`] owns the
//! archetypes and the slot map that resolves handles to rows; [`Manager`]
//! pairs a registry with a [`ThreadPool`] for parallel bulk operations.
//!
//! ```
//! use archetype_ecs::prelude::*;
//!
//! #[derive(Clone, Copy)]
//! struct Position { x: f32, y: f32 }
//! #[derive(Clone, Copy)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let registry = Registry::new();
//! let h = registry.insert((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
//! registry.get::<Position, _>(h, |p| assert_eq!(p.x, 0.0)).unwrap();
//! ```

pub mod archetype;
pub mod column;
pub mod component;
pub mod error;
pub mod handle;
pub mod manager;
pub mod refs;
pub mod registry;
pub mod slotmap;
pub mod snapshot;
pub mod threadpool;
mod typeid;
pub mod view;

pub use archetype::{ArchetypeCell, ArchetypeData};
pub use column::{Column, TypedColumn};
pub use component::{Bundle, Component, TypeList};
pub use error::{EcsError, Result};
pub use handle::Handle;
pub use manager::{EngineConfig, Manager};
pub use refs::Ref;
pub use registry::Registry;
pub use slotmap::{Location, SlotMap};
pub use snapshot::{ArchetypeSnapshot, SnapshotDoc, SnapshotSupplier};
pub use threadpool::ThreadPool;
pub use typeid::{type_id_of, ComponentTypeId};
pub use view::View;

pub mod prelude {
    //! Convenience re-exports for the common case: a registry, bundles,
    //! handles, and views.
    pub use crate::component::{Bundle, Component, TypeList};
    pub use crate::error::{EcsError, Result};
    pub use crate::handle::Handle;
    pub use crate::manager::{EngineConfig, Manager};
    pub use crate::refs::Ref;
    pub use crate::registry::Registry;
    pub use crate::snapshot::SnapshotSupplier;
    pub use crate::threadpool::ThreadPool;
    pub use crate::typeid::type_id_of;
    pub use crate::view::View;
}

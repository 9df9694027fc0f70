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

//! Type-erased, densely packed component storage (spec §4.1).
//!
//! `Column` is the trait-object seam: an abstract base with one concrete
//! per-type implementor (`TypedColumn<T>`), per spec §9's "abstract base
//! with a concrete per-type subclass" option — chosen over the teacher's
//! raw-byte-buffer erasure because `Any`-downcasting removes most of the
//! unsafe surface without changing any externally observable behavior.

use std::any::Any;

use crate::error::{EcsError, Result};
use crate::typeid::{type_id_of, ComponentTypeId};

/// A type-erased column of component values, one row per live entity.
///
/// Invariant: within one archetype, every column's `len()` equals the
/// archetype's row count (spec §3).
pub trait Column: Send + Sync {
    /// Number of values currently stored.
    fn len(&self) -> usize;

    /// True iff `len() == 0`.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The component type this column stores.
    fn type_id(&self) -> ComponentTypeId;

    /// Swap-remove `row`, truncating by one. Returns the row that now holds
    /// what used to be the last element (`row` itself if it was already
    /// last), so the caller can re-index the moved entity (spec §4.1/§4.2).
    fn erase(&mut self, row: usize) -> Result<usize>;

    /// Exchange two rows in place; no size change.
    fn swap(&mut self, a: usize, b: usize) -> Result<()>;

    /// Produce a new, empty column of the same element type.
    fn clone_empty(&self) -> Box<dyn Column>;

    /// Append a deep copy of `other[other_row]`.
    ///
    /// Fails with [`EcsError::TypeMismatch`] if `other`'s element type
    /// differs from this column's, [`EcsError::OutOfRange`] if
    /// `other_row >= other.len()`.
    fn copy_from(&mut self, other: &dyn Column, other_row: usize) -> Result<()>;

    /// Borrow this column as `Any`, for downcasting to `TypedColumn<T>`.
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow this column as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Concrete, densely packed storage for one component type.
pub struct TypedColumn<T: 'static + Send + Sync> {
    data: Vec<T>,
}

impl<T: 'static + Send + Sync> TypedColumn<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Append `v`, returning its row index (previous length).
    pub fn push(&mut self, v: T) -> usize {
        self.data.push(v);
        self.data.len() - 1
    }

    pub fn get(&self, row: usize) -> Result<&T> {
        self.data.get(row).ok_or(EcsError::OutOfRange)
    }

    pub fn get_mut(&mut self, row: usize) -> Result<&mut T> {
        self.data.get_mut(row).ok_or(EcsError::OutOfRange)
    }

    pub fn set(&mut self, row: usize, v: T) -> Result<()> {
        *self.data.get_mut(row).ok_or(EcsError::OutOfRange)? = v;
        Ok(())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: 'static + Send + Sync> Default for TypedColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static + Clone + Send + Sync> Column for TypedColumn<T> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn type_id(&self) -> ComponentTypeId {
        type_id_of::<T>()
    }

    fn erase(&mut self, row: usize) -> Result<usize> {
        if row >= self.data.len() {
            return Err(EcsError::OutOfRange);
        }
        self.data.swap_remove(row);
        // swap_remove already moved the old tail into `row` (a no-op if
        // `row` was the tail); either way the moved element now lives at
        // `row`, which is what the caller re-indexes in the slot map.
        Ok(row)
    }

    fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        if a >= self.data.len() || b >= self.data.len() {
            return Err(EcsError::OutOfRange);
        }
        self.data.swap(a, b);
        Ok(())
    }

    fn clone_empty(&self) -> Box<dyn Column> {
        Box::new(TypedColumn::<T>::new())
    }

    fn copy_from(&mut self, other: &dyn Column, other_row: usize) -> Result<()> {
        let other = other
            .as_any()
            .downcast_ref::<TypedColumn<T>>()
            .ok_or(EcsError::TypeMismatch)?;
        let value = other.get(other_row)?.clone();
        self.data.push(value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

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

//! Error types

use std::fmt;

use crate::typeid::ComponentTypeId;

/// ECS error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Handle generation no longer matches the live slot.
    DeadHandle,

    /// The archetype backing a handle does not carry the requested component.
    MissingComponent(ComponentTypeId),

    /// A column operation was attempted between incompatible element types.
    TypeMismatch,

    /// A row index was out of range for the column/archetype it was applied to.
    OutOfRange,

    /// A `Ref<T>` was dereferenced after its archetype's change counter moved on.
    StaleRef,

    /// Attempted to add a component type an entity already carries.
    DuplicateType(ComponentTypeId),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::DeadHandle => write!(f, "handle refers to a destroyed entity"),
            EcsError::MissingComponent(t) => write!(f, "archetype lacks component type {t:?}"),
            EcsError::TypeMismatch => write!(f, "column operation between incompatible element types"),
            EcsError::OutOfRange => write!(f, "row index out of range"),
            EcsError::StaleRef => write!(f, "Ref accessed after its archetype changed"),
            EcsError::DuplicateType(t) => write!(f, "component type {t:?} already present"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;

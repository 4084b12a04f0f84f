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

//! Component trait and the process-wide type registry.
//!
//! Components are plain value types identified by a dense `u8` id assigned
//! on first encounter. The registry never releases ids: `ComponentTypeId`
//! values are stable for the lifetime of a `World`.

use std::any::TypeId;

use rustc_hash::FxHashMap;

/// Maximum number of distinct component types a single registry can hold.
pub const MAX_COMPONENTS: usize = 256;

/// Marker trait for plain-value component types.
///
/// Components must tolerate a raw byte copy during archetype migration, so
/// no `Drop` impl, no self-referential pointers, no borrowed data.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Dense identifier for a registered component type, in `0..MAX_COMPONENTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeId(pub(crate) u8);

impl ComponentTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Maps component `TypeId`s to dense `ComponentTypeId`s and records byte
/// sizes. Monotonic: once assigned, an id is never reused or freed.
#[derive(Default)]
pub struct ComponentRegistry {
    type_to_id: FxHashMap<TypeId, ComponentTypeId>,
    id_to_type: Vec<TypeId>,
    sizes: Vec<usize>,
    aligns: Vec<usize>,
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the id already assigned to `T`, without assigning a new one.
    pub fn id_of<T: Component>(&self) -> Option<ComponentTypeId> {
        self.type_to_id.get(&TypeId::of::<T>()).copied()
    }

    /// Return the id for `T`, assigning a fresh one on first encounter.
    ///
    /// # Panics
    /// Panics if more than [`MAX_COMPONENTS`] distinct component types have
    /// already been registered — this is the spec's "component type registry
    /// exhausted" fatal condition (never recoverable, never silently
    /// truncated).
    pub fn get_or_assign<T: Component>(&mut self) -> ComponentTypeId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.type_to_id.get(&type_id) {
            return id;
        }
        assert!(
            self.id_to_type.len() < MAX_COMPONENTS,
            "component type registry exhausted: more than {MAX_COMPONENTS} distinct component types"
        );
        let id = ComponentTypeId(self.id_to_type.len() as u8);
        self.type_to_id.insert(type_id, id);
        self.id_to_type.push(type_id);
        self.sizes.push(std::mem::size_of::<T>());
        self.aligns.push(std::mem::align_of::<T>());
        self.names.push(std::any::type_name::<T>());
        id
    }

    pub fn size_of(&self, id: ComponentTypeId) -> usize {
        self.sizes[id.index()]
    }

    pub fn align_of(&self, id: ComponentTypeId) -> usize {
        self.aligns[id.index()]
    }

    pub fn type_of(&self, id: ComponentTypeId) -> TypeId {
        self.id_to_type[id.index()]
    }

    pub fn name_of(&self, id: ComponentTypeId) -> &'static str {
        self.names[id.index()]
    }

    pub fn len(&self) -> usize {
        self.id_to_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_type.is_empty()
    }
}

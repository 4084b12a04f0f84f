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

//! Entity handles and the generational metadata table.
//!
//! An [`Entity`] is a `{id, version}` pair. `id` indexes a recyclable slot
//! in [`EntityRegistry`]; `version` is the generation stamped into that slot
//! when it was last allocated. A handle is only valid while its version
//! matches the slot's current version — the sole source of "stale entity"
//! errors (spec.md §3, §7).

/// A lightweight, `Copy` entity handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub id: u32,
    pub version: u32,
}

/// Per-slot bookkeeping: where the entity's row currently lives.
///
/// `version == 0` means the slot is free. A live slot's `archetype_index`,
/// `chunk_index`, and `row` always point at the row holding this entity's
/// data (spec.md §3 invariant).
#[derive(Debug, Clone, Copy)]
pub struct EntityMeta {
    pub archetype_index: i32,
    pub chunk_index: i32,
    pub row: i32,
    pub version: u32,
}

impl EntityMeta {
    const FREE: EntityMeta = EntityMeta {
        archetype_index: -1,
        chunk_index: -1,
        row: -1,
        version: 0,
    };
}

/// Owns the entity metadata table and the free-id stack.
///
/// Capacity grows by doubling (at least); freed ids are recycled LIFO, so
/// the most recently freed id is the next one handed out.
pub struct EntityRegistry {
    metas: Vec<EntityMeta>,
    free_ids: Vec<u32>,
    next_version: u32,
}

impl EntityRegistry {
    /// Create a registry pre-sized for `initial_capacity` live entities.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        let mut reg = Self {
            metas: Vec::new(),
            free_ids: Vec::new(),
            next_version: 1,
        };
        if initial_capacity > 0 {
            reg.grow_to(initial_capacity);
        }
        reg
    }

    pub fn capacity(&self) -> usize {
        self.metas.len()
    }

    pub fn meta(&self, id: u32) -> Option<&EntityMeta> {
        self.metas.get(id as usize)
    }

    pub fn meta_mut(&mut self, id: u32) -> Option<&mut EntityMeta> {
        self.metas.get_mut(id as usize)
    }

    /// `e.id < capacity && slot is live && slot.version == e.version`.
    pub fn is_valid(&self, e: Entity) -> bool {
        match self.metas.get(e.id as usize) {
            Some(meta) => meta.version != 0 && meta.version == e.version,
            None => false,
        }
    }

    /// Pop a free id (growing capacity first if none are available),
    /// stamp it with `next_version`, and return the new handle alongside
    /// its freshly-allocated (but not yet positioned) meta slot index.
    pub fn allocate(&mut self) -> Entity {
        if self.free_ids.is_empty() {
            let old_cap = self.metas.len();
            self.grow_to(old_cap.max(1) * 2);
        }
        let id = self.free_ids.pop().expect("grow_to must seed free_ids");
        let version = self.next_version;
        self.next_version = self
            .next_version
            .checked_add(1)
            .expect("entity version counter overflow");
        self.metas[id as usize] = EntityMeta {
            archetype_index: -1,
            chunk_index: -1,
            row: -1,
            version,
        };
        Entity { id, version }
    }

    /// Reserve `n` free ids in one shot (growing capacity if needed) and
    /// stamp each with a fresh version, returning the handles in allocation
    /// order. Used by batch creation (spec.md §4.4 append-batch).
    pub fn allocate_many(&mut self, n: usize) -> Vec<Entity> {
        if self.free_ids.len() < n {
            let old_cap = self.metas.len();
            let needed = n - self.free_ids.len();
            self.grow_to((old_cap * 2).max(old_cap + needed));
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let id = self.free_ids.pop().expect("reserved above");
            let version = self.next_version;
            self.next_version = self
                .next_version
                .checked_add(1)
                .expect("entity version counter overflow");
            self.metas[id as usize] = EntityMeta {
                archetype_index: -1,
                chunk_index: -1,
                row: -1,
                version,
            };
            out.push(Entity { id, version });
        }
        out
    }

    /// Mark `e`'s slot dead and push its id back onto the free stack.
    /// No-op (returns `false`) if `e` is already stale.
    pub fn free(&mut self, e: Entity) -> bool {
        if !self.is_valid(e) {
            return false;
        }
        self.metas[e.id as usize] = EntityMeta::FREE;
        self.free_ids.push(e.id);
        true
    }

    /// Reset every slot to free, refill the free stack with every id, and
    /// reset `next_version` to 1 (spec.md §9 Open Question: chosen because
    /// all prior handles are stale regardless once every slot is cleared).
    pub fn clear_all(&mut self) {
        for meta in self.metas.iter_mut() {
            *meta = EntityMeta::FREE;
        }
        self.free_ids.clear();
        for id in (0..self.metas.len() as u32).rev() {
            self.free_ids.push(id);
        }
        self.next_version = 1;
    }

    /// Grow `metas`/`free_ids` to at least `new_cap`, seeding freshly
    /// appended ids onto the free stack in reverse so pops produce the
    /// lowest free id first.
    fn grow_to(&mut self, new_cap: usize) {
        let old_cap = self.metas.len();
        if new_cap <= old_cap {
            return;
        }
        self.metas.resize(new_cap, EntityMeta::FREE);
        for id in (old_cap as u32..new_cap as u32).rev() {
            self.free_ids.push(id);
        }
    }
}

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

//! `World`: composes the component registry, archetype index, and entity
//! registry; owns entity lifecycle and structural mutation (spec.md §4.6).

#[cfg(feature = "profiling")]
use tracing::trace_span;

use crate::archetype::{ComponentSpec, RemoveEffects};
use crate::archetype_index::ArchetypeIndex;
use crate::bitmask::BitMask256;
use crate::bundle::{Bundle, ComponentSet, SetBundle};
use crate::component::{Component, ComponentRegistry, ComponentTypeId};
use crate::entity::{Entity, EntityRegistry};
use crate::error::{EcsError, Result};
use crate::resources::Resources;

/// A snapshot of the core's memory footprint, for diagnostics only —
/// never consulted by the storage algorithm itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStats {
    pub entity_index_bytes: usize,
    pub archetype_struct_bytes: usize,
    pub component_column_bytes: usize,
    pub total_bytes: usize,
}

/// Build the mask that a set of component specs belongs to.
pub fn mask_from_specs(specs: &[ComponentSpec]) -> BitMask256 {
    let mut mask = BitMask256::EMPTY;
    for spec in specs {
        mask.set(spec.id);
    }
    mask
}

pub struct World {
    entities: EntityRegistry,
    archetypes: ArchetypeIndex,
    components: ComponentRegistry,
    resources: Resources,
    mutation_version: u64,
}

impl World {
    /// Create a world with its entity table pre-sized for `initial_capacity`
    /// and the empty archetype already built.
    pub fn new(initial_capacity: usize) -> Self {
        let mut archetypes = ArchetypeIndex::new();
        archetypes.get_or_create(BitMask256::EMPTY, &[]);
        Self {
            entities: EntityRegistry::with_capacity(initial_capacity),
            archetypes,
            components: ComponentRegistry::new(),
            resources: Resources::new(),
            mutation_version: 0,
        }
    }

    /// Approximate memory footprint, for diagnostics only.
    pub fn memory_stats(&self) -> MemoryStats {
        let entity_index_bytes = self.entities.capacity()
            * std::mem::size_of::<crate::entity::EntityMeta>();
        let archetype_struct_bytes =
            self.archetypes.len() * std::mem::size_of::<crate::archetype::Archetype>();
        let mut component_column_bytes = 0usize;
        for arch in self.archetypes.iter() {
            let per_chunk: usize = arch
                .comp_order()
                .iter()
                .map(|&cid| arch.comp_size(cid) * crate::archetype::CHUNK_SIZE)
                .sum();
            component_column_bytes += per_chunk * arch.chunk_count();
        }
        MemoryStats {
            entity_index_bytes,
            archetype_struct_bytes,
            component_column_bytes,
            total_bytes: entity_index_bytes + archetype_struct_bytes + component_column_bytes,
        }
    }

    // ---- resources (side-car, outside the storage core) -----------------

    pub fn insert_resource<R: Send + Sync + 'static>(&mut self, value: R) -> Option<R> {
        self.resources.insert(value)
    }

    pub fn resource<R: 'static>(&self) -> Option<&R> {
        self.resources.get::<R>()
    }

    pub fn resource_mut<R: 'static>(&mut self) -> Option<&mut R> {
        self.resources.get_mut::<R>()
    }

    pub fn has_resource<R: 'static>(&self) -> bool {
        self.resources.contains::<R>()
    }

    pub fn remove_resource<R: 'static>(&mut self) -> Option<R> {
        self.resources.remove::<R>()
    }

    pub fn mutation_version(&self) -> u64 {
        self.mutation_version
    }

    pub fn archetype_version(&self) -> u64 {
        self.archetypes.archetype_version()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn entity_capacity(&self) -> usize {
        self.entities.capacity()
    }

    pub(crate) fn archetypes(&self) -> &ArchetypeIndex {
        &self.archetypes
    }

    pub(crate) fn archetypes_mut(&mut self) -> &mut ArchetypeIndex {
        &mut self.archetypes
    }

    /// Look up the id already assigned to `T`, without registering it.
    pub fn component_id<T: Component>(&self) -> Option<ComponentTypeId> {
        self.components.id_of::<T>()
    }

    /// Mark every entity in `es` dead and recycle its id, without touching
    /// any archetype (the caller has already emptied their rows). Used by
    /// [`crate::query::Query::remove_entities`].
    pub(crate) fn free_entities_bulk(&mut self, es: &[Entity]) {
        for &e in es {
            self.entities.free(e);
        }
        self.mutation_version += 1;
    }

    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        self.components.get_or_assign::<T>()
    }

    pub fn component_spec<T: Component>(&mut self) -> ComponentSpec {
        let id = self.register_component::<T>();
        ComponentSpec {
            id,
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
        }
    }

    pub fn is_valid(&self, e: Entity) -> bool {
        self.entities.is_valid(e)
    }

    // ---- lifecycle -----------------------------------------------------

    /// Append a fresh, uninitialized row to the archetype for `mask`
    /// (creating it from `specs` if this mask hasn't been seen before).
    /// Component cells are not written; callers typically create into the
    /// empty archetype and populate via `set_component`.
    pub fn create_entity_in(&mut self, mask: BitMask256, specs: &[ComponentSpec]) -> Entity {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("create_entity_in").entered();

        let arch_idx = self.archetypes.get_or_create(mask, specs);
        let e = self.entities.allocate();
        let (chunk_idx, row) = self.archetypes.archetype_mut(arch_idx).append_row(e);
        let meta = self
            .entities
            .meta_mut(e.id)
            .expect("entity was just allocated");
        meta.archetype_index = arch_idx as i32;
        meta.chunk_index = chunk_idx as i32;
        meta.row = row as i32;
        self.mutation_version += 1;
        e
    }

    /// Spawn a fresh entity directly into the archetype for `B`'s component
    /// set, writing every value in one append (spec.md §6 `Builder_K`).
    /// Skips the per-component migrations that K calls to `set_component`
    /// would otherwise trigger.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Entity {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("spawn").entered();

        let specs = B::specs(self);
        let mask = mask_from_specs(&specs);
        let arch_idx = self.archetypes.get_or_create(mask, &specs);
        let e = self.entities.allocate();
        let (chunk_idx, row) = self.archetypes.archetype_mut(arch_idx).append_row(e);
        {
            let arch = self.archetypes.archetype(arch_idx);
            let ptrs: Vec<*mut u8> = specs
                .iter()
                // SAFETY: cid is present in arch's mask (just created from
                // these exact specs); row was just appended.
                .map(|s| unsafe { arch.cell_ptr(chunk_idx, row, s.id) })
                .collect();
            // SAFETY: ptrs has one writable, correctly aligned entry per spec.
            unsafe { bundle.write(&ptrs) };
        }
        let meta = self
            .entities
            .meta_mut(e.id)
            .expect("entity was just allocated");
        meta.archetype_index = arch_idx as i32;
        meta.chunk_index = chunk_idx as i32;
        meta.row = row as i32;
        self.mutation_version += 1;
        e
    }

    /// K-ary `set_component` (spec.md §6 `SetComponent_K`): writes every
    /// member of `bundle` in a single structural-mutation call instead of K
    /// separate ones, so only one migration happens if any member is new.
    pub fn set_components<B: SetBundle>(&mut self, e: Entity, bundle: B) -> Result<()> {
        let ops = bundle.ops(self);
        self.set_components_raw(e, &ops)
    }

    /// K-ary `remove_component` (spec.md §6 `RemoveComponent_K`).
    pub fn remove_components<S: ComponentSet>(&mut self, e: Entity) -> Result<()> {
        let ids = S::ids(self);
        self.remove_components_raw(e, &ids)
    }

    /// Batch form of [`Self::create_entity_in`]: one `mutation_version` bump
    /// for the whole call (spec.md §4.5 `create_many_in`).
    pub fn create_entities_in(
        &mut self,
        mask: BitMask256,
        specs: &[ComponentSpec],
        n: usize,
    ) -> Vec<Entity> {
        if n == 0 {
            return Vec::new();
        }
        let arch_idx = self.archetypes.get_or_create(mask, specs);
        let ids = self.entities.allocate_many(n);
        let mut out = Vec::with_capacity(n);
        for e in ids {
            let (chunk_idx, row) = self.archetypes.archetype_mut(arch_idx).append_row(e);
            let meta = self
                .entities
                .meta_mut(e.id)
                .expect("entity was just allocated");
            meta.archetype_index = arch_idx as i32;
            meta.chunk_index = chunk_idx as i32;
            meta.row = row as i32;
            out.push(e);
        }
        self.mutation_version += 1;
        out
    }

    /// Validate, remove from its archetype, and recycle `e`'s id.
    /// No-op if `e` is already stale.
    pub fn remove_entity(&mut self, e: Entity) -> Result<()> {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("despawn").entered();

        if !self.entities.is_valid(e) {
            return Err(EcsError::StaleEntity(e));
        }
        let meta = *self.entities.meta(e.id).expect("validated above");
        let arch_idx = meta.archetype_index as usize;
        let chunk_idx = meta.chunk_index as usize;
        let row = meta.row as usize;

        let effects = self
            .archetypes
            .archetype_mut(arch_idx)
            .remove_swap(chunk_idx, row);
        self.apply_remove_effects(arch_idx, effects);

        self.entities.free(e);
        self.mutation_version += 1;
        Ok(())
    }

    /// Loop [`Self::remove_entity`] over `es`, ignoring entities already stale.
    pub fn remove_entities(&mut self, es: &[Entity]) {
        for &e in es {
            let _ = self.remove_entity(e);
        }
    }

    /// Drop every row in every archetype and reset the entity table.
    /// Resets `next_entity_version` to 1 (spec.md §9 Open Question), so
    /// every prior `Entity` handle is stale afterward.
    pub fn clear_entities(&mut self) {
        self.archetypes.clear_all_rows();
        self.entities.clear_all();
        self.mutation_version += 1;
    }

    // ---- accessors -------------------------------------------------------

    pub fn get_component<T: Component>(&self, e: Entity) -> Option<&T> {
        let cid = self.components.id_of::<T>()?;
        if !self.entities.is_valid(e) {
            return None;
        }
        let meta = self.entities.meta(e.id)?;
        let arch = self.archetypes.archetype(meta.archetype_index as usize);
        if !arch.mask().contains_bit(cid) {
            return None;
        }
        // SAFETY: cid is present in arch's mask and (chunk, row) addresses
        // e's live row, so the cell is a valid, initialized T.
        unsafe {
            let ptr = arch.cell_ptr(meta.chunk_index as usize, meta.row as usize, cid) as *const T;
            Some(&*ptr)
        }
    }

    pub fn get_component_mut<T: Component>(&mut self, e: Entity) -> Option<&mut T> {
        let cid = self.components.id_of::<T>()?;
        if !self.entities.is_valid(e) {
            return None;
        }
        let meta = *self.entities.meta(e.id)?;
        let arch = self.archetypes.archetype(meta.archetype_index as usize);
        if !arch.mask().contains_bit(cid) {
            return None;
        }
        // SAFETY: same as get_component; &mut self ensures exclusive access.
        unsafe {
            let ptr = arch.cell_ptr(meta.chunk_index as usize, meta.row as usize, cid) as *mut T;
            Some(&mut *ptr)
        }
    }

    /// Set a single component, registering its type on first use.
    pub fn set_component<T: Component>(&mut self, e: Entity, value: T) -> Result<()> {
        let cid = self.components.get_or_assign::<T>();
        self.set_components_raw(e, &[(cid, &value as *const T as *const u8)])
    }

    /// Remove a single component. No-op (not an error) if `T` was never
    /// registered or is not present on `e`.
    pub fn remove_component<T: Component>(&mut self, e: Entity) -> Result<()> {
        match self.components.id_of::<T>() {
            Some(cid) => self.remove_components_raw(e, &[cid]),
            None => {
                if self.entities.is_valid(e) {
                    Ok(())
                } else {
                    Err(EcsError::StaleEntity(e))
                }
            }
        }
    }

    /// General K-ary "set these components" primitive (spec.md §4.6).
    /// `writes` is `(component id, pointer to K bytes of value data)`; the
    /// N-ary typed wrappers (`SetComponent_K`) build this from a tuple.
    ///
    /// # Panics
    /// Panics if `writes` names the same component id twice — a duplicate
    /// write in one call is a programmer error (spec.md §7).
    pub fn set_components_raw(&mut self, e: Entity, writes: &[(ComponentTypeId, *const u8)]) -> Result<()> {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("migrate_set_components").entered();

        assert_no_duplicates(writes.iter().map(|&(cid, _)| cid));

        if !self.entities.is_valid(e) {
            return Err(EcsError::StaleEntity(e));
        }
        let meta = *self.entities.meta(e.id).expect("validated above");
        let old_arch_idx = meta.archetype_index as usize;
        let old_chunk = meta.chunk_index as usize;
        let old_row = meta.row as usize;
        let old_mask = *self.archetypes.archetype(old_arch_idx).mask();

        let all_present = writes.iter().all(|&(cid, _)| old_mask.contains_bit(cid));
        if all_present {
            // Fast path: every requested component already lives on this
            // entity's archetype. Overwrite in place; do not touch
            // archetypes or bump mutation_version (spec.md §4.6 step 3).
            let arch = self.archetypes.archetype(old_arch_idx);
            for &(cid, src) in writes {
                let size = self.components.size_of(cid);
                if size == 0 {
                    continue;
                }
                // SAFETY: cid is present in arch's mask, (old_chunk, old_row)
                // addresses a live row, src points to `size` readable bytes.
                unsafe {
                    let dst = arch.cell_ptr(old_chunk, old_row, cid);
                    std::ptr::copy_nonoverlapping(src, dst, size);
                }
            }
            return Ok(());
        }

        // Slow path: migrate to a new archetype whose mask is the union of
        // the current mask and every requested component id.
        let mut new_mask = old_mask;
        for &(cid, _) in writes {
            new_mask.set(cid);
        }

        let new_idx = match self.archetypes.get(&new_mask) {
            Some(idx) => idx,
            None => {
                let mut specs: Vec<ComponentSpec> = self
                    .archetypes
                    .archetype(old_arch_idx)
                    .comp_order()
                    .iter()
                    .map(|&cid| ComponentSpec {
                        id: cid,
                        size: self.components.size_of(cid),
                        align: self.components.align_of(cid),
                    })
                    .collect();
                for &(cid, _) in writes {
                    if !old_mask.contains_bit(cid) {
                        specs.push(ComponentSpec {
                            id: cid,
                            size: self.components.size_of(cid),
                            align: self.components.align_of(cid),
                        });
                    }
                }
                self.archetypes.get_or_create(new_mask, &specs)
            }
        };

        let (new_chunk, new_row) = self.archetypes.archetype_mut(new_idx).append_row(e);

        {
            let (old_arch, new_arch) = self.archetypes.get_pair_mut(old_arch_idx, new_idx);
            let shared: Vec<ComponentTypeId> = old_arch
                .comp_order()
                .iter()
                .copied()
                .filter(|cid| new_arch.mask().contains_bit(*cid))
                .collect();
            for cid in shared {
                let size = old_arch.comp_size(cid);
                if size == 0 {
                    continue;
                }
                // SAFETY: cid is present in both archetypes' masks; old/new
                // rows are distinct, freshly-computed addresses.
                unsafe {
                    let src = old_arch.cell_ptr(old_chunk, old_row, cid);
                    let dst = new_arch.cell_ptr(new_chunk, new_row, cid);
                    std::ptr::copy_nonoverlapping(src, dst, size);
                }
            }
            for &(cid, src) in writes {
                let size = self.components.size_of(cid);
                if size == 0 {
                    continue;
                }
                unsafe {
                    let dst = new_arch.cell_ptr(new_chunk, new_row, cid);
                    std::ptr::copy_nonoverlapping(src, dst, size);
                }
            }
        }

        let effects = self
            .archetypes
            .archetype_mut(old_arch_idx)
            .remove_swap(old_chunk, old_row);
        self.apply_remove_effects(old_arch_idx, effects);

        let meta = self.entities.meta_mut(e.id).expect("e is valid");
        meta.archetype_index = new_idx as i32;
        meta.chunk_index = new_chunk as i32;
        meta.row = new_row as i32;

        self.mutation_version += 1;
        Ok(())
    }

    /// General K-ary "remove these components" primitive (spec.md §4.6,
    /// symmetric case). No-op if none of `ids` are present on `e`.
    ///
    /// # Panics
    /// Panics if `ids` contains a duplicate.
    pub fn remove_components_raw(&mut self, e: Entity, ids: &[ComponentTypeId]) -> Result<()> {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("migrate_remove_components").entered();

        assert_no_duplicates(ids.iter().copied());

        if !self.entities.is_valid(e) {
            return Err(EcsError::StaleEntity(e));
        }
        let meta = *self.entities.meta(e.id).expect("validated above");
        let old_arch_idx = meta.archetype_index as usize;
        let old_chunk = meta.chunk_index as usize;
        let old_row = meta.row as usize;
        let old_mask = *self.archetypes.archetype(old_arch_idx).mask();

        let any_present = ids.iter().any(|&cid| old_mask.contains_bit(cid));
        if !any_present {
            return Ok(());
        }

        let mut remove_mask = BitMask256::EMPTY;
        for &cid in ids {
            remove_mask.set(cid);
        }
        let new_mask = old_mask.difference(&remove_mask);

        let new_idx = match self.archetypes.get(&new_mask) {
            Some(idx) => idx,
            None => {
                let specs: Vec<ComponentSpec> = self
                    .archetypes
                    .archetype(old_arch_idx)
                    .comp_order()
                    .iter()
                    .filter(|cid| !remove_mask.contains_bit(**cid))
                    .map(|&cid| ComponentSpec {
                        id: cid,
                        size: self.components.size_of(cid),
                        align: self.components.align_of(cid),
                    })
                    .collect();
                self.archetypes.get_or_create(new_mask, &specs)
            }
        };

        let (new_chunk, new_row) = self.archetypes.archetype_mut(new_idx).append_row(e);

        {
            let (old_arch, new_arch) = self.archetypes.get_pair_mut(old_arch_idx, new_idx);
            let shared: Vec<ComponentTypeId> = new_arch.comp_order().to_vec();
            for cid in shared {
                let size = old_arch.comp_size(cid);
                if size == 0 {
                    continue;
                }
                // SAFETY: cid is present in both masks (new_mask subset of
                // old_mask); rows are distinct live addresses.
                unsafe {
                    let src = old_arch.cell_ptr(old_chunk, old_row, cid);
                    let dst = new_arch.cell_ptr(new_chunk, new_row, cid);
                    std::ptr::copy_nonoverlapping(src, dst, size);
                }
            }
        }

        let effects = self
            .archetypes
            .archetype_mut(old_arch_idx)
            .remove_swap(old_chunk, old_row);
        self.apply_remove_effects(old_arch_idx, effects);

        let meta = self.entities.meta_mut(e.id).expect("e is valid");
        meta.archetype_index = new_idx as i32;
        meta.chunk_index = new_chunk as i32;
        meta.row = new_row as i32;

        self.mutation_version += 1;
        Ok(())
    }

    /// Apply the meta-table side effects of a swap-remove that happened in
    /// archetype `arch_idx` to every other entity it displaced.
    fn apply_remove_effects(&mut self, arch_idx: usize, effects: RemoveEffects) {
        if let Some((moved, new_row)) = effects.row_swapped {
            if let Some(meta) = self.entities.meta_mut(moved.id) {
                meta.row = new_row as i32;
            }
        }
        if let Some((new_chunk_idx, relocated)) = effects.chunk_relocated {
            for ent in relocated {
                if let Some(meta) = self.entities.meta_mut(ent.id) {
                    if meta.archetype_index as usize == arch_idx {
                        meta.chunk_index = new_chunk_idx as i32;
                    }
                }
            }
        }
    }
}

fn assert_no_duplicates(ids: impl Iterator<Item = ComponentTypeId>) {
    let mut seen = BitMask256::EMPTY;
    for id in ids {
        assert!(
            !seen.contains_bit(id),
            "duplicate component type id {} in a single multi-component operation",
            id.index()
        );
        seen.set(id);
    }
}

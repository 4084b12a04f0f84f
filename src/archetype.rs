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

//! Archetype storage: one row-set per unique component mask, chunked into
//! fixed-capacity slabs so column addresses stay stable across growth.

use std::alloc::{self, Layout};

use smallvec::SmallVec;

use crate::bitmask::BitMask256;
use crate::component::{ComponentTypeId, MAX_COMPONENTS};
use crate::entity::Entity;

/// Rows per chunk. Column addresses are stable for the lifetime of a chunk,
/// so growth never relocates a live component pointer — it only allocates a
/// fresh chunk.
pub const CHUNK_SIZE: usize = 1024;

/// `(id, element size, element align)` describing one column to materialize
/// when an archetype is created.
#[derive(Debug, Clone, Copy)]
pub struct ComponentSpec {
    pub id: ComponentTypeId,
    pub size: usize,
    pub align: usize,
}

/// A fixed-capacity slab of `CHUNK_SIZE` rows inside an archetype.
///
/// Each present component gets one contiguous, natively-aligned buffer of
/// `CHUNK_SIZE * size` bytes; `columns[id]` is null for ids outside the
/// archetype's mask.
pub struct Chunk {
    entities: Box<[Entity]>,
    columns: Box<[*mut u8]>,
    size: usize,
}

impl Chunk {
    fn new() -> Self {
        Self {
            entities: vec![Entity { id: 0, version: 0 }; CHUNK_SIZE].into_boxed_slice(),
            columns: vec![std::ptr::null_mut(); MAX_COMPONENTS].into_boxed_slice(),
            size: 0,
        }
    }

    fn alloc_column(&mut self, spec: ComponentSpec) {
        let idx = spec.id.index();
        if spec.size == 0 {
            // Zero-sized component: no storage needed, just a non-null sentinel
            // so "is this column present" checks (`!ptr.is_null()`) still work.
            self.columns[idx] = std::ptr::NonNull::<u8>::dangling().as_ptr();
            return;
        }
        let layout = column_layout(spec);
        // SAFETY: layout has non-zero size, validated by Layout::from_size_align.
        let ptr = unsafe { alloc::alloc(layout) };
        assert!(!ptr.is_null(), "allocation failure creating component column");
        self.columns[idx] = ptr;
    }

    fn free_column(&mut self, spec: ComponentSpec) {
        let idx = spec.id.index();
        let ptr = self.columns[idx];
        if ptr.is_null() {
            return;
        }
        if spec.size != 0 {
            let layout = column_layout(spec);
            // SAFETY: ptr was allocated with this exact layout in alloc_column.
            unsafe { alloc::dealloc(ptr, layout) };
        }
        self.columns[idx] = std::ptr::null_mut();
    }

    /// Raw address of `cid`'s cell at `row`. Caller must know `elem_size`
    /// (from the owning archetype's `comp_sizes`) and must not read past
    /// `self.size` rows of live data.
    ///
    /// # Safety
    /// `row < CHUNK_SIZE` and `cid` must be present in the owning archetype's
    /// mask (i.e. `columns[cid]` non-null).
    #[inline]
    pub unsafe fn cell_ptr(&self, cid: ComponentTypeId, row: usize, elem_size: usize) -> *mut u8 {
        unsafe { self.columns[cid.index()].add(row * elem_size) }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities[..self.size]
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == CHUNK_SIZE
    }
}

fn column_layout(spec: ComponentSpec) -> Layout {
    Layout::from_size_align(spec.size * CHUNK_SIZE, spec.align)
        .expect("component size/align must form a valid layout")
}

/// One row-set: every entity stored here shares an identical component mask.
pub struct Archetype {
    mask: BitMask256,
    comp_order: SmallVec<[ComponentTypeId; 8]>,
    comp_sizes: Box<[usize]>,
    comp_aligns: Box<[usize]>,
    chunks: Vec<Chunk>,
    size: usize,
    index: usize,
}

/// What happened to other entities as a side effect of removing a row.
/// The caller (World) owns entity metadata and must apply these.
#[derive(Debug, Default)]
pub struct RemoveEffects {
    /// An entity was copied into the vacated row; its meta.row must become
    /// the row that was removed.
    pub row_swapped: Option<(Entity, usize)>,
    /// A chunk became empty and was swap-removed; every entity in `entities`
    /// now lives in chunk `new_chunk_index` and must have meta.chunk_index
    /// updated accordingly.
    pub chunk_relocated: Option<(usize, Vec<Entity>)>,
}

impl Archetype {
    pub fn new(index: usize, mask: BitMask256, specs: &[ComponentSpec]) -> Self {
        let mut comp_sizes = vec![0usize; MAX_COMPONENTS].into_boxed_slice();
        let mut comp_aligns = vec![1usize; MAX_COMPONENTS].into_boxed_slice();
        let mut comp_order = SmallVec::new();
        for spec in specs {
            comp_sizes[spec.id.index()] = spec.size;
            comp_aligns[spec.id.index()] = spec.align;
            comp_order.push(spec.id);
        }
        Self {
            mask,
            comp_order,
            comp_sizes,
            comp_aligns,
            chunks: Vec::new(),
            size: 0,
            index,
        }
    }

    pub fn mask(&self) -> &BitMask256 {
        &self.mask
    }

    pub fn comp_order(&self) -> &[ComponentTypeId] {
        &self.comp_order
    }

    pub fn comp_size(&self, id: ComponentTypeId) -> usize {
        self.comp_sizes[id.index()]
    }

    pub fn comp_align(&self, id: ComponentTypeId) -> usize {
        self.comp_aligns[id.index()]
    }

    fn spec_of(&self, id: ComponentTypeId) -> ComponentSpec {
        ComponentSpec {
            id,
            size: self.comp_sizes[id.index()],
            align: self.comp_aligns[id.index()],
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, i: usize) -> &Chunk {
        &self.chunks[i]
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Append one uninitialized row for `e`, allocating a new chunk if the
    /// last one is full or absent. Returns `(chunk_index, row)`; the caller
    /// is responsible for writing every present column's cell before the
    /// row is observable by queries.
    pub fn append_row(&mut self, e: Entity) -> (usize, usize) {
        let needs_new_chunk = match self.chunks.last() {
            Some(c) => c.is_full(),
            None => true,
        };
        if needs_new_chunk {
            let mut chunk = Chunk::new();
            for &cid in &self.comp_order {
                chunk.alloc_column(self.spec_of(cid));
            }
            self.chunks.push(chunk);
        }
        let chunk_idx = self.chunks.len() - 1;
        let chunk = &mut self.chunks[chunk_idx];
        let row = chunk.size;
        chunk.entities[row] = e;
        chunk.size += 1;
        self.size += 1;
        (chunk_idx, row)
    }

    /// Raw cell address for `(chunk_idx, row, cid)`.
    ///
    /// # Safety
    /// `cid` must be present in this archetype's mask and `(chunk_idx, row)`
    /// must address a live row.
    #[inline]
    pub unsafe fn cell_ptr(&self, chunk_idx: usize, row: usize, cid: ComponentTypeId) -> *mut u8 {
        let size = self.comp_sizes[cid.index()];
        unsafe { self.chunks[chunk_idx].cell_ptr(cid, row, size) }
    }

    /// Remove the row at `(chunk_idx, row)` via swap-with-last (spec.md
    /// §4.4). Returns the bookkeeping the caller must apply to entity meta.
    pub fn remove_swap(&mut self, chunk_idx: usize, row: usize) -> RemoveEffects {
        let mut effects = RemoveEffects::default();
        let last_row = self.chunks[chunk_idx].size - 1;

        if row != last_row {
            // SAFETY: both rows are within this chunk's live range; columns
            // are disjoint buffers so copying each one is non-aliasing.
            for &cid in &self.comp_order {
                let size = self.comp_sizes[cid.index()];
                if size == 0 {
                    continue;
                }
                unsafe {
                    let chunk = &self.chunks[chunk_idx];
                    let src = chunk.cell_ptr(cid, last_row, size);
                    let dst = chunk.cell_ptr(cid, row, size);
                    std::ptr::copy_nonoverlapping(src, dst, size);
                }
            }
            let moved = self.chunks[chunk_idx].entities[last_row];
            self.chunks[chunk_idx].entities[row] = moved;
            effects.row_swapped = Some((moved, row));
        }

        self.chunks[chunk_idx].size -= 1;
        self.size -= 1;

        if self.chunks[chunk_idx].size == 0 && self.chunks.len() > 1 {
            let mut removed = self.chunks.swap_remove(chunk_idx);
            for &cid in &self.comp_order {
                removed.free_column(self.spec_of(cid));
            }
            if chunk_idx < self.chunks.len() {
                let relocated = self.chunks[chunk_idx].entities().to_vec();
                effects.chunk_relocated = Some((chunk_idx, relocated));
            }
        }

        effects
    }

    /// Drop every chunk, freeing their column buffers, and reset to empty.
    /// Used by `World::clear_entities` and by batch query removal.
    pub fn clear(&mut self) {
        for chunk in self.chunks.drain(..) {
            let mut chunk = chunk;
            for &cid in &self.comp_order {
                chunk.free_column(self.spec_of(cid));
            }
        }
        self.size = 0;
    }
}

impl Drop for Archetype {
    fn drop(&mut self) {
        for chunk in self.chunks.drain(..) {
            let mut chunk = chunk;
            for &cid in &self.comp_order {
                chunk.free_column(self.spec_of(cid));
            }
        }
    }
}

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

//! The archetype table graph: every live archetype, keyed by its mask.

use rustc_hash::FxHashMap;

use crate::archetype::{Archetype, ComponentSpec};
use crate::bitmask::BitMask256;

/// Owns every archetype and the mask -> index lookup.
///
/// `archetype_version` bumps each time a new archetype is created. Query
/// caches compare against it to know when their matching-archetype list
/// might be stale (spec.md §4.7).
pub struct ArchetypeIndex {
    by_mask: FxHashMap<BitMask256, usize>,
    archetypes: Vec<Archetype>,
    archetype_version: u64,
}

impl ArchetypeIndex {
    pub fn new() -> Self {
        Self {
            by_mask: FxHashMap::default(),
            archetypes: Vec::new(),
            archetype_version: 0,
        }
    }

    pub fn archetype_version(&self) -> u64 {
        self.archetype_version
    }

    pub fn get(&self, mask: &BitMask256) -> Option<usize> {
        self.by_mask.get(mask).copied()
    }

    pub fn archetype(&self, index: usize) -> &Archetype {
        &self.archetypes[index]
    }

    pub fn archetype_mut(&mut self, index: usize) -> &mut Archetype {
        &mut self.archetypes[index]
    }

    /// Borrow two distinct archetypes mutably at once, needed while
    /// migrating a row from one archetype into another (spec.md §4.6).
    ///
    /// # Panics
    /// Panics if `a == b`.
    pub fn get_pair_mut(&mut self, a: usize, b: usize) -> (&mut Archetype, &mut Archetype) {
        assert_ne!(a, b, "get_pair_mut requires two distinct archetypes");
        if a < b {
            let (left, right) = self.archetypes.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Find the archetype for `mask`, creating it (with `specs` as its
    /// column layout) if this is the first time this exact mask is seen.
    /// `specs` must describe exactly the ids set in `mask`.
    pub fn get_or_create(&mut self, mask: BitMask256, specs: &[ComponentSpec]) -> usize {
        if let Some(&idx) = self.by_mask.get(&mask) {
            return idx;
        }
        let idx = self.archetypes.len();
        self.archetypes.push(Archetype::new(idx, mask, specs));
        self.by_mask.insert(mask, idx);
        self.archetype_version += 1;
        idx
    }

    /// Drop every row in every archetype, keeping the archetypes (and their
    /// column layouts) themselves intact. Used by `World::clear_entities`.
    pub fn clear_all_rows(&mut self) {
        for arch in self.archetypes.iter_mut() {
            arch.clear();
        }
    }
}

impl Default for ArchetypeIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentTypeId;

    fn mask_of(ids: &[u8]) -> BitMask256 {
        let mut m = BitMask256::default();
        for &id in ids {
            m.set(ComponentTypeId(id));
        }
        m
    }

    #[test]
    fn get_or_create_is_idempotent_per_mask() {
        let mut idx = ArchetypeIndex::new();
        let mask = mask_of(&[0, 1]);
        let specs = vec![
            ComponentSpec {
                id: ComponentTypeId(0),
                size: 4,
                align: 4,
            },
            ComponentSpec {
                id: ComponentTypeId(1),
                size: 8,
                align: 8,
            },
        ];
        let a = idx.get_or_create(mask, &specs);
        let b = idx.get_or_create(mask, &specs);
        assert_eq!(a, b);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.archetype_version(), 1);
    }

    #[test]
    fn distinct_masks_bump_archetype_version() {
        let mut idx = ArchetypeIndex::new();
        idx.get_or_create(mask_of(&[0]), &[ComponentSpec {
            id: ComponentTypeId(0),
            size: 4,
            align: 4,
        }]);
        idx.get_or_create(mask_of(&[1]), &[ComponentSpec {
            id: ComponentTypeId(1),
            size: 4,
            align: 4,
        }]);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.archetype_version(), 2);
    }

    #[test]
    fn empty_mask_is_the_root_archetype() {
        let mut idx = ArchetypeIndex::new();
        let empty_idx = idx.get_or_create(BitMask256::EMPTY, &[]);
        assert_eq!(empty_idx, 0);
        assert!(idx.archetype(empty_idx).mask().is_empty());
    }
}

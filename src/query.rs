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

//! Query iteration over every archetype whose mask is a superset of a
//! required mask (spec.md §4.7).
//!
//! A `Query` does not borrow a `World`; every method takes one explicitly.
//! That keeps read iteration (`&World`) and batch removal (`&mut World`)
//! on the same type without fighting the borrow checker.

use crate::bitmask::BitMask256;
use crate::component::Component;
use crate::entity::Entity;
use crate::world::World;

pub struct Query {
    required_mask: BitMask256,
    matching: Vec<usize>,
    last_archetype_version: u64,
    last_mutation_version: u64,
    cached_entities: Option<Vec<Entity>>,
    match_idx: usize,
    chunk_idx: usize,
    row: i64,
}

impl Query {
    pub fn new(mask: BitMask256) -> Self {
        Self {
            required_mask: mask,
            matching: Vec::new(),
            // Sentinels guaranteeing the first `reset`/`entities` call sees
            // a stale cache and refreshes unconditionally.
            last_archetype_version: u64::MAX,
            last_mutation_version: u64::MAX,
            cached_entities: None,
            match_idx: 0,
            chunk_idx: 0,
            row: -1,
        }
    }

    pub fn mask(&self) -> &BitMask256 {
        &self.required_mask
    }

    pub fn is_stale(&self, world: &World) -> bool {
        self.last_archetype_version != world.archetype_version()
    }

    /// Rebuild `matching` by scanning every archetype for a superset of the
    /// required mask.
    pub fn refresh_matching(&mut self, world: &World) {
        self.matching.clear();
        let archetypes = world.archetypes();
        for i in 0..archetypes.len() {
            if archetypes.archetype(i).mask().contains(&self.required_mask) {
                self.matching.push(i);
            }
        }
        self.last_archetype_version = world.archetype_version();
    }

    /// Flatten every matching archetype's live entities into `cached_entities`.
    pub fn refresh_entities(&mut self, world: &World) {
        if self.is_stale(world) {
            self.refresh_matching(world);
        }
        let archetypes = world.archetypes();
        let mut flat = Vec::new();
        for &ai in &self.matching {
            let arch = archetypes.archetype(ai);
            for c in 0..arch.chunk_count() {
                flat.extend_from_slice(arch.chunk(c).entities());
            }
        }
        self.last_mutation_version = world.mutation_version();
        self.cached_entities = Some(flat);
    }

    /// Refresh the matching-archetype list if stale, then point the cursor
    /// just before the first row.
    pub fn reset(&mut self, world: &World) {
        if self.is_stale(world) {
            self.refresh_matching(world);
        }
        self.match_idx = 0;
        self.chunk_idx = 0;
        self.row = -1;
    }

    /// Advance to the next live row. Returns `false` once every matching
    /// archetype is exhausted.
    pub fn next(&mut self, world: &World) -> bool {
        let archetypes = world.archetypes();
        loop {
            if self.match_idx >= self.matching.len() {
                return false;
            }
            let arch = archetypes.archetype(self.matching[self.match_idx]);
            if self.chunk_idx >= arch.chunk_count() {
                self.match_idx += 1;
                self.chunk_idx = 0;
                self.row = -1;
                continue;
            }
            self.row += 1;
            let chunk_len = arch.chunk(self.chunk_idx).len() as i64;
            if self.row < chunk_len {
                return true;
            }
            self.chunk_idx += 1;
            self.row = -1;
        }
    }

    /// Index of the archetype the cursor currently sits in, per `matching`.
    pub(crate) fn match_index(&self) -> usize {
        self.matching[self.match_idx]
    }

    pub(crate) fn chunk_index(&self) -> usize {
        self.chunk_idx
    }

    pub(crate) fn row_index(&self) -> usize {
        self.row as usize
    }

    /// Entity at the current cursor position.
    ///
    /// # Panics
    /// Panics if called before a successful `next()`.
    pub fn entity(&self, world: &World) -> Entity {
        let arch = world.archetypes().archetype(self.matching[self.match_idx]);
        arch.chunk(self.chunk_idx).entities()[self.row as usize]
    }

    /// Typed read of component `T` at the current cursor position.
    pub fn get<T: Component>(&self, world: &World) -> Option<&T> {
        let cid = world.component_id::<T>()?;
        let arch = world.archetypes().archetype(self.matching[self.match_idx]);
        if !arch.mask().contains_bit(cid) {
            return None;
        }
        // SAFETY: cid is present in arch's mask; (chunk_idx, row) was
        // validated live by the preceding `next()`.
        unsafe {
            let ptr = arch.cell_ptr(self.chunk_idx, self.row as usize, cid) as *const T;
            Some(&*ptr)
        }
    }

    /// Typed mutable access to component `T` at the current cursor position.
    /// Takes `&mut World` so only one query can hold a live mutable cell at
    /// a time.
    pub fn get_mut<'w, T: Component>(&self, world: &'w mut World) -> Option<&'w mut T> {
        let cid = world.component_id::<T>()?;
        let arch = world.archetypes().archetype(self.matching[self.match_idx]);
        if !arch.mask().contains_bit(cid) {
            return None;
        }
        // SAFETY: same as `get`; `&mut World` enforces exclusivity.
        unsafe {
            let ptr = arch.cell_ptr(self.chunk_idx, self.row as usize, cid) as *mut T;
            Some(&mut *ptr)
        }
    }

    /// The cached flattened entity list, refreshing first if the world has
    /// mutated since the last refresh.
    pub fn entities(&mut self, world: &World) -> &[Entity] {
        if self.cached_entities.is_none() || self.last_mutation_version != world.mutation_version() {
            self.refresh_entities(world);
        }
        self.cached_entities.as_deref().unwrap_or(&[])
    }

    /// Despawn every entity currently matching this query's mask: for each
    /// matching archetype, free every row's entity id and drop its chunks.
    /// Resets the cursor afterward (spec.md §4.7).
    pub fn remove_entities(&mut self, world: &mut World) {
        if self.is_stale(world) {
            self.refresh_matching(world);
        }
        let matching = self.matching.clone();
        let mut doomed = Vec::new();
        for ai in matching {
            let arch = world.archetypes_mut().archetype_mut(ai);
            doomed.reserve(arch.len());
            for c in 0..arch.chunk_count() {
                doomed.extend_from_slice(arch.chunk(c).entities());
            }
            arch.clear();
        }
        // One mutation_version bump for the whole batch removal (spec.md §4.7),
        // not one per matching archetype. Skip entirely if nothing matched.
        if !doomed.is_empty() {
            world.free_entities_bulk(&doomed);
        }
        self.cached_entities = None;
        self.reset(world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::ComponentSpec;
    use crate::world::mask_from_specs;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct A(i32);
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct B(i32);

    fn spawn_ab(world: &mut World, n: usize) {
        for i in 0..n {
            let e = world.create_entity_in(BitMask256::EMPTY, &[]);
            world.set_component(e, A(i as i32)).unwrap();
            world.set_component(e, B(i as i32)).unwrap();
        }
    }

    fn spawn_a_only(world: &mut World, n: usize) {
        for i in 0..n {
            let e = world.create_entity_in(BitMask256::EMPTY, &[]);
            world.set_component(e, A(i as i32)).unwrap();
        }
    }

    #[test]
    fn s4_query_iteration_counts() {
        let mut world = World::new(16);
        spawn_ab(&mut world, 1000);
        spawn_a_only(&mut world, 500);

        let cid_a = world.register_component::<A>();
        let mut mask_a = BitMask256::EMPTY;
        mask_a.set(cid_a);

        let mut q_a = Query::new(mask_a);
        q_a.reset(&world);
        let mut count = 0;
        let mut sum = 0;
        while q_a.next(&world) {
            count += 1;
            sum += q_a.get::<A>(&world).unwrap().0;
        }
        assert_eq!(count, 1500);
        let expected_sum: i32 = (0..1000).sum::<i32>() + (0..500).sum::<i32>();
        assert_eq!(sum, expected_sum);

        let cid_b = world.register_component::<B>();
        let mut mask_ab = mask_a;
        mask_ab.set(cid_b);
        let mut q_ab = Query::new(mask_ab);
        q_ab.reset(&world);
        let mut count_ab = 0;
        while q_ab.next(&world) {
            count_ab += 1;
        }
        assert_eq!(count_ab, 1000);
    }

    #[test]
    fn s5_query_unaffected_by_new_archetype_created_mid_iteration() {
        let mut world = World::new(16);
        spawn_a_only(&mut world, 100);
        let cid_a = world.register_component::<A>();
        let mut mask_a = BitMask256::EMPTY;
        mask_a.set(cid_a);

        let mut q = Query::new(mask_a);
        q.reset(&world);
        let mut first_pass = 0;
        let mut first_entity = None;
        while q.next(&world) {
            first_pass += 1;
            if first_entity.is_none() {
                first_entity = Some(q.entity(&world));
            }
        }
        assert_eq!(first_pass, 100);

        world
            .set_component(first_entity.unwrap(), B(42))
            .unwrap();

        q.reset(&world);
        let mut second_pass = 0;
        while q.next(&world) {
            second_pass += 1;
        }
        assert_eq!(second_pass, 100);
    }

    #[test]
    fn s6_batch_remove_via_query() {
        let mut world = World::new(16);
        spawn_ab(&mut world, 1000);
        let mut ac_entities = Vec::new();
        let cid_a = world.register_component::<A>();
        let cid_c = world.register_component::<crate::query::tests::CMarker>();
        let _ = cid_c;
        for i in 0..500 {
            let e = world.create_entity_in(BitMask256::EMPTY, &[]);
            world.set_component(e, A(i)).unwrap();
            world.set_component(e, CMarker(i)).unwrap();
            ac_entities.push(e);
        }

        let mut mask_ab = BitMask256::EMPTY;
        mask_ab.set(cid_a);
        mask_ab.set(world.register_component::<B>());

        let mut q = Query::new(mask_ab);
        q.reset(&world);
        let doomed: Vec<Entity> = {
            let mut v = Vec::new();
            let mut q2 = Query::new(mask_ab);
            q2.reset(&world);
            while q2.next(&world) {
                v.push(q2.entity(&world));
            }
            v
        };
        assert_eq!(doomed.len(), 1000);

        q.remove_entities(&mut world);

        for e in doomed {
            assert!(!world.is_valid(e));
        }
        for e in ac_entities {
            assert!(world.is_valid(e));
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub(crate) struct CMarker(i32);
}

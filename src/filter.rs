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

//! Typed N-ary query façade (spec.md §6 `Filter2..6`).
//!
//! [`crate::query::Query`] is the untyped core: it's built from a mask and
//! hands back raw cells via `Query::get::<T>`. [`Fetch`] generates, per
//! tuple arity, the mechanical work of deriving that mask from a type list
//! and fetching every member at the current cursor in one call — no design
//! content beyond what `Query::get` already does per-component.

use crate::bitmask::BitMask256;
use crate::component::Component;
use crate::query::Query;
use crate::world::World;

/// Maximum arity supported by the generated tuple impls below.
pub const MAX_FETCH_ARITY: usize = 8;

/// A tuple of component types fetchable together at a query cursor.
pub trait Fetch<'w> {
    type Item;

    /// The mask a query must require to guarantee every member is present.
    fn mask(world: &World) -> BitMask256;

    /// Fetch every member at `(arch_idx, chunk_idx, row)`.
    ///
    /// # Safety
    /// The archetype at `arch_idx` must be a superset of `Self::mask()` and
    /// `(chunk_idx, row)` must address one of its live rows.
    unsafe fn fetch(world: &'w World, arch_idx: usize, chunk_idx: usize, row: usize) -> Self::Item;
}

macro_rules! impl_fetch {
    ($($T:ident),+) => {
        impl<'w, $($T: Component),+> Fetch<'w> for ($($T,)+) {
            type Item = ($(&'w $T,)+);

            fn mask(world: &World) -> BitMask256 {
                let mut m = BitMask256::EMPTY;
                $(
                    if let Some(cid) = world.component_id::<$T>() {
                        m.set(cid);
                    }
                )+
                m
            }

            unsafe fn fetch(world: &'w World, arch_idx: usize, chunk_idx: usize, row: usize) -> Self::Item {
                let arch = world.archetypes().archetype(arch_idx);
                ($(
                    {
                        let cid = world
                            .component_id::<$T>()
                            .expect("Self::mask() already required this component to be registered");
                        // SAFETY: caller guarantees arch's mask is a superset
                        // of Self::mask(), which includes cid; row is live.
                        unsafe { &*(arch.cell_ptr(chunk_idx, row, cid) as *const $T) }
                    },
                )+)
            }
        }
    };
}

impl_fetch!(A);
impl_fetch!(A, B);
impl_fetch!(A, B, C);
impl_fetch!(A, B, C, D);
impl_fetch!(A, B, C, D, E);
impl_fetch!(A, B, C, D, E, F);
impl_fetch!(A, B, C, D, E, F, G);
impl_fetch!(A, B, C, D, E, F, G, H);

impl Query {
    /// Build a query whose required mask is derived from `F`'s component
    /// list (`Filter_K::new`).
    pub fn for_fetch<F>(world: &World) -> Query
    where
        F: for<'a> Fetch<'a>,
    {
        Query::new(F::mask(world))
    }

    /// Typed read of every `F` member at the current cursor
    /// (`Filter_K::get`).
    ///
    /// # Panics
    /// Panics if called before a successful `next()`.
    pub fn fetch<'w, F: Fetch<'w>>(&self, world: &'w World) -> F::Item {
        let arch_idx = self.match_index();
        // SAFETY: the query's required mask was derived from F::mask(), so
        // every matching archetype is a superset of it; `next()` validated
        // the cursor's (chunk, row) as live.
        unsafe { F::fetch(world, arch_idx, self.chunk_index(), self.row_index()) }
    }
}

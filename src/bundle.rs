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

//! N-ary component façades over the core single-component primitives
//! (spec.md §6: `Builder1..6`, `SetComponent_K`, `RemoveComponent_K`).
//!
//! Rust has no variadic generics, so the mechanical body the spec describes
//! is generated once per tuple arity via `macro_rules!`, the same trick the
//! teacher crate uses for `Bundle` in its own `component.rs`. Each arity's
//! body adds no design content beyond `World::set_components_raw` and
//! `World::remove_components_raw`.

use crate::archetype::ComponentSpec;
use crate::component::{Component, ComponentTypeId};
use crate::world::World;

/// Maximum arity supported by the generated tuple impls below.
pub const MAX_BUNDLE_ARITY: usize = 8;

/// A fixed set of component values spawned onto a fresh entity in one
/// archetype append, skipping the per-component migration that calling
/// `World::set_component` K times would otherwise trigger (`Builder_K`).
pub trait Bundle: 'static {
    /// Component specs for this bundle, in write order. Registers any
    /// component type seen for the first time.
    fn specs(world: &mut World) -> Vec<ComponentSpec>;

    /// Write every value to its corresponding address in `ptrs`, which has
    /// exactly `specs().len()` entries in the same order.
    ///
    /// # Safety
    /// Every `ptrs[i]` must be writable and aligned for the `i`-th spec.
    unsafe fn write(self, ptrs: &[*mut u8]);
}

/// A fixed set of component *values* to overwrite or add on an existing
/// entity in one call (`SetComponent_K`). Unlike [`Bundle`], order need not
/// match archetype layout — `World::set_components` resolves ids itself.
pub trait SetBundle {
    /// `(component id, pointer to the value's bytes)` for every member,
    /// registering any component type seen for the first time. The
    /// returned pointers borrow from `self` and are only valid for the
    /// duration of the caller's use of them.
    fn ops(&self, world: &mut World) -> Vec<(ComponentTypeId, *const u8)>;
}

/// A fixed set of component *types* to remove from an entity in one call
/// (`RemoveComponent_K`).
pub trait ComponentSet {
    fn ids(world: &mut World) -> Vec<ComponentTypeId>;
}

macro_rules! impl_bundle {
    ($($T:ident),+) => {
        impl<$($T: Component),+> Bundle for ($($T,)+) {
            fn specs(world: &mut World) -> Vec<ComponentSpec> {
                vec![$(world.component_spec::<$T>()),+]
            }

            #[allow(non_snake_case)]
            unsafe fn write(self, ptrs: &[*mut u8]) {
                let ($($T,)+) = self;
                let mut i = 0;
                $(
                    unsafe { std::ptr::write(ptrs[i] as *mut $T, $T); }
                    i += 1;
                )+
                let _ = i;
            }
        }

        impl<$($T: Component),+> SetBundle for ($($T,)+) {
            #[allow(non_snake_case)]
            fn ops(&self, world: &mut World) -> Vec<(ComponentTypeId, *const u8)> {
                let ($($T,)+) = self;
                vec![$((world.register_component::<$T>(), $T as *const $T as *const u8)),+]
            }
        }

        impl<$($T: Component),+> ComponentSet for ($($T,)+) {
            fn ids(world: &mut World) -> Vec<ComponentTypeId> {
                vec![$(world.register_component::<$T>()),+]
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use crate::bitmask::BitMask256;
    use crate::world::World;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pos {
        x: f32,
        y: f32,
    }
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Vel {
        dx: f32,
        dy: f32,
    }
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Tag(u32);

    #[test]
    fn spawn_bundle_lands_directly_in_the_target_archetype() {
        let mut world = World::new(4);
        let e = world.spawn((Pos { x: 1.0, y: 2.0 }, Vel { dx: 3.0, dy: 4.0 }));
        assert_eq!(world.get_component::<Pos>(e), Some(&Pos { x: 1.0, y: 2.0 }));
        assert_eq!(world.get_component::<Vel>(e), Some(&Vel { dx: 3.0, dy: 4.0 }));
        // One archetype creation for {Pos,Vel} beyond the pre-built empty one.
        assert_eq!(world.archetype_count(), 2);
    }

    #[test]
    fn spawn_single_component_bundle() {
        let mut world = World::new(1);
        let e = world.spawn((Tag(7),));
        assert_eq!(world.get_component::<Tag>(e), Some(&Tag(7)));
    }

    #[test]
    fn set_components_k_ary_overwrites_both_in_one_migration() {
        let mut world = World::new(1);
        let e = world.create_entity_in(BitMask256::EMPTY, &[]);
        let before = world.mutation_version();
        world
            .set_components(e, (Pos { x: 1.0, y: 1.0 }, Vel { dx: 2.0, dy: 2.0 }))
            .unwrap();
        assert_eq!(world.mutation_version(), before + 1);
        assert_eq!(world.get_component::<Pos>(e), Some(&Pos { x: 1.0, y: 1.0 }));
        assert_eq!(world.get_component::<Vel>(e), Some(&Vel { dx: 2.0, dy: 2.0 }));
    }

    #[test]
    fn remove_components_k_ary() {
        let mut world = World::new(1);
        let e = world.spawn((Pos { x: 1.0, y: 1.0 }, Vel { dx: 2.0, dy: 2.0 }, Tag(1)));
        world.remove_components::<(Pos, Vel)>(e).unwrap();
        assert_eq!(world.get_component::<Pos>(e), None);
        assert_eq!(world.get_component::<Vel>(e), None);
        assert_eq!(world.get_component::<Tag>(e), Some(&Tag(1)));
    }
}

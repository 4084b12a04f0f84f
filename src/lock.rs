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

//! Optional reader/writer gate around a [`World`] (spec.md §5).
//!
//! Not part of the storage algorithm — a surface convenience for callers
//! who want concurrent readers (`is_valid`, `get_component`, query
//! iteration) while no structural mutation is in flight. The bare `World`
//! remains the primary type; nothing in `world.rs` or `query.rs` depends on
//! this module.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::world::World;

/// A `World` behind a `parking_lot::RwLock`.
pub struct WorldLock {
    inner: RwLock<World>,
}

impl WorldLock {
    pub fn new(world: World) -> Self {
        Self {
            inner: RwLock::new(world),
        }
    }

    /// Acquire shared read access. Blocks while a writer holds the lock.
    pub fn read(&self) -> RwLockReadGuard<'_, World> {
        self.inner.read()
    }

    /// Acquire exclusive write access. Blocks while any reader or writer
    /// holds the lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, World> {
        self.inner.write()
    }

    pub fn into_inner(self) -> World {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmask::BitMask256;

    #[test]
    fn readers_see_writes_once_the_writer_releases() {
        let lock = WorldLock::new(World::new(4));
        let e = {
            let mut w = lock.write();
            w.create_entity_in(BitMask256::EMPTY, &[])
        };
        let r = lock.read();
        assert!(r.is_valid(e));
    }
}

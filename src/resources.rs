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

//! Typed singleton side-car (spec.md §6 "Resource bag").
//!
//! Not part of the storage core: no archetype, no entity, touches no query
//! cache. A thin `TypeId -> Box<dyn Any>` map, the same shape as the
//! teacher's `World::resources` field, pulled out into its own type so the
//! core stays storage-only.

use std::any::{Any, TypeId};

use rustc_hash::FxHashMap;

/// A typed singleton bag, one value per type.
#[derive(Default)]
pub struct Resources {
    slots: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource, replacing and returning any prior value of the
    /// same type.
    pub fn insert<R: Send + Sync + 'static>(&mut self, value: R) -> Option<R> {
        self.slots
            .insert(TypeId::of::<R>(), Box::new(value))
            .and_then(|old| old.downcast().ok())
            .map(|boxed| *boxed)
    }

    pub fn get<R: 'static>(&self) -> Option<&R> {
        self.slots.get(&TypeId::of::<R>()).and_then(|r| r.downcast_ref())
    }

    pub fn get_mut<R: 'static>(&mut self) -> Option<&mut R> {
        self.slots
            .get_mut(&TypeId::of::<R>())
            .and_then(|r| r.downcast_mut())
    }

    pub fn contains<R: 'static>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<R>())
    }

    pub fn remove<R: 'static>(&mut self) -> Option<R> {
        self.slots
            .remove(&TypeId::of::<R>())
            .and_then(|r| r.downcast().ok())
            .map(|boxed| *boxed)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Time {
        delta: f32,
    }

    #[test]
    fn insert_get_remove_roundtrip() {
        let mut res = Resources::new();
        assert!(res.get::<Time>().is_none());
        res.insert(Time { delta: 0.016 });
        assert_eq!(res.get::<Time>(), Some(&Time { delta: 0.016 }));
        res.get_mut::<Time>().unwrap().delta = 0.033;
        assert_eq!(res.get::<Time>().unwrap().delta, 0.033);
        assert_eq!(res.remove::<Time>(), Some(Time { delta: 0.033 }));
        assert!(!res.contains::<Time>());
    }

    #[test]
    fn insert_replaces_and_returns_prior_value() {
        let mut res = Resources::new();
        assert_eq!(res.insert(Time { delta: 1.0 }), None);
        assert_eq!(res.insert(Time { delta: 2.0 }), Some(Time { delta: 1.0 }));
    }
}

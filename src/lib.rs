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

//! Archetype-based ECS storage core.
//!
//! Entities are `{id, version}` handles into a generational metadata table.
//! Each entity's components live packed in the columns of whichever
//! [`archetype::Archetype`] matches its current component mask; adding or
//! removing a component migrates the entity's row to a different archetype.
//! [`query::Query`] walks every archetype whose mask is a superset of a
//! required mask, yielding direct pointers into live columns.
//!
//! See `world::World` for the lifecycle/mutation entry points and
//! `query::Query` for iteration.

pub mod archetype;
pub mod archetype_index;
pub mod bitmask;
pub mod bundle;
pub mod component;
pub mod entity;
pub mod error;
pub mod filter;
pub mod lock;
pub mod query;
pub mod resources;
pub mod world;

pub use archetype::{ComponentSpec, CHUNK_SIZE};
pub use bitmask::BitMask256;
pub use bundle::{Bundle, ComponentSet, SetBundle};
pub use component::{Component, ComponentTypeId, MAX_COMPONENTS};
pub use entity::Entity;
pub use error::{EcsError, Result};
pub use filter::Fetch;
pub use lock::WorldLock;
pub use query::Query;
pub use world::World;

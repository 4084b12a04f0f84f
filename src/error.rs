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

//! Error types.
//!
//! `StaleEntity` is the only recoverable condition the storage core ever
//! returns (spec.md §7: a missing component is an accessor returning `None`,
//! not an `Err`). Conditions the spec treats as programmer error —
//! registering past the component type cap, a duplicate component id in one
//! multi-component call, entity version overflow — panic before any mutation
//! happens, so they never surface as an `EcsError` either.

use std::fmt;

use crate::entity::Entity;

/// Storage-core error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// The handle's id is out of range or its version no longer matches
    /// the slot's current occupant.
    StaleEntity(Entity),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::StaleEntity(e) => {
                write!(f, "entity {}v{} is stale or unknown", e.id, e.version)
            }
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias.
pub type Result<T> = std::result::Result<T, EcsError>;

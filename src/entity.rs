//! Core Entity Trait
//!
//! Every record held in a normalized store has a unique, stable id.
//! Ids are numeric or string, but a single collection never mixes the two.

use std::fmt::Debug;
use std::hash::Hash;

/// Core trait for all cached entities
pub trait Entity: Clone {
    /// The type of the entity's unique identifier
    type Id: Clone + Eq + Hash + Debug;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

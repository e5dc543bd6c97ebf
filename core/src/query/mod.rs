//! Query serialization
//!
//! [`serialize_query`] turns a model, an [`Action`](quarry_types::Action)
//! and the caller's arguments into a [`WireQuery`]: a tree of
//! [`FieldSelection`]s carrying encoded arguments and the fields to return.

mod serialize;
mod wire;

pub use serialize::serialize_query;
pub use wire::{COMPOSITES, FieldSelection, SCALARS, SelectionSet, SelectionValue, WireQuery};

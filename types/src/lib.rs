//! Shared type definitions for Quarry
//!
//! This crate provides the read-only metadata consumed by the query
//! pipeline:
//!
//! - [`DataModel`] - the relation graph (models, fields, relation targets)
//! - [`Action`] / [`WireAction`] - caller-facing and protocol action names
//!
//! # Features
//!
//! - `serde` - Enable serde support and loading the graph from its JSON description

mod action;
mod datamodel;

pub use action::{Action, ActionParseError, WireAction};
pub use datamodel::{DataModel, Field, FieldKind, Model, SchemaError};

/// Prelude module for commonly used types
pub mod prelude {
    pub use crate::{Action, DataModel, Field, FieldKind, Model, WireAction};
}

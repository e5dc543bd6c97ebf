//! # Quarry
//!
//! Extension-aware query shaping and result hydration for a data-access
//! client.
//!
//! A [`Client`] pairs a relation graph ([`DataModel`]) with a stack of
//! [`ExtensionLayer`]s. Calls are serialized into [`WireQuery`]s for an
//! [`Engine`], and the engine's answers come back as [`Value`] trees whose
//! records carry the computed fields the extensions declare.
//!
//! ```rust
//! use quarry::prelude::*;
//! use serde_json::json;
//!
//! # fn main() -> quarry::Result<()> {
//! let graph = DataModel::new([Model::new(
//!     "User",
//!     [
//!         Field::scalar("id", "String"),
//!         Field::scalar("firstName", "String"),
//!         Field::scalar("lastName", "String"),
//!     ],
//! )])?;
//!
//! let client = Client::new(graph).extend(
//!     ExtensionLayer::builder()
//!         .computed_field(
//!             "User",
//!             ComputedFieldDef::new("fullName")
//!                 .needs(["firstName", "lastName"])
//!                 .compute(|user| {
//!                     let first = user.get("firstName")?;
//!                     let last = user.get("lastName")?;
//!                     Ok(format!("{} {}", first.as_str().unwrap_or(""), last.as_str().unwrap_or("")).into())
//!                 }),
//!         )
//!         .build()?,
//! );
//!
//! let args = Value::from(json!({ "select": { "id": true, "fullName": true } }));
//! let engine = |_: &WireQuery| -> quarry::Result<serde_json::Value> {
//!     Ok(json!({ "id": "1", "firstName": "John", "lastName": "Smith" }))
//! };
//! let user = client.request(&engine, Some("User"), Action::FindFirst, args, &[])?;
//!
//! assert_eq!(
//!     serde_json::to_value(&user)?,
//!     json!({ "id": "1", "fullName": "John Smith" })
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `tracing` (default) - debug events for serialized queries and extension activity
//! - `profiling` - puffin scopes around serialization and hydration

mod client;
mod engine;

pub use client::Client;
pub use engine::Engine;

/// Result type for quarry operations
pub use quarry_core::error::Result;

/// Error types
pub mod error {
    pub use quarry_core::error::{BoxError, QueryError, ValidationError, ValidationErrorKind};
    pub use quarry_types::SchemaError;
}

/// Relation graph and action vocabulary
pub use quarry_types as types;

pub use quarry_core::{
    Action, ClientOptions, ComputedFieldDef, DataModel, ExtensionChain, ExtensionLayer, Field,
    Model, Object, Value, WireAction, WireQuery,
};

/// Lower-level pipeline stages, for hosts that drive the steps themselves
pub mod core {
    pub use quarry_core::{codec, config, extensions, fluent, query, result, value};
}

/// Commonly used types
pub mod prelude {
    pub use crate::error::{QueryError, ValidationError, ValidationErrorKind};
    pub use crate::{
        Action, Client, ClientOptions, ComputedFieldDef, DataModel, Engine, ExtensionLayer, Field,
        Model, Object, Value, WireQuery,
    };
    pub use quarry_core::result::FieldSource;
}

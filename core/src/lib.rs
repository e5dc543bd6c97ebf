//! Core of the quarry client pipeline
//!
//! A call goes through [`query::serialize_query`] on the way out and
//! through [`codec::decode`], [`result::visit_query_result`] and
//! [`result::apply_result_extensions`] on the way back. What a model looks
//! like to callers is decided by the [`extensions::ExtensionChain`] in use.

pub mod codec;
pub mod config;
pub mod error;
pub mod extensions;
pub mod fluent;
pub mod query;
pub mod result;
pub mod value;

pub mod profiling;
mod tracing;

pub use config::{ClientOptions, GlobalOmit};
pub use error::{BoxError, QueryError, Result, ValidationError, ValidationErrorKind};
pub use extensions::{ComputedFieldDef, ExtensionChain, ExtensionLayer};
pub use fluent::FluentContext;
pub use query::WireQuery;
pub use value::{Object, Value};

pub use quarry_types::{Action, DataModel, Field, Model, WireAction};

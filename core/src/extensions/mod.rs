//! Client extensions
//!
//! An [`ExtensionLayer`] bundles computed result fields, model and client
//! methods, and query interceptors. Layers are stacked into an
//! [`ExtensionChain`], which resolves and memoizes what every model sees.

mod chain;
mod computed;
mod layer;
mod query;

pub use chain::{ExtensionChain, MethodBundle, NamedInterceptor, NamedMethod};
pub use computed::{ComputedField, ComputedFields, apply_to_selection, resolve};
pub use layer::{
    ComputeFn, ComputedFieldDef, ExtensionLayer, ExtensionLayerBuilder, MethodContext, MethodFn, Next,
    QueryFn, QueryParams,
};
pub use query::apply_query_extensions;

/// Model key matching every model
pub const ALL_MODELS: &str = "$allModels";

/// Action key matching every action
pub const ALL_OPERATIONS: &str = "$allOperations";

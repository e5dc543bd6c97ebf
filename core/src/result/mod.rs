//! Result hydration
//!
//! [`visit_query_result`] re-associates every record of a decoded result
//! with its model and arguments; [`apply_result_extensions`] is the visitor
//! that layers computed fields over each record through an
//! [`ExtendedRecord`].

mod apply;
mod overlay;
mod visit;

pub use apply::apply_result_extensions;
pub use overlay::{ExtendedRecord, FieldSource};
pub use visit::visit_query_result;

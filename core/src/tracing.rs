//! Tracing utilities for query shaping and result hydration.
//!
//! Enable the `tracing` feature to emit spans and events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a debug-level tracing event for a serialized query.
///
/// ```ignore
/// quarry_trace_query!(model_name, action, selection.len());
/// ```
#[macro_export]
macro_rules! quarry_trace_query {
    ($model:expr, $action:expr, $selection:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            model = ?$model,
            action = %$action,
            selection = $selection,
            "quarry.query"
        );
    };
}

/// Emit a debug-level tracing event for extension lifecycle (append, cycle rejection).
///
/// ```ignore
/// quarry_trace_extension!("append", layer.name());
/// ```
#[macro_export]
macro_rules! quarry_trace_extension {
    ($event:literal, $name:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(event = $event, extension = ?$name, "quarry.extension");
    };
}

/// Emit a trace-level event for every model-shaped result node that gets extended.
///
/// ```ignore
/// quarry_trace_result!(model_name, computed.len(), masked.len());
/// ```
#[macro_export]
macro_rules! quarry_trace_result {
    ($model:expr, $computed:expr, $masked:expr) => {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            model = %$model,
            computed = $computed,
            masked = $masked,
            "quarry.result"
        );
    };
}

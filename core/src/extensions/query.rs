use quarry_types::Action;

use crate::error::{QueryError, Result};
use crate::value::Value;

use super::chain::{ExtensionChain, NamedInterceptor};
use super::layer::QueryParams;

/// Runs `base` wrapped in every interceptor registered for the call
///
/// The most recently registered interceptor runs outermost. Each one
/// receives the call and a `next` continuation into the inner
/// interceptors; it may rewrite the arguments, skip `next` or replace the
/// result.
pub fn apply_query_extensions(
    chain: &ExtensionChain,
    model: Option<&str>,
    action: Action,
    args: Value,
    base: &dyn Fn(Value) -> Result<Value>,
) -> Result<Value> {
    let interceptors = chain.all_query_interceptors(model, action);
    run(&interceptors, model, action, args, base)
}

fn run(
    interceptors: &[NamedInterceptor],
    model: Option<&str>,
    action: Action,
    args: Value,
    base: &dyn Fn(Value) -> Result<Value>,
) -> Result<Value> {
    let Some((outer, inner)) = interceptors.split_last() else {
        return base(args);
    };
    let next = |args: Value| run(inner, model, action, args, base);
    let params = QueryParams {
        model: model.map(str::to_string),
        action,
        args,
    };
    (outer.f)(params, &next).map_err(|e| QueryError::from_extension(outer.extension.as_deref(), e))
}

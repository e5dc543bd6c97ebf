use std::sync::Arc;

use quarry_core::extensions::{MethodContext, NamedMethod, apply_query_extensions};
use quarry_core::fluent::{resolve_context, unpack_data_path};
use quarry_core::query::serialize_query;
use quarry_core::result::{apply_result_extensions, visit_query_result};
use quarry_core::{
    Action, ClientOptions, DataModel, ExtensionChain, ExtensionLayer, QueryError, Result, Value,
    WireQuery, codec,
};

use crate::Engine;

/// Handle through which queries are shaped and results hydrated
///
/// Cloning is cheap. [`Client::extend`] returns a new handle and leaves the
/// one it was called on untouched.
#[derive(Debug, Clone)]
pub struct Client {
    graph: Arc<DataModel>,
    chain: ExtensionChain,
    options: Arc<ClientOptions>,
}

impl Client {
    pub fn new(graph: DataModel) -> Self {
        Self::with_options(graph, ClientOptions::default())
    }

    pub fn with_options(graph: DataModel, options: ClientOptions) -> Self {
        Self {
            graph: Arc::new(graph),
            chain: ExtensionChain::empty(),
            options: Arc::new(options),
        }
    }

    /// New handle with `layer` stacked on top of this one's extensions
    #[must_use]
    pub fn extend(&self, layer: ExtensionLayer) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            chain: self.chain.append(layer),
            options: Arc::clone(&self.options),
        }
    }

    pub fn graph(&self) -> &DataModel {
        &self.graph
    }

    pub fn chain(&self) -> &ExtensionChain {
        &self.chain
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Builds the wire query for one call
    pub fn serialize(&self, model: Option<&str>, action: Action, args: &Value) -> Result<WireQuery> {
        serialize_query(&self.graph, &self.chain, &self.options, model, action, args)
    }

    /// Hydrates the engine's answer to a call
    ///
    /// The response is decoded, narrowed to the node `data_path` points at,
    /// and every record in it gets the computed fields of its model.
    pub fn process_result(
        &self,
        model: Option<&str>,
        args: &Value,
        data_path: &[String],
        response: serde_json::Value,
    ) -> Result<Value> {
        let result = unpack_data_path(codec::decode(response), data_path);
        let Some(model) = model else {
            return Ok(result);
        };

        let context = resolve_context(data_path, model, args, &self.graph)?;
        let mut extend = |record: Value, model: &str, args: &Value| {
            let select = args
                .get("select")
                .filter(|select| select.is_truthy())
                .and_then(Value::as_object);
            let omit = self.options.effective_omit(Some(model), args);
            Ok(apply_result_extensions(record, model, select, omit.as_ref(), &self.chain))
        };
        visit_query_result(result, &context.args, &context.model_name, &self.graph, &mut extend)
    }

    /// Runs one call through the query interceptors and `engine`
    ///
    /// The innermost step serializes the (possibly rewritten) arguments,
    /// executes them and hydrates the result.
    pub fn request<E>(
        &self,
        engine: &E,
        model: Option<&str>,
        action: Action,
        args: Value,
        data_path: &[String],
    ) -> Result<Value>
    where
        E: Engine + ?Sized,
    {
        let base = |args: Value| -> Result<Value> {
            let query = self.serialize(model, action, &args)?;
            let response = engine.execute(&query)?;
            self.process_result(model, &args, data_path, response)
        };
        apply_query_extensions(&self.chain, model, action, args, &base)
    }

    /// Calls a method that an extension added to `model`
    pub fn call_model_method(&self, model: &str, name: &str, args: Value) -> Result<Value> {
        if self.graph.model(model).is_none() {
            return Err(QueryError::UnknownModel(model.to_string()));
        }
        let methods = self.chain.all_model_methods(model);
        let method = methods
            .get(name)
            .ok_or_else(|| QueryError::UnknownMethod(format!("{model}.{name}")))?;
        call(
            method,
            &MethodContext {
                model: Some(model.to_string()),
            },
            args,
        )
    }

    /// Calls a method that an extension added to the client
    pub fn call_client_method(&self, name: &str, args: Value) -> Result<Value> {
        let methods = self.chain.all_client_methods();
        let method = methods
            .get(name)
            .ok_or_else(|| QueryError::UnknownMethod(name.to_string()))?;
        call(method, &MethodContext { model: None }, args)
    }
}

fn call(method: &NamedMethod, ctx: &MethodContext, args: Value) -> Result<Value> {
    quarry_core::quarry_trace_extension!("method", method.extension.as_deref());
    (method.f)(ctx, args).map_err(|err| QueryError::from_extension(method.extension.as_deref(), err))
}

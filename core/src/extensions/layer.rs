use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use quarry_types::Action;

use crate::error::{BoxError, QueryError, Result};
use crate::result::FieldSource;
use crate::value::Value;

use super::{ALL_MODELS, ALL_OPERATIONS};

/// Compute function as written by an extension author
pub type ComputeFn = dyn Fn(&dyn FieldSource) -> std::result::Result<Value, BoxError> + Send + Sync;

/// Model or client method contributed by an extension
pub type MethodFn =
    Arc<dyn Fn(&MethodContext, Value) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Continuation handed to a query interceptor
pub type Next<'a> = &'a dyn Fn(Value) -> Result<Value>;

/// Query interceptor contributed by an extension
pub type QueryFn =
    Arc<dyn Fn(QueryParams, Next<'_>) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Receiver of a model or client method call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodContext {
    /// `None` for client methods
    pub model: Option<String>,
}

/// The call an interceptor is wrapped around
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub model: Option<String>,
    pub action: Action,
    pub args: Value,
}

/// Computed field declaration
///
/// ```
/// use quarry_core::extensions::ComputedFieldDef;
///
/// let full_name = ComputedFieldDef::new("fullName")
///     .needs(["firstName", "lastName"])
///     .compute(|user| {
///         let first = user.get("firstName")?;
///         let last = user.get("lastName")?;
///         Ok(format!("{} {}", first.as_str().unwrap_or(""), last.as_str().unwrap_or("")).into())
///     });
/// assert_eq!(full_name.name(), "fullName");
/// ```
#[derive(Clone)]
pub struct ComputedFieldDef {
    pub(crate) name: String,
    pub(crate) needs: Vec<String>,
    pub(crate) compute: Arc<ComputeFn>,
}

impl ComputedFieldDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            needs: Vec::new(),
            compute: Arc::new(|_: &dyn FieldSource| -> std::result::Result<Value, BoxError> {
                Ok(Value::Undefined)
            }),
        }
    }

    /// Fields the compute function reads; stored or computed
    #[must_use]
    pub fn needs<I, S>(mut self, needs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.needs = needs.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn compute<F>(mut self, compute: F) -> Self
    where
        F: Fn(&dyn FieldSource) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.compute = Arc::new(compute);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ComputedFieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedFieldDef")
            .field("name", &self.name)
            .field("needs", &self.needs)
            .finish_non_exhaustive()
    }
}

/// One registered extension
///
/// Immutable once built. Model keys are model names or [`ALL_MODELS`];
/// interceptor action keys are action names or [`ALL_OPERATIONS`].
#[derive(Clone, Default)]
pub struct ExtensionLayer {
    name: Option<String>,
    result: IndexMap<String, IndexMap<String, ComputedFieldDef>>,
    model: IndexMap<String, IndexMap<String, MethodFn>>,
    client: IndexMap<String, MethodFn>,
    query: IndexMap<String, IndexMap<String, QueryFn>>,
}

impl ExtensionLayer {
    pub fn builder() -> ExtensionLayerBuilder {
        ExtensionLayerBuilder::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Computed fields declared under one model key, wildcard not merged
    pub fn computed_fields(&self, model_key: &str) -> Option<&IndexMap<String, ComputedFieldDef>> {
        self.result.get(model_key).filter(|fields| !fields.is_empty())
    }

    pub(crate) fn model_methods(&self, model_key: &str) -> Option<&IndexMap<String, MethodFn>> {
        self.model.get(model_key)
    }

    pub(crate) fn client_methods(&self) -> &IndexMap<String, MethodFn> {
        &self.client
    }

    pub(crate) fn query(&self, model_key: &str, action_key: &str) -> Option<&QueryFn> {
        self.query.get(model_key)?.get(action_key)
    }
}

impl fmt::Debug for ExtensionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn keys<V>(map: &IndexMap<String, V>) -> Vec<&str> {
            map.keys().map(String::as_str).collect()
        }
        f.debug_struct("ExtensionLayer")
            .field("name", &self.name)
            .field("result", &self.result)
            .field("model", &self.model.iter().map(|(k, v)| (k, keys(v))).collect::<Vec<_>>())
            .field("client", &keys(&self.client))
            .field("query", &self.query.iter().map(|(k, v)| (k, keys(v))).collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`ExtensionLayer`]
#[derive(Default)]
pub struct ExtensionLayerBuilder {
    layer: ExtensionLayer,
}

impl ExtensionLayerBuilder {
    /// Label used in extension error messages
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.layer.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn computed_field(mut self, model: impl Into<String>, field: ComputedFieldDef) -> Self {
        self.layer
            .result
            .entry(model.into())
            .or_default()
            .insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn model_method<F>(mut self, model: impl Into<String>, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&MethodContext, Value) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.layer
            .model
            .entry(model.into())
            .or_default()
            .insert(name.into(), Arc::new(f));
        self
    }

    #[must_use]
    pub fn client_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&MethodContext, Value) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.layer.client.insert(name.into(), Arc::new(f));
        self
    }

    /// Intercepts one action on a model (or on [`ALL_MODELS`])
    #[must_use]
    pub fn query<F>(self, model: impl Into<String>, action: Action, f: F) -> Self
    where
        F: Fn(QueryParams, Next<'_>) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.intercept(model.into(), action.as_str().to_string(), Arc::new(f))
    }

    /// Intercepts every action on a model (or on [`ALL_MODELS`])
    #[must_use]
    pub fn query_all_operations<F>(self, model: impl Into<String>, f: F) -> Self
    where
        F: Fn(QueryParams, Next<'_>) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.intercept(model.into(), ALL_OPERATIONS.to_string(), Arc::new(f))
    }

    fn intercept(mut self, model: String, action: String, f: QueryFn) -> Self {
        self.layer.query.entry(model).or_default().insert(action, f);
        self
    }

    /// Finishes the layer, rejecting computed fields that need each other
    /// in a loop
    pub fn build(self) -> Result<ExtensionLayer> {
        let layer = self.layer;
        let wildcard = layer.result.get(ALL_MODELS);
        for (model, fields) in &layer.result {
            let mut visible: IndexMap<&str, &ComputedFieldDef> = IndexMap::new();
            if model != ALL_MODELS
                && let Some(wildcard) = wildcard
            {
                visible.extend(wildcard.iter().map(|(k, v)| (k.as_str(), v)));
            }
            visible.extend(fields.iter().map(|(k, v)| (k.as_str(), v)));

            if let Some(field) = find_cycle(&visible) {
                crate::quarry_trace_extension!("cycle", layer.name());
                return Err(QueryError::CyclicComputedField {
                    model: model.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(layer)
    }
}

/// First field found on a dependency loop, if any
///
/// A field needing its own name reads the previous layer's value and does
/// not count as an edge.
fn find_cycle<'a>(fields: &IndexMap<&'a str, &'a ComputedFieldDef>) -> Option<&'a str> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        name: &'a str,
        fields: &IndexMap<&'a str, &'a ComputedFieldDef>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Option<&'a str> {
        match marks.get(name) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => return Some(name),
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        if let Some(def) = fields.get(name) {
            for need in &def.needs {
                if need == name {
                    continue;
                }
                if let Some((&dep, _)) = fields.get_key_value(need.as_str())
                    && let Some(found) = visit(dep, fields, marks)
                {
                    return Some(found);
                }
            }
        }
        marks.insert(name, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    fields
        .keys()
        .find_map(|&name| visit(name, fields, &mut marks))
}

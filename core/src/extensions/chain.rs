use core::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use hashbrown::HashMap;
use indexmap::IndexMap;
use quarry_types::Action;

use super::computed::{self, ComputedFields};
use super::layer::{ExtensionLayer, MethodFn, QueryFn};
use super::{ALL_MODELS, ALL_OPERATIONS};

/// A method together with the extension that declared it
#[derive(Clone)]
pub struct NamedMethod {
    pub extension: Option<String>,
    pub f: MethodFn,
}

/// A query interceptor together with the extension that declared it
#[derive(Clone)]
pub struct NamedInterceptor {
    pub extension: Option<String>,
    pub f: QueryFn,
}

pub type MethodBundle = IndexMap<String, NamedMethod>;

/// Write-once-per-key memo table owned by one chain node
struct Cache<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: Clone> Cache<V> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_insert_with(&self, key: &str, f: impl FnOnce() -> V) -> V {
        if let Some(value) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return value.clone();
        }
        // Computed outside the lock; a racing fill produces an equal value
        let value = f();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_insert(value)
            .clone()
    }
}

struct ChainNode {
    layer: Arc<ExtensionLayer>,
    previous: ExtensionChain,
    computed_fields: Cache<Option<Arc<ComputedFields>>>,
    model_methods: Cache<Arc<MethodBundle>>,
    client_methods: OnceLock<Arc<MethodBundle>>,
    query_interceptors: Cache<Arc<[NamedInterceptor]>>,
}

/// Immutable, newest-first stack of extension layers
///
/// Appending returns a new chain that shares every older node, so chains
/// handed out earlier stay valid along with their memoized views.
///
/// # Examples
///
/// ```
/// use quarry_core::extensions::{ExtensionChain, ExtensionLayer};
///
/// let base = ExtensionChain::empty();
/// let layer = ExtensionLayer::builder().name("audit").build().unwrap();
/// let extended = base.append(layer);
///
/// assert!(base.is_empty());
/// assert_eq!(extended.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct ExtensionChain {
    head: Option<Arc<ChainNode>>,
}

impl ExtensionChain {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(layer: ExtensionLayer) -> Self {
        Self::empty().append(layer)
    }

    /// New chain with `layer` on top; `self` is left as it was
    #[must_use]
    pub fn append(&self, layer: ExtensionLayer) -> Self {
        crate::quarry_trace_extension!("append", layer.name());
        Self {
            head: Some(Arc::new(ChainNode {
                layer: Arc::new(layer),
                previous: self.clone(),
                computed_fields: Cache::new(),
                model_methods: Cache::new(),
                client_methods: OnceLock::new(),
                query_interceptors: Cache::new(),
            })),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.layers().count()
    }

    /// Layers, newest first
    pub fn layers(&self) -> impl Iterator<Item = &ExtensionLayer> {
        let mut node = self.head.as_deref();
        core::iter::from_fn(move || {
            let current = node?;
            node = current.previous.head.as_deref();
            Some(&*current.layer)
        })
    }

    /// Computed fields visible on `model`, `None` when there are none
    pub fn all_computed_fields(&self, model: &str) -> Option<Arc<ComputedFields>> {
        let node = self.head.as_deref()?;
        node.computed_fields.get_or_insert_with(model, || {
            computed::resolve(node.previous.all_computed_fields(model), &node.layer, model)
        })
    }

    /// Methods callable on `model`; newer layers override older ones
    pub fn all_model_methods(&self, model: &str) -> Arc<MethodBundle> {
        let Some(node) = self.head.as_deref() else {
            return Arc::default();
        };
        node.model_methods.get_or_insert_with(model, || {
            let mut bundle = MethodBundle::clone(&node.previous.all_model_methods(model));
            for key in [ALL_MODELS, model] {
                if let Some(methods) = node.layer.model_methods(key) {
                    extend_bundle(&mut bundle, node.layer.name(), methods);
                }
            }
            Arc::new(bundle)
        })
    }

    /// Methods callable on the client itself
    pub fn all_client_methods(&self) -> Arc<MethodBundle> {
        let Some(node) = self.head.as_deref() else {
            return Arc::default();
        };
        node.client_methods
            .get_or_init(|| {
                let mut bundle = MethodBundle::clone(&node.previous.all_client_methods());
                extend_bundle(&mut bundle, node.layer.name(), node.layer.client_methods());
                Arc::new(bundle)
            })
            .clone()
    }

    /// Interceptors for one call, oldest layer first
    ///
    /// Within a layer the order is: model and action, model and all
    /// actions, all models and action, all models and all actions.
    /// Model-less calls only consult the all-models entries.
    pub fn all_query_interceptors(&self, model: Option<&str>, action: Action) -> Arc<[NamedInterceptor]> {
        let Some(node) = self.head.as_deref() else {
            return Arc::from(Vec::new());
        };
        let key = format!("{}.{}", model.unwrap_or(""), action.as_str());
        node.query_interceptors.get_or_insert_with(&key, || {
            let mut interceptors = node.previous.all_query_interceptors(model, action).to_vec();
            let layer = &node.layer;
            let model_keys = model.into_iter().chain([ALL_MODELS]);
            for model_key in model_keys {
                for action_key in [action.as_str(), ALL_OPERATIONS] {
                    if let Some(f) = layer.query(model_key, action_key) {
                        interceptors.push(NamedInterceptor {
                            extension: layer.name().map(str::to_string),
                            f: f.clone(),
                        });
                    }
                }
            }
            Arc::from(interceptors)
        })
    }
}

fn extend_bundle(bundle: &mut MethodBundle, extension: Option<&str>, methods: &IndexMap<String, MethodFn>) {
    for (name, f) in methods {
        bundle.insert(
            name.clone(),
            NamedMethod {
                extension: extension.map(str::to_string),
                f: f.clone(),
            },
        );
    }
}

impl fmt::Debug for ExtensionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.layers().map(|layer| layer.name().unwrap_or("<unnamed>")))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::extensions::{ComputedFieldDef, Next, QueryParams};
    use crate::value::Value;

    fn computed(model: &str, name: &str) -> ExtensionLayer {
        ExtensionLayer::builder()
            .computed_field(model, ComputedFieldDef::new(name).needs(["id"]))
            .build()
            .unwrap()
    }

    fn tag(label: &'static str) -> impl Fn(QueryParams, Next<'_>) -> Result<Value, BoxError> + Send + Sync + 'static {
        move |_, _| Ok(Value::from(label))
    }

    fn tagging(name: &'static str) -> ExtensionLayer {
        ExtensionLayer::builder()
            .name(name)
            .query("User", Action::FindMany, tag("model+action"))
            .query_all_operations("User", tag("model+all"))
            .query(ALL_MODELS, Action::FindMany, tag("all+action"))
            .query_all_operations(ALL_MODELS, tag("all+all"))
            .build()
            .unwrap()
    }

    fn labels(interceptors: &[NamedInterceptor]) -> Vec<String> {
        interceptors
            .iter()
            .map(|i| {
                let args = QueryParams {
                    model: None,
                    action: Action::FindMany,
                    args: Value::Null,
                };
                let next = |v: Value| -> crate::Result<Value> { Ok(v) };
                let label = (i.f)(args, &next).unwrap();
                format!("{}:{}", i.extension.as_deref().unwrap_or("-"), label.as_str().unwrap())
            })
            .collect()
    }

    #[test]
    fn test_append_leaves_receiver_untouched() {
        let base = ExtensionChain::single(computed("User", "a"));
        let left = base.append(computed("User", "b"));
        let right = base.append(computed("User", "c"));

        let keys = |chain: &ExtensionChain| {
            chain
                .all_computed_fields("User")
                .map(|f| f.keys().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        };
        assert_eq!(keys(&base), ["a"]);
        assert_eq!(keys(&left), ["a", "b"]);
        assert_eq!(keys(&right), ["a", "c"]);
        assert_eq!(base.len(), 1);
        assert!(ExtensionChain::empty().all_computed_fields("User").is_none());
    }

    #[test]
    fn test_computed_fields_are_memoized() {
        let chain = ExtensionChain::single(computed("User", "a")).append(computed("Post", "b"));
        let first = chain.all_computed_fields("User").unwrap();
        let second = chain.all_computed_fields("User").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(chain.all_computed_fields("Comment").is_none());
    }

    #[test]
    fn test_methods_newest_wins() {
        let older = ExtensionLayer::builder()
            .name("older")
            .model_method("User", "greet", |_, _| Ok(Value::from("older")))
            .model_method(ALL_MODELS, "count", |_, _| Ok(Value::from(0)))
            .client_method("ping", |_, _| Ok(Value::from("older")))
            .build()
            .unwrap();
        let newer = ExtensionLayer::builder()
            .name("newer")
            .model_method(ALL_MODELS, "greet", |_, _| Ok(Value::from("newer")))
            .client_method("ping", |_, _| Ok(Value::from("newer")))
            .build()
            .unwrap();
        let chain = ExtensionChain::single(older).append(newer);

        let methods = chain.all_model_methods("User");
        assert_eq!(methods.keys().collect::<Vec<_>>(), ["count", "greet"]);
        assert_eq!(methods["greet"].extension.as_deref(), Some("newer"));
        assert_eq!(chain.all_model_methods("Post").len(), 2);
        assert_eq!(chain.all_client_methods()["ping"].extension.as_deref(), Some("newer"));
    }

    #[test]
    fn test_interceptor_order() {
        let chain = ExtensionChain::single(tagging("a")).append(tagging("b"));

        assert_eq!(
            labels(&chain.all_query_interceptors(Some("User"), Action::FindMany)),
            [
                "a:model+action",
                "a:model+all",
                "a:all+action",
                "a:all+all",
                "b:model+action",
                "b:model+all",
                "b:all+action",
                "b:all+all",
            ]
        );
        assert_eq!(
            labels(&chain.all_query_interceptors(Some("Post"), Action::Create)),
            ["a:all+all", "b:all+all"]
        );
        assert_eq!(
            labels(&chain.all_query_interceptors(None, Action::FindMany)),
            ["a:all+action", "a:all+all", "b:all+action", "b:all+all"]
        );
    }
}

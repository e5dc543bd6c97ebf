//! Client configuration

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::{Object, Value};

/// Per-model map of field name to "omit by default"
pub type GlobalOmit = IndexMap<String, IndexMap<String, bool>>;

/// Options shared by every query issued through one client
///
/// ```
/// use quarry_core::ClientOptions;
///
/// let options: ClientOptions =
///     serde_json::from_str(r#"{ "omit": { "User": { "password": true } } }"#).unwrap();
/// assert!(options.omit_enabled);
/// assert_eq!(options.omit["User"]["password"], true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    /// Fields left out of implicit selections unless the caller asks for them
    pub omit: GlobalOmit,
    /// Enables the `omit` argument
    pub omit_enabled: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            omit: GlobalOmit::new(),
            omit_enabled: true,
        }
    }
}

impl ClientOptions {
    #[must_use]
    pub fn with_global_omit(mut self, model: impl Into<String>, field: impl Into<String>) -> Self {
        self.omit
            .entry(model.into())
            .or_default()
            .insert(field.into(), true);
        self
    }

    /// Global and caller omissions for one selection node
    ///
    /// Caller entries win over global ones. `None` when omission is
    /// disabled, when the node has an explicit `select`, or when nothing
    /// is omitted.
    pub fn effective_omit(&self, model: Option<&str>, args: &Value) -> Option<Object> {
        if !self.omit_enabled || args.get_truthy("select").is_some() {
            return None;
        }
        let mut omit: Object = model
            .and_then(|model| self.omit.get(model))
            .into_iter()
            .flatten()
            .map(|(field, omitted)| (field.clone(), Value::Bool(*omitted)))
            .collect();
        if let Some(Value::Object(caller)) = args.get_truthy("omit") {
            omit.extend(caller.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        omit.retain(|_, v| !matches!(v, Value::Undefined));
        (!omit.is_empty()).then_some(omit)
    }
}

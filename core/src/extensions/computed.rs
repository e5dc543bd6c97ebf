//! Computed field resolution
//!
//! Each chain node folds its layer's declarations for a model into the
//! view inherited from the previous node. Needs are flattened to stored
//! field names, and a field that shadows an earlier definition of the same
//! name is composed with it rather than replacing it.

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::error::{QueryError, Result};
use crate::result::FieldSource;
use crate::value::{Object, Value};

use super::ALL_MODELS;
use super::layer::{ComputedFieldDef, ExtensionLayer};

type ResolvedFn = dyn Fn(&dyn FieldSource) -> Result<Value> + Send + Sync;

/// A computed field as visible on one model
#[derive(Clone)]
pub struct ComputedField {
    pub name: String,
    /// Stored fields the value is derived from, transitively
    pub needs: Vec<String>,
    compute: Arc<ResolvedFn>,
}

impl ComputedField {
    pub fn new<I, S, F>(name: impl Into<String>, needs: I, compute: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&dyn FieldSource) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            needs: needs.into_iter().map(Into::into).collect(),
            compute: Arc::new(compute),
        }
    }

    pub fn evaluate(&self, record: &dyn FieldSource) -> Result<Value> {
        (self.compute)(record)
    }
}

impl fmt::Debug for ComputedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedField")
            .field("name", &self.name)
            .field("needs", &self.needs)
            .finish_non_exhaustive()
    }
}

/// Every computed field visible on a model, dependencies first
pub type ComputedFields = IndexMap<String, ComputedField>;

/// Folds `layer`'s declarations for `model` into `previous`
///
/// Returns `previous` untouched when the layer declares nothing for the
/// model, neither under its name nor under [`ALL_MODELS`].
pub fn resolve(
    previous: Option<Arc<ComputedFields>>,
    layer: &ExtensionLayer,
    model: &str,
) -> Option<Arc<ComputedFields>> {
    let wildcard = layer.computed_fields(ALL_MODELS);
    let specific = layer.computed_fields(model);
    if wildcard.is_none() && specific.is_none() {
        return previous;
    }

    let mut declared: IndexMap<&str, &ComputedFieldDef> = IndexMap::new();
    for fields in [wildcard, specific].into_iter().flatten() {
        declared.extend(fields.iter().map(|(name, def)| (name.as_str(), def)));
    }

    let mut resolver = Resolver {
        declared: &declared,
        previous: previous.as_deref(),
        extension: layer.name(),
        memo: HashMap::new(),
        visiting: Vec::new(),
        output: previous.as_deref().cloned().unwrap_or_default(),
        placed: Vec::new(),
    };
    for &name in declared.keys() {
        resolver.place(name);
    }
    Some(Arc::new(resolver.output))
}

struct Resolver<'a> {
    declared: &'a IndexMap<&'a str, &'a ComputedFieldDef>,
    previous: Option<&'a ComputedFields>,
    extension: Option<&'a str>,
    memo: HashMap<&'a str, Vec<String>>,
    visiting: Vec<&'a str>,
    output: ComputedFields,
    placed: Vec<&'a str>,
}

impl<'a> Resolver<'a> {
    /// Inserts `name` after the fields of this layer it depends on
    fn place(&mut self, name: &'a str) {
        if self.placed.contains(&name) {
            return;
        }
        self.placed.push(name);
        let Some(def) = self.declared.get(name).copied() else {
            return;
        };
        for need in &def.needs {
            if need != name
                && let Some((&dep, _)) = self.declared.get_key_value(need.as_str())
            {
                self.place(dep);
            }
        }

        let field = ComputedField {
            name: name.to_string(),
            needs: self.flatten(name),
            compute: compose(
                self.extension.map(str::to_string),
                def,
                self.previous.and_then(|previous| previous.get(name)).cloned(),
            ),
        };
        // Shadowed fields keep their slot unless they now need a field placed after it
        if self.needs_later_field(name, def) {
            self.output.shift_remove(name);
        }
        self.output.insert(name.to_string(), field);
    }

    fn needs_later_field(&self, name: &str, def: &ComputedFieldDef) -> bool {
        let Some(slot) = self.output.get_index_of(name) else {
            return false;
        };
        def.needs.iter().any(|need| {
            need != name
                && self.declared.contains_key(need.as_str())
                && self
                    .output
                    .get_index_of(need.as_str())
                    .is_some_and(|dep| dep > slot)
        })
    }

    /// Stored fields `name` transitively needs
    fn flatten(&mut self, name: &'a str) -> Vec<String> {
        if let Some(needs) = self.memo.get(name) {
            return needs.clone();
        }
        // Rejected when the layer is built; kept so a cycle can never recurse forever
        if self.visiting.contains(&name) {
            return vec![name.to_string()];
        }
        let Some(def) = self.declared.get(name).copied() else {
            return self.inherited(name);
        };

        self.visiting.push(name);
        let mut needs: Vec<String> = Vec::new();
        for need in &def.needs {
            let resolved = if need == name {
                self.inherited(name)
            } else if let Some((&dep, _)) = self.declared.get_key_value(need.as_str()) {
                self.flatten(dep)
            } else {
                self.inherited(need)
            };
            for field in resolved {
                if !needs.contains(&field) {
                    needs.push(field);
                }
            }
        }
        self.visiting.pop();

        self.memo.insert(name, needs.clone());
        needs
    }

    /// Needs of a name as seen before this layer
    fn inherited(&self, name: &str) -> Vec<String> {
        match self.previous.and_then(|previous| previous.get(name)) {
            Some(field) => field.needs.clone(),
            None => vec![name.to_string()],
        }
    }
}

fn compose(
    extension: Option<String>,
    def: &ComputedFieldDef,
    previous: Option<ComputedField>,
) -> Arc<ResolvedFn> {
    let compute = def.compute.clone();
    match previous {
        None => Arc::new(move |record: &dyn FieldSource| {
            compute(record).map_err(|e| QueryError::from_extension(extension.as_deref(), e))
        }),
        Some(previous) => Arc::new(move |record: &dyn FieldSource| {
            let shadowed = Shadowed {
                record,
                previous: &previous,
            };
            compute(&shadowed).map_err(|e| QueryError::from_extension(extension.as_deref(), e))
        }),
    }
}

/// Record as seen by a field that shadows an earlier definition: reading
/// its own name yields the earlier definition's value
struct Shadowed<'a> {
    record: &'a dyn FieldSource,
    previous: &'a ComputedField,
}

impl FieldSource for Shadowed<'_> {
    fn field(&self, name: &str) -> Result<Option<Value>> {
        if name == self.previous.name {
            return self.previous.evaluate(self.record).map(Some);
        }
        self.record.field(name)
    }
}

/// Adds the needs of every selected computed field to `select`
///
/// Computed field names stay in the selection; the serializer drops the
/// ones that do not name a stored field.
pub fn apply_to_selection(select: &Object, fields: &ComputedFields) -> Object {
    let mut out = select.clone();
    for field in fields.values() {
        if !select.get(&field.name).is_some_and(Value::is_truthy) {
            continue;
        }
        for need in &field.needs {
            out.insert(need.clone(), Value::Bool(true));
        }
    }
    out
}

//! Lazy computed-property overlay around a result record

use core::fmt;
use std::sync::OnceLock;

use crate::error::Result;
use crate::extensions::ComputedField;
use crate::value::{Object, Value};

/// Read access to the fields of a record
///
/// Compute functions receive their owning record through this trait.
/// `field` returns `None` for properties the record does not have.
pub trait FieldSource {
    fn field(&self, name: &str) -> Result<Option<Value>>;

    /// Like [`FieldSource::field`], with absent properties read as
    /// [`Value::Undefined`]
    fn get(&self, name: &str) -> Result<Value> {
        Ok(self.field(name)?.unwrap_or_default())
    }
}

impl FieldSource for Object {
    fn field(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.get(name).cloned())
    }
}

#[derive(Clone)]
struct ComputedProperty {
    field: ComputedField,
    cache: OnceLock<Value>,
}

/// Result record with computed properties layered on top and
/// dependency-only properties masked
///
/// Computed properties are evaluated on first access and cached for the
/// lifetime of the record. Each one sees the unmasked stored properties
/// and every computed property added before it.
#[derive(Clone)]
pub struct ExtendedRecord {
    base: Object,
    computed: Vec<ComputedProperty>,
    masked: Vec<String>,
}

impl ExtendedRecord {
    pub fn new(base: Object) -> Self {
        Self {
            base,
            computed: Vec::new(),
            masked: Vec::new(),
        }
    }

    pub(crate) fn push_computed(&mut self, field: ComputedField) {
        self.computed.push(ComputedProperty {
            field,
            cache: OnceLock::new(),
        });
    }

    pub(crate) fn mask(&mut self, names: impl IntoIterator<Item = String>) {
        for name in names {
            if !self.masked.contains(&name) {
                self.masked.push(name);
            }
        }
    }

    /// Stored properties, masked ones included
    pub fn base(&self) -> &Object {
        &self.base
    }

    pub(crate) fn base_mut(&mut self) -> &mut Object {
        &mut self.base
    }

    /// Names of the added computed properties
    pub fn computed_names(&self) -> impl Iterator<Item = &str> {
        self.computed.iter().map(|p| p.field.name.as_str())
    }

    pub fn masked(&self) -> &[String] {
        &self.masked
    }

    /// Visible keys: stored properties first, then computed ones
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.base.keys().map(String::as_str).collect();
        for name in self.computed_names() {
            if !keys.contains(&name) {
                keys.push(name);
            }
        }
        keys.retain(|key| !self.masked.iter().any(|m| m == key));
        keys
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.keys().contains(&name)
    }

    /// Evaluates every visible property into a plain object
    pub fn to_object(&self) -> Result<Object> {
        let mut out = Object::with_capacity(self.base.len() + self.computed.len());
        for key in self.keys() {
            if let Some(value) = self.field(key)? {
                out.insert(key.to_string(), value);
            }
        }
        Ok(out)
    }

    fn evaluate(&self, index: usize) -> Result<Value> {
        let property = &self.computed[index];
        if let Some(value) = property.cache.get() {
            return Ok(value.clone());
        }
        let view = LayerView {
            record: self,
            upto: index,
        };
        let value = property.field.evaluate(&view)?;
        Ok(property.cache.get_or_init(|| value).clone())
    }

    fn lookup(&self, name: &str, upto: usize) -> Result<Option<Value>> {
        match self.computed[..upto]
            .iter()
            .rposition(|p| p.field.name == name)
        {
            Some(index) => self.evaluate(index).map(Some),
            None => Ok(self.base.get(name).cloned()),
        }
    }
}

impl FieldSource for ExtendedRecord {
    fn field(&self, name: &str) -> Result<Option<Value>> {
        if self.masked.iter().any(|m| m == name) {
            return Ok(None);
        }
        self.lookup(name, self.computed.len())
    }
}

/// What the computed property at `upto` sees of its record
struct LayerView<'a> {
    record: &'a ExtendedRecord,
    upto: usize,
}

impl FieldSource for LayerView<'_> {
    fn field(&self, name: &str) -> Result<Option<Value>> {
        self.record.lookup(name, self.upto)
    }
}

impl fmt::Debug for ExtendedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedRecord")
            .field("base", &self.base)
            .field("computed", &self.computed_names().collect::<Vec<_>>())
            .field("masked", &self.masked)
            .finish()
    }
}

use crate::extensions::ExtensionChain;
use crate::value::{Object, Value};

use super::overlay::ExtendedRecord;

/// Adds `model`'s computed fields to one result record
///
/// A computed field is added when it survives `omit` (or is picked by
/// `select`) and every stored field it needs is present on the record.
/// Needed fields the caller did not ask for are masked. Lists, `null`
/// and records that were already extended come back unchanged.
pub fn apply_result_extensions(
    result: Value,
    model: &str,
    select: Option<&Object>,
    omit: Option<&Object>,
    chain: &ExtensionChain,
) -> Value {
    let Value::Object(base) = result else {
        return result;
    };
    let Some(fields) = chain.all_computed_fields(model) else {
        return Value::Object(base);
    };

    let mut record = ExtendedRecord::new(base);
    let mut masked: Vec<String> = Vec::new();
    for field in fields.values() {
        if let Some(omit) = omit {
            if flag(omit, &field.name) {
                continue;
            }
            masked.extend(field.needs.iter().filter(|need| flag(omit, need)).cloned());
        } else if let Some(select) = select {
            if !flag(select, &field.name) {
                continue;
            }
            masked.extend(field.needs.iter().filter(|need| !flag(select, need)).cloned());
        }

        if field.needs.iter().all(|need| record.base().contains_key(need)) {
            record.push_computed(field.clone());
        }
    }

    let computed = record.computed_names().count();
    if computed == 0 && masked.is_empty() {
        return Value::Object(core::mem::take(record.base_mut()));
    }
    crate::quarry_trace_result!(model, computed, masked.len());
    record.mask(masked);
    Value::Extended(record)
}

fn flag(map: &Object, key: &str) -> bool {
    map.get(key).is_some_and(Value::is_truthy)
}

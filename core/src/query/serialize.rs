use std::sync::Arc;

use quarry_types::{Action, DataModel, Field};

use crate::ClientOptions;
use crate::codec::{ArgumentContext, encode};
use crate::error::{QueryError, Result, ValidationError, ValidationErrorKind};
use crate::extensions::{ComputedFields, ExtensionChain, apply_to_selection};
use crate::value::{Object, Value};

use super::wire::{COMPOSITES, FieldSelection, SCALARS, SelectionSet, SelectionValue, WireQuery};

/// Turns a caller's arguments into the engine's query shape
///
/// `select`, `include` and `omit` become the selection tree; every other
/// argument is encoded with [`encode`]. Relations are resolved through
/// `graph`, and computed fields from `chain` are replaced by the stored
/// fields they need.
pub fn serialize_query(
    graph: &DataModel,
    chain: &ExtensionChain,
    options: &ClientOptions,
    model: Option<&str>,
    action: Action,
    args: &Value,
) -> Result<WireQuery> {
    crate::quarry_profile_function!();

    if let Some(model) = model
        && graph.model(model).is_none()
    {
        return Err(QueryError::UnknownModel(model.to_string()));
    }

    let ctx = SerializeContext {
        graph,
        chain,
        options,
        action,
        model,
        selection_path: Vec::new(),
    };
    let query = serialize_field_selection(args, &ctx)?;
    crate::quarry_trace_query!(model, action, query.selection.len());

    Ok(WireQuery {
        model_name: model.map(str::to_string),
        action: action.to_wire(),
        query,
    })
}

struct SerializeContext<'a> {
    graph: &'a DataModel,
    chain: &'a ExtensionChain,
    options: &'a ClientOptions,
    action: Action,
    /// `None` for client-level calls and for non-model nested objects
    model: Option<&'a str>,
    selection_path: Vec<String>,
}

impl<'a> SerializeContext<'a> {
    fn nest_selection(&self, field: &str) -> Self {
        let mut selection_path = self.selection_path.clone();
        selection_path.push(field.to_string());
        Self {
            graph: self.graph,
            chain: self.chain,
            options: self.options,
            action: self.action,
            model: self
                .model
                .and_then(|model| self.graph.relation_target(model, field)),
            selection_path,
        }
    }

    fn find_field(&self, name: &str) -> Option<&'a Field> {
        self.graph.field(self.model?, name)
    }

    fn computed_fields(&self) -> Option<Arc<ComputedFields>> {
        self.chain.all_computed_fields(self.model?)
    }

    fn error(&self, kind: ValidationErrorKind) -> QueryError {
        ValidationError::new(kind)
            .with_selection_path(self.selection_path.clone())
            .into()
    }

    fn expect_object<'v>(&self, name: &str, value: &'v Value) -> Result<&'v Object> {
        value.as_object().ok_or_else(|| {
            ValidationError::new(ValidationErrorKind::InvalidArgumentValue {
                argument_name: name.to_string(),
                type_names: vec!["Object".to_string()],
                underlying_error: format!("`{name}` must be an object"),
            })
            .with_selection_path(self.selection_path.clone())
            .with_argument_path(vec![name.to_string()])
            .into()
        })
    }
}

fn serialize_field_selection(args: &Value, ctx: &SerializeContext<'_>) -> Result<FieldSelection> {
    let empty = Object::new();
    let entries = match args {
        Value::Undefined | Value::Null => &empty,
        other => ctx.expect_object("args", other)?,
    };

    let arg_ctx = ArgumentContext::new(ctx.selection_path.clone());
    let mut select = None;
    let mut include = None;
    let mut omit = None;
    let mut arguments = serde_json::Map::new();
    for (key, value) in entries {
        match key.as_str() {
            "select" => select = Some(value),
            "include" => include = Some(value),
            "omit" if ctx.options.omit_enabled => omit = Some(value),
            _ if matches!(value, Value::Undefined) => {}
            _ => {
                arguments.insert(key.clone(), encode(value, &arg_ctx.nested(key))?);
            }
        }
    }

    let selection = serialize_selection_set(truthy(select), truthy(include), truthy(omit), ctx)?;
    Ok(FieldSelection {
        arguments,
        selection,
    })
}

fn serialize_selection_set(
    select: Option<&Value>,
    include: Option<&Value>,
    omit: Option<&Value>,
    ctx: &SerializeContext<'_>,
) -> Result<SelectionSet> {
    if let Some(select) = select {
        let second = match (include, omit) {
            (Some(_), _) => Some("include"),
            (None, Some(_)) => Some("omit"),
            (None, None) => None,
        };
        if let Some(second) = second {
            return Err(ctx.error(ValidationErrorKind::MutuallyExclusiveFields {
                first_field: "select".to_string(),
                second_field: second.to_string(),
            }));
        }
        return explicit_selection(ctx.expect_object("select", select)?, ctx);
    }

    let mut selection = SelectionSet::new();
    if ctx.action.is_raw() {
        return Ok(selection);
    }
    if ctx.model.is_some() {
        selection.insert(COMPOSITES.to_string(), SelectionValue::Include(true));
        selection.insert(SCALARS.to_string(), SelectionValue::Include(true));
    }
    if let Some(include) = include {
        add_included_relations(&mut selection, ctx.expect_object("include", include)?, ctx)?;
    }
    if ctx.options.omit_enabled {
        let omit = omit.map(|omit| ctx.expect_object("omit", omit)).transpose()?;
        add_omissions(&mut selection, omit, ctx);
    }
    Ok(selection)
}

fn explicit_selection(select: &Object, ctx: &SerializeContext<'_>) -> Result<SelectionSet> {
    let computed = ctx.computed_fields();
    let select = match &computed {
        Some(fields) => apply_to_selection(select, fields),
        None => select.clone(),
    };

    let mut selection = SelectionSet::new();
    for (key, value) in &select {
        if matches!(value, Value::Undefined) {
            continue;
        }
        let field = ctx.find_field(key);
        if field.is_none() && is_computed(computed.as_deref(), key) {
            continue;
        }
        let entry = match value {
            Value::Object(_) => SelectionValue::Nested(serialize_field_selection(value, &ctx.nest_selection(key))?),
            v if !v.is_truthy() => SelectionValue::Include(false),
            _ if field.is_some_and(Field::is_relation) => {
                SelectionValue::Nested(serialize_field_selection(&Value::Null, &ctx.nest_selection(key))?)
            }
            _ => SelectionValue::Include(true),
        };
        selection.insert(key.clone(), entry);
    }
    Ok(selection)
}

fn add_included_relations(
    selection: &mut SelectionSet,
    include: &Object,
    ctx: &SerializeContext<'_>,
) -> Result<()> {
    for (key, value) in include {
        if matches!(value, Value::Undefined) {
            continue;
        }
        let nested = ctx.nest_selection(key);
        let field = ctx.find_field(key);
        if field.is_some_and(|field| !field.is_relation()) {
            return Err(nested.error(ValidationErrorKind::IncludeOnScalar {
                model: ctx.model.map(str::to_string),
            }));
        }
        if !value.is_truthy() {
            selection.insert(key.clone(), SelectionValue::Include(false));
            continue;
        }
        let entry = match field {
            Some(_) => SelectionValue::Nested(serialize_field_selection(nested_args(value), &nested)?),
            None if matches!(value, Value::Bool(true)) => SelectionValue::Include(true),
            None => SelectionValue::Nested(serialize_field_selection(value, &nested)?),
        };
        selection.insert(key.clone(), entry);
    }
    Ok(())
}

/// Writes global and caller omissions as `false` selection entries
///
/// Omitting a computed field omits the stored fields it needs, unless
/// they are mentioned on their own. Stored fields still needed by a
/// visible computed field stay selected; the result applier masks them.
fn add_omissions(selection: &mut SelectionSet, caller: Option<&Object>, ctx: &SerializeContext<'_>) {
    let mut omit: Object = ctx
        .model
        .and_then(|model| ctx.options.omit.get(model))
        .into_iter()
        .flatten()
        .map(|(field, omitted)| (field.clone(), Value::Bool(*omitted)))
        .collect();
    if let Some(caller) = caller {
        omit.extend(caller.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let computed = ctx.computed_fields();
    let mut kept: Vec<&str> = Vec::new();
    let mut injected: Vec<String> = Vec::new();
    for field in computed.iter().flat_map(|fields| fields.values()) {
        if omit.get(&field.name).is_some_and(Value::is_truthy) {
            injected.extend(field.needs.iter().filter(|need| !omit.contains_key(*need)).cloned());
        } else {
            kept.extend(field.needs.iter().map(String::as_str));
        }
    }
    for need in injected {
        omit.insert(need, Value::Bool(true));
    }

    for (key, value) in &omit {
        if matches!(value, Value::Undefined) {
            continue;
        }
        if ctx.find_field(key).is_none() && is_computed(computed.as_deref(), key) {
            continue;
        }
        let omitted = value.is_truthy();
        if omitted && kept.contains(&key.as_str()) {
            continue;
        }
        selection.insert(key.clone(), SelectionValue::Include(!omitted));
    }
}

fn truthy(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| v.is_truthy())
}

fn nested_args(value: &Value) -> &Value {
    match value {
        Value::Object(_) => value,
        _ => &Value::Null,
    }
}

fn is_computed(fields: Option<&ComputedFields>, name: &str) -> bool {
    fields.is_some_and(|fields| fields.contains_key(name))
}

//! Relation hops recorded by fluent accessors
//!
//! A data path such as `["select", "author", "include", "posts"]` alternates
//! a selector token with a relation name. The request is issued against the
//! root model, so the result must be unpacked along the path and extended
//! with the model and arguments of the node it lands on.

use quarry_types::DataModel;

use crate::error::{QueryError, Result};
use crate::value::{Object, Value};

/// Model and arguments that shaped the node a data path points at
#[derive(Debug, Clone, PartialEq)]
pub struct FluentContext {
    pub model_name: String,
    pub args: Value,
}

/// Resolves the model and sub-arguments at the end of `data_path`
///
/// Hops through an unknown model or a field that is not a relation fall
/// back to the root context. A field missing from a known model is an
/// error, since the path was recorded from that model's own accessors.
pub fn resolve_context(
    data_path: &[String],
    model: &str,
    args: &Value,
    graph: &DataModel,
) -> Result<FluentContext> {
    let root = || FluentContext {
        model_name: model.to_string(),
        args: args.clone(),
    };

    let mut current = root();
    for hop in data_path.chunks(2) {
        let [_, field] = hop else {
            break;
        };
        let Some(schema) = graph.model(&current.model_name) else {
            return Ok(root());
        };
        let Some(target) = schema.field(field).map(|f| f.relation_target()) else {
            return Err(QueryError::DataPath {
                model: current.model_name,
                field: field.clone(),
            });
        };
        let Some(target) = target else {
            return Ok(root());
        };
        current = FluentContext {
            model_name: target.to_string(),
            args: sub_args(&current.args, field),
        };
    }
    Ok(current)
}

/// Follows the field names of `data_path` into a decoded result
///
/// A missing or `null` hop yields `null`. Lists are not flattened.
pub fn unpack_data_path(mut value: Value, data_path: &[String]) -> Value {
    for field in data_path.iter().skip(1).step_by(2) {
        value = match value.member_mut(field) {
            Some(slot) => core::mem::take(slot),
            None => return Value::Null,
        };
        if value.is_nullish() {
            return Value::Null;
        }
    }
    value
}

fn sub_args(args: &Value, field: &str) -> Value {
    let config = ["select", "include"]
        .into_iter()
        .filter_map(|key| args.get_truthy(key)?.get(field))
        .find(|config| config.is_truthy());
    match config {
        Some(config @ Value::Object(_)) => config.clone(),
        _ => Value::Object(Object::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_types::{Field, Model};
    use serde_json::json;

    fn graph() -> DataModel {
        DataModel::new([
            Model::new(
                "User",
                [
                    Field::scalar("id", "String"),
                    Field::scalar("firstName", "String"),
                    Field::relation("posts", "Post", "UserToPost").list(),
                    Field::relation("profile", "Profile", "UserToProfile"),
                ],
            ),
            Model::new(
                "Post",
                [
                    Field::scalar("id", "String"),
                    Field::relation("author", "User", "UserToPost"),
                ],
            ),
            Model::new("Profile", [Field::scalar("bio", "String")]),
        ])
        .unwrap()
    }

    fn path(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_resolves_select_hop() {
        let args = Value::from(json!({ "select": { "posts": { "select": { "id": true } } } }));
        let ctx = resolve_context(&path(&["select", "posts"]), "User", &args, &graph()).unwrap();
        assert_eq!(ctx.model_name, "Post");
        assert_eq!(ctx.args, Value::from(json!({ "select": { "id": true } })));
    }

    #[test]
    fn test_multiple_hops_and_bare_true() {
        let args = Value::from(json!({ "include": { "posts": { "include": { "author": true } } } }));
        let ctx = resolve_context(
            &path(&["include", "posts", "include", "author"]),
            "User",
            &args,
            &graph(),
        )
        .unwrap();
        assert_eq!(ctx.model_name, "User");
        assert_eq!(ctx.args, Value::from(json!({})));
    }

    #[test]
    fn test_select_preferred_over_include() {
        let args = Value::from(json!({
            "select": { "profile": { "select": { "bio": true } } },
            "include": { "profile": { "omit": { "bio": true } } }
        }));
        let ctx = resolve_context(&path(&["select", "profile"]), "User", &args, &graph()).unwrap();
        assert_eq!(ctx.model_name, "Profile");
        assert_eq!(ctx.args, Value::from(json!({ "select": { "bio": true } })));
    }

    #[test]
    fn test_falls_back_to_root() {
        let args = Value::from(json!({ "where": { "id": "1" } }));
        let scalar = resolve_context(&path(&["select", "firstName"]), "User", &args, &graph()).unwrap();
        assert_eq!(scalar.model_name, "User");
        assert_eq!(scalar.args, args);

        let unknown = resolve_context(&path(&["select", "posts"]), "Ghost", &args, &graph()).unwrap();
        assert_eq!(unknown.model_name, "Ghost");
        assert_eq!(unknown.args, args);
    }

    #[test]
    fn test_absent_field_is_an_error() {
        let err = resolve_context(&path(&["select", "comments"]), "User", &Value::Null, &graph()).unwrap_err();
        assert!(matches!(
            err,
            QueryError::DataPath { ref model, ref field } if model == "User" && field == "comments"
        ));
    }

    #[test]
    fn test_empty_path_is_root() {
        let args = Value::from(json!({ "select": { "id": true } }));
        let ctx = resolve_context(&[], "Post", &args, &graph()).unwrap();
        assert_eq!(ctx, FluentContext { model_name: "Post".into(), args });
    }

    #[test]
    fn test_unpack_data_path() {
        let result = Value::from(json!({
            "id": "1",
            "profile": { "bio": "hi" },
            "posts": [{ "id": "p1" }]
        }));
        assert_eq!(
            unpack_data_path(result.clone(), &path(&["select", "profile"])),
            Value::from(json!({ "bio": "hi" }))
        );
        assert_eq!(
            unpack_data_path(result.clone(), &path(&["select", "posts"])),
            Value::from(json!([{ "id": "p1" }]))
        );
        assert_eq!(
            unpack_data_path(result.clone(), &path(&["select", "posts", "select", "author"])),
            Value::Null
        );
        assert_eq!(unpack_data_path(result.clone(), &[]), result);
        assert_eq!(
            unpack_data_path(Value::from(json!({ "profile": null })), &path(&["select", "profile", "select", "x"])),
            Value::Null
        );
    }
}
